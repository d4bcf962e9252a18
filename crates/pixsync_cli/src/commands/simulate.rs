//! Simulate command implementation.

use pixsync_client::{
    ClientConfig, ClientState, Feedback, HandshakeConfig, LoopbackTransport, NoDiscovery,
    RecordingFeedback, SyncClient,
};
use pixsync_protocol::CommandSet;
use pixsync_testkit::SimulatedController;
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// Options of one simulation run.
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    /// Let the controller compress payloads.
    pub compression: bool,
    /// Let the controller ignore every request.
    pub silent: bool,
    /// Poll ticks to run once ready.
    pub ticks: u64,
    /// Wait between handshake rounds.
    pub handshake_interval: Duration,
    /// Wait between poll ticks.
    pub poll_interval: Duration,
    /// Output format (text, json).
    pub format: String,
}

/// Snapshot summary after a simulation run.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    /// Final client state.
    pub state: String,
    /// Whether the handshake completed.
    pub ready: bool,
    /// Resolved endpoint.
    pub endpoint: Option<String>,
    /// Whether payloads were compressed.
    pub compressed: bool,
    /// Controller version.
    pub version: Option<String>,
    /// Commands answered at least once.
    pub received: Vec<String>,
    /// Commands never answered.
    pub missing: Vec<String>,
    /// Number of visuals.
    pub visuals: Option<usize>,
    /// Matrix size, `WxH`.
    pub matrix: Option<String>,
    /// Color palette names.
    pub color_sets: Vec<String>,
    /// UI state entries.
    pub gui_state: Vec<String>,
    /// Frames rendered by the controller, as last polled.
    pub frame_count: Option<u64>,
    /// Poll ticks run.
    pub poll_ticks: u64,
    /// Requests sent.
    pub requests_sent: u64,
    /// Responses that failed to decode.
    pub decode_failures: u64,
    /// Feedback shown during the run (json output only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub feedback: Vec<String>,
}

impl SimulationReport {
    /// Collects the report from a stopped client.
    pub fn collect(client: &SyncClient, feedback: Vec<String>) -> Self {
        let received = client.received();
        let stats = client.stats();
        Self {
            state: client.state().to_string(),
            ready: client.is_ready(),
            endpoint: client.endpoint().map(|e| e.to_string()),
            compressed: client.compression().is_enabled(),
            version: client.version().map(|v| v.to_string()),
            received: names(received),
            missing: names(CommandSet::all().difference(&received)),
            visuals: client.nr_of_visuals(),
            matrix: client
                .matrix()
                .map(|m| format!("{}x{}", m.device_x_size, m.device_y_size)),
            color_sets: client
                .color_sets()
                .map(|sets| sets.iter().map(|s| s.name.clone()).collect())
                .unwrap_or_default(),
            gui_state: client
                .gui_state()
                .map(|state| state.entries().to_vec())
                .unwrap_or_default(),
            frame_count: client.statistics().map(|s| s.frame_count),
            poll_ticks: stats.poll_ticks,
            requests_sent: stats.requests_sent,
            decode_failures: stats.decode_failures,
            feedback,
        }
    }
}

fn names(set: CommandSet) -> Vec<String> {
    set.iter().map(|c| c.as_str().to_string()).collect()
}

/// Runs the simulate command.
pub fn run(options: &SimulateOptions) -> Result<(), Box<dyn std::error::Error>> {
    let controller = Arc::new(if options.compression {
        SimulatedController::compressed()
    } else {
        SimulatedController::new()
    });
    if options.silent {
        controller.set_silent(CommandSet::all());
    }

    let config = ClientConfig::new()
        .with_handshake(HandshakeConfig::new(5, options.handshake_interval))
        .with_poll_interval(options.poll_interval);
    let settle_timeout = config
        .handshake
        .budget()
        .saturating_add(Duration::from_secs(1));

    let json = options.format == "json";
    let recorder = Arc::new(RecordingFeedback::new());
    let feedback: Arc<dyn Feedback> = if json {
        recorder.clone()
    } else {
        Arc::new(|text: &str| println!("{text}"))
    };

    let transport = LoopbackTransport::new(Arc::clone(&controller));
    let client = SyncClient::start(config, transport, NoDiscovery, feedback)?;

    let state = client.wait_until_settled(settle_timeout);
    info!(%state, "client settled");
    if state == ClientState::Ready {
        wait_for_ticks(&client, options.ticks, options.poll_interval);
    }
    client.shutdown();

    let report = SimulationReport::collect(&client, recorder.messages());
    info!(
        requests = controller.total_requests(),
        ticks = report.poll_ticks,
        "simulation finished"
    );

    match options.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => print_text_output(&report),
    }
    Ok(())
}

fn wait_for_ticks(client: &SyncClient, ticks: u64, poll_interval: Duration) {
    let rounds = u32::try_from(ticks).unwrap_or(u32::MAX).saturating_add(2);
    let budget = poll_interval.saturating_mul(rounds).saturating_mul(2);
    let deadline = Instant::now().checked_add(budget);
    while client.stats().poll_ticks < ticks
        && deadline.is_none_or(|deadline| Instant::now() < deadline)
    {
        thread::sleep(poll_interval.min(Duration::from_millis(50)).max(Duration::from_millis(1)));
    }
}

fn print_text_output(report: &SimulationReport) {
    println!();
    println!("PixSync Simulation");
    println!("==================");
    println!();
    println!("State:       {} (ready: {})", report.state, report.ready);
    if let Some(endpoint) = &report.endpoint {
        println!("Endpoint:    {endpoint}");
    }
    println!("Compressed:  {}", report.compressed);
    println!(
        "Version:     {}",
        report.version.as_deref().unwrap_or("-")
    );
    println!();
    println!("Snapshot:");
    println!("  Received:  {}/{}", report.received.len(), report.received.len() + report.missing.len());
    if !report.missing.is_empty() {
        println!("  Missing:   {}", report.missing.join(", "));
    }
    if let Some(visuals) = report.visuals {
        println!("  Visuals:   {visuals}");
    }
    if let Some(matrix) = &report.matrix {
        println!("  Matrix:    {matrix}");
    }
    if !report.color_sets.is_empty() {
        println!("  Colorsets: {}", report.color_sets.join(", "));
    }
    for entry in &report.gui_state {
        println!("  GUI:       {entry}");
    }
    println!();
    println!("Traffic:");
    println!("  Poll ticks:      {}", report.poll_ticks);
    println!("  Requests sent:   {}", report.requests_sent);
    println!("  Decode failures: {}", report.decode_failures);
    if let Some(frames) = report.frame_count {
        println!("  Frames rendered: {frames}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_from_simulated_run() {
        let controller = Arc::new(SimulatedController::compressed());
        let config = ClientConfig::new()
            .with_handshake(HandshakeConfig::new(5, Duration::from_millis(20)))
            .with_poll_interval(Duration::from_millis(2));
        let client = SyncClient::start(
            config,
            LoopbackTransport::new(Arc::clone(&controller)),
            NoDiscovery,
            Arc::new(pixsync_client::NullFeedback),
        )
        .unwrap();

        assert_eq!(client.wait_until_settled(Duration::from_secs(10)), ClientState::Ready);
        wait_for_ticks(&client, 3, Duration::from_millis(2));
        client.shutdown();

        let report = SimulationReport::collect(&client, Vec::new());
        assert_eq!(report.state, "stopped");
        assert!(report.ready);
        assert!(report.compressed);
        assert!(report.missing.is_empty());
        assert_eq!(report.matrix.as_deref(), Some("8x8"));
        assert_eq!(report.visuals, Some(4));
        assert!(report.poll_ticks >= 3);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("feedback").is_none());
        assert_eq!(json["version"], "3.0.1");
    }
}
