//! Sync client state machine.
//!
//! A [`SyncClient`] owns one worker thread that walks the lifecycle
//! `Starting → Discovering → Connecting → Handshaking → Ready`, then polls the
//! controller until shut down. Inbound envelopes are dispatched on whatever
//! thread the transport delivers them on and land in the shared
//! [`SnapshotStore`].

use crate::config::ClientConfig;
use crate::discovery::{resolve, Endpoint, ServiceDiscovery};
use crate::error::{ObserverError, SyncError, SyncResult};
use crate::feedback::Feedback;
use crate::lifecycle::ShutdownSignal;
use crate::observer::{Observer, ObserverRegistry};
use crate::snapshot::SnapshotStore;
use crate::transport::{EnvelopeSender, InboundHandler, Listener, Transport};
use parking_lot::{Condvar, Mutex, RwLock};
use pixsync_protocol::{
    ApplicationConfig, BlockDecoder, ColorSet, Command, CommandSet, Compression, Envelope,
    FileLocation, GuiState, ImageBuffer, MatrixData, OutputDescriptor, OutputMapping,
    PresetSettings, Response, RuntimeStatistics,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Lifecycle state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Worker spawned, nothing done yet.
    Starting,
    /// Looking up the controller endpoint.
    Discovering,
    /// Binding the local receiver and creating the sender.
    Connecting,
    /// Collecting the initial snapshot.
    Handshaking,
    /// Snapshot complete, polling.
    Ready,
    /// The handshake ran out of rounds.
    Failed,
    /// Shut down by the consumer.
    Stopped,
}

impl ClientState {
    /// Returns true for states the client never leaves on its own.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ClientState::Ready | ClientState::Failed | ClientState::Stopped
        )
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientState::Starting => "starting",
            ClientState::Discovering => "discovering",
            ClientState::Connecting => "connecting",
            ClientState::Handshaking => "handshaking",
            ClientState::Ready => "ready",
            ClientState::Failed => "failed",
            ClientState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Counters describing client traffic.
#[derive(Debug, Clone, Default)]
pub struct ClientStats {
    /// Requests handed to the sender successfully.
    pub requests_sent: u64,
    /// Requests the sender rejected.
    pub send_failures: u64,
    /// Envelopes delivered by the transport.
    pub envelopes_received: u64,
    /// Envelopes with an unknown pattern.
    pub envelopes_discarded: u64,
    /// Responses whose payload could not be decoded.
    pub decode_failures: u64,
    /// Handshake rounds started.
    pub handshake_rounds: u64,
    /// Poll ticks completed.
    pub poll_ticks: u64,
}

struct Shared {
    config: ClientConfig,
    feedback: Arc<dyn Feedback>,
    state: Mutex<ClientState>,
    state_changed: Condvar,
    ready: AtomicBool,
    received: AtomicU32,
    store: SnapshotStore,
    gui_observers: ObserverRegistry<GuiState>,
    decoder: Mutex<BlockDecoder>,
    compression: OnceLock<Compression>,
    endpoint: OnceLock<Endpoint>,
    sender: OnceLock<Box<dyn EnvelopeSender>>,
    listener: Mutex<Option<Box<dyn Listener>>>,
    shutdown: ShutdownSignal,
    finished: AtomicBool,
    stats: RwLock<ClientStats>,
}

impl Shared {
    fn new(config: ClientConfig, feedback: Arc<dyn Feedback>) -> Self {
        let decoder = BlockDecoder::new(config.buffer_size);
        Self {
            config,
            feedback,
            state: Mutex::new(ClientState::Starting),
            state_changed: Condvar::new(),
            ready: AtomicBool::new(false),
            received: AtomicU32::new(0),
            store: SnapshotStore::new(),
            gui_observers: ObserverRegistry::new(),
            decoder: Mutex::new(decoder),
            compression: OnceLock::new(),
            endpoint: OnceLock::new(),
            sender: OnceLock::new(),
            listener: Mutex::new(None),
            shutdown: ShutdownSignal::new(),
            finished: AtomicBool::new(false),
            stats: RwLock::new(ClientStats::default()),
        }
    }

    fn emit(&self, text: &str) {
        self.feedback.message(text);
    }

    fn state(&self) -> ClientState {
        *self.state.lock()
    }

    fn set_state(&self, next: ClientState) {
        let mut state = self.state.lock();
        let previous = *state;
        if previous != next {
            debug!(from = %previous, to = %next, "state transition");
            *state = next;
        }
        self.state_changed.notify_all();
    }

    fn received(&self) -> CommandSet {
        CommandSet::from_bits_truncate(self.received.load(Ordering::Acquire))
    }

    fn compression(&self) -> Compression {
        self.compression.get().copied().unwrap_or_default()
    }

    /// Full lifecycle, run on the worker thread.
    fn run<T, D>(self: &Arc<Self>, transport: &T, discovery: &D)
    where
        T: Transport,
        D: ServiceDiscovery + ?Sized,
    {
        self.emit("Detect PixelController OSC Port");
        self.set_state(ClientState::Discovering);
        let resolution = resolve(
            discovery,
            &self.config.service_type,
            self.config.discovery_timeout,
            &self.config.default_endpoint(),
        );
        self.emit(&resolution.notice());
        let endpoint = resolution.into_endpoint();
        let _ = self.endpoint.set(endpoint.clone());

        if self.shutdown.is_triggered() {
            return;
        }

        self.set_state(ClientState::Connecting);
        if let Err(e) = self.connect(transport, &endpoint) {
            error!(%endpoint, error = %e, "connection setup failed");
            self.close_listener();
            self.emit(&format!("ERROR: {e}"));
            return;
        }

        self.set_state(ClientState::Handshaking);
        match self.handshake() {
            Ok(true) => {
                self.ready.store(true, Ordering::Release);
                self.set_state(ClientState::Ready);
                info!(%endpoint, "handshake complete");
            }
            Ok(false) => return,
            Err(e) => {
                error!(error = %e, "handshake failed");
                self.set_state(ClientState::Failed);
                self.emit("");
                self.emit("ERROR: No answer from PixelController received!");
                self.emit("Start aborted, make sure PixelController is running and restart client");
                return;
            }
        }

        self.poll();
    }

    fn connect<T: Transport>(self: &Arc<Self>, transport: &T, endpoint: &Endpoint) -> SyncResult<()> {
        self.emit("Start OSC Server");
        let listener = transport.listen(
            self.config.local_port,
            self.config.buffer_size,
            self.inbound_handler(),
        )?;
        *self.listener.lock() = Some(listener);
        info!(port = self.config.local_port, "local receiver bound");
        self.emit(" ... started");

        self.emit("Connect to PixelController OSC Server");
        let sender = transport.connect(endpoint, self.config.buffer_size)?;
        let _ = self.sender.set(sender);
        info!(%endpoint, "connected to controller");
        self.emit(" ... done");
        Ok(())
    }

    fn close_listener(&self) {
        let listener = self.listener.lock().take();
        if let Some(mut listener) = listener {
            listener.close();
            debug!("local receiver closed");
        }
    }

    fn inbound_handler(self: &Arc<Self>) -> InboundHandler {
        let shared = Arc::downgrade(self);
        Arc::new(move |envelope: Envelope| {
            if let Some(shared) = shared.upgrade() {
                shared.handle_envelope(envelope);
            }
        })
    }

    /// Returns `Ok(true)` once every command answered, `Ok(false)` if
    /// interrupted by shutdown.
    fn handshake(&self) -> SyncResult<bool> {
        let required = CommandSet::all();
        let rounds = self.config.handshake.rounds;

        for round in 1..=rounds {
            let missing = required.difference(&self.received());
            self.stats.write().handshake_rounds += 1;
            debug!(round, missing = missing.len(), "handshake round");
            for command in missing.iter() {
                self.request(command);
            }

            if self.shutdown.wait(self.config.handshake.interval) {
                return Ok(false);
            }

            let received = self.received();
            if received.is_superset(&required) {
                return Ok(true);
            }
            let outstanding = required.difference(&received);
            info!(round, outstanding = outstanding.len(), "handshake incomplete");
            if round < rounds {
                self.emit(&format!(
                    "Waiting for PixelController ({round}/{rounds}), {} of {} items missing",
                    outstanding.len(),
                    required.len()
                ));
            }
        }

        Err(SyncError::HandshakeTimeout { rounds })
    }

    fn poll(&self) {
        let mut tick: u64 = 0;
        loop {
            for &command in self.config.poll_requests(tick) {
                self.request(command);
            }
            self.stats.write().poll_ticks += 1;
            tick = tick.wrapping_add(1);

            if self.shutdown.wait(self.config.poll_interval) {
                debug!(ticks = tick, "poller stopped");
                return;
            }
        }
    }

    fn request(&self, command: Command) {
        let Some(sender) = self.sender.get() else {
            return;
        };
        match sender.send(&Envelope::request(command)) {
            Ok(()) => {
                self.stats.write().requests_sent += 1;
                debug!(%command, "request sent");
            }
            Err(e) => {
                self.stats.write().send_failures += 1;
                error!(%command, error = %e, "failed to send request");
            }
        }
    }

    fn handle_envelope(&self, envelope: Envelope) {
        self.stats.write().envelopes_received += 1;

        if envelope.is_blank() {
            debug!("ignoring envelope without pattern");
            return;
        }
        let Some(command) = envelope.command() else {
            self.stats.write().envelopes_discarded += 1;
            debug!(pattern = %envelope.pattern, "discarding unknown message");
            return;
        };

        let mut bit = CommandSet::empty();
        bit.insert(command);
        self.received.fetch_or(bit.bits(), Ordering::AcqRel);

        let compression = self.compression();
        let decoded = {
            let mut decoder = self.decoder.lock();
            Response::decode(command, &envelope, &mut decoder, compression)
        };
        let response = match decoded {
            Ok(response) => response,
            Err(e) => {
                self.stats.write().decode_failures += 1;
                warn!(%command, bytes = envelope.payload_len(), error = %e, "failed to decode response");
                return;
            }
        };
        debug!(%command, "response received");

        if let Response::Configuration(config) = &response {
            let negotiated = Compression::from_enabled(config.use_remote_compression());
            if self.compression.set(negotiated).is_ok() {
                info!(?negotiated, "payload compression fixed for session");
            }
        }
        if let Some(notice) = receipt_notice(&response) {
            self.emit(&notice);
        }

        if let Some(gui_state) = self.store.apply(response) {
            let delivery = self.gui_observers.notify(&gui_state);
            if delivery.failed > 0 {
                debug!(
                    delivered = delivery.delivered,
                    failed = delivery.failed,
                    "gui state partially delivered"
                );
            }
        }
    }

    fn finish(&self) {
        let _state = self.state.lock();
        self.finished.store(true, Ordering::Release);
        self.state_changed.notify_all();
    }
}

fn receipt_notice(response: &Response) -> Option<String> {
    let notice = match response {
        Response::Version(version) => return Some(format!("Found PixelController Version {version}")),
        Response::Configuration(_) => "Received Configuration",
        Response::MatrixData(_) => "Received Matrixdata",
        Response::ColorSets(_) => "Received Colorsets",
        Response::OutputMappings(_) => "Received Output mapping",
        _ => return None,
    };
    Some(notice.to_string())
}

struct FinishGuard<'a>(&'a Shared);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Client that mirrors the state of a remote PixelController.
///
/// All read accessors are non-blocking and return shared handles to the
/// latest complete value. Dropping the client shuts it down.
pub struct SyncClient {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SyncClient {
    /// Starts the client on a new worker thread and returns immediately.
    pub fn start<T, D>(
        config: ClientConfig,
        transport: T,
        discovery: D,
        feedback: Arc<dyn Feedback>,
    ) -> SyncResult<Self>
    where
        T: Transport,
        D: ServiceDiscovery + 'static,
    {
        let shared = Arc::new(Shared::new(config, feedback));
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("pixsync-worker".into())
            .spawn(move || {
                let _finish = FinishGuard(&worker_shared);
                worker_shared.run(&transport, &discovery);
            })
            .map_err(|e| SyncError::Worker(e.to_string()))?;

        info!("sync client started");
        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Returns the client configuration.
    pub fn client_config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Returns the current state.
    pub fn state(&self) -> ClientState {
        self.shared.state()
    }

    /// Returns true once the handshake completed.
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    /// Returns true once the worker thread has exited.
    pub fn worker_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    /// Resolved controller endpoint, once discovery finished.
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.shared.endpoint.get().cloned()
    }

    /// Payload compression of this session. Disabled until the
    /// configuration arrived.
    pub fn compression(&self) -> Compression {
        self.shared.compression()
    }

    /// Commands answered at least once, whether or not decoding succeeded.
    pub fn received(&self) -> CommandSet {
        self.shared.received()
    }

    /// Returns traffic counters.
    pub fn stats(&self) -> ClientStats {
        self.shared.stats.read().clone()
    }

    /// Blocks the caller until the client settled in `Ready`, `Failed` or
    /// `Stopped`, the worker exited, or `timeout` elapsed. Returns the state
    /// at that point.
    pub fn wait_until_settled(&self, timeout: Duration) -> ClientState {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.shared.state.lock();
        loop {
            if state.is_settled() || self.shared.finished.load(Ordering::Acquire) {
                return *state;
            }
            match deadline {
                Some(deadline) => {
                    if self
                        .shared
                        .state_changed
                        .wait_until(&mut state, deadline)
                        .timed_out()
                    {
                        return *state;
                    }
                }
                None => self.shared.state_changed.wait(&mut state),
            }
        }
    }

    /// Controller version.
    pub fn version(&self) -> Option<Arc<String>> {
        self.shared.store.version()
    }

    /// Controller application configuration.
    pub fn config(&self) -> Option<Arc<ApplicationConfig>> {
        self.shared.store.config()
    }

    /// Matrix geometry.
    pub fn matrix(&self) -> Option<Arc<MatrixData>> {
        self.shared.store.matrix()
    }

    /// Color palettes.
    pub fn color_sets(&self) -> Option<Arc<Vec<ColorSet>>> {
        self.shared.store.color_sets()
    }

    /// Visual to output mappings.
    pub fn output_mappings(&self) -> Option<Arc<Vec<OutputMapping>>> {
        self.shared.store.output_mappings()
    }

    /// Output device descriptor.
    pub fn output(&self) -> Option<Arc<OutputDescriptor>> {
        self.shared.store.output()
    }

    /// UI state.
    pub fn gui_state(&self) -> Option<Arc<GuiState>> {
        self.shared.store.gui_state()
    }

    /// Preset settings.
    pub fn preset_settings(&self) -> Option<Arc<PresetSettings>> {
        self.shared.store.preset_settings()
    }

    /// Runtime statistics.
    pub fn statistics(&self) -> Option<Arc<RuntimeStatistics>> {
        self.shared.store.statistics()
    }

    /// File location descriptor.
    pub fn file_location(&self) -> Option<Arc<FileLocation>> {
        self.shared.store.file_location()
    }

    /// Latest pixel buffers.
    pub fn image_buffer(&self) -> Option<Arc<ImageBuffer>> {
        self.shared.store.image_buffer()
    }

    /// Pixels of output `nr` from the latest image buffer.
    pub fn output_buffer(&self, nr: usize) -> Option<Vec<u32>> {
        self.image_buffer()
            .and_then(|buffer| buffer.output_buffer(nr).map(<[u32]>::to_vec))
    }

    /// Pixels of visual `nr` from the latest image buffer.
    pub fn visual_buffer(&self, nr: usize) -> Option<Vec<u32>> {
        self.image_buffer()
            .and_then(|buffer| buffer.visual_buffer(nr).map(<[u32]>::to_vec))
    }

    /// Number of visuals: one per screen, one preview, plus additional
    /// visuals. Unknown until the configuration arrived.
    pub fn nr_of_visuals(&self) -> Option<usize> {
        self.config()
            .map(|config| config.nr_of_screens() + 1 + config.nr_of_additional_visuals())
    }

    /// Sends an arbitrary message; the first token is the pattern.
    pub fn send_message<S: AsRef<str>>(&self, tokens: &[S]) -> SyncResult<()> {
        let envelope = Envelope::from_tokens(tokens)?;
        let sender = self.shared.sender.get().ok_or(SyncError::NotConnected)?;
        debug!(pattern = %envelope.pattern, args = envelope.args.len(), "sending message");
        sender.send(&envelope)
    }

    /// Subscribes to UI-state updates.
    pub fn observe_gui_state(&self, observer: Arc<dyn Observer<GuiState>>) {
        self.shared.gui_observers.subscribe(observer);
    }

    /// Subscribes a closure to UI-state updates.
    pub fn on_gui_state<F>(&self, f: F)
    where
        F: Fn(&GuiState) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        self.shared.gui_observers.subscribe_fn(f);
    }

    /// Subscribes a channel to UI-state updates.
    pub fn gui_state_channel(&self) -> Receiver<GuiState> {
        self.shared.gui_observers.subscribe_channel()
    }

    /// Dispatches one inbound envelope, as the transport would.
    pub fn handle_envelope(&self, envelope: Envelope) {
        self.shared.handle_envelope(envelope);
    }

    /// Stops the worker, closes the receiver and moves to `Stopped` unless
    /// the handshake already failed. Idempotent.
    pub fn shutdown(&self) {
        self.shared.shutdown.trigger();

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                error!("sync worker panicked");
            }
        }

        self.shared.close_listener();

        if self.shared.state() != ClientState::Failed {
            self.shared.set_state(ClientState::Stopped);
        }
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncClient")
            .field("state", &self.state())
            .field("ready", &self.is_ready())
            .field("endpoint", &self.endpoint())
            .field("received", &self.received())
            .finish()
    }
}
