//! Vocabulary listing for the `commands` command.

use pixsync_client::ClientConfig;
use pixsync_protocol::Command;
use serde::Serialize;

/// How often a command is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    /// Only during the handshake.
    HandshakeOnly,
    /// On every poll tick.
    EveryTick,
    /// On every n-th poll tick.
    EveryNthTick(u64),
}

/// One vocabulary entry.
#[derive(Debug, Serialize)]
pub struct CommandInfo {
    /// Wire name.
    pub name: &'static str,
    /// Whether the response carries a binary payload.
    pub carries_payload: bool,
    /// Whether the handshake waits for it.
    pub handshake: bool,
    /// Poll schedule once ready.
    pub schedule: Schedule,
}

/// Describes every command under `config`.
pub fn describe(config: &ClientConfig) -> Vec<CommandInfo> {
    let fast = config.poll_requests(1);
    let slow = config.poll_requests(0);

    Command::ALL
        .into_iter()
        .map(|command| {
            let schedule = if fast.contains(&command) {
                Schedule::EveryTick
            } else if slow.contains(&command) {
                Schedule::EveryNthTick(config.slow_poll_every)
            } else {
                Schedule::HandshakeOnly
            };
            CommandInfo {
                name: command.as_str(),
                carries_payload: command.carries_blob(),
                handshake: true,
                schedule,
            }
        })
        .collect()
}

/// Runs the commands command.
pub fn run(format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::new();
    let infos = describe(&config);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&infos)?);
        }
        _ => print_text_output(&infos, &config),
    }
    Ok(())
}

fn print_text_output(infos: &[CommandInfo], config: &ClientConfig) {
    println!("PixSync Command Vocabulary");
    println!("==========================");
    println!();
    println!(
        "Handshake: {} rounds, {:?} apart",
        config.handshake.rounds, config.handshake.interval
    );
    println!("Polling:   every {:?}", config.poll_interval);
    println!();
    for info in infos {
        let schedule = match info.schedule {
            Schedule::HandshakeOnly => "handshake only".to_string(),
            Schedule::EveryTick => "every tick".to_string(),
            Schedule::EveryNthTick(n) => format!("every {n}th tick"),
        };
        println!(
            "  {:<26} {:<8} {}",
            info.name,
            if info.carries_payload { "payload" } else { "" },
            schedule
        );
    }
}
