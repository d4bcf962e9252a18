//! In-process simulated controller.
//!
//! [`SimulatedController`] answers requests routed through a
//! [`LoopbackTransport`] the way a running PixelController does: every
//! `GET_*` request is answered with the matching payload, and any other
//! message is treated as a UI command that updates and pushes the UI state.

use crate::fixtures::{fast_config, ControllerFixture};
use parking_lot::{Mutex, RwLock};
use pixsync_client::{
    ClientConfig, Feedback, LoopbackTransport, NoDiscovery, NullFeedback, Responder, SyncClient,
};
use pixsync_protocol::{Command, CommandSet, Compression, Envelope, DEFAULT_BUFFER_SIZE};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A scripted PixelController.
pub struct SimulatedController {
    fixture: RwLock<ControllerFixture>,
    silent: RwLock<CommandSet>,
    corrupt: RwLock<CommandSet>,
    buffer_size: usize,
    requests: Mutex<BTreeMap<Command, u64>>,
    messages: Mutex<Vec<Envelope>>,
}

impl SimulatedController {
    /// A controller serving [`ControllerFixture::new`], uncompressed.
    pub fn new() -> Self {
        Self::with_fixture(ControllerFixture::new())
    }

    /// A controller serving `fixture`.
    pub fn with_fixture(fixture: ControllerFixture) -> Self {
        Self {
            fixture: RwLock::new(fixture),
            silent: RwLock::new(CommandSet::empty()),
            corrupt: RwLock::new(CommandSet::empty()),
            buffer_size: DEFAULT_BUFFER_SIZE,
            requests: Mutex::new(BTreeMap::new()),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// A controller that compresses payloads.
    pub fn compressed() -> Self {
        Self::with_fixture(ControllerFixture::new().with_compression(true))
    }

    /// A controller that never answers anything.
    pub fn unresponsive() -> Self {
        let controller = Self::new();
        controller.set_silent(CommandSet::all());
        controller
    }

    /// Stops answering the given commands.
    pub fn set_silent(&self, commands: CommandSet) {
        *self.silent.write() = commands;
    }

    /// Answers the given commands with a payload that cannot be decoded.
    pub fn set_corrupt(&self, commands: CommandSet) {
        *self.corrupt.write() = commands;
    }

    /// Payload compression this controller uses for everything but the
    /// configuration itself.
    pub fn compression(&self) -> Compression {
        Compression::from_enabled(self.fixture.read().config.use_remote_compression())
    }

    /// Current state served.
    pub fn fixture(&self) -> ControllerFixture {
        self.fixture.read().clone()
    }

    /// Number of requests seen for `command`.
    pub fn requests(&self, command: Command) -> u64 {
        self.requests.lock().get(&command).copied().unwrap_or(0)
    }

    /// Number of requests seen for every command.
    pub fn total_requests(&self) -> u64 {
        self.requests.lock().values().sum()
    }

    /// Non-request messages received, in order.
    pub fn messages(&self) -> Vec<Envelope> {
        self.messages.lock().clone()
    }

    /// Encodes the reply to `command`.
    ///
    /// The configuration always goes out uncompressed since it is what tells
    /// the client whether to decompress.
    pub fn reply(&self, command: Command) -> Option<Envelope> {
        if self.corrupt.read().contains(command) {
            return Some(Envelope::request(command).with_blob(vec![0xff, 0x13, 0x37]));
        }
        let compression = match command {
            Command::GetConfiguration => Compression::Disabled,
            _ => self.compression(),
        };
        let response = self.fixture.read().response(command);
        response.encode(compression, self.buffer_size).ok()
    }

    /// Applies a UI command and returns the pushed UI state.
    fn apply_message(&self, message: &Envelope) -> Option<Envelope> {
        self.messages.lock().push(message.clone());

        let entry = std::iter::once(message.pattern.as_str())
            .chain(message.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        {
            let mut fixture = self.fixture.write();
            let entries = &mut fixture.gui_state.0;
            let key = format!("{} ", message.pattern);
            match entries.iter_mut().find(|e| e.starts_with(&key)) {
                Some(existing) => *existing = entry,
                None => entries.push(entry),
            }
        }
        self.reply(Command::GetGuiState)
    }
}

impl Default for SimulatedController {
    fn default() -> Self {
        Self::new()
    }
}

impl Responder for SimulatedController {
    fn respond(&self, request: &Envelope) -> Vec<Envelope> {
        let Some(command) = request.command() else {
            debug!(pattern = %request.pattern, "simulated controller got message");
            return self.apply_message(request).into_iter().collect();
        };

        *self.requests.lock().entry(command).or_insert(0) += 1;
        if self.silent.read().contains(command) {
            return Vec::new();
        }
        if command == Command::GetImageBuffer {
            self.fixture.write().advance_frame();
        }
        self.reply(command).into_iter().collect()
    }
}

/// Starts a client against `controller` over the threaded loopback transport.
pub fn start_simulated(controller: &Arc<SimulatedController>, config: ClientConfig) -> SyncClient {
    start_simulated_with_feedback(controller, config, Arc::new(NullFeedback))
}

/// Like [`start_simulated`], reporting progress to `feedback`.
pub fn start_simulated_with_feedback(
    controller: &Arc<SimulatedController>,
    config: ClientConfig,
    feedback: Arc<dyn Feedback>,
) -> SyncClient {
    let transport = LoopbackTransport::new(Arc::clone(controller));
    SyncClient::start(config, transport, NoDiscovery, feedback).expect("failed to start client")
}

/// Starts a client against a fresh default controller with fast timings.
pub fn start_default() -> (Arc<SimulatedController>, SyncClient) {
    let controller = Arc::new(SimulatedController::new());
    let client = start_simulated(&controller, fast_config());
    (controller, client)
}
