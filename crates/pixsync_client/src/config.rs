//! Configuration for the sync client.

use crate::discovery::Endpoint;
use pixsync_protocol::{Command, DEFAULT_BUFFER_SIZE};
use std::time::Duration;

/// Well-known host of the controller when discovery finds nothing.
pub const DEFAULT_HOST: &str = "pixelcontroller.local";
/// Well-known control port of the controller.
pub const DEFAULT_REMOTE_PORT: u16 = 9876;
/// Port the local receiver listens on.
pub const DEFAULT_LOCAL_PORT: u16 = 9875;
/// Service type announced by the controller.
pub const DEFAULT_SERVICE_TYPE: &str = "_pixelcontroller-osc._udp.local.";

const EVERY_TICK: [Command; 1] = [Command::GetImageBuffer];
const SLOW_TICK: [Command; 4] = [
    Command::GetImageBuffer,
    Command::GetOutputMapping,
    Command::GetPresetSettings,
    Command::GetJmxStatistics,
];

/// Configuration for the sync client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Port of the local receiver.
    pub local_port: u16,
    /// Host used when discovery finds nothing.
    pub default_host: String,
    /// Port used when discovery finds nothing.
    pub default_port: u16,
    /// Service type to query.
    pub service_type: String,
    /// How long discovery may take.
    pub discovery_timeout: Duration,
    /// Capacity of the receive and decode buffers.
    pub buffer_size: usize,
    /// Handshake budget.
    pub handshake: HandshakeConfig,
    /// Steady-state poll interval.
    pub poll_interval: Duration,
    /// Every n-th poll tick also refreshes the slow-changing state.
    pub slow_poll_every: u64,
}

impl ClientConfig {
    /// Creates a configuration with the controller's well-known defaults.
    pub fn new() -> Self {
        Self {
            local_port: DEFAULT_LOCAL_PORT,
            default_host: DEFAULT_HOST.to_string(),
            default_port: DEFAULT_REMOTE_PORT,
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
            discovery_timeout: Duration::from_millis(6000),
            buffer_size: DEFAULT_BUFFER_SIZE,
            handshake: HandshakeConfig::default(),
            poll_interval: Duration::from_millis(400),
            slow_poll_every: 20,
        }
    }

    /// Sets the local receiver port.
    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }

    /// Sets the fallback endpoint.
    pub fn with_default_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.default_host = host.into();
        self.default_port = port;
        self
    }

    /// Sets the service type to query.
    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = service_type.into();
        self
    }

    /// Sets the discovery timeout.
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Sets the receive buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sets the handshake configuration.
    pub fn with_handshake(mut self, handshake: HandshakeConfig) -> Self {
        self.handshake = handshake;
        self
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets how often the slow-changing state is refreshed. Zero is treated as one.
    pub fn with_slow_poll_every(mut self, every: u64) -> Self {
        self.slow_poll_every = every.max(1);
        self
    }

    /// Endpoint used when discovery finds nothing.
    pub fn default_endpoint(&self) -> Endpoint {
        Endpoint::new(self.default_host.clone(), self.default_port)
    }

    /// Requests issued on poll tick `tick` (zero-indexed).
    pub fn poll_requests(&self, tick: u64) -> &'static [Command] {
        if tick % self.slow_poll_every.max(1) == 0 {
            &SLOW_TICK
        } else {
            &EVERY_TICK
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded handshake budget: `rounds` request rounds, `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// Maximum number of request rounds.
    pub rounds: u32,
    /// Wait after each round.
    pub interval: Duration,
}

impl HandshakeConfig {
    /// Creates a handshake configuration.
    pub fn new(rounds: u32, interval: Duration) -> Self {
        Self { rounds, interval }
    }

    /// Upper bound of the time spent waiting for answers. Saturates at
    /// [`Duration::MAX`].
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.rounds)
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(2000))
    }
}
