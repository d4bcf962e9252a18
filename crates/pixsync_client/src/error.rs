//! Error types for the sync client.

use pixsync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for sync client operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while talking to the remote controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The local receiver could not be bound.
    #[error("failed to bind local receiver on port {port}: {message}")]
    Bind {
        /// Local port.
        port: u16,
        /// Error message.
        message: String,
    },

    /// The remote sender could not be created.
    #[error("failed to connect to {endpoint}: {message}")]
    Connect {
        /// Target endpoint, `host:port`.
        endpoint: String,
        /// Error message.
        message: String,
    },

    /// No sender exists yet (or any more).
    #[error("not connected to controller")]
    NotConnected,

    /// Malformed message.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The handshake did not collect every required response in time.
    #[error("no answer from controller after {rounds} handshake rounds")]
    HandshakeTimeout {
        /// Number of rounds attempted.
        rounds: u32,
    },

    /// The worker thread could not be spawned.
    #[error("failed to start worker: {0}")]
    Worker(String),
}

/// Errors reported by a service discovery backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The discovery mechanism is not available on this host.
    #[error("discovery unavailable: {0}")]
    Unavailable(String),
}

/// Error returned by an observer that failed to handle a notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("observer failed: {0}")]
pub struct ObserverError(pub String);

impl ObserverError {
    /// Creates an observer error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
