//! # PixSync Client
//!
//! Remote synchronization client for a PixelController instance.
//!
//! This crate provides:
//! - Endpoint discovery with fallback to a default endpoint
//! - Bounded handshake that collects the initial state snapshot
//! - Periodic polling of the fast-changing state
//! - Snapshot store with consistent, non-blocking reads
//! - UI-state observer fan-out
//! - Transport abstraction with loopback and mock transports
//!
//! ## Architecture
//!
//! One worker thread per client runs the lifecycle:
//! 1. Discover the controller (or fall back to the default endpoint)
//! 2. Bind the local receiver and create the sender
//! 3. Request every state item until all answered, for a bounded number of
//!    rounds
//! 4. Poll the image buffer, and every 20th tick the slow-changing items,
//!    until shut down
//!
//! Responses arrive on transport threads and are decoded straight into the
//! snapshot store.
//!
//! ## Key Invariants
//!
//! - Readiness becomes true once and never reverts
//! - An answered command is never requested again during the handshake
//! - A failed decode leaves every slot as it was
//! - Unknown messages change nothing
//! - Payload compression is fixed by the first configuration received

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod discovery;
mod error;
mod feedback;
mod lifecycle;
mod observer;
mod snapshot;
mod state;
mod transport;

pub use config::{
    ClientConfig, HandshakeConfig, DEFAULT_HOST, DEFAULT_LOCAL_PORT, DEFAULT_REMOTE_PORT,
    DEFAULT_SERVICE_TYPE,
};
pub use discovery::{resolve, Endpoint, NoDiscovery, Resolution, ServiceDiscovery, StaticDiscovery};
pub use error::{DiscoveryError, ObserverError, SyncError, SyncResult};
pub use feedback::{Feedback, NullFeedback, RecordingFeedback};
pub use lifecycle::ShutdownSignal;
pub use observer::{Delivery, Observer, ObserverRegistry};
pub use snapshot::SnapshotStore;
pub use state::{ClientState, ClientStats, SyncClient};
pub use transport::{
    DeliveryMode, EnvelopeSender, InboundHandler, Listener, LoopbackTransport,
    MockTransport, Responder, Transport,
};
