//! # PixSync Protocol
//!
//! Command vocabulary, message envelopes and the remote data model spoken
//! between a front-end and a remote PixelController.
//!
//! This crate provides:
//! - `Command`, the closed request/response vocabulary, and `CommandSet`
//! - `Envelope`, one message on the control channel
//! - The data objects carried in response payloads
//! - `Response`, a typed response with one decode strategy per command
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod envelope;
mod error;
mod model;
mod response;

pub use command::{Command, CommandSet};
pub use envelope::Envelope;
pub use error::{ProtocolError, ProtocolResult};
pub use model::{
    ApplicationConfig, ColorSet, FileLocation, GuiState, ImageBuffer, MatrixData,
    OutputDescriptor, OutputMapping, PresetSettings, RuntimeStatistics,
};
pub use response::{blob_envelope, Response};

pub use pixsync_codec::{BlockDecoder, CodecError, Compression, DEFAULT_BUFFER_SIZE};
