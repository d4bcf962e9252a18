//! Error types for the protocol crate.

use crate::command::Command;
use pixsync_codec::CodecError;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while building or decoding protocol messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The pattern is not part of the command vocabulary.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A message needs at least a pattern.
    #[error("empty message")]
    EmptyMessage,

    /// A response that echoes a text argument arrived without one.
    #[error("{command} response has no argument")]
    MissingArgument {
        /// Command of the response.
        command: Command,
    },

    /// A blob-bearing response arrived without a blob.
    #[error("{command} response has no payload")]
    MissingBlob {
        /// Command of the response.
        command: Command,
    },

    /// The payload could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}
