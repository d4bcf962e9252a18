//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while compressing, decompressing or (de)serializing
/// a payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The compressed block is corrupt or expands beyond the decode buffer.
    #[error("decompression failed: {message}")]
    Decompression {
        /// Description of the decompression error.
        message: String,
    },

    /// The payload does not fit the fixed-capacity buffer.
    #[error("payload of {size} bytes exceeds buffer capacity of {capacity} bytes")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        size: usize,
        /// Capacity of the buffer.
        capacity: usize,
    },

    /// Failed to serialize a value to CBOR.
    #[error("serialization failed: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
    },

    /// Failed to deserialize a value from CBOR.
    #[error("deserialization failed: {message}")]
    Deserialization {
        /// Description of the deserialization error.
        message: String,
    },
}

impl CodecError {
    /// Create a decompression error.
    pub fn decompression(message: impl Into<String>) -> Self {
        Self::Decompression {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization {
            message: message.into(),
        }
    }
}
