//! Payload serialization.
//!
//! A payload is a plain data object serialized to CBOR and, when the session
//! negotiated compression, wrapped in one LZ4 block.

use crate::compression::{compress_block, BlockDecoder, Compression};
use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serializes a value to CBOR bytes.
pub fn encode_payload<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out)
        .map_err(|e| CodecError::serialization(e.to_string()))?;
    Ok(out)
}

/// Deserializes a value from CBOR bytes.
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::deserialization(e.to_string()))
}

/// Serializes a value and compresses it if `compression` is enabled.
///
/// `capacity` is the receiver's decode buffer size; compressed payloads
/// larger than that would be rejected on the other side, so they are
/// rejected here.
pub fn pack<T: Serialize>(
    value: &T,
    compression: Compression,
    capacity: usize,
) -> CodecResult<Vec<u8>> {
    let raw = encode_payload(value)?;
    match compression {
        Compression::Disabled => Ok(raw),
        Compression::Lz4 => compress_block(&raw, capacity),
    }
}

/// Decompresses (if enabled) and deserializes a payload.
pub fn unpack<T: DeserializeOwned>(
    decoder: &mut BlockDecoder,
    compression: Compression,
    blob: &[u8],
) -> CodecResult<T> {
    let raw = decoder.decode_with(compression, blob)?;
    decode_payload(raw)
}
