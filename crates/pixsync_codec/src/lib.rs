//! # PixSync Codec
//!
//! Payload encoding for the PixSync remote protocol.
//!
//! A payload travels as:
//! 1. A plain data object serialized to CBOR
//! 2. Optionally wrapped in one LZ4 block (no length prefix)
//!
//! Compression is negotiated once per session. The receiver decodes blocks
//! into a fixed-capacity buffer, so a payload larger than one full image
//! buffer is an error rather than a reallocation.
//!
//! ## Usage
//!
//! ```
//! use pixsync_codec::{pack, unpack, BlockDecoder, Compression, DEFAULT_BUFFER_SIZE};
//!
//! let pixels: Vec<u32> = vec![0xff0000, 0x00ff00, 0x0000ff];
//! let blob = pack(&pixels, Compression::Lz4, DEFAULT_BUFFER_SIZE).unwrap();
//!
//! let mut decoder = BlockDecoder::default();
//! let decoded: Vec<u32> = unpack(&mut decoder, Compression::Lz4, &blob).unwrap();
//! assert_eq!(decoded, pixels);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod compression;
mod error;
mod payload;

pub use compression::{compress_block, BlockDecoder, Compression, DEFAULT_BUFFER_SIZE};
pub use error::{CodecError, CodecResult};
pub use payload::{decode_payload, encode_payload, pack, unpack};
