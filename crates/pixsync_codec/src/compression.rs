//! LZ4 block compression with a fixed-capacity decode buffer.
//!
//! Blocks carry no length prefix. The receiving side decodes into a buffer
//! that is allocated once and sized for the largest expected payload (a full
//! image buffer), so a block that would expand past that size is rejected
//! instead of growing the buffer.

use crate::error::{CodecError, CodecResult};

/// Default decode buffer capacity. Large enough for one full image buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 60 * 1024;

/// Compression mode of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Payloads are plain serialized bytes.
    #[default]
    Disabled,
    /// Payloads are LZ4 blocks.
    Lz4,
}

impl Compression {
    /// Maps an on/off switch to a compression mode.
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Compression::Lz4
        } else {
            Compression::Disabled
        }
    }

    /// Returns true if payloads are compressed.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Compression::Lz4)
    }
}

/// Decodes LZ4 blocks into a pre-allocated buffer.
#[derive(Debug)]
pub struct BlockDecoder {
    buffer: Vec<u8>,
}

impl BlockDecoder {
    /// Creates a decoder with a buffer of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0u8; capacity],
        }
    }

    /// Returns the buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Decompresses one block.
    ///
    /// The returned slice borrows the internal buffer and is valid until the
    /// next call.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decompression`] if the block is corrupt or its
    /// decompressed size exceeds the capacity.
    pub fn decode(&mut self, compressed: &[u8]) -> CodecResult<&[u8]> {
        let len = lz4_flex::block::decompress_into(compressed, &mut self.buffer)
            .map_err(|e| CodecError::decompression(e.to_string()))?;
        Ok(&self.buffer[..len])
    }

    /// Decodes `payload` according to `compression`. Identity when disabled.
    pub fn decode_with<'a>(
        &'a mut self,
        compression: Compression,
        payload: &'a [u8],
    ) -> CodecResult<&'a [u8]> {
        match compression {
            Compression::Disabled => Ok(payload),
            Compression::Lz4 => self.decode(payload),
        }
    }
}

impl Default for BlockDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

/// Compresses `data` into one LZ4 block.
///
/// # Errors
///
/// Returns [`CodecError::PayloadTooLarge`] if `data` is larger than the
/// receiver's buffer `capacity`.
pub fn compress_block(data: &[u8], capacity: usize) -> CodecResult<Vec<u8>> {
    if data.len() > capacity {
        return Err(CodecError::PayloadTooLarge {
            size: data.len(),
            capacity,
        });
    }
    Ok(lz4_flex::block::compress(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn roundtrip_small_block() {
        let data = b"pixelcontroller pixelcontroller pixelcontroller";
        let compressed = compress_block(data, DEFAULT_BUFFER_SIZE).unwrap();

        let mut decoder = BlockDecoder::default();
        assert_eq!(decoder.decode(&compressed).unwrap(), &data[..]);
    }

    #[test]
    fn roundtrip_empty_block() {
        let compressed = compress_block(&[], DEFAULT_BUFFER_SIZE).unwrap();
        let mut decoder = BlockDecoder::default();
        assert!(decoder.decode(&compressed).unwrap().is_empty());
    }

    #[test]
    fn roundtrip_at_full_capacity() {
        let data: Vec<u8> = (0..DEFAULT_BUFFER_SIZE).map(|i| (i % 251) as u8).collect();
        let compressed = compress_block(&data, DEFAULT_BUFFER_SIZE).unwrap();

        let mut decoder = BlockDecoder::default();
        assert_eq!(decoder.decode(&compressed).unwrap(), data.as_slice());
    }

    #[test]
    fn encoder_rejects_oversized_input() {
        let data = vec![7u8; 1025];
        let err = compress_block(&data, 1024).unwrap_err();
        assert_eq!(
            err,
            CodecError::PayloadTooLarge {
                size: 1025,
                capacity: 1024
            }
        );
    }

    #[test]
    fn decoder_rejects_block_larger_than_capacity() {
        let data = vec![42u8; 2048];
        let compressed = compress_block(&data, data.len()).unwrap();

        let mut decoder = BlockDecoder::new(1024);
        let result = decoder.decode(&compressed);
        assert!(matches!(result, Err(CodecError::Decompression { .. })));
        assert_eq!(decoder.capacity(), 1024);
    }

    #[test]
    fn decoder_rejects_corrupt_block() {
        let mut decoder = BlockDecoder::new(1024);
        let result = decoder.decode(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(result, Err(CodecError::Decompression { .. })));
    }

    #[test]
    fn decoder_is_reusable_after_failure() {
        let mut decoder = BlockDecoder::new(1024);
        assert!(decoder.decode(&[0xFF, 0xFF]).is_err());

        let compressed = compress_block(b"still works", 1024).unwrap();
        assert_eq!(decoder.decode(&compressed).unwrap(), b"still works");
    }

    #[test]
    fn disabled_compression_is_identity() {
        let mut decoder = BlockDecoder::new(4);
        let payload = b"longer than the buffer";
        assert_eq!(
            decoder
                .decode_with(Compression::Disabled, payload)
                .unwrap(),
            payload
        );
    }

    #[test]
    fn compression_from_switch() {
        assert_eq!(Compression::from_enabled(true), Compression::Lz4);
        assert_eq!(Compression::from_enabled(false), Compression::Disabled);
        assert!(!Compression::default().is_enabled());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn roundtrip_any_size_up_to_capacity(
            data in prop::collection::vec(any::<u8>(), 0..=4096usize)
        ) {
            let compressed = compress_block(&data, 4096).unwrap();
            let mut decoder = BlockDecoder::new(4096);
            prop_assert_eq!(decoder.decode(&compressed).unwrap(), data.as_slice());
        }

        #[test]
        fn oversized_input_never_decodes(
            data in prop::collection::vec(any::<u8>(), 4097..6000usize)
        ) {
            prop_assert!(compress_block(&data, 4096).is_err());

            let compressed = compress_block(&data, data.len()).unwrap();
            let mut decoder = BlockDecoder::new(4096);
            prop_assert!(decoder.decode(&compressed).is_err());
        }
    }
}
