use blkz_core::{BlockOptions, Codec, CodecError};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};

const SIZE_PREFIX_LEN: usize = 4;

/// LZ4 block codec.
///
/// Fastest of the bundled codecs, and the closest in spirit to a small-window
/// LZ block compressor. Each payload carries lz4_flex's 4-byte size prefix,
/// which is checked against the caller's bound before anything is allocated.
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress_block(&self, raw: &[u8], _options: BlockOptions) -> Result<Vec<u8>, CodecError> {
        Ok(compress_prepend_size(raw))
    }

    fn decompress_block(
        &self,
        payload: &[u8],
        _options: BlockOptions,
        max_len: usize,
    ) -> Result<Vec<u8>, CodecError> {
        let prefix: [u8; SIZE_PREFIX_LEN] = payload
            .get(..SIZE_PREFIX_LEN)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| CodecError::decompress(self.name(), "payload shorter than size prefix"))?;
        let declared = u32::from_le_bytes(prefix) as usize;
        if declared > max_len {
            return Err(CodecError::OutputTooLarge {
                codec: self.name(),
                len: declared,
                max: max_len,
            });
        }
        decompress_size_prepended(payload)
            .map_err(|e| CodecError::decompress(self.name(), e))
    }
}
