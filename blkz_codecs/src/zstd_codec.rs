use blkz_core::{BlockOptions, Codec, CodecError};
use zstd::zstd_safe;

/// Level used when a block asks for [`BlockOptions::FAST`].
const FAST_LEVEL: i32 = 1;

/// Zstandard block codec.
///
/// Each block is compressed independently with `zstd` at the configured level
/// (default: 3). Small blocks leave zstd little history to work with, so
/// ratios trail whole-file zstd; in exchange blocks compress in parallel.
///
/// Best for: general text, JSON, logs, mixed structured data.
pub struct ZstdCodec {
    /// Compression level (1 = fast / larger, 22 = slow / smallest).
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Codec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress_block(&self, raw: &[u8], options: BlockOptions) -> Result<Vec<u8>, CodecError> {
        let level = if options.contains(BlockOptions::FAST) {
            FAST_LEVEL
        } else {
            self.level
        };
        zstd::bulk::compress(raw, level).map_err(|e| CodecError::compress(self.name(), e))
    }

    fn decompress_block(
        &self,
        payload: &[u8],
        _options: BlockOptions,
        max_len: usize,
    ) -> Result<Vec<u8>, CodecError> {
        // Frames written by `bulk::compress` record their content size.
        if let Ok(Some(size)) = zstd_safe::get_frame_content_size(payload) {
            if size > max_len as u64 {
                return Err(CodecError::OutputTooLarge {
                    codec: self.name(),
                    len: usize::try_from(size).unwrap_or(usize::MAX),
                    max: max_len,
                });
            }
        }
        // Bulk decompression never grows past `max_len`, so a frame without a
        // recorded size still fails inside zstd instead of allocating.
        zstd::bulk::decompress(payload, max_len).map_err(|e| CodecError::decompress(self.name(), e))
    }
}
