use std::io::{Read, Write};

use blkz_core::{BlockOptions, Codec, CodecError};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

/// Raw DEFLATE block codec backed by flate2.
///
/// Slower than lz4 and usually behind zstd, but the payload is plain RFC 1951
/// data that any inflate implementation can read.
pub struct DeflateCodec {
    /// Compression level (0 = store, 9 = best).
    pub level: u32,
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl DeflateCodec {
    pub fn new(level: u32) -> Self {
        Self { level: level.min(9) }
    }
}

impl Codec for DeflateCodec {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress_block(&self, raw: &[u8], options: BlockOptions) -> Result<Vec<u8>, CodecError> {
        let level = if options.contains(BlockOptions::FAST) {
            Compression::fast()
        } else {
            Compression::new(self.level)
        };
        let mut encoder = DeflateEncoder::new(Vec::with_capacity(raw.len()), level);
        encoder
            .write_all(raw)
            .map_err(|e| CodecError::compress(self.name(), e))?;
        encoder.finish().map_err(|e| CodecError::compress(self.name(), e))
    }

    fn decompress_block(
        &self,
        payload: &[u8],
        _options: BlockOptions,
        max_len: usize,
    ) -> Result<Vec<u8>, CodecError> {
        // Read one byte past the limit to detect an oversized block.
        let mut out = Vec::with_capacity(max_len.min(payload.len() * 4));
        DeflateDecoder::new(payload)
            .take(max_len as u64 + 1)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::decompress(self.name(), e))?;
        if out.len() > max_len {
            return Err(CodecError::OutputTooLarge {
                codec: self.name(),
                len: out.len(),
                max: max_len,
            });
        }
        Ok(out)
    }
}
