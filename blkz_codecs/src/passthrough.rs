use blkz_core::{BlockOptions, Codec, CodecError};

/// No-op codec: hands blocks back verbatim.
///
/// Its output is never smaller than the input, so every block ends up as a
/// stored frame. Useful for exercising the framing and stored path on their
/// own, or for data that is already compressed.
pub struct PassThroughCodec;

impl Codec for PassThroughCodec {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn compress_block(&self, raw: &[u8], _options: BlockOptions) -> Result<Vec<u8>, CodecError> {
        Ok(raw.to_vec())
    }

    fn decompress_block(
        &self,
        payload: &[u8],
        _options: BlockOptions,
        max_len: usize,
    ) -> Result<Vec<u8>, CodecError> {
        if payload.len() > max_len {
            return Err(CodecError::OutputTooLarge {
                codec: self.name(),
                len: payload.len(),
                max: max_len,
            });
        }
        Ok(payload.to_vec())
    }
}
