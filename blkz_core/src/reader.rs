use std::io::{Read, Write};
use std::sync::Arc;

use tracing::{debug, info};

use crate::codec::Codec;
use crate::config::PipelineConfig;
use crate::error::{CodecError, FrameError, PipelineError, Result};
use crate::format::{Frame, FrameReader, HEADER_LEN};

/// Totals reported after a successful decompression run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecompressSummary {
    pub frames: u64,
    pub stored_frames: u64,
    /// Frame bytes consumed, headers included.
    pub compressed_bytes: u64,
    pub raw_bytes: u64,
}

/// Sequential decompressor.
///
/// # Read loop
/// 1. Parse one frame header and read exactly `length` payload bytes.
/// 2. Stored frame: validate the sub-length and copy the literal bytes.
///    Otherwise: decode with the codec and reject anything longer than the
///    configured block size.
/// 3. Reverse the block filter and write the block.
///
/// A clean end of stream between frames ends the loop successfully. There is
/// no concurrency here: frames carry no sequence numbers, so their position
/// in the stream is their order.
pub struct Decompressor {
    codec: Arc<dyn Codec>,
    config: PipelineConfig,
}

impl Decompressor {
    pub fn new(codec: Arc<dyn Codec>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { codec, config })
    }

    /// Decompress every frame in `input` into `output`.
    pub fn decompress<R: Read, W: Write>(&self, input: R, mut output: W) -> Result<DecompressSummary> {
        let max_block = self.config.block_size;
        let mut frames = FrameReader::new(input, max_block);
        let mut summary = DecompressSummary::default();

        info!(codec = self.codec.name(), max_block, "decompressing");

        loop {
            let index = frames.frames_read();
            let frame = match frames.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => return Err(PipelineError::frame(index, e)),
            };

            let block = self.decode_block(index, &frame)?;
            let block = self.config.filter.reverse_block(&block)?;
            output.write_all(&block)?;

            debug!(
                frame = index,
                stored = frame.is_stored(),
                payload = frame.payload.len(),
                raw = block.len(),
                "frame decoded"
            );
            summary.frames += 1;
            summary.compressed_bytes += (frame.payload.len() + HEADER_LEN) as u64;
            summary.raw_bytes += block.len() as u64;
            if frame.is_stored() {
                summary.stored_frames += 1;
            }
        }

        output.flush()?;
        info!(
            frames = summary.frames,
            stored = summary.stored_frames,
            raw = summary.raw_bytes,
            "decompression finished"
        );
        Ok(summary)
    }

    fn decode_block(&self, index: u64, frame: &Frame) -> Result<Vec<u8>> {
        let max_block = self.config.block_size;
        if frame.is_stored() {
            let literal = frame
                .stored_literal(max_block)
                .map_err(|e| PipelineError::frame(index, e))?;
            return Ok(literal.to_vec());
        }

        let raw = self
            .codec
            .decompress_block(&frame.payload, frame.options, max_block)
            .map_err(|source| match source {
                CodecError::OutputTooLarge { len, max, .. } => {
                    PipelineError::frame(index, FrameError::PayloadOverflow { len, max })
                }
                source => PipelineError::Codec {
                    sequence: index,
                    source,
                },
            })?;
        if raw.len() > max_block {
            return Err(PipelineError::frame(
                index,
                FrameError::PayloadOverflow {
                    len: raw.len(),
                    max: max_block,
                },
            ));
        }
        Ok(raw)
    }
}
