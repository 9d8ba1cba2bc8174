use std::io::Read;
use std::sync::Arc;

use tracing::trace;

use crate::codec::{BlockOptions, Codec};
use crate::error::{PipelineError, Result};
use crate::filter::BlockFilter;
use crate::format::{encode_frame, encode_stored, read_full, FRAME_OVERHEAD, HEADER_LEN};

/// One raw block read from the input stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub sequence: u64,
    pub data: Vec<u8>,
}

/// Splits a byte stream into blocks and numbers them.
///
/// This is the only place sequence numbers are assigned: they start at zero
/// and increase by one per block with no gaps.
pub struct BlockReader<R> {
    reader: R,
    block_size: usize,
    next_sequence: u64,
    bytes_read: u64,
    eof: bool,
}

impl<R: Read> BlockReader<R> {
    pub fn new(reader: R, block_size: usize) -> Self {
        Self {
            reader,
            block_size,
            next_sequence: 0,
            bytes_read: 0,
            eof: false,
        }
    }

    /// Read the next block, or `None` once the stream is exhausted.
    ///
    /// Every block is exactly `block_size` bytes except possibly the last.
    /// Empty blocks are never produced.
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        if self.eof {
            return Ok(None);
        }

        let mut data = Vec::new();
        data.try_reserve_exact(self.block_size)
            .map_err(PipelineError::allocation(self.block_size))?;
        data.resize(self.block_size, 0);

        let n = read_full(&mut self.reader, &mut data)?;
        if n < self.block_size {
            self.eof = true;
        }
        if n == 0 {
            return Ok(None);
        }
        data.truncate(n);

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.bytes_read += n as u64;
        Ok(Some(Block { sequence, data }))
    }

    /// Number of blocks handed out so far.
    pub fn blocks_read(&self) -> u64 {
        self.next_sequence
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

/// A block after filtering, compression and framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlock {
    pub sequence: u64,
    pub raw_len: usize,
    /// True when the codec could not shrink the block.
    pub stored: bool,
    /// Complete frame bytes: header followed by payload.
    pub frame: Vec<u8>,
}

/// Turns a raw block into a frame. Shared immutably by all workers.
pub struct BlockEncoder {
    codec: Arc<dyn Codec>,
    options: BlockOptions,
    filter: BlockFilter,
}

impl BlockEncoder {
    pub fn new(codec: Arc<dyn Codec>, options: BlockOptions, filter: BlockFilter) -> Self {
        Self {
            codec,
            options,
            filter,
        }
    }

    pub fn codec_name(&self) -> &'static str {
        self.codec.name()
    }

    /// Filter, compress and frame one block.
    ///
    /// Falls back to a stored frame whenever the codec output is not strictly
    /// smaller than the filtered block, so a frame is never longer than
    /// `raw_len + FRAME_OVERHEAD`.
    pub fn encode(&self, block: &Block) -> Result<EncodedBlock> {
        let filtered = self.filter.forward_block(&block.data)?;
        let compressed = self
            .codec
            .compress_block(&filtered, self.options)
            .map_err(|source| PipelineError::Codec {
                sequence: block.sequence,
                source,
            })?;

        let stored = compressed.len() >= filtered.len();
        let capacity = if stored {
            filtered.len() + FRAME_OVERHEAD
        } else {
            compressed.len() + HEADER_LEN
        };
        let mut frame = Vec::new();
        frame
            .try_reserve_exact(capacity)
            .map_err(PipelineError::allocation(capacity))?;

        let encoded = if stored {
            encode_stored(self.options, &filtered, &mut frame)
        } else {
            encode_frame(self.options, &compressed, &mut frame)
        };
        encoded.map_err(|source| PipelineError::frame(block.sequence, source))?;

        trace!(
            sequence = block.sequence,
            raw = block.data.len(),
            framed = frame.len(),
            stored,
            "block encoded"
        );
        Ok(EncodedBlock {
            sequence: block.sequence,
            raw_len: block.data.len(),
            stored,
            frame,
        })
    }
}
