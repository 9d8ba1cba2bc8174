use std::io::{Read, Write};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::block::{BlockEncoder, BlockReader};
use crate::codec::Codec;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PoolError, Result};
use crate::pool::{Completion, WorkerPool};
use crate::reorder::ReorderQueue;

/// Totals reported after a successful compression run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressSummary {
    pub blocks: u64,
    /// Blocks emitted as stored frames.
    pub stored_blocks: u64,
    pub raw_bytes: u64,
    pub compressed_bytes: u64,
    pub workers: usize,
    pub peak_in_flight: usize,
    /// Most frames ever waiting in the reorder queue.
    pub peak_reorder_depth: usize,
}

impl CompressSummary {
    /// Compression ratio (raw / compressed).
    pub fn ratio(&self) -> f64 {
        if self.compressed_bytes == 0 {
            return 1.0;
        }
        self.raw_bytes as f64 / self.compressed_bytes as f64
    }
}

/// Driver states.
///
/// ```text
/// Reading ──EOF──▶ Draining ──all slots idle──▶ Done
///    └──────────────┴──── any error ──────────▶ Failed
/// ```
#[derive(Debug)]
enum DriverState {
    Reading,
    Draining,
    Done,
    Failed(PipelineError),
}

/// Streaming compressor.
///
/// # Pipeline
/// Blocks are read and numbered on the calling thread, compressed on a
/// bounded pool of worker threads, and written through a reorder queue so the
/// output is a concatenation of frames in exactly the input order:
///
/// ```text
/// input ─▶ BlockReader ─▶ WorkerPool (P threads) ─▶ ReorderQueue ─▶ output
/// ```
///
/// Output is bit-identical for any pool size.
pub struct Compressor {
    codec: Arc<dyn Codec>,
    config: PipelineConfig,
}

impl Compressor {
    pub fn new(codec: Arc<dyn Codec>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { codec, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compress all of `input` into `output`.
    ///
    /// On any failure the pool stops taking blocks, every running worker is
    /// joined, and the first error is returned.
    pub fn compress<R: Read, W: Write>(&self, input: R, mut output: W) -> Result<CompressSummary> {
        let encoder = Arc::new(BlockEncoder::new(
            Arc::clone(&self.codec),
            self.config.options,
            self.config.filter,
        ));
        let mut pool = WorkerPool::new(self.config.workers, encoder)?;
        let mut reader = BlockReader::new(input, self.config.block_size);
        let mut queue = ReorderQueue::new();
        let mut summary = CompressSummary {
            workers: self.config.workers,
            ..CompressSummary::default()
        };

        info!(
            codec = self.codec.name(),
            block_size = self.config.block_size,
            workers = self.config.workers,
            filter = self.config.filter.name(),
            "compressing"
        );

        let mut state = DriverState::Reading;
        loop {
            state = match state {
                DriverState::Reading => {
                    match read_step(&mut reader, &mut pool, &mut queue, &mut output, &mut summary) {
                        Ok(next) => next,
                        Err(e) => DriverState::Failed(e),
                    }
                }
                DriverState::Draining => {
                    match drain_step(&mut pool, &mut queue, &mut output, &mut summary) {
                        Ok(next) => next,
                        Err(e) => DriverState::Failed(e),
                    }
                }
                DriverState::Done => break,
                DriverState::Failed(err) => {
                    let discarded = pool.abort();
                    warn!(%err, discarded, "compression aborted");
                    return Err(err);
                }
            };
        }

        queue.finish(reader.blocks_read())?;
        output.flush()?;

        let stats = pool.stats();
        summary.blocks = reader.blocks_read();
        summary.raw_bytes = reader.bytes_read();
        summary.peak_in_flight = stats.peak_in_flight;
        summary.peak_reorder_depth = queue.peak_len();
        info!(
            blocks = summary.blocks,
            stored = summary.stored_blocks,
            raw = summary.raw_bytes,
            compressed = summary.compressed_bytes,
            "compression finished"
        );
        Ok(summary)
    }
}

/// Read one block and hand it to the pool, then flush what is ready.
fn read_step<R: Read, W: Write>(
    reader: &mut BlockReader<R>,
    pool: &mut WorkerPool,
    queue: &mut ReorderQueue,
    output: &mut W,
    summary: &mut CompressSummary,
) -> Result<DriverState> {
    let Some(block) = reader.next_block()? else {
        debug!(blocks = reader.blocks_read(), "end of input");
        return Ok(DriverState::Draining);
    };

    match pool.submit(block) {
        Ok(_) => {}
        Err(PoolError::Aborted) => {
            // Surface the block error that caused the abort.
            absorb(pool.poll_completions(), queue, output, summary)?;
            return Err(PoolError::Aborted.into());
        }
        Err(e) => return Err(e.into()),
    }

    absorb(pool.poll_completions(), queue, output, summary)?;
    Ok(DriverState::Reading)
}

/// Wait for outstanding blocks after end of input.
fn drain_step<W: Write>(
    pool: &mut WorkerPool,
    queue: &mut ReorderQueue,
    output: &mut W,
    summary: &mut CompressSummary,
) -> Result<DriverState> {
    if pool.is_quiescent() {
        return Ok(DriverState::Done);
    }
    absorb(pool.wait_completions(), queue, output, summary)?;
    Ok(DriverState::Draining)
}

/// Move completions into the reorder queue, draining after each insert.
fn absorb<W: Write>(
    completions: Vec<Completion>,
    queue: &mut ReorderQueue,
    output: &mut W,
    summary: &mut CompressSummary,
) -> Result<()> {
    for completion in completions {
        let encoded = completion.result?;
        if encoded.sequence != completion.sequence {
            return Err(PipelineError::Consistency(format!(
                "slot reported block {} for block {}",
                encoded.sequence, completion.sequence
            )));
        }
        summary.compressed_bytes += encoded.frame.len() as u64;
        if encoded.stored {
            summary.stored_blocks += 1;
        }
        queue.push(encoded.sequence, encoded.frame, output)?;
    }
    Ok(())
}
