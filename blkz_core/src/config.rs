use crate::codec::BlockOptions;
use crate::error::PipelineError;
use crate::filter::BlockFilter;
use crate::format::{DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};

/// Worker threads per available CPU when no pool size is given.
pub const WORKERS_PER_CPU: usize = 2;

/// Default worker pool capacity: two slots per logical CPU.
pub fn default_workers() -> usize {
    num_cpus::get().max(1) * WORKERS_PER_CPU
}

/// Settings shared by the compressing and decompressing sides.
///
/// Neither the block size nor the block filter is recorded in the stream,
/// so the decompressor must be given the values the compressor used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Raw bytes per block; the final block may be shorter. On the
    /// decompressing side this is the largest block accepted.
    pub block_size: usize,
    /// Worker pool capacity. Ignored when decompressing.
    pub workers: usize,
    /// Options handed to the codec for every block.
    pub options: BlockOptions,
    /// Per-block filter applied before compression and reversed after.
    pub filter: BlockFilter,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            workers: default_workers(),
            options: BlockOptions::empty(),
            filter: BlockFilter::None,
        }
    }
}

impl PipelineConfig {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_options(mut self, options: BlockOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_filter(mut self, filter: BlockFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Reject settings the frame format cannot carry.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(PipelineError::Config(format!(
                "block size {} out of range 1..={}",
                self.block_size, MAX_BLOCK_SIZE
            )));
        }
        if self.workers == 0 {
            return Err(PipelineError::Config("worker count must be at least 1".into()));
        }
        if self.options.is_stored() {
            return Err(PipelineError::Config(
                "the STORED option is chosen per block and cannot be forced".into(),
            ));
        }
        self.filter.validate()?;
        Ok(())
    }
}
