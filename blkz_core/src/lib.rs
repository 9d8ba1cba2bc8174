pub mod block;
pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod pool;
pub mod reader;
pub mod reorder;
pub mod writer;

pub use block::{Block, BlockEncoder, BlockReader, EncodedBlock};
pub use codec::{BlockOptions, Codec};
pub use config::PipelineConfig;
pub use error::{CodecError, FilterError, FrameError, PipelineError, PoolError};
pub use filter::{BlockFilter, Direction};
pub use format::{Frame, FrameHeader, FrameReader, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};
pub use pool::{Completion, PoolStats, WorkerPool};
pub use reader::{DecompressSummary, Decompressor};
pub use reorder::ReorderQueue;
pub use writer::{CompressSummary, Compressor};
