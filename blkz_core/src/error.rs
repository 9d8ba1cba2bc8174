//! Error types for the block pipeline.
//!
//! Every failure kind maps to its own process exit status through
//! [`PipelineError::exit_code`], so a caller can tell a corrupt stream from a
//! failing codec or a broken pipe without parsing messages.

use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

// ── Exit codes ─────────────────────────────────────────────────────────────

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_USAGE: u8 = 2;
pub const EXIT_IO: u8 = 3;
pub const EXIT_CODEC: u8 = 4;
pub const EXIT_PROTOCOL: u8 = 5;
pub const EXIT_ALLOCATION: u8 = 6;
pub const EXIT_CONSISTENCY: u8 = 7;
pub const EXIT_FILTER: u8 = 8;

/// Failure reported by a [`Codec`](crate::Codec) implementation.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{codec} compression failed: {message}")]
    Compress { codec: &'static str, message: String },

    #[error("{codec} decompression failed: {message}")]
    Decompress { codec: &'static str, message: String },

    /// The block would decode to more than the caller's `max_len`.
    #[error("{codec} block decodes to at least {len} bytes, limit is {max}")]
    OutputTooLarge {
        codec: &'static str,
        len: usize,
        max: usize,
    },

    /// The codec panicked inside a worker thread.
    #[error("{codec} panicked while compressing")]
    Panicked { codec: &'static str },
}

impl CodecError {
    pub fn compress(codec: &'static str, message: impl ToString) -> Self {
        CodecError::Compress {
            codec,
            message: message.to_string(),
        }
    }

    pub fn decompress(codec: &'static str, message: impl ToString) -> Self {
        CodecError::Decompress {
            codec,
            message: message.to_string(),
        }
    }
}

/// Wire-level framing errors. All of these mean the stream is corrupt.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Declared length exceeds the length field or the configured maximum.
    #[error("declared frame length {declared} exceeds maximum {max}")]
    LengthOverflow { declared: usize, max: usize },

    /// Stream ended before the header or payload was complete.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// A decoded block is larger than the configured maximum block size.
    #[error("decoded payload of {len} bytes exceeds maximum block size {max}")]
    PayloadOverflow { len: usize, max: usize },

    /// A stored frame's sub-length disagrees with its payload length.
    #[error("stored sub-length {declared} does not match available payload {available}")]
    StoredLengthMismatch { declared: usize, available: usize },

    #[error("I/O error while reading frame: {0}")]
    Io(#[from] io::Error),
}

/// Errors from the standalone block filters.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("buffer length {len} is not a multiple of {planes} byte planes")]
    UnalignedLength { len: usize, planes: usize },

    #[error("invalid byte plane count {0}: must be at least 1")]
    InvalidPlaneCount(usize),
}

/// Errors from the worker pool control surface.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A worker failed earlier; the pool accepts no more blocks.
    #[error("worker pool aborted after a failed block")]
    Aborted,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Top-level pipeline error. Each variant is fatal.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid configuration or arguments; raised before any stream I/O.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("codec error on block {sequence}: {source}")]
    Codec {
        sequence: u64,
        #[source]
        source: CodecError,
    },

    #[error("corrupt stream at frame {index}: {source}")]
    Frame {
        index: u64,
        #[source]
        source: FrameError,
    },

    #[error("allocation failed: could not reserve {requested} bytes")]
    Allocation { requested: usize },

    /// Lost or duplicated sequence number. Indicates a bug, not bad input.
    #[error("internal consistency error: {0}")]
    Consistency(String),

    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),
}

impl PipelineError {
    /// Wrap a frame error, lifting plain I/O failures to [`PipelineError::Io`].
    pub fn frame(index: u64, source: FrameError) -> Self {
        match source {
            FrameError::Io(e) => PipelineError::Io(e),
            source => PipelineError::Frame { index, source },
        }
    }

    pub fn allocation(requested: usize) -> impl FnOnce(TryReserveError) -> Self {
        move |_| PipelineError::Allocation { requested }
    }

    /// Distinct process exit status for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Config(_) => EXIT_USAGE,
            PipelineError::Io(_) => EXIT_IO,
            PipelineError::Codec { .. } => EXIT_CODEC,
            PipelineError::Frame { .. } => EXIT_PROTOCOL,
            PipelineError::Allocation { .. } => EXIT_ALLOCATION,
            PipelineError::Consistency(_) => EXIT_CONSISTENCY,
            PipelineError::Filter(_) => EXIT_FILTER,
            PipelineError::Pool(PoolError::Spawn(_)) => EXIT_ALLOCATION,
            PipelineError::Pool(PoolError::Aborted) => EXIT_CODEC,
        }
    }
}
