//! Reversible single-block filters.
//!
//! Neither filter knows about frames or workers. They run either as a
//! standalone stream transform ([`run_stream`]) or as a per-block stage of
//! the pipeline ([`BlockFilter`]), applied to each raw block before the codec
//! and reversed after decoding.

pub mod byteplane;
pub mod delta;

use std::borrow::Cow;
use std::io::{Read, Write};

use tracing::debug;

use crate::error::{FilterError, PipelineError};
use crate::format::read_full;

pub use byteplane::DEFAULT_PLANES;
pub use delta::{DeltaDecoder, DeltaEncoder};

/// Chunk size used by the standalone stream filter.
pub const DEFAULT_FILTER_CHUNK: usize = 4096;

/// Which way to run a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Per-block pre/post-processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockFilter {
    #[default]
    None,
    /// Delta coding; the predictor restarts at zero for every block.
    Delta,
    /// Byte-plane split with the given plane count.
    BytePlane(usize),
}

impl BlockFilter {
    pub fn validate(&self) -> Result<(), FilterError> {
        match *self {
            BlockFilter::BytePlane(0) => Err(FilterError::InvalidPlaneCount(0)),
            _ => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlockFilter::None => "none",
            BlockFilter::Delta => "delta",
            BlockFilter::BytePlane(_) => "byteplane",
        }
    }

    /// Transform one raw block before compression.
    pub fn forward_block<'a>(&self, raw: &'a [u8]) -> Result<Cow<'a, [u8]>, FilterError> {
        self.apply(raw, Direction::Forward)
    }

    /// Undo [`forward_block`](Self::forward_block) on a decoded block.
    pub fn reverse_block<'a>(&self, raw: &'a [u8]) -> Result<Cow<'a, [u8]>, FilterError> {
        self.apply(raw, Direction::Reverse)
    }

    /// Byte-plane blocks whose length is not a multiple of the plane count
    /// (only ever the final block) transform their largest aligned prefix and
    /// keep the tail verbatim.
    fn apply<'a>(&self, raw: &'a [u8], direction: Direction) -> Result<Cow<'a, [u8]>, FilterError> {
        match (*self, direction) {
            (BlockFilter::None, _) => Ok(Cow::Borrowed(raw)),
            (BlockFilter::Delta, Direction::Forward) => Ok(Cow::Owned(delta::encode(raw))),
            (BlockFilter::Delta, Direction::Reverse) => Ok(Cow::Owned(delta::decode(raw))),
            (BlockFilter::BytePlane(planes), direction) => {
                if planes == 0 {
                    return Err(FilterError::InvalidPlaneCount(planes));
                }
                let aligned = raw.len() - raw.len() % planes;
                let (body, tail) = raw.split_at(aligned);
                let mut out = match direction {
                    Direction::Forward => byteplane::forward(body, planes)?,
                    Direction::Reverse => byteplane::reverse(body, planes)?,
                };
                out.extend_from_slice(tail);
                Ok(Cow::Owned(out))
            }
        }
    }
}

/// Run `filter` over a whole stream in `chunk_size` pieces.
///
/// Delta coding carries its predictor across chunks, so its output does not
/// depend on `chunk_size`. It is therefore not byte-compatible with delta
/// tools that restart the predictor at every read buffer (such as 32 KiB
/// `fread`-sized chunks) once the input exceeds one buffer. Byte-plane coding works
/// chunk by chunk, so the same `chunk_size` must be used to reverse it.
/// Returns the number of bytes processed.
pub fn run_stream<R: Read, W: Write>(
    filter: BlockFilter,
    direction: Direction,
    chunk_size: usize,
    mut input: R,
    mut output: W,
) -> Result<u64, PipelineError> {
    filter.validate()?;
    if chunk_size == 0 {
        return Err(PipelineError::Config("filter chunk size must be positive".into()));
    }
    if let BlockFilter::BytePlane(planes) = filter {
        if chunk_size % planes != 0 {
            return Err(FilterError::UnalignedLength {
                len: chunk_size,
                planes,
            }
            .into());
        }
    }

    let mut encoder = DeltaEncoder::new();
    let mut decoder = DeltaDecoder::new();
    let mut buf = Vec::new();
    buf.try_reserve_exact(chunk_size)
        .map_err(PipelineError::allocation(chunk_size))?;
    buf.resize(chunk_size, 0);
    let mut total = 0u64;

    loop {
        let n = read_full(&mut input, &mut buf)?;
        if n == 0 {
            break;
        }
        let chunk = &mut buf[..n];
        match (filter, direction) {
            (BlockFilter::None, _) => output.write_all(chunk)?,
            (BlockFilter::Delta, Direction::Forward) => {
                encoder.apply(chunk);
                output.write_all(chunk)?;
            }
            (BlockFilter::Delta, Direction::Reverse) => {
                decoder.apply(chunk);
                output.write_all(chunk)?;
            }
            (BlockFilter::BytePlane(_), direction) => {
                output.write_all(&filter.apply(chunk, direction)?)?;
            }
        }
        total += n as u64;
        if n < chunk_size {
            break;
        }
    }

    output.flush()?;
    debug!(filter = filter.name(), ?direction, bytes = total, "stream filter finished");
    Ok(total)
}
