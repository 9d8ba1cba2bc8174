#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use blkz_core::{BlockOptions, Codec, CodecError, Compressor, Decompressor, PipelineConfig};

/// Generate `len` deterministic bytes using a simple LCG.
pub fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (rng >> 56) as u8
        })
        .collect()
}

/// Generate `len` highly compressible bytes (repeating pattern).
pub fn compressible_bytes(len: usize) -> Vec<u8> {
    let pattern = b"the quick brown fox jumps over the lazy dog. ";
    (0..len).map(|i| pattern[i % pattern.len()]).collect()
}

/// Alternate compressible and random runs of `run` bytes.
pub fn mixed_bytes(len: usize, run: usize) -> Vec<u8> {
    let text = compressible_bytes(len);
    let noise = pseudo_random_bytes(len, 0xC0FF_EE00);
    (0..len)
        .map(|i| if (i / run) % 2 == 0 { text[i] } else { noise[i] })
        .collect()
}

pub fn compress_with(codec: Arc<dyn Codec>, config: PipelineConfig, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    Compressor::new(codec, config)
        .unwrap()
        .compress(data, &mut out)
        .unwrap();
    out
}

pub fn decompress_with(codec: Arc<dyn Codec>, config: PipelineConfig, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    Decompressor::new(codec, config)
        .unwrap()
        .decompress(data, &mut out)
        .unwrap();
    out
}

/// Stores blocks verbatim while recording how many calls overlap.
///
/// A block whose first byte is `slow_marker` sleeps for `slow`; all others
/// sleep for `fast`.
pub struct InstrumentedCodec {
    pub current: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
    pub slow_marker: Option<u8>,
    pub slow: Duration,
    pub fast: Duration,
}

impl InstrumentedCodec {
    pub fn new(fast: Duration) -> Self {
        Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            slow_marker: None,
            slow: fast,
            fast,
        }
    }

    pub fn with_slow_marker(mut self, marker: u8, slow: Duration) -> Self {
        self.slow_marker = Some(marker);
        self.slow = slow;
        self
    }
}

impl Codec for InstrumentedCodec {
    fn name(&self) -> &'static str {
        "instrumented"
    }

    fn compress_block(&self, raw: &[u8], _options: BlockOptions) -> Result<Vec<u8>, CodecError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = match (self.slow_marker, raw.first()) {
            (Some(marker), Some(&first)) if first == marker => self.slow,
            _ => self.fast,
        };
        thread::sleep(delay);
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(raw.to_vec())
    }

    fn decompress_block(
        &self,
        payload: &[u8],
        _options: BlockOptions,
        _max_len: usize,
    ) -> Result<Vec<u8>, CodecError> {
        Ok(payload.to_vec())
    }
}

/// Fails (or panics) on any block containing `marker`.
pub struct FailingCodec {
    pub marker: u8,
    pub panic: bool,
}

impl Codec for FailingCodec {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn compress_block(&self, raw: &[u8], _options: BlockOptions) -> Result<Vec<u8>, CodecError> {
        if raw.contains(&self.marker) {
            if self.panic {
                panic!("marker byte found");
            }
            return Err(CodecError::compress(self.name(), "marker byte found"));
        }
        Ok(raw[..raw.len() / 2].to_vec())
    }

    fn decompress_block(
        &self,
        _payload: &[u8],
        _options: BlockOptions,
        _max_len: usize,
    ) -> Result<Vec<u8>, CodecError> {
        Err(CodecError::decompress(self.name(), "always fails"))
    }
}
