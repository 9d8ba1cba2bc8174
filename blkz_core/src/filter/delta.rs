//! Running-difference coding.
//!
//! `out[i] = in[i] - in[i - 1]` with wrapping arithmetic and an implicit
//! predictor of zero before the first byte. Decoding is a running sum.

/// Delta-encode `input` into a fresh buffer.
pub fn encode(input: &[u8]) -> Vec<u8> {
    let mut out = input.to_vec();
    DeltaEncoder::new().apply(&mut out);
    out
}

/// Reverse [`encode`].
pub fn decode(input: &[u8]) -> Vec<u8> {
    let mut out = input.to_vec();
    DeltaDecoder::new().apply(&mut out);
    out
}

/// Streaming encoder: carries the predictor across calls, so chunking the
/// input differently never changes the output.
#[derive(Debug, Default, Clone)]
pub struct DeltaEncoder {
    prev: u8,
}

impl DeltaEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `buf` in place.
    pub fn apply(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            let cur = *b;
            *b = cur.wrapping_sub(self.prev);
            self.prev = cur;
        }
    }
}

/// Streaming counterpart of [`DeltaEncoder`].
#[derive(Debug, Default, Clone)]
pub struct DeltaDecoder {
    prev: u8,
}

impl DeltaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `buf` in place.
    pub fn apply(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            self.prev = b.wrapping_add(self.prev);
            *b = self.prev;
        }
    }
}
