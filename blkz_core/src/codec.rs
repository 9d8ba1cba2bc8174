use bitflags::bitflags;

use crate::error::CodecError;
use crate::format::WIRE_OPTIONS_MASK;

bitflags! {
    /// Per-block option bits.
    ///
    /// The top three bits travel in the frame header (see
    /// [`format`](crate::format)); the low bits are compressor tuning hints
    /// that never reach the wire.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BlockOptions: u8 {
        /// Payload is the raw block stored literally behind a sub-length.
        const STORED = 0x80;
        /// Reserved header bit, passed through to the codec on decompress.
        const RESERVED_6 = 0x40;
        /// Reserved header bit, passed through to the codec on decompress.
        const RESERVED_5 = 0x20;
        /// Prefer speed over ratio when compressing.
        const FAST = 0x01;
    }
}

impl BlockOptions {
    /// The subset of bits carried in a frame header.
    pub fn wire(self) -> Self {
        Self::from_bits_truncate(self.bits() & WIRE_OPTIONS_MASK)
    }

    /// Options as decoded from a header byte.
    pub fn from_header_byte(byte: u8) -> Self {
        Self::from_bits_truncate(byte & WIRE_OPTIONS_MASK)
    }

    pub fn is_stored(self) -> bool {
        self.contains(Self::STORED)
    }
}

/// Block compression abstraction.
///
/// Each `Codec` implementation:
/// - Compresses and decompresses single blocks independently. No cross-block
///   state is permitted, which is what lets blocks run on any worker.
/// - Is pure and thread-safe: the worker pool calls `compress_block`
///   concurrently from many threads on disjoint buffers.
/// - Round-trips: `decompress_block(compress_block(x, o), o.wire(), max)`
///   returns `x` for every block up to the maximum block size. Only the wire
///   bits of the options are available when decompressing.
pub trait Codec: Send + Sync {
    /// Human-readable codec name for logs and CLI display.
    fn name(&self) -> &'static str;

    /// Compress a single independent block.
    ///
    /// The output may be larger than `raw`; the encoder falls back to a
    /// stored frame in that case.
    fn compress_block(&self, raw: &[u8], options: BlockOptions) -> Result<Vec<u8>, CodecError>;

    /// Decompress a single independent block.
    ///
    /// `max_len` bounds the decoded size. Implementations must not allocate
    /// past it on hostile input, and report an oversized block as
    /// [`CodecError::OutputTooLarge`]; the caller still checks the returned
    /// length.
    fn decompress_block(
        &self,
        payload: &[u8],
        options: BlockOptions,
        max_len: usize,
    ) -> Result<Vec<u8>, CodecError>;
}
