//! On-wire frame layout.
//!
//! A compressed stream is a plain concatenation of frames with no file header
//! or trailer. Each frame is a 2-byte header followed by `length` payload
//! bytes:
//!
//! ```text
//! byte 0:  S R R L L L L L    S = STORED (0x80), R = reserved (0x40, 0x20)
//! byte 1:  L L L L L L L L    length = (byte0 & 0x1f) << 8 | byte1
//! ```
//!
//! A stored frame's payload starts with its own sub-length in the same
//! 13-bit layout (flag bits zero), followed by that many literal bytes.

use std::io::{self, Read};

use crate::codec::BlockOptions;
use crate::error::FrameError;

/// Size of the frame header in bytes.
pub const HEADER_LEN: usize = 2;

/// Width of the header length field.
pub const LENGTH_BITS: u32 = 13;

/// Largest payload length the header can express: 8191.
pub const MAX_FRAME_LEN: usize = (1 << LENGTH_BITS) - 1;

/// Size of the sub-length prefix inside a stored payload.
pub const STORED_PREFIX_LEN: usize = 2;

/// Worst-case bytes added to a block: header plus stored prefix.
pub const FRAME_OVERHEAD: usize = HEADER_LEN + STORED_PREFIX_LEN;

/// Largest block whose stored fallback still fits the length field: 8189.
pub const MAX_BLOCK_SIZE: usize = MAX_FRAME_LEN - STORED_PREFIX_LEN;

/// Default raw bytes per block.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Header bits that carry [`BlockOptions`].
pub const WIRE_OPTIONS_MASK: u8 = 0xe0;

const LENGTH_HIGH_MASK: u8 = 0x1f;

/// Largest payload a reader configured for `max_block_size` will accept.
pub fn max_payload_len(max_block_size: usize) -> usize {
    max_block_size
        .saturating_add(STORED_PREFIX_LEN)
        .min(MAX_FRAME_LEN)
}

fn pack_length(high_bits: u8, length: usize) -> [u8; 2] {
    [
        high_bits | ((length >> 8) as u8 & LENGTH_HIGH_MASK),
        length as u8,
    ]
}

fn unpack_length(buf: [u8; 2]) -> usize {
    ((buf[0] & LENGTH_HIGH_MASK) as usize) << 8 | buf[1] as usize
}

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded representation of the 2-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Wire option bits only.
    pub options: BlockOptions,
    /// Payload length in bytes.
    pub length: u16,
}

impl FrameHeader {
    /// Build a header, rejecting lengths the field cannot hold.
    pub fn new(options: BlockOptions, length: usize) -> Result<Self, FrameError> {
        if length > MAX_FRAME_LEN {
            return Err(FrameError::LengthOverflow {
                declared: length,
                max: MAX_FRAME_LEN,
            });
        }
        Ok(Self {
            options: options.wire(),
            length: length as u16,
        })
    }

    /// Serialize to exactly `HEADER_LEN` bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        pack_length(self.options.wire().bits(), self.length as usize)
    }

    /// Deserialize from `HEADER_LEN` bytes. Every bit pattern is a valid header.
    pub fn from_bytes(buf: [u8; HEADER_LEN]) -> Self {
        Self {
            options: BlockOptions::from_header_byte(buf[0]),
            length: unpack_length(buf) as u16,
        }
    }

    /// Check the declared length against a reader's configured maximum.
    pub fn check_length(&self, max_block_size: usize) -> Result<usize, FrameError> {
        let declared = self.length as usize;
        let max = max_payload_len(max_block_size);
        if declared > max {
            return Err(FrameError::LengthOverflow { declared, max });
        }
        Ok(declared)
    }
}

// ── Encoding ───────────────────────────────────────────────────────────────

/// Append one frame (header + payload) to `out`.
pub fn encode_frame(
    options: BlockOptions,
    payload: &[u8],
    out: &mut Vec<u8>,
) -> Result<(), FrameError> {
    let header = FrameHeader::new(options, payload.len())?;
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

/// Append a stored frame carrying `raw` verbatim.
///
/// The result is always `raw.len() + FRAME_OVERHEAD` bytes.
pub fn encode_stored(options: BlockOptions, raw: &[u8], out: &mut Vec<u8>) -> Result<(), FrameError> {
    if raw.len() > MAX_BLOCK_SIZE {
        return Err(FrameError::LengthOverflow {
            declared: raw.len(),
            max: MAX_BLOCK_SIZE,
        });
    }
    let header = FrameHeader::new(options | BlockOptions::STORED, raw.len() + STORED_PREFIX_LEN)?;
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&pack_length(0, raw.len()));
    out.extend_from_slice(raw);
    Ok(())
}

// ── Decoding ───────────────────────────────────────────────────────────────

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub options: BlockOptions,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn is_stored(&self) -> bool {
        self.options.is_stored()
    }

    /// Decode one frame from the front of `buf`.
    ///
    /// Returns the frame and the number of bytes consumed. Never reads past
    /// the end of `buf`: a header declaring more than is available fails with
    /// [`FrameError::ShortRead`], and one declaring more than the configured
    /// maximum fails with [`FrameError::LengthOverflow`] before any slicing.
    pub fn parse(buf: &[u8], max_block_size: usize) -> Result<(Self, usize), FrameError> {
        if buf.len() < HEADER_LEN {
            return Err(FrameError::ShortRead {
                expected: HEADER_LEN,
                actual: buf.len(),
            });
        }
        let header = FrameHeader::from_bytes([buf[0], buf[1]]);
        let length = header.check_length(max_block_size)?;

        let body = &buf[HEADER_LEN..];
        if body.len() < length {
            return Err(FrameError::ShortRead {
                expected: length,
                actual: body.len(),
            });
        }
        let frame = Frame {
            options: header.options,
            payload: body[..length].to_vec(),
        };
        Ok((frame, HEADER_LEN + length))
    }

    /// The literal block inside a stored frame.
    pub fn stored_literal(&self, max_block_size: usize) -> Result<&[u8], FrameError> {
        if self.payload.len() < STORED_PREFIX_LEN {
            return Err(FrameError::ShortRead {
                expected: STORED_PREFIX_LEN,
                actual: self.payload.len(),
            });
        }
        let declared = unpack_length([self.payload[0], self.payload[1]]);
        if declared > max_block_size {
            return Err(FrameError::PayloadOverflow {
                len: declared,
                max: max_block_size,
            });
        }
        let literal = &self.payload[STORED_PREFIX_LEN..];
        if declared != literal.len() {
            return Err(FrameError::StoredLengthMismatch {
                declared,
                available: literal.len(),
            });
        }
        Ok(literal)
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
///
/// Returns the number of bytes read.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Sequential frame parser over a byte stream.
pub struct FrameReader<R> {
    reader: R,
    max_block_size: usize,
    frames_read: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R, max_block_size: usize) -> Self {
        Self {
            reader,
            max_block_size,
            frames_read: 0,
        }
    }

    /// Number of frames returned so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read the next frame.
    ///
    /// `Ok(None)` means the stream ended cleanly between frames. A stream that
    /// ends inside a header or payload is a [`FrameError::ShortRead`].
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        let mut header_buf = [0u8; HEADER_LEN];
        match read_full(&mut self.reader, &mut header_buf)? {
            0 => return Ok(None),
            n if n < HEADER_LEN => {
                return Err(FrameError::ShortRead {
                    expected: HEADER_LEN,
                    actual: n,
                })
            }
            _ => {}
        }

        let header = FrameHeader::from_bytes(header_buf);
        let length = header.check_length(self.max_block_size)?;

        let mut payload = vec![0u8; length];
        let n = read_full(&mut self.reader, &mut payload)?;
        if n < length {
            return Err(FrameError::ShortRead {
                expected: length,
                actual: n,
            });
        }

        self.frames_read += 1;
        Ok(Some(Frame {
            options: header.options,
            payload,
        }))
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
