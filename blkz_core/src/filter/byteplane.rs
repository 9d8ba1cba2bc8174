//! Byte-plane deinterleaving.
//!
//! A buffer of `planes * n` bytes is viewed as `n` records of `planes` bytes.
//! The forward transform writes byte 0 of every record, then byte 1 of every
//! record, and so on (plane-major). Structured data such as arrays of
//! little-endian integers compresses noticeably better in this layout.

use crate::error::FilterError;

/// Plane count used by the standalone filter when none is given.
pub const DEFAULT_PLANES: usize = 4;

fn check(len: usize, planes: usize) -> Result<usize, FilterError> {
    if planes == 0 {
        return Err(FilterError::InvalidPlaneCount(planes));
    }
    if len % planes != 0 {
        return Err(FilterError::UnalignedLength { len, planes });
    }
    Ok(len / planes)
}

/// Split `input` into `planes` planes, plane-major.
pub fn forward(input: &[u8], planes: usize) -> Result<Vec<u8>, FilterError> {
    let records = check(input.len(), planes)?;
    let mut out = vec![0u8; input.len()];
    for (r, record) in input.chunks_exact(planes).enumerate() {
        for (p, &b) in record.iter().enumerate() {
            out[p * records + r] = b;
        }
    }
    Ok(out)
}

/// Exact inverse of [`forward`].
pub fn reverse(input: &[u8], planes: usize) -> Result<Vec<u8>, FilterError> {
    let records = check(input.len(), planes)?;
    let mut out = vec![0u8; input.len()];
    for (p, plane) in input.chunks_exact(records.max(1)).enumerate().take(planes) {
        for (r, &b) in plane.iter().enumerate() {
            out[r * planes + p] = b;
        }
    }
    Ok(out)
}
