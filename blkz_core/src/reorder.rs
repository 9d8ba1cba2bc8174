use std::collections::BTreeMap;
use std::io::{self, Write};

use tracing::trace;

use crate::error::{PipelineError, Result};

/// Reassembles out-of-order block completions into sequence order.
///
/// Holds encoded frames keyed by sequence number. Only the contiguous run
/// starting at `next_to_write` is ever written, so output order matches read
/// order no matter which worker finished first.
#[derive(Debug, Default)]
pub struct ReorderQueue {
    pending: BTreeMap<u64, Vec<u8>>,
    next_to_write: u64,
    peak_len: usize,
}

impl ReorderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a finished frame.
    ///
    /// Fails if the sequence was already written or is already queued:
    /// either means a sequence number was duplicated.
    pub fn enqueue(&mut self, sequence: u64, frame: Vec<u8>) -> Result<()> {
        if sequence < self.next_to_write {
            return Err(PipelineError::Consistency(format!(
                "block {sequence} arrived after it was written (next is {})",
                self.next_to_write
            )));
        }
        if self.pending.contains_key(&sequence) {
            return Err(PipelineError::Consistency(format!(
                "block {sequence} queued twice"
            )));
        }
        self.pending.insert(sequence, frame);
        self.peak_len = self.peak_len.max(self.pending.len());
        Ok(())
    }

    /// Write every frame whose turn has come. Returns how many were written.
    ///
    /// A frame leaves the queue only after it was written in full, so a
    /// failed write leaves it pending at `next_to_write`.
    pub fn drain<W: Write>(&mut self, output: &mut W) -> io::Result<usize> {
        let mut written = 0;
        while let Some(entry) = self.pending.first_entry() {
            if *entry.key() != self.next_to_write {
                break;
            }
            output.write_all(entry.get())?;
            let frame = entry.remove();
            trace!(sequence = self.next_to_write, bytes = frame.len(), "frame written");
            self.next_to_write += 1;
            written += 1;
        }
        Ok(written)
    }

    /// [`enqueue`](Self::enqueue) immediately followed by [`drain`](Self::drain).
    pub fn push<W: Write>(&mut self, sequence: u64, frame: Vec<u8>, output: &mut W) -> Result<usize> {
        self.enqueue(sequence, frame)?;
        Ok(self.drain(output)?)
    }

    /// Confirm the queue is empty and every one of `total_blocks` was written.
    pub fn finish(&self, total_blocks: u64) -> Result<()> {
        if !self.pending.is_empty() || self.next_to_write != total_blocks {
            let first_pending = self.pending.keys().next();
            return Err(PipelineError::Consistency(format!(
                "reorder queue stuck at block {} of {total_blocks} with {} pending (first {:?})",
                self.next_to_write,
                self.pending.len(),
                first_pending
            )));
        }
        Ok(())
    }

    pub fn next_to_write(&self) -> u64 {
        self.next_to_write
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Largest number of frames held at once.
    pub fn peak_len(&self) -> usize {
        self.peak_len
    }
}
