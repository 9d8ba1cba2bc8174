//! Bounded pool of compression slots.
//!
//! Each submitted block gets its own worker thread, and at most `capacity`
//! of them run at once. The slot table is owned by the driver thread alone.
//! Workers share nothing with it except one completion channel: every worker
//! sends exactly one message when its block is done, and that message is the
//! only way a slot ever leaves `Working`.
//!
//! ```text
//! Idle ──submit──▶ Working ──message──▶ Done | Failed ──reap──▶ Idle
//! ```

use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::block::{Block, BlockEncoder, EncodedBlock};
use crate::error::{CodecError, PipelineError, PoolError, Result};

/// Codec name reported when the codec panics while naming itself.
const UNNAMED_CODEC: &str = "unknown";

/// Result of one block, as handed back to the driver.
#[derive(Debug)]
pub struct Completion {
    pub sequence: u64,
    pub result: Result<EncodedBlock>,
}

/// Identifies the slot a block was submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotHandle {
    pub slot: usize,
    pub sequence: u64,
}

/// Counters collected over the pool's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    /// Highest number of simultaneously working slots observed.
    pub peak_in_flight: usize,
}

enum SlotState {
    Idle,
    Working {
        sequence: u64,
        handle: JoinHandle<()>,
    },
    Done(EncodedBlock),
    Failed {
        sequence: u64,
        error: PipelineError,
    },
}

struct WorkerMessage {
    slot: usize,
    result: Result<EncodedBlock>,
}

pub struct WorkerPool {
    encoder: Arc<BlockEncoder>,
    slots: Vec<SlotState>,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    /// Completions reaped while `submit` was looking for a free slot.
    reaped: Vec<Completion>,
    failed: bool,
    stats: PoolStats,
}

impl WorkerPool {
    pub fn new(capacity: usize, encoder: Arc<BlockEncoder>) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::Config("worker pool capacity must be at least 1".into()));
        }
        let (tx, rx) = unbounded();
        Ok(Self {
            encoder,
            slots: (0..capacity).map(|_| SlotState::Idle).collect(),
            tx,
            rx,
            reaped: Vec::new(),
            failed: false,
            stats: PoolStats::default(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently `Working`.
    pub fn in_flight(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, SlotState::Working { .. }))
            .count()
    }

    /// True once any block has failed. No further submissions are accepted.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// True when nothing is working and no result is waiting to be reaped.
    pub fn is_quiescent(&self) -> bool {
        self.reaped.is_empty() && self.slots.iter().all(|s| matches!(s, SlotState::Idle))
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Start compressing `block` on a free slot.
    ///
    /// Blocks the caller while every slot is working. Finished slots found
    /// along the way are reaped into an internal buffer that the next
    /// [`poll_completions`](Self::poll_completions) returns.
    pub fn submit(&mut self, block: Block) -> std::result::Result<SlotHandle, PoolError> {
        if self.failed {
            return Err(PoolError::Aborted);
        }

        let slot = loop {
            if let Some(i) = self.idle_slot() {
                break i;
            }
            self.reap_finished();
            if let Some(i) = self.idle_slot() {
                break i;
            }
            // Every slot is working: wait for one to report back.
            self.receive_one();
            if self.failed {
                return Err(PoolError::Aborted);
            }
        };

        let sequence = block.sequence;
        let encoder = Arc::clone(&self.encoder);
        let tx = self.tx.clone();
        let handle = thread::Builder::new()
            .name(format!("blkz-worker-{slot}"))
            .spawn(move || {
                // Nothing between here and the send may unwind: the driver
                // waits for exactly one message per working slot.
                let result = panic::catch_unwind(AssertUnwindSafe(|| encoder.encode(&block)))
                    .unwrap_or_else(|_| {
                        let codec = panic::catch_unwind(AssertUnwindSafe(|| encoder.codec_name()))
                            .unwrap_or(UNNAMED_CODEC);
                        Err(PipelineError::Codec {
                            sequence,
                            source: CodecError::Panicked { codec },
                        })
                    });
                // The pool joins every worker before dropping the receiver.
                let _ = tx.send(WorkerMessage { slot, result });
            })
            .map_err(PoolError::Spawn)?;

        self.slots[slot] = SlotState::Working { sequence, handle };
        self.stats.submitted += 1;
        self.stats.peak_in_flight = self.stats.peak_in_flight.max(self.in_flight());
        debug!(sequence, slot, "block submitted");
        Ok(SlotHandle { slot, sequence })
    }

    /// Collect every finished block without blocking.
    pub fn poll_completions(&mut self) -> Vec<Completion> {
        while let Ok(msg) = self.rx.try_recv() {
            self.record(msg);
        }
        self.reap_finished();
        mem::take(&mut self.reaped)
    }

    /// Like [`poll_completions`](Self::poll_completions), but waits for at
    /// least one result while any slot is still working.
    pub fn wait_completions(&mut self) -> Vec<Completion> {
        let mut completions = self.poll_completions();
        if completions.is_empty() && self.in_flight() > 0 {
            self.receive_one();
            completions = self.poll_completions();
        }
        completions
    }

    /// Stop accepting blocks and join every working slot, discarding results.
    ///
    /// Returns the number of discarded completions.
    pub fn abort(&mut self) -> usize {
        self.failed = true;
        let in_flight = self.in_flight();
        if in_flight > 0 {
            warn!(in_flight, "aborting worker pool, waiting for running blocks");
        }
        while self.in_flight() > 0 {
            self.receive_one();
        }
        self.reap_finished();
        mem::take(&mut self.reaped).len()
    }

    fn idle_slot(&self) -> Option<usize> {
        self.slots.iter().position(|s| matches!(s, SlotState::Idle))
    }

    /// Block until one worker message arrives. Only called while some slot is
    /// working, so a message is guaranteed to come.
    fn receive_one(&mut self) {
        debug_assert!(self.in_flight() > 0);
        if let Ok(msg) = self.rx.recv() {
            self.record(msg);
        }
    }

    /// Apply a worker message: `Working` → `Done` or `Failed`.
    fn record(&mut self, msg: WorkerMessage) {
        let (sequence, handle) = match mem::replace(&mut self.slots[msg.slot], SlotState::Idle) {
            SlotState::Working { sequence, handle } => (sequence, handle),
            other => {
                warn!(slot = msg.slot, "completion for a slot that was not working");
                self.slots[msg.slot] = other;
                return;
            }
        };
        // The worker sends as its last action, so this join is immediate.
        let _ = handle.join();

        self.slots[msg.slot] = match msg.result {
            Ok(encoded) => SlotState::Done(encoded),
            Err(error) => {
                warn!(sequence, slot = msg.slot, %error, "block failed");
                self.failed = true;
                self.stats.failed += 1;
                SlotState::Failed { sequence, error }
            }
        };
    }

    /// Move every `Done` / `Failed` slot back to `Idle`.
    fn reap_finished(&mut self) {
        for slot in self.slots.iter_mut() {
            if !matches!(slot, SlotState::Done(_) | SlotState::Failed { .. }) {
                continue;
            }
            let completion = match mem::replace(slot, SlotState::Idle) {
                SlotState::Done(encoded) => Completion {
                    sequence: encoded.sequence,
                    result: Ok(encoded),
                },
                SlotState::Failed { sequence, error } => Completion {
                    sequence,
                    result: Err(error),
                },
                other => {
                    *slot = other;
                    continue;
                }
            };
            self.stats.completed += 1;
            self.reaped.push(completion);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Never leave worker threads running past the pool.
        while self.in_flight() > 0 {
            self.receive_one();
        }
    }
}
