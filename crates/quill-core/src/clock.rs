//! Per-replica Lamport logical clock.
//!
//! Each replica owns exactly one clock. `advance` timestamps local events;
//! `observe` folds in a remote timestamp so that every future local event
//! causally dominates everything the replica has already seen. The clock is
//! plain mutable state - callers in multi-threaded hosts must serialize
//! access externally.

use serde::{Deserialize, Serialize};

/// Lamport clock plus the running sequence used for same-tick id tie-breaks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    time: u64,
    seq: u64,
}

impl Clock {
    /// Create a clock at logical time zero.
    pub fn new() -> Self {
        Clock { time: 0, seq: 0 }
    }

    /// Restore a clock from persisted counters.
    pub fn from_parts(time: u64, seq: u64) -> Self {
        Clock { time, seq }
    }

    /// Advance for a local event, returning a value strictly greater than
    /// every previously issued local value.
    pub fn advance(&mut self) -> u64 {
        self.time += 1;
        self.time
    }

    /// Fold in a remote timestamp: the local counter jumps past it, so ids
    /// minted afterwards dominate anything already observed.
    pub fn observe(&mut self, remote: u64) {
        self.time = self.time.max(remote) + 1;
    }

    /// Allocate the next id sequence number.
    pub fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// The current logical time (highest issued or observed).
    pub fn time(&self) -> u64 {
        self.time
    }

    /// The current sequence counter.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}
