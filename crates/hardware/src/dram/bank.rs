//! Per-bank state.
//!
//! A bank owns its request buffer, the entry currently occupying it, the
//! open row, and the timing points the schedulers compare against the clock.
//! A timing point of `None` means nothing is armed.

use crate::common::Cycle;
use crate::dram::drb::{DramState, DrbEntry, RequestBuffer};

/// One DRAM bank: request buffer plus bank-local command state.
pub struct Bank {
    /// Pending and free request entries.
    pub drb: RequestBuffer,
    /// Arena index of the entry occupying the bank, if any.
    pub current: Option<usize>,
    /// Row currently latched in the row buffer.
    pub open_row: Option<u64>,
    /// Cycle the in-flight command finishes.
    pub bank_ready: Option<Cycle>,
    /// Cycle the scheduled data transfer completes.
    pub data_ready: Option<Cycle>,
    /// Cycle the column data becomes eligible for the bus.
    pub data_avail: Option<Cycle>,
    /// Cycle of the last scheduling action; channel arbitration ages on it.
    pub last_cmd_at: Cycle,
}

impl Bank {
    /// Creates an idle bank with a buffer of `buffer_size` entries.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            drb: RequestBuffer::new(buffer_size),
            current: None,
            open_row: None,
            bank_ready: None,
            data_ready: None,
            data_avail: None,
            last_cmd_at: 0,
        }
    }

    /// Returns the entry occupying the bank, if any.
    pub fn current_entry(&self) -> Option<&DrbEntry> {
        self.current.map(|idx| self.drb.entry(idx))
    }

    /// Returns the state of the occupying entry, if any.
    pub fn current_state(&self) -> Option<DramState> {
        self.current_entry().map(|e| e.state)
    }

    /// Returns whether the occupying entry sits in `state`.
    #[inline]
    pub fn current_in(&self, state: DramState) -> bool {
        self.current_state() == Some(state)
    }
}
