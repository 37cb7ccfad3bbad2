//! Per-bank DRAM request buffer.
//!
//! Each bank owns a fixed pool of entries split between a free list and an
//! insertion-ordered pending queue. This module provides:
//! 1. **Allocation:** Acquire a free entry at ingress, release it at completion.
//! 2. **Queueing:** FIFO pending queue of arena indices; policies may reorder it.
//! 3. **Entry records:** The controller-local copy of everything it schedules on.
//!
//! The arena owns every entry for the lifetime of the bank; the free list,
//! the pending queue, and the bank's current slot hold indices into it, so
//! an entry is always in exactly one place.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::common::{Cycle, MemLevel};
use crate::dram::decoder::DecodedAddr;
use crate::mem::{MemReq, MemReqKind, ReqId};

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(0);

/// Command progress of the request occupying a bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DramState {
    /// Free entry; not associated with any request.
    #[default]
    Init,
    /// Selected; waiting for the channel to issue its next command.
    Cmd,
    /// A command is in flight; waiting out its latency.
    CmdWait,
    /// Column access done or pending; waiting for the data bus.
    Data,
    /// Transfer scheduled on the bus; waiting for data-ready.
    DataWait,
}

impl DramState {
    /// Diagnostic name matching the controller dump format.
    pub fn name(self) -> &'static str {
        match self {
            DramState::Init => "DRAM_INIT",
            DramState::Cmd => "DRAM_CMD",
            DramState::CmdWait => "DRAM_CMD_WAIT",
            DramState::Data => "DRAM_DATA",
            DramState::DataWait => "DRAM_DATA_WAIT",
        }
    }
}

/// A request buffer entry: the controller's record of one pending request.
///
/// Fields the schedulers consult every cycle are copied out of the external
/// request at ingress so the hot loops never chase the pool handle.
#[derive(Clone, Debug, Default)]
pub struct DrbEntry {
    /// Unique entry id (monotonic across the process, diagnostics only).
    pub id: u64,
    /// Command progress.
    pub state: DramState,
    /// Physical address of the request.
    pub addr: u64,
    /// Bank this entry was decoded into.
    pub bank_id: usize,
    /// Decoded row index.
    pub row_id: u64,
    /// Decoded column offset.
    pub column_id: u64,
    /// Issuing core.
    pub core_id: u32,
    /// Issuing hardware thread.
    pub thread_id: u32,
    /// Application id.
    pub app_id: u32,
    /// Request type.
    pub kind: Option<MemReqKind>,
    /// Whether this access reads DRAM (false only for writebacks).
    pub is_read: bool,
    /// Whether latencies use the GPU clock scale.
    pub is_gpu: bool,
    /// Policy priority copied from the request type table.
    pub priority: i32,
    /// Transfer size in bytes.
    pub size: u32,
    /// L3 slice the fill routes back to.
    pub dst_cache_id: u32,
    /// Cycle this entry entered the pending queue.
    pub inserted_at: Cycle,
    /// Cycle this entry was first selected for command issue.
    pub scheduled_at: Cycle,
    /// Handle of the external request, `None` for free entries.
    pub req: Option<ReqId>,
}

impl DrbEntry {
    /// Populates a freshly acquired entry from an external request.
    pub fn assign(&mut self, req_id: ReqId, req: &MemReq, dec: &DecodedAddr, now: Cycle) {
        self.id = NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed);
        self.state = DramState::Init;
        self.addr = req.addr;
        self.bank_id = dec.bank;
        self.row_id = dec.row;
        self.column_id = dec.column;
        self.core_id = req.core_id;
        self.thread_id = req.thread_id;
        self.app_id = req.app_id;
        self.kind = Some(req.kind);
        self.is_read = req.kind.is_read();
        self.is_gpu = req.is_gpu;
        self.priority = req.kind.priority();
        self.size = req.size;
        self.dst_cache_id = req.cache_id[MemLevel::L3.idx()];
        self.inserted_at = now;
        self.scheduled_at = 0;
        self.req = Some(req_id);
    }

    /// Clears the entry back to its free-list form.
    pub fn reset(&mut self) {
        *self = DrbEntry::default();
    }

    /// Request kind; valid only on occupied entries.
    #[inline]
    pub fn req_kind(&self) -> MemReqKind {
        self.kind.expect("kind read from a free buffer entry")
    }
}

/// Fixed-capacity request buffer for one bank.
pub struct RequestBuffer {
    entries: Vec<DrbEntry>,
    free: Vec<usize>,
    pending: VecDeque<usize>,
}

impl RequestBuffer {
    /// Creates a buffer with `capacity` entries, all free.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "request buffer capacity must be nonzero");
        Self {
            entries: (0..capacity).map(|_| DrbEntry::default()).collect(),
            free: (0..capacity).rev().collect(),
            pending: VecDeque::with_capacity(capacity),
        }
    }

    /// Returns the total entry count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of free entries.
    #[inline]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Returns true if no entry is free.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Returns the number of queued entries.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if the pending queue is empty.
    #[inline]
    pub fn pending_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Takes an entry off the free list, or `None` when the buffer is full.
    ///
    /// The entry is not queued until [`RequestBuffer::push_pending`].
    pub fn try_acquire(&mut self) -> Option<usize> {
        self.free.pop()
    }

    /// Resets an entry and returns it to the free list.
    pub fn release(&mut self, idx: usize) {
        debug_assert!(!self.free.contains(&idx), "double release of entry {idx}");
        self.entries[idx].reset();
        self.free.push(idx);
    }

    /// Appends an entry to the back of the pending queue.
    pub fn push_pending(&mut self, idx: usize) {
        self.pending.push_back(idx);
    }

    /// Removes an entry from anywhere in the pending queue.
    pub fn remove_pending(&mut self, idx: usize) {
        let pos = self
            .pending
            .iter()
            .position(|&i| i == idx)
            .expect("entry not in the pending queue");
        self.pending.remove(pos);
    }

    /// Returns the index at the front of the pending queue.
    pub fn pending_front(&self) -> Option<usize> {
        self.pending.front().copied()
    }

    /// Iterates pending entry indices in queue order.
    pub fn pending(&self) -> impl Iterator<Item = usize> + '_ {
        self.pending.iter().copied()
    }

    /// Iterates free entry indices.
    pub fn free(&self) -> impl Iterator<Item = usize> + '_ {
        self.free.iter().copied()
    }

    /// Stable-sorts the pending queue with a comparator over entries.
    pub fn sort_pending_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&DrbEntry, &DrbEntry) -> std::cmp::Ordering,
    {
        let mut order: Vec<usize> = self.pending.iter().copied().collect();
        order.sort_by(|&a, &b| cmp(&self.entries[a], &self.entries[b]));
        self.pending.clear();
        self.pending.extend(order);
    }

    /// Returns an entry by arena index.
    #[inline]
    pub fn entry(&self, idx: usize) -> &DrbEntry {
        &self.entries[idx]
    }

    /// Returns an entry by arena index, mutably.
    #[inline]
    pub fn entry_mut(&mut self, idx: usize) -> &mut DrbEntry {
        &mut self.entries[idx]
    }
}
