//! Deterministic synthetic request generation.
//!
//! The generator produces a reproducible request stream with tunable row
//! locality and a fixed type mix. Randomness comes from a seeded xorshift
//! state rather than an external RNG crate so that cycle-exact tests and
//! repeated CLI runs see identical traces.

use crate::common::{Cycle, MemLevel};
use crate::mem::{MemReq, MemReqKind, MemState};

/// Synthetic request source with row-locality bias.
pub struct TraceGen {
    state: u64,
    last_addr: u64,
    line_size: u64,
    num_cores: u32,
}

impl TraceGen {
    /// Creates a generator; equal seeds produce equal streams.
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed | 1,
            last_addr: 0,
            line_size: 64,
            num_cores: 4,
        }
    }

    /// xorshift64 step.
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }

    /// Possibly emits one request this cycle (about one in four cycles).
    pub fn maybe_request(&mut self, _now: Cycle) -> Option<MemReq> {
        if self.next_below(4) != 0 {
            return None;
        }
        Some(self.request())
    }

    /// Emits the next request in the stream unconditionally.
    pub fn request(&mut self) -> MemReq {
        // Half the stream stays near the previous address for row locality.
        let addr = if self.next_below(2) == 0 {
            (self.last_addr & !0x7FF) | (self.next_below(32) * self.line_size)
        } else {
            self.next_below(1 << 28) & !(self.line_size - 1)
        };
        self.last_addr = addr;

        let kind = match self.next_below(100) {
            0..=49 => MemReqKind::Dfetch,
            50..=64 => MemReqKind::Ifetch,
            65..=84 => MemReqKind::Wb,
            _ => MemReqKind::Dprf,
        };
        let core_id = self.next_below(self.num_cores as u64) as u32;
        let is_gpu = self.next_below(4) == 0;

        MemReq {
            id: 0,
            addr,
            size: self.line_size as u32,
            kind,
            core_id,
            thread_id: 0,
            app_id: 0,
            is_gpu,
            cache_id: [0; MemLevel::COUNT],
            state: MemState::New,
        }
    }
}
