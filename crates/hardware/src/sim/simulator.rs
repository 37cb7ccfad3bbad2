//! Standalone driver: clock, pool, interconnect, and one controller.
//!
//! The driver plays the role of the surrounding system: it sources synthetic
//! requests into the controller's terminal, advances the shared clock, and
//! retires fills arriving at the L3 node, freeing their requests. This is
//! the loop the CLI runs; integration tests drive the controller directly.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::common::{Cycle, NodeId};
use crate::config::Config;
use crate::dram::DramController;
use crate::mem::MemoryHierarchy;
use crate::noc::{Interconnect, MsgKind, QueueNoc};
use crate::sim::pool::ReqPool;
use crate::sim::trace::TraceGen;

/// Interconnect node of the controller terminal.
pub const MC_NODE: NodeId = 0;
/// Interconnect node of the (single) L3 slice fills return to.
pub const L3_NODE: NodeId = 1;

/// Top-level simulator: shared clock plus the controller's collaborators.
pub struct Simulator {
    clock: Arc<AtomicU64>,
    /// Request pool (the memory hierarchy seam).
    pub pool: ReqPool,
    /// Interconnect fabric between the trace source, controller, and L3.
    pub noc: QueueNoc,
    /// The controller under simulation.
    pub mc: DramController,
    trace: TraceGen,
    remaining: u64,
    /// Fills consumed at the L3 node. Writebacks retire inside the
    /// controller and show up in `pool.freed` instead.
    pub retired: u64,
}

impl Simulator {
    /// Creates a driver that will source `requests` trace requests.
    pub fn new(cfg: &Config, seed: u64, requests: u64) -> Self {
        let clock = Arc::new(AtomicU64::new(0));
        Self {
            mc: DramController::new(cfg, 0, MC_NODE, clock.clone()),
            clock,
            pool: ReqPool::new(L3_NODE),
            noc: QueueNoc::new(2),
            trace: TraceGen::new(seed),
            remaining: requests,
            retired: 0,
        }
    }

    /// Current host cycle.
    pub fn now(&self) -> Cycle {
        self.clock.load(Ordering::Relaxed)
    }

    /// Returns whether every sourced request has been retired.
    pub fn done(&self) -> bool {
        self.remaining == 0 && self.mc.total_requests() == 0 && self.pool.in_flight() == 0
    }

    /// Advances the whole system by one cycle.
    pub fn tick(&mut self) {
        let now = self.now();

        // Source at most one new request per cycle toward the controller.
        if self.remaining > 0 {
            if let Some(req) = self.trace.maybe_request(now) {
                let id = self.pool.alloc(req);
                self.noc.insert(L3_NODE, MC_NODE, MsgKind::Req, id);
                self.remaining -= 1;
            }
        }

        self.mc.run_a_cycle(&mut self.pool, &mut self.noc);

        // Retire fills: the upstream hierarchy consumes them immediately.
        while let Some(fill) = self.noc.inbound(L3_NODE) {
            self.noc.pop_inbound(L3_NODE);
            let core_id = self.pool.req(fill).core_id;
            self.pool.free_req(core_id, fill);
            self.retired += 1;
        }

        self.clock.fetch_add(1, Ordering::Relaxed);
    }

    /// Runs for at most `cycles`, stopping early once all requests retired.
    pub fn run(&mut self, cycles: u64) {
        for _ in 0..cycles {
            if self.done() {
                break;
            }
            self.tick();
        }
    }
}
