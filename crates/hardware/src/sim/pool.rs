//! Slab-backed request pool.
//!
//! The pool owns every in-flight request and hands out `ReqId` handles. It
//! also implements the destination lookup: L3 slices map onto consecutive
//! interconnect nodes starting at a configured base.

use crate::common::{MemLevel, NodeId};
use crate::mem::{MemReq, MemoryHierarchy, ReqId};

/// Request pool: a fixed-role allocator for `MemReq` records.
pub struct ReqPool {
    slots: Vec<Option<MemReq>>,
    free: Vec<usize>,
    next_req_id: u64,
    l3_node_base: NodeId,
    /// Requests returned to the pool over the run.
    pub freed: u64,
}

impl ReqPool {
    /// Creates an empty pool whose L3 slice `i` lives at node
    /// `l3_node_base + i`.
    pub fn new(l3_node_base: NodeId) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            next_req_id: 0,
            l3_node_base,
            freed: 0,
        }
    }

    /// Allocates a request, assigning it the next pool id.
    pub fn alloc(&mut self, mut req: MemReq) -> ReqId {
        req.id = self.next_req_id;
        self.next_req_id += 1;

        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(req);
                ReqId(slot)
            }
            None => {
                self.slots.push(Some(req));
                ReqId(self.slots.len() - 1)
            }
        }
    }

    /// Returns the number of live (not yet freed) requests.
    pub fn in_flight(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

impl MemoryHierarchy for ReqPool {
    fn req(&self, id: ReqId) -> &MemReq {
        self.slots[id.0].as_ref().expect("stale request handle")
    }

    fn req_mut(&mut self, id: ReqId) -> &mut MemReq {
        self.slots[id.0].as_mut().expect("stale request handle")
    }

    fn free_req(&mut self, _core_id: u32, id: ReqId) {
        assert!(self.slots[id.0].is_some(), "double free of request handle");
        self.slots[id.0] = None;
        self.free.push(id.0);
        self.freed += 1;
    }

    fn dst_id(&self, level: MemLevel, cache_id: u32) -> NodeId {
        debug_assert_eq!(level, MemLevel::L3, "only L3 slices home fills");
        self.l3_node_base + cache_id as usize
    }
}
