//! External memory-request model and the hierarchy seam.
//!
//! This module defines the interface between the controller and the memory
//! hierarchy that owns the requests it services. It provides:
//! 1. **Request records:** Type, origin, and lifecycle state of an in-flight request.
//! 2. **Handles:** `ReqId`, the opaque handle the controller schedules by.
//! 3. **Hierarchy trait:** Request lookup, pool free, and fill destination lookup.

use crate::common::{MemLevel, NodeId};

/// Opaque handle to a request owned by the external request pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReqId(pub usize);

/// Memory request types as issued by the cores and caches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemReqKind {
    /// Instruction fetch.
    Ifetch,
    /// Data fetch (demand load).
    Dfetch,
    /// Data store.
    Dstore,
    /// Hardware instruction prefetch.
    Iprf,
    /// Hardware data prefetch.
    Dprf,
    /// Writeback of a dirty line.
    Wb,
    /// Software data prefetch.
    SwDprf,
    /// Software prefetch, non-temporal hint.
    SwDprfNta,
    /// Software prefetch, T0 hint.
    SwDprfT0,
    /// Software prefetch, T1 hint.
    SwDprfT1,
    /// Software prefetch, T2 hint.
    SwDprfT2,
}

impl MemReqKind {
    /// Returns whether this request reads DRAM. Only writebacks are writes.
    #[inline]
    pub fn is_read(self) -> bool {
        !matches!(self, MemReqKind::Wb)
    }

    /// Returns whether this request is a discardable hardware data prefetch.
    ///
    /// Only `Dprf` entries are evicted by the buffer-full flush and demoted
    /// by the first-ready scheduler; software prefetches carry program
    /// semantics and are treated as demand requests.
    #[inline]
    pub fn is_flushable_prefetch(self) -> bool {
        matches!(self, MemReqKind::Dprf)
    }

    /// Scheduling priority for this request type.
    ///
    /// The reference configuration gives every type equal priority; the
    /// field exists so a policy can weight types without changing the
    /// buffer format.
    #[inline]
    pub fn priority(self) -> i32 {
        0
    }

    /// Short display name used in logs and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            MemReqKind::Ifetch => "IFETCH",
            MemReqKind::Dfetch => "DFETCH",
            MemReqKind::Dstore => "DSTORE",
            MemReqKind::Iprf => "IPRF",
            MemReqKind::Dprf => "DPRF",
            MemReqKind::Wb => "WB",
            MemReqKind::SwDprf => "SW_DPRF",
            MemReqKind::SwDprfNta => "SW_DPRF_NTA",
            MemReqKind::SwDprfT0 => "SW_DPRF_T0",
            MemReqKind::SwDprfT1 => "SW_DPRF_T1",
            MemReqKind::SwDprfT2 => "SW_DPRF_T2",
        }
    }
}

/// Lifecycle state of a request while it traverses the DRAM controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MemState {
    /// Allocated by the pool, not yet accepted by a controller.
    #[default]
    New,
    /// Queued in a bank's pending buffer.
    DramStart,
    /// A DRAM command has been issued on its behalf.
    DramCmd,
    /// Its data transfer occupies the channel bus.
    DramData,
    /// Serviced; the fill has left the controller.
    DramDone,
}

/// A memory request as seen by the controller.
///
/// The record is owned by the external request pool; the controller reads it
/// at ingress, updates `state` as the request advances, and either frees it
/// (writebacks) or forwards its handle to the interconnect as a fill.
#[derive(Clone, Debug)]
pub struct MemReq {
    /// Pool-assigned unique id.
    pub id: u64,
    /// Physical byte address.
    pub addr: u64,
    /// Transfer size in bytes.
    pub size: u32,
    /// Request type.
    pub kind: MemReqKind,
    /// Core that issued the request.
    pub core_id: u32,
    /// Hardware thread on the issuing core.
    pub thread_id: u32,
    /// Application (workload) id.
    pub app_id: u32,
    /// Whether the request originates from the GPU clock domain.
    pub is_gpu: bool,
    /// Owning cache slice id per hierarchy level.
    pub cache_id: [u32; MemLevel::COUNT],
    /// Lifecycle state, updated by the controller.
    pub state: MemState,
}

/// Seam between the controller and the memory hierarchy that owns requests.
///
/// Implementors provide request storage (a pool the controller never
/// allocates from), the free path for retired writebacks and flushed
/// prefetches, and the home-node lookup used to route fills.
pub trait MemoryHierarchy {
    /// Returns the request behind a handle.
    fn req(&self, id: ReqId) -> &MemReq;

    /// Returns the request behind a handle, mutably.
    fn req_mut(&mut self, id: ReqId) -> &mut MemReq;

    /// Returns a serviced or discarded request to the pool.
    fn free_req(&mut self, core_id: u32, id: ReqId);

    /// Returns the interconnect node that homes the given cache slice.
    fn dst_id(&self, level: MemLevel, cache_id: u32) -> NodeId;
}
