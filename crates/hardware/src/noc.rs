//! Interconnect seam and a queue-backed implementation.
//!
//! This module defines how the controller talks to the network-on-chip. It
//! provides:
//! 1. **Message kinds:** Requests travelling toward a controller and fills travelling back.
//! 2. **`Interconnect` trait:** Non-blocking injection plus peek-then-consume delivery.
//! 3. **`QueueNoc`:** Per-node FIFO queues with fill-credit backpressure controls.
//!
//! The fabric itself (topology, routing, link contention) is outside the
//! model; `QueueNoc` is the zero-latency stand-in used by the driver and the
//! test suite.

use std::collections::VecDeque;

use log::debug;

use crate::common::NodeId;
use crate::mem::ReqId;

/// Message classes exchanged with the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MsgKind {
    /// A memory request travelling to a controller terminal.
    Req,
    /// A completed read returning to its L3 home slice.
    Fill,
}

/// Non-blocking interconnect seam.
///
/// `insert` may refuse a message (backpressure); the caller keeps the
/// request and retries on a later cycle. Delivery is peek-then-consume so a
/// receiver that cannot accept a message this cycle leaves it queued.
pub trait Interconnect {
    /// Injects a message. Returns `false` when the fabric refuses it.
    fn insert(&mut self, src: NodeId, dst: NodeId, kind: MsgKind, req: ReqId) -> bool;

    /// Peeks the oldest message queued at `node` without consuming it.
    fn inbound(&self, node: NodeId) -> Option<ReqId>;

    /// Consumes the message previously returned by [`Interconnect::inbound`].
    fn pop_inbound(&mut self, node: NodeId);
}

/// Per-node FIFO queues standing in for the interconnect fabric.
///
/// Fill injection can be throttled with a credit count so tests and the
/// driver can model a saturated or wedged return path.
pub struct QueueNoc {
    queues: Vec<VecDeque<ReqId>>,
    fill_credits: Option<u64>,
    /// Fills refused due to exhausted credits.
    pub refused_fills: u64,
}

impl QueueNoc {
    /// Creates a fabric with `num_nodes` endpoints and unlimited credits.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            queues: (0..num_nodes).map(|_| VecDeque::new()).collect(),
            fill_credits: None,
            refused_fills: 0,
        }
    }

    /// Limits the number of fills the fabric will still accept.
    ///
    /// `Some(0)` refuses every fill; `None` restores unlimited acceptance.
    pub fn set_fill_credits(&mut self, credits: Option<u64>) {
        self.fill_credits = credits;
    }

    /// Returns the number of messages queued at `node`.
    pub fn queued(&self, node: NodeId) -> usize {
        self.queues[node].len()
    }
}

impl Interconnect for QueueNoc {
    fn insert(&mut self, src: NodeId, dst: NodeId, kind: MsgKind, req: ReqId) -> bool {
        if kind == MsgKind::Fill {
            match self.fill_credits {
                Some(0) => {
                    self.refused_fills += 1;
                    debug!("noc: fill {:?} from {src} to {dst} refused", req);
                    return false;
                }
                Some(ref mut credits) => *credits -= 1,
                None => {}
            }
        }
        self.queues[dst].push_back(req);
        true
    }

    fn inbound(&self, node: NodeId) -> Option<ReqId> {
        self.queues[node].front().copied()
    }

    fn pop_inbound(&mut self, node: NodeId) {
        self.queues[node].pop_front();
    }
}
