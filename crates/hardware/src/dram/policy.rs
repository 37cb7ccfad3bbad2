//! Request scheduling policies.
//!
//! A policy picks which pending entry an idle bank services next. Policies
//! are swappable values selected from the configuration:
//! 1. **FCFS:** always the oldest pending request.
//! 2. **FR-FCFS:** demand requests over data prefetches, then row-buffer
//!    hits, then arrival order, via a stable sort of the pending queue.

use std::cmp::Ordering;

use crate::config::SchedulerKind;
use crate::dram::drb::{DrbEntry, RequestBuffer};

/// Selects the next entry an idle bank should service.
pub trait SchedulePolicy: Send {
    /// Picks an entry index from a nonempty pending queue.
    ///
    /// `open_row` is the bank's currently latched row, if any. The policy
    /// may reorder the pending queue but must not add or remove entries.
    fn select(&self, drb: &mut RequestBuffer, open_row: Option<u64>) -> usize;
}

/// Builds the policy object named by the configuration.
pub fn make_policy(kind: SchedulerKind) -> Box<dyn SchedulePolicy> {
    match kind {
        SchedulerKind::Fcfs => Box::new(Fcfs),
        SchedulerKind::FrFcfs => Box::new(FrFcfs),
    }
}

/// First-Come First-Served: service strictly in arrival order.
pub struct Fcfs;

impl SchedulePolicy for Fcfs {
    fn select(&self, drb: &mut RequestBuffer, _open_row: Option<u64>) -> usize {
        drb.pending_front().expect("schedule on an empty pending queue")
    }
}

/// First-Ready FCFS: prefer row-buffer hits, subject to aging.
pub struct FrFcfs;

impl SchedulePolicy for FrFcfs {
    fn select(&self, drb: &mut RequestBuffer, open_row: Option<u64>) -> usize {
        drb.sort_pending_by(|a, b| frfcfs_order(a, b, open_row));
        drb.pending_front().expect("schedule on an empty pending queue")
    }
}

/// FR-FCFS ranking: demand over prefetch, row hit over conflict, then age.
///
/// The sort driving this comparator is stable, so entries that tie on every
/// key keep their arrival order.
fn frfcfs_order(a: &DrbEntry, b: &DrbEntry, open_row: Option<u64>) -> Ordering {
    let a_prf = a.req_kind().is_flushable_prefetch();
    let b_prf = b.req_kind().is_flushable_prefetch();
    if a_prf != b_prf {
        return if a_prf { Ordering::Greater } else { Ordering::Less };
    }

    if let Some(open) = open_row {
        let a_hit = a.row_id == open;
        let b_hit = b.row_id == open;
        if a_hit != b_hit {
            return if a_hit { Ordering::Less } else { Ordering::Greater };
        }
    }

    a.inserted_at.cmp(&b.inserted_at)
}
