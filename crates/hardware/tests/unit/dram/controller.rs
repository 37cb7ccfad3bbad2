//! Controller End-to-End Tests.
//!
//! Drives whole requests through the controller with the unit
//! configuration: one bank, one channel, buffer 4, activate 10, column 5,
//! precharge 10, 8-byte bus, and every clock at the same frequency.
//!
//! With those parameters a cold 64-byte read inserted at cycle 0 runs:
//! selected at 0, ACTIVATE at 1 (ready 11), re-armed at 11, COLUMN at 12
//! (data available 17), bus granted at 17 (8 bus cycles), complete at 25.

use crate::common::harness::{TestContext, unit_config};
use crate::common::mocks::noc::MockNoc;
use memsim_core::DramController;
use memsim_core::common::MemLevel;
use memsim_core::config::SchedulerKind;
use memsim_core::dram::drb::DramState;
use memsim_core::mem::{MemReqKind, MemState, MemoryHierarchy, ReqId};
use memsim_core::noc::MsgKind;
use memsim_core::sim::ReqPool;
use memsim_core::sim::simulator::{L3_NODE, MC_NODE};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// ══════════════════════════════════════════════════════════
// 1. Cold read: ACTIVATE + COLUMN + burst
// ══════════════════════════════════════════════════════════

#[test]
fn cold_read_completes_after_activate_column_and_burst() {
    let mut ctx = TestContext::new();
    let req = ctx.insert(0x1000, MemReqKind::Dfetch);

    let (cycle, fill) = ctx.run_until_fill(100);
    assert_eq!(fill, req);
    assert_eq!(cycle, 25);

    assert_eq!(ctx.mc.stats.activates, 1);
    assert_eq!(ctx.mc.stats.columns, 1);
    assert_eq!(ctx.mc.stats.precharges, 0);
    assert_eq!(ctx.mc.stats.bandwidth_bytes, 64);
    assert_eq!(ctx.mc.total_requests(), 0);
    assert_eq!(ctx.mc.stats.latency_sum, 25);
}

#[test]
fn bank_walks_the_command_state_machine() {
    let mut ctx = TestContext::new();
    ctx.insert(0x1000, MemReqKind::Dfetch);
    let row = 0x1000 >> 11;

    // Selected in the first tick.
    ctx.tick();
    assert_eq!(ctx.mc.banks[0].current_state(), Some(DramState::Cmd));

    // ACTIVATE issued in the second tick.
    ctx.tick();
    assert_eq!(ctx.mc.banks[0].current_state(), Some(DramState::CmdWait));
    assert_eq!(ctx.mc.banks[0].open_row, Some(row));
    assert_eq!(ctx.mc.banks[0].bank_ready, Some(11));

    // Re-armed at 11, COLUMN at 12.
    ctx.run(11); // now = 13
    assert_eq!(ctx.mc.banks[0].current_state(), Some(DramState::Data));
    assert_eq!(ctx.mc.banks[0].data_avail, Some(17));

    // Bus granted at 17.
    ctx.run(5); // now = 18
    assert_eq!(ctx.mc.banks[0].current_state(), Some(DramState::DataWait));
    assert_eq!(ctx.mc.banks[0].data_ready, Some(25));

    // Complete at 25: entry recycled, row stays open.
    ctx.run(8); // now = 26
    assert_eq!(ctx.mc.banks[0].current, None);
    assert_eq!(ctx.mc.banks[0].open_row, Some(row));
    assert_eq!(ctx.mc.banks[0].drb.free_len(), 4);
}

#[test]
fn request_lifecycle_states_advance() {
    let mut ctx = TestContext::new();
    let req = ctx.insert(0x1000, MemReqKind::Dfetch);
    assert_eq!(ctx.pool.req(req).state, MemState::DramStart);

    ctx.run(2); // ACTIVATE issued
    assert_eq!(ctx.pool.req(req).state, MemState::DramCmd);

    ctx.run(16); // bus granted at 17
    assert_eq!(ctx.pool.req(req).state, MemState::DramData);

    ctx.run(8); // complete at 25
    assert_eq!(ctx.pool.req(req).state, MemState::DramDone);
}

// ══════════════════════════════════════════════════════════
// 2. Row-buffer locality
// ══════════════════════════════════════════════════════════

#[test]
fn second_read_to_open_row_pays_column_only() {
    let mut ctx = TestContext::new();
    let r1 = ctx.insert(0x1000, MemReqKind::Dfetch);
    ctx.tick();
    let r2 = ctx.insert(0x1040, MemReqKind::Dfetch);

    let (c1, f1) = ctx.run_until_fill(100);
    assert_eq!((c1, f1), (25, r1));

    // Selected at 25, COLUMN at 26 (no ACTIVATE), data at 31, release 39.
    let (c2, f2) = ctx.run_until_fill(100);
    assert_eq!((c2, f2), (39, r2));

    assert_eq!(ctx.mc.stats.activates, 1);
    assert_eq!(ctx.mc.stats.columns, 2);
    assert_eq!(ctx.mc.stats.precharges, 0);
}

#[test]
fn read_to_different_row_pays_precharge_activate_column() {
    let mut ctx = TestContext::new();
    let r1 = ctx.insert(0x0000, MemReqKind::Dfetch);
    ctx.tick();
    let r2 = ctx.insert(0x10_0000, MemReqKind::Dfetch);

    let (c1, f1) = ctx.run_until_fill(100);
    assert_eq!((c1, f1), (25, r1));

    // PRECHARGE at 26 (ready 36), ACTIVATE at 37 (ready 47), COLUMN at 48
    // (data 53), bus 53..61.
    let (c2, f2) = ctx.run_until_fill(100);
    assert_eq!((c2, f2), (61, r2));

    assert_eq!(ctx.mc.stats.precharges, 1);
    assert_eq!(ctx.mc.stats.activates, 2);
    assert_eq!(ctx.mc.stats.columns, 2);
}

// ══════════════════════════════════════════════════════════
// 3. Writebacks
// ══════════════════════════════════════════════════════════

#[test]
fn writeback_retires_internally_without_a_fill() {
    let mut ctx = TestContext::new();
    ctx.insert(0x2000, MemReqKind::Wb);

    assert!(ctx.run_until_idle(100));
    assert_eq!(ctx.mc.total_requests(), 0);
    assert_eq!(ctx.pool.freed, 1);
    assert_eq!(ctx.take_fill(), None);
    // The write still occupied the command machinery and the bus.
    assert_eq!(ctx.mc.stats.activates, 1);
    assert_eq!(ctx.mc.stats.columns, 1);
    assert_eq!(ctx.mc.stats.bandwidth_bytes, 64);
}

// ══════════════════════════════════════════════════════════
// 4. Clock-domain scaling
// ══════════════════════════════════════════════════════════

#[test]
fn gpu_requests_use_the_gpu_latency_scale() {
    let mut cfg = unit_config();
    cfg.clocks.cpu_frequency = 2.0; // CPU latencies double
    cfg.clocks.gpu_frequency = 1.0;

    let mut ctx = TestContext::with_config(cfg.clone());
    let (_, accepted) = ctx.try_insert(TestContext::make_req(0x1000, MemReqKind::Dfetch, true));
    assert!(accepted);
    ctx.run(2);
    assert_eq!(ctx.mc.banks[0].bank_ready, Some(1 + 10), "GPU activate at scale 1");
    let (cycle, _) = ctx.run_until_fill(200);
    assert_eq!(cycle, 25);

    let mut ctx = TestContext::with_config(cfg);
    ctx.insert(0x1000, MemReqKind::Dfetch);
    ctx.run(2);
    assert_eq!(ctx.mc.banks[0].bank_ready, Some(1 + 20), "CPU activate at scale 2");
    // ACTIVATE ready 21, COLUMN at 22 (data 32), 8 DRAM cycles = 16 host.
    let (cycle, _) = ctx.run_until_fill(200);
    assert_eq!(cycle, 48);
}

// ══════════════════════════════════════════════════════════
// 5. Scheduling policy selection
// ══════════════════════════════════════════════════════════

/// Opens row 0, then queues an older row-miss and a younger row-hit while
/// the first request is in flight. Returns the completion order of the two
/// queued requests as (second fill, third fill).
fn contended_fill_order(scheduler: SchedulerKind) -> (ReqId, ReqId, ReqId, ReqId) {
    let mut cfg = unit_config();
    cfg.dram.scheduler = scheduler;
    let mut ctx = TestContext::with_config(cfg);

    let ra = ctx.insert(0x0000, MemReqKind::Dfetch); // row 0
    ctx.run(3); // row 0 now open, rA in flight
    let rb = ctx.insert(0x0800, MemReqKind::Dfetch); // row 1, older
    ctx.tick();
    let ra2 = ctx.insert(0x0040, MemReqKind::Dfetch); // row 0, younger

    let (_, first) = ctx.run_until_fill(500);
    assert_eq!(first, ra);
    let (_, second) = ctx.run_until_fill(500);
    let (_, third) = ctx.run_until_fill(500);
    (rb, ra2, second, third)
}

#[test]
fn frfcfs_prefers_the_younger_row_hit() {
    let (rb, ra2, second, third) = contended_fill_order(SchedulerKind::FrFcfs);
    assert_eq!(second, ra2, "row hit overtakes the older row miss");
    assert_eq!(third, rb);
}

#[test]
fn fcfs_services_strictly_in_arrival_order() {
    let (rb, ra2, second, third) = contended_fill_order(SchedulerKind::Fcfs);
    assert_eq!(second, rb, "arrival order is preserved");
    assert_eq!(third, ra2);
}

// ══════════════════════════════════════════════════════════
// 6. Fill routing
// ══════════════════════════════════════════════════════════

#[test]
fn fill_is_routed_to_the_requests_l3_home_node() {
    let cfg = unit_config();
    let clock = Arc::new(AtomicU64::new(0));
    let mut mc = DramController::new(&cfg, 0, MC_NODE, clock.clone());
    let mut pool = ReqPool::new(L3_NODE);

    let mut req = TestContext::make_req(0x1000, MemReqKind::Dfetch, false);
    req.cache_id[MemLevel::L3.idx()] = 2;
    let id = pool.alloc(req);
    assert!(mc.insert_new_req(id, &mut pool));

    let mut noc = MockNoc::new();
    noc.expect_inbound().return_const(None);
    noc.expect_insert()
        .withf(move |&src, &dst, &kind, &fill| {
            src == MC_NODE && dst == L3_NODE + 2 && kind == MsgKind::Fill && fill == id
        })
        .times(1)
        .return_const(true);

    for _ in 0..40 {
        mc.run_a_cycle(&mut pool, &mut noc);
        clock.fetch_add(1, Ordering::Relaxed);
    }
    assert_eq!(mc.total_requests(), 0);
}
