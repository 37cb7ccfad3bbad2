//! Starvation Watchdog Tests.
//!
//! Verifies liveness detection: a controller holding requests that cannot
//! retire aborts after the starvation limit with a diagnostic dump, while
//! normal forward progress keeps resetting the counter.

use crate::common::harness::{TestContext, unit_config};
use memsim_core::dram::controller::STARVATION_LIMIT;
use memsim_core::mem::MemReqKind;
use std::panic::{AssertUnwindSafe, catch_unwind};

#[test]
fn wedged_interconnect_aborts_with_a_dump() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("bug_detect_dram.out");

    let mut cfg = unit_config();
    cfg.dram.bug_file = dump.to_str().unwrap().to_string();
    let mut ctx = TestContext::with_config(cfg);

    ctx.noc.set_fill_credits(Some(0));
    ctx.insert(0x1000, MemReqKind::Dfetch);

    let result = catch_unwind(AssertUnwindSafe(|| {
        ctx.run(STARVATION_LIMIT + 100);
    }));
    assert!(result.is_err(), "the watchdog must abort the run");

    let text = std::fs::read_to_string(&dump).expect("diagnostic dump written");
    assert!(text.contains("Total req:1"));
    assert!(text.contains("DBUS[0]"));
    assert!(text.contains("bank[0]"));
    assert!(text.contains("DRAM_DATA_WAIT"), "the stuck entry is mid-transfer");
}

#[test]
fn abort_happens_just_past_the_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = unit_config();
    cfg.dram.bug_file = dir.path().join("dump.out").to_str().unwrap().to_string();
    let mut ctx = TestContext::with_config(cfg);

    ctx.noc.set_fill_credits(Some(0));
    ctx.insert(0x1000, MemReqKind::Dfetch);

    // One cycle short of the limit: still alive.
    ctx.run(STARVATION_LIMIT - 1);
    assert_eq!(ctx.mc.starvation_cycles(), STARVATION_LIMIT - 1);

    let result = catch_unwind(AssertUnwindSafe(|| ctx.tick()));
    assert!(result.is_err());
}

#[test]
fn forward_progress_resets_the_counter() {
    let mut ctx = TestContext::new();
    ctx.insert(0x1000, MemReqKind::Dfetch);

    // The request waits ~25 cycles before retiring; the counter climbs and
    // then clears on completion.
    ctx.run(20);
    assert!(ctx.mc.starvation_cycles() > 0);

    ctx.run(20);
    assert_eq!(ctx.mc.total_requests(), 0);
    assert_eq!(ctx.mc.starvation_cycles(), 0);
}

#[test]
fn dump_is_also_available_on_demand() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("state.out");

    let mut cfg = unit_config();
    cfg.dram.bug_file = dump.to_str().unwrap().to_string();
    let mut ctx = TestContext::with_config(cfg);

    ctx.insert(0x1000, MemReqKind::Dfetch);
    ctx.run(3);
    ctx.mc.dump_state();

    let text = std::fs::read_to_string(&dump).unwrap();
    assert!(text.contains("Current cycle:3"));
    assert!(text.contains("DRAM_CMD_WAIT"));
}
