//! Cycle-accurate DRAM memory-controller model.
//!
//! This crate models a DRAM controller inside a heterogeneous (CPU + GPU)
//! architectural simulator, one host clock cycle at a time:
//! 1. **Decoding:** Physical address to (channel, bank, row, column), with optional XOR interleaving.
//! 2. **Banks:** Bounded per-bank request buffers and the ACTIVATE/COLUMN/PRECHARGE state machine.
//! 3. **Channels:** Command arbitration and shared data-bus scheduling with sub-width packing.
//! 4. **Policies:** FCFS and FR-FCFS request scheduling, selected at construction.
//! 5. **Completion:** Same-address merging, fill dispatch to the interconnect, and a starvation watchdog.
//!
//! The interconnect, the request pool, and the global clock are external
//! collaborators injected at construction or passed into each tick.

/// Common types (cycles, node ids, hierarchy levels).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// DRAM controller model (decoder, buffers, banks, channels, policies).
pub mod dram;
/// External request model and the memory hierarchy seam.
pub mod mem;
/// Interconnect seam and the queue-backed stand-in fabric.
pub mod noc;
/// Host-side driver: request pool, clock owner, trace generation.
pub mod sim;
/// Controller statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// The DRAM controller; construct with `DramController::new` and tick with `run_a_cycle`.
pub use crate::dram::DramController;
/// Standalone driver owning the controller and its collaborators.
pub use crate::sim::Simulator;
