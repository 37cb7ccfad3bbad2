//! Host-side simulation driver.
//!
//! This module provides what a host simulator supplies around the
//! controller: a request pool, a driver that owns the shared clock and
//! retires fills, and a deterministic trace generator for standalone runs.

/// Slab-backed request pool implementing the hierarchy seam.
pub mod pool;

/// Standalone driver owning clock, pool, interconnect, and controller.
pub mod simulator;

/// Deterministic synthetic request generation.
pub mod trace;

pub use pool::ReqPool;
pub use simulator::Simulator;
