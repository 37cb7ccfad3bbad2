//! Configuration system for the memory-controller simulator.
//!
//! This module defines all configuration structures and enums used to
//! parameterize the model. It provides:
//! 1. **Defaults:** Baseline DRAM geometry, timing, and clock constants.
//! 2. **Structures:** Hierarchical config for the controller, clock domains, and hierarchy glue.
//! 3. **Enums:** The request scheduling policy selector.
//!
//! Configuration is supplied as JSON from the host simulator or built with
//! `Config::default()` for the CLI.

use serde::Deserialize;

/// Default configuration constants for the simulator.
///
/// These values define the baseline controller configuration when not
/// explicitly overridden in a JSON configuration file.
mod defaults {
    /// Total number of DRAM banks across the controller.
    pub const NUM_BANKS: usize = 16;

    /// Number of channels; banks are divided evenly across channels.
    pub const NUM_CHANNELS: usize = 2;

    /// Request buffer entries per bank (pending + free).
    pub const BUFFER_SIZE: usize = 32;

    /// Data bus width in bytes per DRAM half-cycle.
    pub const BUS_WIDTH: u64 = 8;

    /// Data rate multiplier applied to the bus width (2 = DDR).
    pub const DDR_FACTOR: u64 = 2;

    /// Row buffer size in bytes; also the column address mask width.
    pub const ROWBUFFER_SIZE: u64 = 2048;

    /// Precharge (row close) latency in DRAM cycles.
    pub const PRECHARGE: u64 = 14;

    /// Activate (row open) latency in DRAM cycles.
    pub const ACTIVATE: u64 = 14;

    /// Column access latency in DRAM cycles.
    pub const COLUMN: u64 = 11;

    /// CPU core clock frequency in GHz.
    pub const CPU_FREQUENCY: f64 = 3.0;

    /// GPU core clock frequency in GHz.
    pub const GPU_FREQUENCY: f64 = 1.5;

    /// DRAM clock frequency in GHz.
    pub const DRAM_FREQUENCY: f64 = 0.8;

    /// Last-level cache line size in bytes; feeds the XOR permutation shift.
    pub const L3_LINE_SIZE: u64 = 64;

    /// Diagnostic file written when the controller stops making progress.
    pub const BUG_FILE: &str = "bug_detect_dram.out";
}

/// Request scheduling policy types.
///
/// Selects how an idle bank picks the next request from its pending buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// First-Come First-Served: always the oldest pending request.
    Fcfs,
    /// First-Ready FCFS: demand over prefetch, then row-buffer hits, then age.
    #[default]
    #[serde(alias = "FRFCFS")]
    FrFcfs,
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// Deserializing from JSON (typical host-simulator usage):
///
/// ```
/// use memsim_core::config::{Config, SchedulerKind};
///
/// let json = r#"{
///     "dram": {
///         "num_banks": 8,
///         "num_channels": 1,
///         "buffer_size": 16,
///         "scheduler": "fcfs",
///         "bank_xor_index": true
///     },
///     "clocks": {
///         "cpu_frequency": 2.0,
///         "gpu_frequency": 1.0,
///         "dram_frequency": 1.0
///     },
///     "hierarchy": {
///         "l3_line_size": 64
///     }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.dram.num_banks, 8);
/// assert_eq!(config.dram.scheduler, SchedulerKind::Fcfs);
/// assert_eq!(config.dram.rowbuffer_size, 2048);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// DRAM controller geometry, timing, and feature knobs.
    #[serde(default)]
    pub dram: DramConfig,
    /// Clock domain frequencies.
    #[serde(default)]
    pub clocks: ClockConfig,
    /// Memory hierarchy glue parameters.
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
}

/// DRAM controller configuration.
///
/// Covers bank/channel geometry, the data bus, DRAM-cycle command latencies,
/// and the controller feature knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct DramConfig {
    /// Total banks across the controller.
    #[serde(default = "DramConfig::default_num_banks")]
    pub num_banks: usize,

    /// Channels; banks are divided evenly across channels.
    #[serde(default = "DramConfig::default_num_channels")]
    pub num_channels: usize,

    /// Request buffer entries per bank.
    #[serde(default = "DramConfig::default_buffer_size")]
    pub buffer_size: usize,

    /// Bus width in bytes per DRAM half-cycle.
    #[serde(default = "DramConfig::default_bus_width")]
    pub bus_width: u64,

    /// Data rate multiplier (2 = DDR).
    #[serde(default = "DramConfig::default_ddr_factor")]
    pub ddr_factor: u64,

    /// Row buffer size in bytes.
    #[serde(default = "DramConfig::default_rowbuffer_size")]
    pub rowbuffer_size: u64,

    /// Precharge latency in DRAM cycles.
    #[serde(default = "DramConfig::default_precharge")]
    pub precharge: u64,

    /// Activate latency in DRAM cycles.
    #[serde(default = "DramConfig::default_activate")]
    pub activate: u64,

    /// Column access latency in DRAM cycles.
    #[serde(default = "DramConfig::default_column")]
    pub column: u64,

    /// Enable permutation-based bank interleaving (XOR bank mapping).
    #[serde(default)]
    pub bank_xor_index: bool,

    /// Enable same-address request coalescing at completion.
    #[serde(default = "DramConfig::default_merge_requests")]
    pub merge_requests: bool,

    /// Request scheduling policy.
    #[serde(default)]
    pub scheduler: SchedulerKind,

    /// Diagnostic dump file written on a starvation abort.
    #[serde(default = "DramConfig::default_bug_file")]
    pub bug_file: String,
}

impl DramConfig {
    /// Returns the default total bank count.
    fn default_num_banks() -> usize {
        defaults::NUM_BANKS
    }

    /// Returns the default channel count.
    fn default_num_channels() -> usize {
        defaults::NUM_CHANNELS
    }

    /// Returns the default per-bank buffer capacity.
    fn default_buffer_size() -> usize {
        defaults::BUFFER_SIZE
    }

    /// Returns the default bus width in bytes.
    fn default_bus_width() -> u64 {
        defaults::BUS_WIDTH
    }

    /// Returns the default data rate multiplier.
    fn default_ddr_factor() -> u64 {
        defaults::DDR_FACTOR
    }

    /// Returns the default row buffer size in bytes.
    fn default_rowbuffer_size() -> u64 {
        defaults::ROWBUFFER_SIZE
    }

    /// Returns the default precharge latency in DRAM cycles.
    fn default_precharge() -> u64 {
        defaults::PRECHARGE
    }

    /// Returns the default activate latency in DRAM cycles.
    fn default_activate() -> u64 {
        defaults::ACTIVATE
    }

    /// Returns the default column access latency in DRAM cycles.
    fn default_column() -> u64 {
        defaults::COLUMN
    }

    /// Merging is on in the reference configuration.
    fn default_merge_requests() -> bool {
        true
    }

    /// Returns the default starvation diagnostic file name.
    fn default_bug_file() -> String {
        defaults::BUG_FILE.to_string()
    }
}

impl Default for DramConfig {
    fn default() -> Self {
        Self {
            num_banks: defaults::NUM_BANKS,
            num_channels: defaults::NUM_CHANNELS,
            buffer_size: defaults::BUFFER_SIZE,
            bus_width: defaults::BUS_WIDTH,
            ddr_factor: defaults::DDR_FACTOR,
            rowbuffer_size: defaults::ROWBUFFER_SIZE,
            precharge: defaults::PRECHARGE,
            activate: defaults::ACTIVATE,
            column: defaults::COLUMN,
            bank_xor_index: false,
            merge_requests: true,
            scheduler: SchedulerKind::default(),
            bug_file: defaults::BUG_FILE.to_string(),
        }
    }
}

/// Clock domain configuration.
///
/// The controller runs on the host (CPU) clock; DRAM-cycle latencies are
/// converted per request into CPU or GPU cycles using these frequencies.
#[derive(Debug, Clone, Deserialize)]
pub struct ClockConfig {
    /// CPU core frequency in GHz.
    #[serde(default = "ClockConfig::default_cpu_frequency")]
    pub cpu_frequency: f64,

    /// GPU core frequency in GHz.
    #[serde(default = "ClockConfig::default_gpu_frequency")]
    pub gpu_frequency: f64,

    /// DRAM frequency in GHz.
    #[serde(default = "ClockConfig::default_dram_frequency")]
    pub dram_frequency: f64,
}

impl ClockConfig {
    /// Returns the default CPU frequency in GHz.
    fn default_cpu_frequency() -> f64 {
        defaults::CPU_FREQUENCY
    }

    /// Returns the default GPU frequency in GHz.
    fn default_gpu_frequency() -> f64 {
        defaults::GPU_FREQUENCY
    }

    /// Returns the default DRAM frequency in GHz.
    fn default_dram_frequency() -> f64 {
        defaults::DRAM_FREQUENCY
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            cpu_frequency: defaults::CPU_FREQUENCY,
            gpu_frequency: defaults::GPU_FREQUENCY,
            dram_frequency: defaults::DRAM_FREQUENCY,
        }
    }
}

/// Memory hierarchy glue configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HierarchyConfig {
    /// Last-level cache line size in bytes (XOR permutation shift input).
    #[serde(default = "HierarchyConfig::default_l3_line_size")]
    pub l3_line_size: u64,
}

impl HierarchyConfig {
    /// Returns the default L3 line size in bytes.
    fn default_l3_line_size() -> u64 {
        defaults::L3_LINE_SIZE
    }
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            l3_line_size: defaults::L3_LINE_SIZE,
        }
    }
}
