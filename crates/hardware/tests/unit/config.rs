//! Configuration Unit Tests.
//!
//! Verifies the built-in defaults and JSON deserialization, including the
//! scheduler selector aliases and partial configuration files.

use memsim_core::config::{Config, SchedulerKind};

#[test]
fn defaults_describe_the_reference_controller() {
    let cfg = Config::default();
    assert_eq!(cfg.dram.num_banks % cfg.dram.num_channels, 0);
    assert!(cfg.dram.rowbuffer_size.is_power_of_two());
    assert_eq!(cfg.dram.scheduler, SchedulerKind::FrFcfs);
    assert!(cfg.dram.merge_requests);
    assert!(!cfg.dram.bank_xor_index);
    assert_eq!(cfg.dram.bug_file, "bug_detect_dram.out");
}

#[test]
fn empty_json_equals_defaults() {
    let cfg: Config = serde_json::from_str("{}").unwrap();
    let def = Config::default();
    assert_eq!(cfg.dram.num_banks, def.dram.num_banks);
    assert_eq!(cfg.dram.buffer_size, def.dram.buffer_size);
    assert_eq!(cfg.clocks.cpu_frequency, def.clocks.cpu_frequency);
    assert_eq!(cfg.hierarchy.l3_line_size, def.hierarchy.l3_line_size);
}

#[test]
fn partial_sections_keep_unset_fields_at_defaults() {
    let cfg: Config = serde_json::from_str(
        r#"{ "dram": { "num_banks": 4, "num_channels": 4 } }"#,
    )
    .unwrap();
    assert_eq!(cfg.dram.num_banks, 4);
    assert_eq!(cfg.dram.num_channels, 4);
    assert_eq!(cfg.dram.rowbuffer_size, Config::default().dram.rowbuffer_size);
}

#[test]
fn scheduler_accepts_lowercase_and_alias() {
    let cfg: Config =
        serde_json::from_str(r#"{ "dram": { "scheduler": "fcfs" } }"#).unwrap();
    assert_eq!(cfg.dram.scheduler, SchedulerKind::Fcfs);

    let cfg: Config =
        serde_json::from_str(r#"{ "dram": { "scheduler": "frfcfs" } }"#).unwrap();
    assert_eq!(cfg.dram.scheduler, SchedulerKind::FrFcfs);

    let cfg: Config =
        serde_json::from_str(r#"{ "dram": { "scheduler": "FRFCFS" } }"#).unwrap();
    assert_eq!(cfg.dram.scheduler, SchedulerKind::FrFcfs);
}

#[test]
fn unknown_scheduler_is_rejected() {
    let result =
        serde_json::from_str::<Config>(r#"{ "dram": { "scheduler": "banked" } }"#);
    assert!(result.is_err());
}
