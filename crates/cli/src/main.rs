//! Memory-controller simulator CLI.
//!
//! This binary drives a synthetic request trace through one DRAM controller
//! and prints the statistics report. Configuration comes from a JSON file or
//! the built-in defaults; logging is controlled through `RUST_LOG`
//! (e.g. `RUST_LOG=memsim_core::dram=debug`).

use clap::{Parser, Subcommand};
use std::{fs, process};

use memsim_core::Config;
use memsim_core::Simulator;

#[derive(Parser, Debug)]
#[command(
    name = "memsim",
    author,
    version,
    about = "Cycle-accurate DRAM memory-controller simulator",
    long_about = "Drive a synthetic request trace through a DRAM controller model.\n\n\
        Examples:\n  \
        memsim run --cycles 200000\n  \
        memsim run --config dram.json --seed 7 --requests 50000\n  \
        memsim run --stats summary --stats latency"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a synthetic trace and print statistics.
    Run {
        /// JSON configuration file (defaults are used when omitted).
        #[arg(short, long)]
        config: Option<String>,

        /// Maximum number of host cycles to simulate.
        #[arg(long, default_value_t = 1_000_000)]
        cycles: u64,

        /// Trace generator seed.
        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// Number of requests to source.
        #[arg(long, default_value_t = 100_000)]
        requests: u64,

        /// Statistics sections to print (repeatable); all when omitted.
        #[arg(long)]
        stats: Vec<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            config,
            cycles,
            seed,
            requests,
            stats,
        }) => cmd_run(config, cycles, seed, requests, stats),
        None => {
            eprintln!("memsim: pass a subcommand");
            eprintln!();
            eprintln!("  memsim run --cycles <N>          Run a synthetic trace");
            eprintln!("  memsim run --config <cfg.json>   Run with a JSON config");
            eprintln!();
            eprintln!("  memsim --help  for full options");
            process::exit(1);
        }
    }
}

/// Loads the configuration, runs the driver, and prints the report.
fn cmd_run(config: Option<String>, cycles: u64, seed: u64, requests: u64, stats: Vec<String>) {
    let cfg = match config {
        Some(path) => {
            let text = fs::read_to_string(&path).unwrap_or_else(|e| {
                eprintln!("Error reading config {}: {}", path, e);
                process::exit(1);
            });
            serde_json::from_str::<Config>(&text).unwrap_or_else(|e| {
                eprintln!("Error parsing config {}: {}", path, e);
                process::exit(1);
            })
        }
        None => Config::default(),
    };

    println!(
        "Configuration: {} banks / {} channels, {:?} scheduler, merge: {}",
        cfg.dram.num_banks, cfg.dram.num_channels, cfg.dram.scheduler, cfg.dram.merge_requests
    );
    println!("Trace: seed {}  requests {}  cycle budget {}", seed, requests, cycles);
    println!();

    let mut sim = Simulator::new(&cfg, seed, requests);
    sim.run(cycles);

    println!(
        "[*] {} cycles simulated, {} fills retired, {} requests freed",
        sim.now(),
        sim.retired,
        sim.pool.freed
    );
    if !sim.done() {
        println!("[!] cycle budget exhausted with requests still in flight");
    }
    sim.mc.stats.print_sections(&stats);
}
