// SPDX-License-Identifier: Apache-2.0
//! qtile command-line interface.
//!
//! ```text
//!   qtile run  --qubits 3 --wire 1            apply H on wire 1, print the state
//!   qtile run  --qubits 2 --wire 0 --emulate  same, on the in-process tile emulator
//!   qtile info --kwargs "{'use_fpga': False}" resolved configuration and capabilities
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{info, run};

/// qtile - statevector device with tile-array Hadamard offload
#[derive(Parser)]
#[command(name = "qtile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that builds a device.
#[derive(Args, Debug, Clone, Default)]
pub struct DeviceArgs {
    /// Device kwargs (JSON object or dict literal)
    #[arg(short, long, default_value = "")]
    pub kwargs: String,

    /// JSON configuration file (kwargs are applied on top)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Bitstream image for the tile array
    #[arg(long, env = "QTILE_BITSTREAM")]
    pub bitstream: Option<PathBuf>,

    /// Use the in-process tile emulator
    #[arg(long)]
    pub emulate: bool,

    /// Run on the CPU only
    #[arg(long, conflicts_with = "emulate")]
    pub cpu: bool,

    /// Per-gate accelerator timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate qubits, apply Hadamards and print the final state
    Run {
        /// Number of qubits to allocate
        #[arg(short = 'n', long, default_value = "1")]
        qubits: usize,

        /// Wire to apply a Hadamard on (repeatable, applied in order)
        #[arg(short, long = "wire")]
        wires: Vec<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Show the resolved configuration and device capabilities
    Info {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        device: DeviceArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Run {
            qubits,
            wires,
            json,
            device,
        } => run::execute(&device, qubits, &wires, json),
        Commands::Info { json, device } => info::execute(&device, json),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_repeated_wires() {
        let cli = Cli::try_parse_from([
            "qtile", "run", "-n", "3", "--wire", "1", "-w", "0", "--emulate",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                qubits,
                wires,
                device,
                json,
            } => {
                assert_eq!(qubits, 3);
                assert_eq!(wires, vec![1, 0]);
                assert!(device.emulate);
                assert!(!json);
            }
            Commands::Info { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_verbosity_is_global() {
        let cli = Cli::try_parse_from(["qtile", "info", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cpu_conflicts_with_emulate() {
        assert!(Cli::try_parse_from(["qtile", "run", "--cpu", "--emulate"]).is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(Cli::try_parse_from(["qtile", "compile"]).is_err());
    }
}
