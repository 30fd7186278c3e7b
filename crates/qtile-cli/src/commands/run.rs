// SPDX-License-Identifier: Apache-2.0
//! Run command implementation.

use anyhow::{Context, Result};
use console::style;
use serde::Serialize;

use qtile_device::{DispatchStats, GateRequest, QuantumDevice};
use qtile_sim::Complex64;

use super::common::build_device;
use crate::DeviceArgs;

/// Amplitudes below this magnitude are omitted from the table.
const PRINT_THRESHOLD: f64 = 1e-12;

#[derive(Serialize)]
struct RunReport {
    num_qubits: usize,
    wires: Vec<usize>,
    accelerator: Option<String>,
    stats: DispatchStats,
    /// `[re, im]` per basis state, little-endian wire order.
    amplitudes: Vec<[f64; 2]>,
}

/// Execute the run command.
pub fn execute(args: &DeviceArgs, qubits: usize, wires: &[usize], json: bool) -> Result<()> {
    let mut device = build_device(args)?;
    let accelerator = device.capabilities().accelerator;

    if !json {
        println!(
            "{} Running {} Hadamard(s) on {} qubit(s) via {}",
            style("→").cyan().bold(),
            wires.len(),
            qubits,
            style(accelerator.as_deref().unwrap_or("cpu")).yellow()
        );
    }

    device
        .allocate_qubits(qubits)
        .with_context(|| format!("Failed to allocate {qubits} qubits"))?;
    for &wire in wires {
        device
            .named_operation(&GateRequest::hadamard(wire))
            .with_context(|| format!("Hadamard on wire {wire} failed"))?;
    }

    let mut state = vec![Complex64::new(0.0, 0.0); device.state().len()];
    device.read_state(&mut state)?;
    let stats = device.dispatch_stats();

    if json {
        let report = RunReport {
            num_qubits: device.num_qubits(),
            wires: wires.to_vec(),
            accelerator,
            stats,
            amplitudes: state.iter().map(|a| [a.re, a.im]).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_state(&state, device.num_qubits());
    println!(
        "\n  Gates: {} accelerated, {} cpu, {} fallback",
        style(stats.accelerated).green(),
        stats.cpu,
        if stats.fallbacks > 0 {
            style(stats.fallbacks).red()
        } else {
            style(stats.fallbacks).dim()
        }
    );
    Ok(())
}

fn print_state(state: &[Complex64], num_qubits: usize) {
    let width = num_qubits.max(5) + 2;
    println!(
        "\n  {:<width$}  {:>12}  {:>12}  {:>8}",
        "state", "re", "im", "prob"
    );
    for (index, amp) in state.iter().enumerate() {
        if amp.norm() < PRINT_THRESHOLD {
            continue;
        }
        println!(
            "  {:<width$}  {:>12.8}  {:>12.8}  {:>8.5}",
            basis_label(index, num_qubits),
            amp.re,
            amp.im,
            amp.norm_sqr(),
        );
    }
}

/// `|q_{n-1} … q_0⟩` for a basis index.
fn basis_label(index: usize, num_qubits: usize) -> String {
    let bits: String = (0..num_qubits)
        .rev()
        .map(|q| if (index >> q) & 1 == 1 { '1' } else { '0' })
        .collect();
    format!("|{bits}⟩")
}
