// SPDX-License-Identifier: Apache-2.0
//! Info command implementation.

use anyhow::Result;
use console::style;
use serde_json::json;

use super::common::build_device;
use crate::DeviceArgs;

/// Execute the info command.
pub fn execute(args: &DeviceArgs, json: bool) -> Result<()> {
    let device = build_device(args)?;
    let caps = device.capabilities();
    let accelerator = device.accelerator();

    if json {
        let report = json!({
            "config": device.config(),
            "accelerator": accelerator,
            "capabilities": caps,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let config = device.config();
    println!("{} {}\n", style("qtile").cyan().bold(), style(&caps.name).bold());
    println!(
        "  {} accelerator {}",
        if accelerator.available {
            style("●").green()
        } else {
            style("○").red()
        },
        caps.accelerator.as_deref().unwrap_or("disabled")
    );
    println!("    Bitstream: {}", accelerator.bitstream.display());
    println!("    Driver:    {}", config.driver_library.display());
    match config.timeout_ms {
        Some(ms) => println!("    Timeout:   {ms} ms"),
        None => println!("    Timeout:   {}", style("none").dim()),
    }
    println!();
    println!("  Operations:   {}", caps.operations.join(", "));
    println!("  Observables:  {}", caps.observables.join(", "));
    println!("  Max qubits:   {}", caps.max_qubits);
    println!("  Shots:        {}", if caps.supports_shots { "yes" } else { "no" });
    println!(
        "  Measurement:  {}",
        serde_json::to_value(caps.measurement)?
            .as_str()
            .unwrap_or_default()
    );
    println!("  Tolerance:    {:e}", config.precision_tolerance);
    Ok(())
}
