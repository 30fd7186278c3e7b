// SPDX-License-Identifier: Apache-2.0
//! Shared helpers for CLI commands.

use anyhow::{Context, Result};
use tracing::debug;

use qtile_device::config::AcceleratorKind;
use qtile_device::{DeviceConfig, TileDevice};

use crate::DeviceArgs;

/// Resolve the device configuration from a config file, kwargs and flags.
///
/// Later sources win: file, then kwargs, then explicit flags.
pub fn load_config(args: &DeviceArgs) -> Result<DeviceConfig> {
    let mut config = match &args.config {
        Some(path) => DeviceConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => DeviceConfig::default(),
    };

    if !args.kwargs.trim().is_empty() {
        config = config.overlay_kwargs(&args.kwargs).context("Invalid kwargs")?;
    }
    if let Some(bitstream) = &args.bitstream {
        config.bitstream_path = bitstream.clone();
    }
    if args.emulate {
        config.use_accelerator = true;
        config.accelerator = AcceleratorKind::Emulated;
    }
    if args.cpu {
        config.use_accelerator = false;
    }
    if args.timeout_ms.is_some() {
        config.timeout_ms = args.timeout_ms;
    }
    config.validate().context("Invalid device configuration")?;
    debug!(?config, "resolved device configuration");
    Ok(config)
}

/// Build a device from the command-line options.
pub fn build_device(args: &DeviceArgs) -> Result<TileDevice> {
    let config = load_config(args)?;
    TileDevice::builder()
        .kwargs(args.kwargs.clone())
        .config(config)
        .build()
        .context("Failed to construct device")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_override_kwargs() {
        let args = DeviceArgs {
            kwargs: "{'use_fpga': False, 'max_qubits': 6}".into(),
            emulate: true,
            timeout_ms: Some(50),
            ..DeviceArgs::default()
        };
        let config = load_config(&args).unwrap();
        assert!(config.use_accelerator);
        assert_eq!(config.accelerator, AcceleratorKind::Emulated);
        assert_eq!(config.max_qubits, 6);
        assert_eq!(config.timeout_ms, Some(50));
    }

    #[test]
    fn test_kwargs_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_qubits": 10, "seed": 3}}"#).unwrap();

        let args = DeviceArgs {
            kwargs: "{'max_qubits': 4}".into(),
            config: Some(file.path().to_path_buf()),
            ..DeviceArgs::default()
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.max_qubits, 4);
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn test_kwargs_equal_to_defaults_still_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_qubits": 10, "use_accelerator": false}}"#).unwrap();

        let args = DeviceArgs {
            kwargs: "{'max_qubits': 24, 'use_fpga': True}".into(),
            config: Some(file.path().to_path_buf()),
            ..DeviceArgs::default()
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.max_qubits, 24);
        assert!(config.use_accelerator);
    }

    #[test]
    fn test_zero_timeout_flag_is_rejected() {
        let args = DeviceArgs {
            timeout_ms: Some(0),
            ..DeviceArgs::default()
        };
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_cpu_flag_disables_accelerator() {
        let args = DeviceArgs {
            cpu: true,
            ..DeviceArgs::default()
        };
        let device = build_device(&args).unwrap();
        assert!(!device.accelerator().available);
    }
}
