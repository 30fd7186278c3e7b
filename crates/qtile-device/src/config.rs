// SPDX-License-Identifier: Apache-2.0
//! Device configuration.
//!
//! The runtime constructs the device with a free-form kwargs string. Three
//! spellings are accepted:
//!
//! ```text
//!   ""                                                  defaults
//!   {"bitstream_path": "k.xclbin", "timeout_ms": 500}   JSON object
//!   {'xclbin_path': 'k.xclbin', 'use_fpga': True}       dict literal
//! ```
//!
//! Keys that are not device settings (the runtime also passes `shots`,
//! `mcmc`, ...) are ignored.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use qtile_accel::{DEFAULT_DRIVER_LIBRARY, GateAccelerator, TileEmulator, Watchdog, XrtDriver};
use qtile_sim::precision::DEFAULT_TOLERANCE;

use crate::error::{DeviceError, DeviceResult};
use crate::measure::MeasurementMode;

/// Bitstream image looked up when none is configured.
pub const DEFAULT_BITSTREAM: &str = "libadf.xclbin";

/// Environment variable overriding the bitstream path.
pub const BITSTREAM_ENV: &str = "QTILE_BITSTREAM";

/// Default register width limit.
pub const DEFAULT_MAX_QUBITS: usize = 24;

const KNOWN_KEYS: &[&str] = &[
    "bitstream_path",
    "xclbin_path",
    "use_accelerator",
    "use_fpga",
    "use_mock_fpga",
    "accelerator",
    "driver_library",
    "timeout_ms",
    "max_qubits",
    "measurement",
    "seed",
    "precision_tolerance",
    "verify_accelerator_output",
    "emulator_latency_ms",
    "emulator_failure_rate",
];

/// Which accelerator implementation backs the tile path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceleratorKind {
    /// Vendor host library (requires the bitstream on disk).
    #[default]
    Xrt,
    /// In-process emulator.
    Emulated,
}

/// Device settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Bitstream image handed to the tile array.
    #[serde(alias = "xclbin_path")]
    pub bitstream_path: PathBuf,
    /// Whether to try the accelerator at all.
    #[serde(alias = "use_fpga")]
    pub use_accelerator: bool,
    /// Accelerator implementation.
    pub accelerator: AcceleratorKind,
    /// Shortcut for `accelerator = emulated`.
    #[serde(skip_serializing)]
    pub use_mock_fpga: bool,
    /// Host library exporting the tile entry point.
    pub driver_library: PathBuf,
    /// Deadline for one accelerator call; unbounded when absent.
    pub timeout_ms: Option<u64>,
    /// Register width limit.
    pub max_qubits: usize,
    /// Measurement behaviour.
    pub measurement: MeasurementMode,
    /// RNG seed for sampled measurement and emulator faults.
    pub seed: Option<u64>,
    /// Tolerance for the single-precision round trip.
    pub precision_tolerance: f64,
    /// Reject accelerator output whose norm drifted from the input's.
    pub verify_accelerator_output: bool,
    /// Emulator per-call latency.
    pub emulator_latency_ms: u64,
    /// Emulator fault probability.
    pub emulator_failure_rate: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            bitstream_path: PathBuf::from(DEFAULT_BITSTREAM),
            use_accelerator: true,
            accelerator: AcceleratorKind::Xrt,
            use_mock_fpga: false,
            driver_library: PathBuf::from(DEFAULT_DRIVER_LIBRARY),
            timeout_ms: None,
            max_qubits: DEFAULT_MAX_QUBITS,
            measurement: MeasurementMode::DeterministicStub,
            seed: None,
            precision_tolerance: DEFAULT_TOLERANCE,
            verify_accelerator_output: true,
            emulator_latency_ms: 0,
            emulator_failure_rate: 0.0,
        }
    }
}

impl DeviceConfig {
    /// Parse the runtime's kwargs string.
    pub fn parse_kwargs(kwargs: &str) -> DeviceResult<Self> {
        let map = parse_kwargs_map(kwargs)?;
        for key in map.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                debug!("ignoring kwarg '{key}'");
            }
        }
        let mut config: DeviceConfig = serde_json::from_value(Value::Object(map))?;
        config.normalise();
        config.validate()?;
        Ok(config)
    }

    /// Apply the keys present in `kwargs` on top of `self`.
    ///
    /// Keys absent from `kwargs` keep their current value, even when it
    /// differs from the default.
    pub fn overlay_kwargs(&self, kwargs: &str) -> DeviceResult<Self> {
        let overlay = parse_kwargs_map(kwargs)?;
        let mut merged = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in overlay {
            let key = match key.as_str() {
                "xclbin_path" => "bitstream_path".to_string(),
                "use_fpga" => "use_accelerator".to_string(),
                _ => key,
            };
            merged.insert(key, value);
        }
        let mut config: DeviceConfig = serde_json::from_value(Value::Object(merged))?;
        config.normalise();
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a JSON file.
    pub fn from_file(path: &Path) -> DeviceResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            DeviceError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        let mut config: DeviceConfig = serde_json::from_str(&source)?;
        config.normalise();
        config.validate()?;
        Ok(config)
    }

    /// Apply the [`BITSTREAM_ENV`] override, if set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var(BITSTREAM_ENV) {
            if !path.is_empty() {
                debug!("bitstream path overridden by {BITSTREAM_ENV}: {path}");
                self.bitstream_path = PathBuf::from(path);
            }
        }
        self
    }

    /// Per-call accelerator deadline.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    fn normalise(&mut self) {
        if self.use_mock_fpga {
            self.accelerator = AcceleratorKind::Emulated;
        }
    }

    /// Reject values the device cannot honour.
    pub fn validate(&self) -> DeviceResult<()> {
        if self.max_qubits > qtile_sim::MAX_QUBITS {
            return Err(DeviceError::Configuration(format!(
                "max_qubits {} exceeds the ceiling of {}",
                self.max_qubits,
                qtile_sim::MAX_QUBITS
            )));
        }
        if !(self.precision_tolerance.is_finite() && self.precision_tolerance >= 0.0) {
            return Err(DeviceError::Configuration(format!(
                "precision_tolerance must be a non-negative number, got {}",
                self.precision_tolerance
            )));
        }
        if !(0.0..=1.0).contains(&self.emulator_failure_rate) {
            return Err(DeviceError::Configuration(format!(
                "emulator_failure_rate must be within [0, 1], got {}",
                self.emulator_failure_rate
            )));
        }
        if self.timeout_ms == Some(0) {
            return Err(DeviceError::Configuration(
                "timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Accelerator availability, resolved once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceleratorConfig {
    /// Bitstream image handed to the accelerator.
    pub bitstream: PathBuf,
    /// Whether the accelerator path is used.
    pub available: bool,
}

impl AcceleratorConfig {
    /// A configuration that never uses the accelerator.
    pub fn disabled(bitstream: impl Into<PathBuf>) -> Self {
        Self {
            bitstream: bitstream.into(),
            available: false,
        }
    }

    /// An enabled configuration.
    pub fn enabled(bitstream: impl Into<PathBuf>) -> Self {
        Self {
            bitstream: bitstream.into(),
            available: true,
        }
    }

    /// Decide whether the accelerator path is usable and set up its service.
    ///
    /// `injected` replaces the service `config` would build. An `xrt`
    /// accelerator needs the bitstream on disk; an emulated one does not.
    /// Every failure disables the accelerator and is reported as the reason.
    pub fn resolve(
        config: &DeviceConfig,
        injected: Option<Arc<dyn GateAccelerator>>,
    ) -> ResolvedAccelerator {
        let bitstream = config.bitstream_path.clone();
        match Self::build_service(config, injected) {
            Ok(service) => ResolvedAccelerator {
                config: Self::enabled(bitstream),
                service: Some(service),
                reason: None,
            },
            Err(reason) => ResolvedAccelerator {
                config: Self::disabled(bitstream),
                service: None,
                reason: Some(reason),
            },
        }
    }

    fn build_service(
        config: &DeviceConfig,
        injected: Option<Arc<dyn GateAccelerator>>,
    ) -> Result<Arc<dyn GateAccelerator>, String> {
        if !config.use_accelerator {
            return Err("disabled by configuration".into());
        }

        let service: Arc<dyn GateAccelerator> = match (injected, config.accelerator) {
            (Some(service), AcceleratorKind::Emulated) => service,
            (injected, AcceleratorKind::Xrt) => {
                if !config.bitstream_path.is_file() {
                    return Err(format!(
                        "bitstream not found at {}",
                        config.bitstream_path.display()
                    ));
                }
                match injected {
                    Some(service) => service,
                    None => Arc::new(
                        XrtDriver::load(&config.driver_library).map_err(|e| e.to_string())?,
                    ),
                }
            }
            (None, AcceleratorKind::Emulated) => {
                let mut emulator = TileEmulator::new()
                    .with_latency(Duration::from_millis(config.emulator_latency_ms))
                    .with_failure_rate(config.emulator_failure_rate);
                if let Some(seed) = config.seed {
                    emulator = emulator.with_seed(seed);
                }
                Arc::new(emulator)
            }
        };

        match config.timeout() {
            Some(timeout) => Ok(Arc::new(
                Watchdog::new(service, timeout).map_err(|e| e.to_string())?,
            )),
            None => Ok(service),
        }
    }
}

/// Outcome of [`AcceleratorConfig::resolve`].
pub struct ResolvedAccelerator {
    /// Path and availability.
    pub config: AcceleratorConfig,
    /// The service to dispatch to, when available.
    pub service: Option<Arc<dyn GateAccelerator>>,
    /// Why the accelerator is unavailable.
    pub reason: Option<String>,
}

impl std::fmt::Debug for ResolvedAccelerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedAccelerator")
            .field("config", &self.config)
            .field("service", &self.service.as_deref().map(|s| s.name()))
            .field("reason", &self.reason)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// kwargs parsing
// ---------------------------------------------------------------------------

fn parse_kwargs_map(kwargs: &str) -> DeviceResult<Map<String, Value>> {
    let trimmed = kwargs.trim();
    if trimmed.is_empty() {
        return Ok(Map::new());
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(map);
    }

    let body = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);

    let mut map = Map::new();
    for entry in split_top_level(body) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (key, value) = split_key_value(entry).ok_or_else(|| {
            DeviceError::Configuration(format!("malformed kwargs entry '{entry}'"))
        })?;
        let key = unquote(key.trim())
            .ok_or_else(|| DeviceError::Configuration(format!("malformed key in '{entry}'")))?;
        map.insert(key, parse_scalar(value.trim())?);
    }
    Ok(map)
}

/// Split on commas that are not inside quotes or brackets.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[' | '(' | '{') => depth += 1,
            (None, ']' | ')' | '}') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

/// Split `key: value` or `key = value` at the first separator outside quotes.
fn split_key_value(entry: &str) -> Option<(&str, &str)> {
    let mut quote: Option<char> = None;
    for (i, c) in entry.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ':' | '=') => return Some((&entry[..i], &entry[i + 1..])),
            _ => {}
        }
    }
    None
}

fn unquote(s: &str) -> Option<String> {
    for q in ['\'', '"'] {
        if let Some(inner) = s.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return Some(inner.to_string());
        }
    }
    if !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Some(s.to_string());
    }
    None
}

fn parse_scalar(raw: &str) -> DeviceResult<Value> {
    match raw {
        "True" | "true" => return Ok(Value::Bool(true)),
        "False" | "false" => return Ok(Value::Bool(false)),
        "None" | "null" => return Ok(Value::Null),
        _ => {}
    }
    if let Some(s) = unquote(raw).filter(|_| raw.starts_with(['\'', '"'])) {
        return Ok(Value::String(s));
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(Value::from(i));
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Ok(Value::from(f));
    }
    // Nested structures the device does not use (e.g. device_kwargs lists).
    if raw.starts_with(['[', '(', '{']) {
        return Ok(Value::String(raw.to_string()));
    }
    Err(DeviceError::Configuration(format!(
        "cannot parse kwargs value '{raw}'"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_kwargs_is_default() {
        assert_eq!(DeviceConfig::parse_kwargs("").unwrap(), DeviceConfig::default());
        assert_eq!(DeviceConfig::parse_kwargs("{}").unwrap(), DeviceConfig::default());
    }

    #[test]
    fn test_dict_literal_aliases() {
        let config = DeviceConfig::parse_kwargs(
            "{'xclbin_path': '/opt/tiles/k.xclbin', 'use_fpga': False, 'shots': 0}",
        )
        .unwrap();
        assert_eq!(config.bitstream_path, PathBuf::from("/opt/tiles/k.xclbin"));
        assert!(!config.use_accelerator);
    }

    #[test]
    fn test_overlay_applies_only_present_keys() {
        let base = DeviceConfig {
            max_qubits: 10,
            use_accelerator: false,
            seed: Some(3),
            ..DeviceConfig::default()
        };
        let merged = base
            .overlay_kwargs("{'max_qubits': 24, 'use_fpga': True}")
            .unwrap();
        assert_eq!(merged.max_qubits, DEFAULT_MAX_QUBITS);
        assert!(merged.use_accelerator);
        assert_eq!(merged.seed, Some(3));

        assert!(matches!(
            base.overlay_kwargs("{'timeout_ms': 0}"),
            Err(DeviceError::Configuration(_))
        ));
    }

    #[test]
    fn test_json_object() {
        let config = DeviceConfig::parse_kwargs(
            r#"{"accelerator": "emulated", "timeout_ms": 250, "measurement": "sampled", "seed": 9}"#,
        )
        .unwrap();
        assert_eq!(config.accelerator, AcceleratorKind::Emulated);
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.measurement, MeasurementMode::Sampled);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_use_mock_fpga_selects_emulator() {
        let config = DeviceConfig::parse_kwargs("{'use_mock_fpga': True}").unwrap();
        assert_eq!(config.accelerator, AcceleratorKind::Emulated);
    }

    #[test]
    fn test_key_equals_value_form() {
        let config =
            DeviceConfig::parse_kwargs("max_qubits=8, emulator_failure_rate=0.25").unwrap();
        assert_eq!(config.max_qubits, 8);
        assert_eq!(config.emulator_failure_rate, 0.25);
    }

    #[test]
    fn test_quoted_comma_is_not_a_separator() {
        let config = DeviceConfig::parse_kwargs("{'xclbin_path': 'a,b.xclbin'}").unwrap();
        assert_eq!(config.bitstream_path, PathBuf::from("a,b.xclbin"));
    }

    #[test]
    fn test_nested_values_are_ignored() {
        let config =
            DeviceConfig::parse_kwargs("{'device_kwargs': {'a': 1, 'b': 2}, 'max_qubits': 4}")
                .unwrap();
        assert_eq!(config.max_qubits, 4);
    }

    #[test]
    fn test_malformed_entry() {
        assert!(matches!(
            DeviceConfig::parse_kwargs("{'use_fpga'}"),
            Err(DeviceError::Configuration(_))
        ));
    }

    #[test]
    fn test_wrong_type_is_configuration_error() {
        assert!(matches!(
            DeviceConfig::parse_kwargs("{'max_qubits': 'many'}"),
            Err(DeviceError::Configuration(_))
        ));
    }

    #[test]
    fn test_limits_validated() {
        assert!(DeviceConfig::parse_kwargs("{'max_qubits': 64}").is_err());
        assert!(DeviceConfig::parse_kwargs("{'emulator_failure_rate': 1.5}").is_err());
        assert!(DeviceConfig::parse_kwargs("{'timeout_ms': 0}").is_err());
    }
}
