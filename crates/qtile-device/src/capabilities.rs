// SPDX-License-Identifier: Apache-2.0
//! Device capability introspection.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::measure::MeasurementMode;
use crate::request::HADAMARD;

/// What a [`TileDevice`](crate::TileDevice) can do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// Device name.
    pub name: String,
    /// Supported named operations.
    pub operations: Vec<String>,
    /// Supported observables.
    pub observables: Vec<String>,
    /// Register width limit.
    pub max_qubits: usize,
    /// Whether shot-based execution is available. Always `false`.
    pub supports_shots: bool,
    /// Active accelerator, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerator: Option<String>,
    /// Bitstream in use when the accelerator is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitstream: Option<PathBuf>,
    /// Measurement behaviour.
    pub measurement: MeasurementMode,
}

impl DeviceCapabilities {
    /// Capabilities of a CPU-only device.
    pub fn statevector(name: impl Into<String>, max_qubits: usize) -> Self {
        Self {
            name: name.into(),
            operations: vec![HADAMARD.to_string()],
            observables: vec!["State".to_string()],
            max_qubits,
            supports_shots: false,
            accelerator: None,
            bitstream: None,
            measurement: MeasurementMode::default(),
        }
    }

    /// Whether `name` is a supported operation.
    pub fn supports(&self, name: &str) -> bool {
        self.operations.iter().any(|op| op == name)
    }
}
