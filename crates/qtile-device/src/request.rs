// SPDX-License-Identifier: Apache-2.0
//! Named-operation requests.

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, DeviceResult};

/// Name of the only operation the device executes.
pub const HADAMARD: &str = "Hadamard";

/// A named operation as the runtime issues it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GateRequest {
    /// Operation name.
    pub name: String,
    /// Numeric parameters.
    pub params: Vec<f64>,
    /// Target wires.
    pub wires: Vec<usize>,
    /// Apply the adjoint.
    pub inverse: bool,
    /// Control wires.
    pub controlled_wires: Vec<usize>,
    /// Control values, one per control wire.
    pub controlled_values: Vec<bool>,
}

/// An operation the device knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedGate {
    /// Hadamard on one wire.
    Hadamard { wire: usize },
}

impl GateRequest {
    /// A request with `name` and nothing else set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A plain Hadamard on `wire`.
    pub fn hadamard(wire: usize) -> Self {
        Self::new(HADAMARD).with_wires([wire])
    }

    pub fn with_params(mut self, params: impl IntoIterator<Item = f64>) -> Self {
        self.params = params.into_iter().collect();
        self
    }

    pub fn with_wires(mut self, wires: impl IntoIterator<Item = usize>) -> Self {
        self.wires = wires.into_iter().collect();
        self
    }

    pub fn inverse(mut self, inverse: bool) -> Self {
        self.inverse = inverse;
        self
    }

    pub fn with_controls(
        mut self,
        wires: impl IntoIterator<Item = usize>,
        values: impl IntoIterator<Item = bool>,
    ) -> Self {
        self.controlled_wires = wires.into_iter().collect();
        self.controlled_values = values.into_iter().collect();
        self
    }

    /// Match the request against the supported shapes.
    ///
    /// Only `Hadamard` with exactly one wire, no parameters, no inverse and
    /// no controls is accepted. Wire range is checked later against the
    /// register.
    pub fn validate(&self) -> DeviceResult<SupportedGate> {
        let reject = |reason: &str| -> DeviceResult<SupportedGate> {
            Err(DeviceError::UnsupportedOperation(format!(
                "{}: {reason}",
                self.name
            )))
        };

        if self.name != HADAMARD {
            return reject("only Hadamard is supported");
        }
        if !self.params.is_empty() {
            return reject("takes no parameters");
        }
        if self.inverse {
            return reject("inverse form is not supported");
        }
        if !self.controlled_wires.is_empty() || !self.controlled_values.is_empty() {
            return reject("controlled form is not supported");
        }
        match self.wires.as_slice() {
            [wire] => Ok(SupportedGate::Hadamard { wire: *wire }),
            wires => reject(&format!("expects exactly one wire, got {}", wires.len())),
        }
    }
}
