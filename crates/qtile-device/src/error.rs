// SPDX-License-Identifier: Apache-2.0
//! Error types for the device crate.

use qtile_sim::SimError;
use thiserror::Error;

/// Errors surfaced to callers of the device.
///
/// Accelerator failures are absent on purpose: the dispatcher recovers from
/// them by running the CPU kernel.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeviceError {
    /// Caller buffer length does not match the state length.
    #[error("State vector size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Length of the internal state.
        expected: usize,
        /// Length of the caller's buffer.
        actual: usize,
    },

    /// The named operation is not the single supported Hadamard shape.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Gate or measurement wire outside the register.
    #[error("Invalid target wire {target} for a {num_qubits}-qubit register")]
    InvalidTarget {
        /// Requested wire.
        target: usize,
        /// Register width.
        num_qubits: usize,
    },

    /// Allocation would exceed the configured register width.
    #[error("Cannot allocate {requested} qubits: device limit is {limit}")]
    TooManyQubits {
        /// Width the allocation would reach.
        requested: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Postselection value other than 0 or 1.
    #[error("Invalid postselect value {0}: expected 0 or 1")]
    InvalidPostselect(i32),

    /// Postselected outcome has zero probability.
    #[error("Postselected outcome {outcome} on wire {wire} has zero probability")]
    PostselectImpossible {
        /// Measured wire.
        wire: usize,
        /// Requested outcome.
        outcome: bool,
    },

    /// Malformed constructor kwargs or configuration file.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal state invariant broken.
    #[error("Statevector error: {0}")]
    State(SimError),
}

impl DeviceError {
    /// Stable status code for the C entry points (`0` is success).
    pub fn code(&self) -> i32 {
        match self {
            DeviceError::SizeMismatch { .. } => -2,
            DeviceError::UnsupportedOperation(_) => -3,
            DeviceError::InvalidTarget { .. } => -4,
            DeviceError::TooManyQubits { .. } => -5,
            DeviceError::InvalidPostselect(_) | DeviceError::PostselectImpossible { .. } => -6,
            DeviceError::Configuration(_) => -7,
            DeviceError::State(_) => -8,
        }
    }
}

impl From<SimError> for DeviceError {
    fn from(err: SimError) -> Self {
        match err {
            SimError::SizeMismatch { expected, actual } => {
                DeviceError::SizeMismatch { expected, actual }
            }
            SimError::InvalidTarget { target, num_qubits } => {
                DeviceError::InvalidTarget { target, num_qubits }
            }
            SimError::TooManyQubits { requested, limit } => {
                DeviceError::TooManyQubits { requested, limit }
            }
            other => DeviceError::State(other),
        }
    }
}

impl From<serde_json::Error> for DeviceError {
    fn from(err: serde_json::Error) -> Self {
        DeviceError::Configuration(err.to_string())
    }
}

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
