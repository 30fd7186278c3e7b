// SPDX-License-Identifier: Apache-2.0
//! Error types for the sim crate.

use thiserror::Error;

/// Errors produced by statevector storage and gate kernels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SimError {
    /// A buffer does not have the length of the current state.
    #[error("State buffer size mismatch: expected {expected} amplitudes, got {actual}")]
    SizeMismatch {
        /// Length of the internal state.
        expected: usize,
        /// Length of the buffer that was offered.
        actual: usize,
    },

    /// A gate targets a wire outside `[0, num_qubits)`.
    #[error("Target qubit {target} out of range for a {num_qubits}-qubit state")]
    InvalidTarget {
        /// The offending wire.
        target: usize,
        /// Number of qubits in the state.
        num_qubits: usize,
    },

    /// Growing the register would exceed the configured qubit limit.
    #[error("Cannot hold {requested} qubits: limit is {limit}")]
    TooManyQubits {
        /// Qubit count the allocation would reach.
        requested: usize,
        /// Configured limit.
        limit: usize,
    },

    /// An amplitude buffer whose length is not a power of two.
    #[error("Amplitude buffer length {0} is not a power of two")]
    NotPowerOfTwo(usize),
}

/// Result type for statevector operations.
pub type SimResult<T> = Result<T, SimError>;
