// SPDX-License-Identifier: Apache-2.0
//! The accelerator service contract.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use num_complex::Complex32;

use crate::error::{AccelError, AccelResult};

/// One Hadamard invocation in the accelerator transfer format.
#[derive(Debug, Clone, PartialEq)]
pub struct GateJob {
    bitstream: PathBuf,
    amplitudes: Vec<Complex32>,
    target: u32,
    num_qubits: u32,
}

impl GateJob {
    /// Build a job, checking the buffer is a `num_qubits` register and
    /// `target` is one of its wires.
    pub fn new(
        bitstream: impl Into<PathBuf>,
        amplitudes: Vec<Complex32>,
        target: u32,
        num_qubits: u32,
    ) -> AccelResult<Self> {
        let expected = 1usize.checked_shl(num_qubits).ok_or_else(|| {
            AccelError::InvalidJob(format!("{num_qubits} qubits do not fit in memory"))
        })?;
        if amplitudes.len() != expected {
            return Err(AccelError::InvalidJob(format!(
                "buffer holds {} amplitudes, a {num_qubits}-qubit state needs {expected}",
                amplitudes.len()
            )));
        }
        if target >= num_qubits {
            return Err(AccelError::InvalidJob(format!(
                "target {target} out of range for {num_qubits} qubits"
            )));
        }
        Ok(Self {
            bitstream: bitstream.into(),
            amplitudes,
            target,
            num_qubits,
        })
    }

    /// Bitstream image handed whole to the device.
    pub fn bitstream(&self) -> &Path {
        &self.bitstream
    }

    /// Input amplitudes.
    pub fn amplitudes(&self) -> &[Complex32] {
        &self.amplitudes
    }

    /// Target wire.
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Register width.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Number of amplitudes (`2^num_qubits`).
    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    /// Always `false`: a valid job holds at least two amplitudes.
    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }
}

/// A service that can run the Hadamard kernel off the CPU.
///
/// # Contract
///
/// - `execute` is synchronous: it returns only after the full
///   transfer-and-run cycle has finished or failed.
/// - `Ok(out)` corresponds to status 0; `out` has the input's length.
/// - `Err(_)` covers every non-zero status and every fault in the device
///   stack. Whatever the device wrote is discarded.
pub trait GateAccelerator: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &str;

    /// Run the Hadamard kernel for `job`.
    fn execute(&self, job: &GateJob) -> AccelResult<Vec<Complex32>>;
}

impl<T: GateAccelerator + ?Sized> GateAccelerator for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&self, job: &GateJob) -> AccelResult<Vec<Complex32>> {
        (**self).execute(job)
    }
}

impl<T: GateAccelerator + ?Sized> GateAccelerator for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&self, job: &GateJob) -> AccelResult<Vec<Complex32>> {
        (**self).execute(job)
    }
}
