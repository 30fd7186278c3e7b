// SPDX-License-Identifier: Apache-2.0
//! Gate dispatch between the tile accelerator and the CPU kernel.
//!
//! ```text
//!   apply_hadamard(state, target)
//!     │
//!     ├─ target out of range ─────────────────────────► Err(InvalidTarget)
//!     ├─ no accelerator ──────────► CPU kernel ───────► KernelPath::Cpu
//!     └─ downcast → execute → length/norm check → upcast
//!          ├─ ok ──────────────► install ─────────────► KernelPath::Accelerator
//!          └─ any failure ─────► CPU kernel on the ───► KernelPath::CpuFallback
//!                                untouched state
//! ```
//!
//! The accelerated path loses precision: amplitudes travel to the tile array
//! as `f32` (see [`PrecisionRoundTrip`]). The CPU path stays in `f64`.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use num_complex::Complex64;
use qtile_accel::{AccelError, AccelResult, GateAccelerator, GateJob};
use qtile_sim::{PrecisionRoundTrip, Statevector};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::error::DeviceResult;
use crate::events::{DeviceEvent, EventSink};

/// Which kernel produced the post-gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelPath {
    /// The tile accelerator.
    Accelerator,
    /// The CPU kernel; no accelerator configured.
    Cpu,
    /// The CPU kernel after the accelerator failed.
    CpuFallback,
}

impl fmt::Display for KernelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KernelPath::Accelerator => "accelerator",
            KernelPath::Cpu => "cpu",
            KernelPath::CpuFallback => "cpu-fallback",
        };
        f.write_str(s)
    }
}

/// Per-path gate counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Gates run on the accelerator.
    pub accelerated: u64,
    /// Gates run on the CPU with no accelerator configured.
    pub cpu: u64,
    /// Gates run on the CPU after an accelerator failure.
    pub fallbacks: u64,
}

impl DispatchStats {
    /// Total gates applied.
    pub fn total(&self) -> u64 {
        self.accelerated + self.cpu + self.fallbacks
    }

    fn bump(&mut self, path: KernelPath) {
        match path {
            KernelPath::Accelerator => self.accelerated += 1,
            KernelPath::Cpu => self.cpu += 1,
            KernelPath::CpuFallback => self.fallbacks += 1,
        }
    }
}

/// Routes Hadamard gates to the accelerator or the CPU kernel.
pub struct GateDispatcher {
    accelerator: Option<Arc<dyn GateAccelerator>>,
    bitstream: PathBuf,
    precision: PrecisionRoundTrip,
    verify_output: bool,
    sink: Arc<dyn EventSink>,
    stats: DispatchStats,
}

impl GateDispatcher {
    /// A dispatcher that always runs the CPU kernel.
    pub fn cpu_only(sink: Arc<dyn EventSink>) -> Self {
        Self {
            accelerator: None,
            bitstream: PathBuf::new(),
            precision: PrecisionRoundTrip::default(),
            verify_output: true,
            sink,
            stats: DispatchStats::default(),
        }
    }

    /// A dispatcher that tries `accelerator` first, programmed with `bitstream`.
    pub fn with_accelerator(
        accelerator: Arc<dyn GateAccelerator>,
        bitstream: impl Into<PathBuf>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            accelerator: Some(accelerator),
            bitstream: bitstream.into(),
            ..Self::cpu_only(sink)
        }
    }

    /// Set the tolerance used to judge accelerator output.
    pub fn with_precision(mut self, precision: PrecisionRoundTrip) -> Self {
        self.precision = precision;
        self
    }

    /// Enable or disable the norm check on accelerator output.
    pub fn verify_output(mut self, verify: bool) -> Self {
        self.verify_output = verify;
        self
    }

    /// Whether gates are offered to the accelerator.
    pub fn accelerator_enabled(&self) -> bool {
        self.accelerator.is_some()
    }

    /// Name of the active accelerator, if any.
    pub fn accelerator_name(&self) -> Option<&str> {
        self.accelerator.as_deref().map(|a| a.name())
    }

    /// Bitstream handed to the accelerator.
    pub fn bitstream(&self) -> &Path {
        &self.bitstream
    }

    /// The precision round trip in use.
    pub fn precision(&self) -> PrecisionRoundTrip {
        self.precision
    }

    /// Counters since construction.
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Apply a Hadamard gate on `target`.
    ///
    /// Fails only for an out-of-range target, before touching the state. An
    /// accelerator failure is reported to the sink and answered with the CPU
    /// kernel; the caller sees a valid post-gate state either way.
    #[instrument(skip(self, state), fields(num_qubits = state.num_qubits()))]
    pub fn apply_hadamard(
        &mut self,
        state: &mut Statevector,
        target: usize,
    ) -> DeviceResult<KernelPath> {
        state.check_target(target)?;

        let path = match self.accelerator.clone() {
            None => {
                state.apply_hadamard(target)?;
                KernelPath::Cpu
            }
            Some(accelerator) => match self.run_accelerated(accelerator.as_ref(), state, target)
            {
                Ok(amplitudes) => {
                    state.replace_amplitudes(amplitudes)?;
                    KernelPath::Accelerator
                }
                Err(err) => {
                    self.sink.record(&DeviceEvent::AcceleratorFailed {
                        wire: target,
                        status: err.status_code(),
                        error: err.to_string(),
                    });
                    if matches!(err, AccelError::Timeout(_)) {
                        // A timed-out call may still hold the device.
                        warn!(
                            "disabling {} after timeout; later gates run on the CPU",
                            accelerator.name()
                        );
                        self.accelerator = None;
                    }
                    state.apply_hadamard(target)?;
                    KernelPath::CpuFallback
                }
            },
        };

        self.stats.bump(path);
        self.sink.record(&DeviceEvent::GateApplied {
            gate: "Hadamard".into(),
            wire: target,
            path,
        });
        Ok(path)
    }

    /// Run one gate on the accelerator and return the widened output.
    ///
    /// Leaves `state` untouched.
    fn run_accelerated(
        &self,
        accelerator: &dyn GateAccelerator,
        state: &Statevector,
        target: usize,
    ) -> AccelResult<Vec<Complex64>> {
        let input = self.precision.downcast(state.amplitudes());
        let job = GateJob::new(
            self.bitstream.clone(),
            input,
            target as u32,
            state.num_qubits() as u32,
        )?;

        debug!("offloading Hadamard on wire {target} to {}", accelerator.name());
        let output = panic::catch_unwind(AssertUnwindSafe(|| accelerator.execute(&job)))
            .map_err(|payload| AccelError::Aborted(panic_message(payload.as_ref())))??;
        if output.len() != job.len() {
            return Err(AccelError::LengthMismatch {
                expected: job.len(),
                actual: output.len(),
            });
        }

        let output = self.precision.upcast(&output);
        if self.verify_output && !self.precision.norm_preserved(state.amplitudes(), &output) {
            return Err(AccelError::Corrupted(format!(
                "squared norm drifted from {:.9} to {:.9}",
                state.norm_sqr(),
                qtile_sim::kernel::norm_sqr(&output)
            )));
        }
        Ok(output)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".into()
    }
}

impl fmt::Debug for GateDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateDispatcher")
            .field("accelerator", &self.accelerator_name())
            .field("bitstream", &self.bitstream)
            .field("precision", &self.precision)
            .field("verify_output", &self.verify_output)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
