// SPDX-License-Identifier: Apache-2.0
//! In-process stand-in for the tile array.
//!
//! Runs the same butterfly the hardware graph runs, in single precision, with
//! optional latency and randomly injected faults. Useful on machines without
//! the vendor stack and for exercising the fallback path deterministically.

use std::sync::Mutex;
use std::time::Duration;

use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::error::{AccelError, AccelResult};
use crate::ffi;
use crate::service::{GateAccelerator, GateJob};

/// Emulated tile-array accelerator.
pub struct TileEmulator {
    latency: Duration,
    failure_rate: f64,
    forced_status: Option<i32>,
    rng: Mutex<StdRng>,
}

impl TileEmulator {
    /// A fault-free emulator with no added latency.
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            failure_rate: 0.0,
            forced_status: None,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// An emulator whose every run fails with `status`.
    ///
    /// A zero status is replaced by the runtime fault code so the emulator
    /// never pretends to succeed.
    pub fn failing(status: i32) -> Self {
        let status = if ffi::is_success(status) {
            ffi::TILE_ERROR_RUNTIME
        } else {
            status
        };
        Self {
            forced_status: Some(status),
            ..Self::new()
        }
    }

    /// Sleep for `latency` before every run (device programming + DMA).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail a fraction of runs with [`ffi::TILE_ERROR_RUNTIME`].
    ///
    /// The rate is clamped to `[0, 1]`.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        self
    }

    /// Seed the fault injector for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Configured per-run latency.
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Configured fault probability.
    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    fn inject_fault(&self) -> bool {
        if self.failure_rate <= 0.0 {
            return false;
        }
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        rng.gen_bool(self.failure_rate)
    }
}

impl Default for TileEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl GateAccelerator for TileEmulator {
    fn name(&self) -> &str {
        "emulator"
    }

    fn execute(&self, job: &GateJob) -> AccelResult<Vec<Complex32>> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        if let Some(status) = self.forced_status {
            return Err(AccelError::from_status(status));
        }
        if self.inject_fault() {
            warn!("emulated tile fault on target {}", job.target());
            return Err(AccelError::from_status(ffi::TILE_ERROR_RUNTIME));
        }

        let mut out = job.amplitudes().to_vec();
        let mask = 1usize << job.target();
        let scale = std::f32::consts::FRAC_1_SQRT_2;
        for i in 0..out.len() {
            let j = i ^ mask;
            if i < j {
                let a = out[i];
                let b = out[j];
                out[i] = (a + b) * scale;
                out[j] = (a - b) * scale;
            }
        }

        debug!(
            "emulated tile run: {} amplitudes, target {}",
            out.len(),
            job.target()
        );
        Ok(out)
    }
}

impl std::fmt::Debug for TileEmulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileEmulator")
            .field("latency", &self.latency)
            .field("failure_rate", &self.failure_rate)
            .field("forced_status", &self.forced_status)
            .finish_non_exhaustive()
    }
}
