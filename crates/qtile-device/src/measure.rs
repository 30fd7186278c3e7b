// SPDX-License-Identifier: Apache-2.0
//! Mid-circuit measurement.
//!
//! The device ships with a deterministic stub: every measurement reports the
//! same outcome and leaves the state alone, so compiled programs that branch
//! on measurement results run reproducibly. [`MeasurementMode::Sampled`]
//! replaces it with a Born-rule draw followed by collapse.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use qtile_sim::Statevector;

use crate::error::{DeviceError, DeviceResult};

/// Outcome reported by the deterministic stub.
pub const STUB_OUTCOME: bool = true;

/// How `measure` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeasurementMode {
    /// Always [`STUB_OUTCOME`]; no collapse; wire and postselect ignored.
    #[default]
    DeterministicStub,
    /// Draw from the amplitudes, honour postselection, collapse.
    Sampled,
}

/// Requested postselection, decoded from the runtime's integer convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Postselect {
    None,
    Zero,
    One,
}

impl Postselect {
    /// Decode: `-1` means none, `0`/`1` force that outcome.
    pub fn from_raw(value: i32) -> DeviceResult<Self> {
        match value {
            -1 => Ok(Postselect::None),
            0 => Ok(Postselect::Zero),
            1 => Ok(Postselect::One),
            other => Err(DeviceError::InvalidPostselect(other)),
        }
    }

    fn forced(self) -> Option<bool> {
        match self {
            Postselect::None => None,
            Postselect::Zero => Some(false),
            Postselect::One => Some(true),
        }
    }
}

/// Performs measurements in the configured mode.
#[derive(Debug)]
pub struct Measurer {
    mode: MeasurementMode,
    rng: StdRng,
}

impl Measurer {
    /// A measurer in `mode`, seeded when `seed` is given.
    pub fn new(mode: MeasurementMode, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { mode, rng }
    }

    pub fn mode(&self) -> MeasurementMode {
        self.mode
    }

    /// Measure `wire`.
    pub fn measure(
        &mut self,
        state: &mut Statevector,
        wire: usize,
        postselect: i32,
    ) -> DeviceResult<bool> {
        match self.mode {
            MeasurementMode::DeterministicStub => Ok(STUB_OUTCOME),
            MeasurementMode::Sampled => self.sample(state, wire, Postselect::from_raw(postselect)?),
        }
    }

    fn sample(
        &mut self,
        state: &mut Statevector,
        wire: usize,
        postselect: Postselect,
    ) -> DeviceResult<bool> {
        let p_one = state.probability_of_one(wire)?;
        let outcome = match postselect.forced() {
            Some(outcome) => {
                let p = if outcome { p_one } else { 1.0 - p_one };
                if p <= f64::EPSILON {
                    return Err(DeviceError::PostselectImpossible { wire, outcome });
                }
                outcome
            }
            None => self.rng.gen_bool(p_one.clamp(0.0, 1.0)),
        };
        state.collapse(wire, outcome)?;
        Ok(outcome)
    }
}
