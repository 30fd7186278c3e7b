// SPDX-License-Identifier: Apache-2.0
//! Precision conversion between the logical state and the tile transfer format.
//!
//! The logical state is held as [`Complex64`]; the tile array consumes and
//! produces [`Complex32`]. Offloading a gate therefore costs one
//! double → single → double round trip per call, which drops each component
//! to roughly seven significant digits. This loss is accepted on the
//! accelerated path; the CPU path never pays it.
//!
//! [`PrecisionRoundTrip`] keeps the conversion and the tolerance it is judged
//! against in one place so the dispatcher and the tests agree on what
//! "close enough" means.

use num_complex::{Complex32, Complex64};

use crate::kernel::norm_sqr;

/// Default tolerance for comparing accelerator output against the CPU kernel.
///
/// `f32` has a 24-bit mantissa (about 6e-8 relative error per component);
/// a butterfly adds two rounded values and scales them, so a few ulps of
/// drift is expected per gate.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Lossy conversion between the double-precision state and the
/// single-precision accelerator format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionRoundTrip {
    /// Largest per-amplitude deviation (and norm drift) still considered a match.
    pub tolerance: f64,
}

impl PrecisionRoundTrip {
    /// Create a round trip judged against `tolerance`.
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Narrow amplitudes to the accelerator transfer format.
    pub fn downcast(&self, amplitudes: &[Complex64]) -> Vec<Complex32> {
        amplitudes
            .iter()
            .map(|c| Complex32::new(c.re as f32, c.im as f32))
            .collect()
    }

    /// Widen accelerator output back to the logical precision.
    pub fn upcast(&self, amplitudes: &[Complex32]) -> Vec<Complex64> {
        amplitudes
            .iter()
            .map(|c| Complex64::new(f64::from(c.re), f64::from(c.im)))
            .collect()
    }

    /// Largest absolute difference between two equally long buffers.
    ///
    /// Returns `None` when the lengths differ.
    pub fn max_deviation(&self, a: &[Complex64], b: &[Complex64]) -> Option<f64> {
        if a.len() != b.len() {
            return None;
        }
        Some(
            a.iter()
                .zip(b)
                .map(|(x, y)| (x - y).norm())
                .fold(0.0, f64::max),
        )
    }

    /// Whether `candidate` matches `reference` amplitude by amplitude.
    pub fn within_tolerance(&self, reference: &[Complex64], candidate: &[Complex64]) -> bool {
        self.max_deviation(reference, candidate)
            .is_some_and(|d| d <= self.tolerance)
    }

    /// Whether `output` has the same squared norm as `input`.
    ///
    /// A unitary gate preserves the norm, so drift beyond the tolerance means
    /// the transfer or the kernel corrupted the buffer.
    pub fn norm_preserved(&self, input: &[Complex64], output: &[Complex64]) -> bool {
        (norm_sqr(input) - norm_sqr(output)).abs() <= self.tolerance
    }
}

impl Default for PrecisionRoundTrip {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}
