// SPDX-License-Identifier: Apache-2.0
//! Statevector store.
//!
//! Owns the amplitude buffer and the qubit count. Every change of the qubit
//! count resizes the buffer to `2^n` and resets it to `|0…0⟩`.
//!
//! # Known limitation
//!
//! Allocation and release do not tensor a fresh `|0⟩` onto (or trace a qubit
//! out of) the existing state: they discard it. A register holding a
//! superposition loses it when another qubit is allocated. The device
//! runtime allocates the whole register before the first gate, which is the
//! only pattern this model supports faithfully.

use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::kernel;

/// Hard ceiling on the register width (2^30 amplitudes = 16 GiB).
pub const MAX_QUBITS: usize = 30;

/// Handle for an allocated qubit.
///
/// Handles are dense: the `k`-th allocated qubit gets id `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl QubitId {
    /// The wire index this handle addresses.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

/// A statevector representing the device register.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers, empty after a full release).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
    /// Largest register this store will grow to.
    max_qubits: usize,
}

impl Statevector {
    /// Create an empty store: zero qubits, no amplitudes.
    pub fn new() -> Self {
        Self::with_max_qubits(MAX_QUBITS)
    }

    /// Create an empty store that refuses to grow past `max_qubits`.
    ///
    /// The limit is clamped to [`MAX_QUBITS`].
    pub fn with_max_qubits(max_qubits: usize) -> Self {
        Self {
            amplitudes: Vec::new(),
            num_qubits: 0,
            max_qubits: max_qubits.min(MAX_QUBITS),
        }
    }

    /// Build a store from an explicit amplitude buffer.
    ///
    /// The length must be a non-zero power of two; the qubit count is derived
    /// from it.
    pub fn from_amplitudes(amplitudes: Vec<Complex64>) -> SimResult<Self> {
        let len = amplitudes.len();
        if !len.is_power_of_two() {
            return Err(SimError::NotPowerOfTwo(len));
        }
        let num_qubits = len.trailing_zeros() as usize;
        if num_qubits > MAX_QUBITS {
            return Err(SimError::TooManyQubits {
                requested: num_qubits,
                limit: MAX_QUBITS,
            });
        }
        Ok(Self {
            amplitudes,
            num_qubits,
            max_qubits: MAX_QUBITS,
        })
    }

    /// Number of qubits in the register.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Largest register this store will grow to.
    pub fn max_qubits(&self) -> usize {
        self.max_qubits
    }

    /// Number of amplitudes currently held.
    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    /// Whether the buffer is empty (only after [`release_all`](Self::release_all)).
    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    /// Read-only view of the amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Add one qubit and reset to `|0…0⟩`.
    ///
    /// Returns the new qubit's id, which equals the previous count.
    pub fn allocate_one(&mut self) -> SimResult<QubitId> {
        let id = self.num_qubits;
        self.grow_to(self.num_qubits + 1)?;
        Ok(QubitId(id as u32))
    }

    /// Add `n` qubits in one step and reset to `|0…0⟩`.
    ///
    /// `n == 0` returns no ids and leaves the state untouched.
    pub fn allocate_many(&mut self, n: usize) -> SimResult<Vec<QubitId>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let first = self.num_qubits;
        let total = first.checked_add(n).ok_or(SimError::TooManyQubits {
            requested: usize::MAX,
            limit: self.max_qubits,
        })?;
        self.grow_to(total)?;
        Ok((first..total).map(|q| QubitId(q as u32)).collect())
    }

    /// Drop one qubit and reset to `|0…0⟩`.
    ///
    /// The id is not consulted: the register simply shrinks by one. No-op on
    /// an empty register.
    pub fn release_one(&mut self, _id: QubitId) {
        if self.num_qubits == 0 {
            return;
        }
        self.reset_to(self.num_qubits - 1);
    }

    /// Drop every qubit and free the buffer.
    pub fn release_all(&mut self) {
        self.num_qubits = 0;
        self.amplitudes.clear();
        debug!("Released all qubits");
    }

    /// Copy the amplitudes verbatim into `target`.
    ///
    /// Fails without writing if `target` is not exactly as long as the state.
    pub fn read_into(&self, target: &mut [Complex64]) -> SimResult<()> {
        if target.len() != self.amplitudes.len() {
            return Err(SimError::SizeMismatch {
                expected: self.amplitudes.len(),
                actual: target.len(),
            });
        }
        target.copy_from_slice(&self.amplitudes);
        Ok(())
    }

    /// Apply a Hadamard gate on `target` with the CPU kernel.
    pub fn apply_hadamard(&mut self, target: usize) -> SimResult<()> {
        kernel::apply_hadamard(&mut self.amplitudes, self.num_qubits, target)
    }

    /// Check that `target` addresses a wire of this register.
    pub fn check_target(&self, target: usize) -> SimResult<()> {
        kernel::check_target(&self.amplitudes, self.num_qubits, target)
    }

    /// Swap in a buffer produced elsewhere (e.g. by the accelerator).
    ///
    /// The new buffer must have the current length; the qubit count does not
    /// change.
    pub fn replace_amplitudes(&mut self, amplitudes: Vec<Complex64>) -> SimResult<()> {
        if amplitudes.len() != self.amplitudes.len() {
            return Err(SimError::SizeMismatch {
                expected: self.amplitudes.len(),
                actual: amplitudes.len(),
            });
        }
        self.amplitudes = amplitudes;
        Ok(())
    }

    /// Sum of squared magnitudes.
    pub fn norm_sqr(&self) -> f64 {
        kernel::norm_sqr(&self.amplitudes)
    }

    /// Probability of reading `1` on `qubit`.
    pub fn probability_of_one(&self, qubit: usize) -> SimResult<f64> {
        self.check_target(qubit)?;
        let mask = 1 << qubit;
        let p: f64 = self
            .amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, amp)| amp.norm_sqr())
            .sum();
        let norm = self.norm_sqr();
        Ok(if norm > 0.0 { p / norm } else { 0.0 })
    }

    /// Project `qubit` onto `outcome` and renormalise.
    pub fn collapse(&mut self, qubit: usize, outcome: bool) -> SimResult<()> {
        self.check_target(qubit)?;
        let mask = 1 << qubit;
        let mut norm_sq = 0.0;
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) != outcome {
                *amp = Complex64::new(0.0, 0.0);
            }
            norm_sq += amp.norm_sqr();
        }
        let norm = norm_sq.sqrt();
        if norm > 0.0 {
            for amp in &mut self.amplitudes {
                *amp /= norm;
            }
        }
        Ok(())
    }

    /// Resize to `num_qubits` and reset to `|0…0⟩`, refusing to pass the limit.
    fn grow_to(&mut self, num_qubits: usize) -> SimResult<()> {
        if num_qubits > self.max_qubits {
            return Err(SimError::TooManyQubits {
                requested: num_qubits,
                limit: self.max_qubits,
            });
        }
        self.reset_to(num_qubits);
        Ok(())
    }

    fn reset_to(&mut self, num_qubits: usize) {
        let size = 1 << num_qubits;
        self.amplitudes.clear();
        self.amplitudes.resize(size, Complex64::new(0.0, 0.0));
        self.amplitudes[0] = Complex64::new(1.0, 0.0);
        self.num_qubits = num_qubits;
        debug!("Register reset to |0…0⟩ with {} qubits", num_qubits);
    }
}

impl Default for Statevector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    #[test]
    fn test_new_store_is_empty() {
        let sv = Statevector::new();
        assert_eq!(sv.num_qubits(), 0);
        assert!(sv.is_empty());
    }

    #[test]
    fn test_allocate_one_returns_previous_count() {
        let mut sv = Statevector::new();
        assert_eq!(sv.allocate_one().unwrap(), QubitId(0));
        assert_eq!(sv.allocate_one().unwrap(), QubitId(1));
        assert_eq!(sv.num_qubits(), 2);
        assert_eq!(sv.len(), 4);
        assert!(approx_eq(sv.amplitudes()[0], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_allocation_discards_superposition() {
        let mut sv = Statevector::new();
        sv.allocate_one().unwrap();
        sv.apply_hadamard(0).unwrap();
        sv.allocate_one().unwrap();

        assert!(approx_eq(sv.amplitudes()[0], Complex64::new(1.0, 0.0)));
        for amp in &sv.amplitudes()[1..] {
            assert!(approx_eq(*amp, Complex64::new(0.0, 0.0)));
        }
    }

    #[test]
    fn test_allocate_zero_is_noop() {
        let mut sv = Statevector::new();
        sv.allocate_one().unwrap();
        sv.apply_hadamard(0).unwrap();
        let before = sv.clone();

        assert!(sv.allocate_many(0).unwrap().is_empty());
        assert_eq!(sv, before);
    }

    #[test]
    fn test_release_to_zero_keeps_unit_buffer() {
        let mut sv = Statevector::new();
        sv.allocate_one().unwrap();
        sv.release_one(QubitId(0));
        assert_eq!(sv.num_qubits(), 0);
        assert_eq!(sv.amplitudes(), &[Complex64::new(1.0, 0.0)]);
    }

    #[test]
    fn test_too_many_qubits_leaves_state() {
        let mut sv = Statevector::with_max_qubits(2);
        sv.allocate_many(2).unwrap();
        sv.apply_hadamard(0).unwrap();
        let before = sv.clone();

        let err = sv.allocate_one().unwrap_err();
        assert_eq!(
            err,
            SimError::TooManyQubits {
                requested: 3,
                limit: 2
            }
        );
        assert_eq!(sv, before);
    }

    #[test]
    fn test_allocate_many_overflow_is_too_many_qubits() {
        let mut sv = Statevector::new();
        sv.allocate_one().unwrap();
        sv.apply_hadamard(0).unwrap();
        let before = sv.clone();

        let err = sv.allocate_many(usize::MAX).unwrap_err();
        assert!(matches!(err, SimError::TooManyQubits { limit: MAX_QUBITS, .. }));
        assert_eq!(sv, before);
        assert_eq!(sv.num_qubits(), 1);
    }

    #[test]
    fn test_from_amplitudes_rejects_odd_length() {
        let amps = vec![Complex64::new(1.0, 0.0); 3];
        assert_eq!(
            Statevector::from_amplitudes(amps),
            Err(SimError::NotPowerOfTwo(3))
        );
    }

    #[test]
    fn test_collapse_renormalises() {
        let mut sv = Statevector::new();
        sv.allocate_one().unwrap();
        sv.apply_hadamard(0).unwrap();

        assert!((sv.probability_of_one(0).unwrap() - 0.5).abs() < 1e-12);
        sv.collapse(0, true).unwrap();
        assert!(approx_eq(sv.amplitudes()[0], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes()[1], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_replace_amplitudes_checks_length() {
        let mut sv = Statevector::new();
        sv.allocate_one().unwrap();
        let err = sv
            .replace_amplitudes(vec![Complex64::new(1.0, 0.0); 4])
            .unwrap_err();
        assert_eq!(
            err,
            SimError::SizeMismatch {
                expected: 2,
                actual: 4
            }
        );
    }
}
