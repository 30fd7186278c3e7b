// SPDX-License-Identifier: Apache-2.0
//! CPU gate kernels.
//!
//! Kernels operate on a raw amplitude slice so they can be driven by the
//! [`Statevector`](crate::Statevector) as well as by callers that hold
//! their own buffers (the C entry points, tests).

use std::f64::consts::FRAC_1_SQRT_2;

use num_complex::Complex64;

use crate::error::{SimError, SimResult};

/// Check that `amplitudes` is a `num_qubits` register and `target` addresses one of its wires.
pub fn check_target(amplitudes: &[Complex64], num_qubits: usize, target: usize) -> SimResult<()> {
    if target >= num_qubits {
        return Err(SimError::InvalidTarget { target, num_qubits });
    }
    let expected = 1usize
        .checked_shl(num_qubits as u32)
        .ok_or(SimError::NotPowerOfTwo(amplitudes.len()))?;
    if amplitudes.len() != expected {
        return Err(SimError::SizeMismatch {
            expected,
            actual: amplitudes.len(),
        });
    }
    Ok(())
}

/// Apply a Hadamard gate to wire `target` in place.
///
/// Every index `i` is paired with `i ^ (1 << target)`; only the lower index
/// of each pair drives the butterfly so no pair is processed twice:
///
/// ```text
/// a' = (a + b) / √2
/// b' = (a - b) / √2
/// ```
///
/// Nothing is written unless `target < num_qubits` and the slice holds
/// exactly `2^num_qubits` amplitudes.
pub fn apply_hadamard(
    amplitudes: &mut [Complex64],
    num_qubits: usize,
    target: usize,
) -> SimResult<()> {
    check_target(amplitudes, num_qubits, target)?;

    let mask = 1usize << target;
    for i in 0..amplitudes.len() {
        let j = i ^ mask;
        if i < j {
            let a = amplitudes[i];
            let b = amplitudes[j];
            amplitudes[i] = FRAC_1_SQRT_2 * (a + b);
            amplitudes[j] = FRAC_1_SQRT_2 * (a - b);
        }
    }
    Ok(())
}

/// Sum of squared magnitudes.
pub fn norm_sqr(amplitudes: &[Complex64]) -> f64 {
    amplitudes.iter().map(Complex64::norm_sqr).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-12
    }

    fn basis(num_qubits: usize, index: usize) -> Vec<Complex64> {
        let mut amps = vec![Complex64::new(0.0, 0.0); 1 << num_qubits];
        amps[index] = Complex64::new(1.0, 0.0);
        amps
    }

    #[test]
    fn test_hadamard_on_zero() {
        let mut amps = basis(1, 0);
        apply_hadamard(&mut amps, 1, 0).unwrap();
        assert!(approx_eq(amps[0], Complex64::new(FRAC_1_SQRT_2, 0.0)));
        assert!(approx_eq(amps[1], Complex64::new(FRAC_1_SQRT_2, 0.0)));
    }

    #[test]
    fn test_hadamard_on_one() {
        let mut amps = basis(1, 1);
        apply_hadamard(&mut amps, 1, 0).unwrap();
        assert!(approx_eq(amps[0], Complex64::new(FRAC_1_SQRT_2, 0.0)));
        assert!(approx_eq(amps[1], Complex64::new(-FRAC_1_SQRT_2, 0.0)));
    }

    #[test]
    fn test_hadamard_wire_one_of_three() {
        let mut amps = basis(3, 0);
        apply_hadamard(&mut amps, 3, 1).unwrap();
        for (i, amp) in amps.iter().enumerate() {
            let expected = if i == 0 || i == 2 { FRAC_1_SQRT_2 } else { 0.0 };
            assert!(approx_eq(*amp, Complex64::new(expected, 0.0)), "index {i}");
        }
    }

    #[test]
    fn test_hadamard_keeps_imaginary_parts() {
        let mut amps = vec![Complex64::new(0.0, 1.0), Complex64::new(0.0, 0.0)];
        apply_hadamard(&mut amps, 1, 0).unwrap();
        assert!(approx_eq(amps[0], Complex64::new(0.0, FRAC_1_SQRT_2)));
        assert!(approx_eq(amps[1], Complex64::new(0.0, FRAC_1_SQRT_2)));
    }

    #[test]
    fn test_invalid_target_leaves_buffer() {
        let mut amps = basis(2, 3);
        let before = amps.clone();
        let err = apply_hadamard(&mut amps, 2, 2).unwrap_err();
        assert_eq!(
            err,
            SimError::InvalidTarget {
                target: 2,
                num_qubits: 2
            }
        );
        assert_eq!(amps, before);
    }

    #[test]
    fn test_zero_qubits_has_no_valid_target() {
        let mut amps = vec![Complex64::new(1.0, 0.0)];
        assert!(matches!(
            apply_hadamard(&mut amps, 0, 0),
            Err(SimError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut amps = basis(2, 0);
        assert_eq!(
            apply_hadamard(&mut amps, 3, 0),
            Err(SimError::SizeMismatch {
                expected: 8,
                actual: 4
            })
        );
    }
}
