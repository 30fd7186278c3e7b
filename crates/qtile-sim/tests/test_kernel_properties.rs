// SPDX-License-Identifier: Apache-2.0
//! Property tests for the CPU Hadamard kernel.

use num_complex::Complex64;
use proptest::prelude::*;
use qtile_sim::kernel::{apply_hadamard, norm_sqr};

/// A normalised random state on 1-10 qubits plus a wire inside it.
fn arb_state_and_target() -> impl Strategy<Value = (usize, usize, Vec<Complex64>)> {
    (1_usize..=10).prop_flat_map(|num_qubits| {
        (
            Just(num_qubits),
            0..num_qubits,
            prop::collection::vec((-1.0_f64..1.0, -1.0_f64..1.0), 1 << num_qubits),
        )
            .prop_filter_map("zero vector", |(nq, target, parts)| {
                let amps: Vec<Complex64> =
                    parts.into_iter().map(|(re, im)| Complex64::new(re, im)).collect();
                let norm = norm_sqr(&amps).sqrt();
                if norm < 1e-6 {
                    return None;
                }
                Some((nq, target, amps.into_iter().map(|a| a / norm).collect()))
            })
    })
}

proptest! {
    #[test]
    fn double_hadamard_is_identity((num_qubits, target, state) in arb_state_and_target()) {
        let mut amps = state.clone();
        apply_hadamard(&mut amps, num_qubits, target).unwrap();
        apply_hadamard(&mut amps, num_qubits, target).unwrap();

        for (before, after) in state.iter().zip(&amps) {
            prop_assert!((before - after).norm() < 1e-12);
        }
    }

    #[test]
    fn hadamard_preserves_norm((num_qubits, target, state) in arb_state_and_target()) {
        let mut amps = state;
        apply_hadamard(&mut amps, num_qubits, target).unwrap();
        prop_assert!((norm_sqr(&amps) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_target_never_writes(
        (num_qubits, _target, state) in arb_state_and_target(),
        excess in 0_usize..4,
    ) {
        let mut amps = state.clone();
        let result = apply_hadamard(&mut amps, num_qubits, num_qubits + excess);
        prop_assert!(result.is_err());
        prop_assert_eq!(amps, state);
    }
}

// ---------------------------------------------------------------------------
// Exhaustive small cases
// ---------------------------------------------------------------------------

#[test]
fn every_wire_of_every_width_is_self_inverse() {
    for num_qubits in 1..=10 {
        for target in 0..num_qubits {
            let mut amps: Vec<Complex64> = (0..1usize << num_qubits)
                .map(|i| Complex64::new(i as f64, -(i as f64) / 2.0))
                .collect();
            let original = amps.clone();
            apply_hadamard(&mut amps, num_qubits, target).unwrap();
            apply_hadamard(&mut amps, num_qubits, target).unwrap();
            for (a, b) in original.iter().zip(&amps) {
                assert!((a - b).norm() < 1e-9, "n={num_qubits} target={target}");
            }
        }
    }
}
