// SPDX-License-Identifier: Apache-2.0
//! Lifecycle tests for the statevector store.

use num_complex::Complex64;
use qtile_sim::{QubitId, SimError, Statevector};

fn is_ground_state(sv: &Statevector) -> bool {
    sv.amplitudes().iter().enumerate().all(|(i, amp)| {
        let expected = if i == 0 { 1.0 } else { 0.0 };
        *amp == Complex64::new(expected, 0.0)
    })
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[test]
fn allocate_many_is_monotonic() {
    let mut sv = Statevector::new();
    let mut expected = 0;
    for n in [1, 0, 3, 2] {
        let ids = sv.allocate_many(n).unwrap();
        assert_eq!(ids.len(), n);
        expected += n;
        assert_eq!(sv.num_qubits(), expected);
        assert_eq!(sv.len(), 1 << expected);
        assert!(is_ground_state(&sv));
    }
}

#[test]
fn allocate_many_ids_are_dense() {
    let mut sv = Statevector::new();
    sv.allocate_one().unwrap();
    let ids = sv.allocate_many(3).unwrap();
    assert_eq!(ids, vec![QubitId(1), QubitId(2), QubitId(3)]);
}

// ---------------------------------------------------------------------------
// Release
// ---------------------------------------------------------------------------

#[test]
fn release_on_empty_register_is_noop() {
    let mut sv = Statevector::new();
    sv.release_one(QubitId(7));
    assert_eq!(sv.num_qubits(), 0);
    assert!(sv.is_empty());
}

#[test]
fn release_ignores_the_id() {
    let mut a = Statevector::new();
    let mut b = Statevector::new();
    a.allocate_many(3).unwrap();
    b.allocate_many(3).unwrap();

    a.release_one(QubitId(0));
    b.release_one(QubitId(2));
    assert_eq!(a, b);
    assert_eq!(a.num_qubits(), 2);
    assert!(is_ground_state(&a));
}

#[test]
fn release_resets_superposition() {
    let mut sv = Statevector::new();
    sv.allocate_many(2).unwrap();
    sv.apply_hadamard(0).unwrap();
    sv.release_one(QubitId(1));
    assert!(is_ground_state(&sv));
}

#[test]
fn release_all_clears_buffer() {
    let mut sv = Statevector::new();
    sv.allocate_many(4).unwrap();
    sv.release_all();
    assert_eq!(sv.num_qubits(), 0);
    assert!(sv.is_empty());
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[test]
fn read_into_copies_verbatim() {
    let mut sv = Statevector::new();
    sv.allocate_many(2).unwrap();
    sv.apply_hadamard(1).unwrap();

    let mut out = vec![Complex64::new(0.0, 0.0); 4];
    sv.read_into(&mut out).unwrap();
    assert_eq!(out.as_slice(), sv.amplitudes());
}

#[test]
fn read_into_wrong_length_leaves_target() {
    let mut sv = Statevector::new();
    sv.allocate_many(2).unwrap();

    let sentinel = Complex64::new(9.0, 9.0);
    let mut out = vec![sentinel; 3];
    let err = sv.read_into(&mut out).unwrap_err();
    assert_eq!(
        err,
        SimError::SizeMismatch {
            expected: 4,
            actual: 3
        }
    );
    assert!(out.iter().all(|a| *a == sentinel));
}

#[test]
fn hadamard_after_release_all_is_invalid_target() {
    let mut sv = Statevector::new();
    sv.allocate_one().unwrap();
    sv.release_all();
    assert!(matches!(
        sv.apply_hadamard(0),
        Err(SimError::InvalidTarget { target: 0, num_qubits: 0 })
    ));
}
