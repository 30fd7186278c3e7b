// SPDX-License-Identifier: Apache-2.0
//! `qtile-sim`: statevector storage and CPU gate kernels.
//!
//! This crate holds the pieces of the qtile device that never touch the
//! accelerator:
//!
//! - [`Statevector`]: the double-precision amplitude buffer and qubit count,
//!   with the allocate / release / reset lifecycle the device runtime drives.
//! - [`kernel`]: the in-place Hadamard butterfly over an amplitude slice.
//! - [`precision`]: the explicit, lossy double → single → double round trip
//!   used when a gate is offloaded to the tile array.
//!
//! # Qubit ordering
//!
//! Wire `w` is bit `w` of the amplitude index (little-endian), so a gate on
//! wire `w` pairs index `i` with `i ^ (1 << w)`.
//!
//! # Quick start
//!
//! ```rust
//! use qtile_sim::Statevector;
//!
//! let mut sv = Statevector::new();
//! sv.allocate_many(3).unwrap();
//! sv.apply_hadamard(1).unwrap();
//!
//! let h = std::f64::consts::FRAC_1_SQRT_2;
//! assert!((sv.amplitudes()[0].re - h).abs() < 1e-12);
//! assert!((sv.amplitudes()[2].re - h).abs() < 1e-12);
//! ```

pub mod error;
pub mod kernel;
pub mod precision;
pub mod statevector;

pub use error::{SimError, SimResult};
pub use precision::PrecisionRoundTrip;
pub use statevector::{MAX_QUBITS, QubitId, Statevector};

pub use num_complex::{Complex32, Complex64};
