// SPDX-License-Identifier: Apache-2.0
//! Accelerator boundary for the qtile device.
//!
//! The tile array runs a single kernel: a Hadamard butterfly over a
//! single-precision complex buffer. This crate narrows everything behind that
//! kernel (device programming, buffer objects, DMA, graph control) to the
//! [`GateAccelerator`] trait:
//!
//! ```text
//!   execute(bitstream, input: [Complex32; 2^n], target, n) -> status, output
//! ```
//!
//! # Implementations
//!
//! | Type | Backing |
//! |------|---------|
//! | [`XrtDriver`] | Vendor host library loaded at runtime (`libloading`) |
//! | [`TileEmulator`] | In-process single-precision emulation with fault injection |
//! | [`Watchdog`] | Decorator adding a deadline to any of the above |
//!
//! # Example
//!
//! ```rust
//! use num_complex::Complex32;
//! use qtile_accel::{GateAccelerator, GateJob, TileEmulator};
//!
//! let job = GateJob::new(
//!     "libadf.xclbin",
//!     vec![Complex32::new(1.0, 0.0), Complex32::new(0.0, 0.0)],
//!     0,
//!     1,
//! )
//! .unwrap();
//! let out = TileEmulator::new().execute(&job).unwrap();
//! assert!((out[1].re - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
//! ```

pub mod driver;
pub mod emulator;
pub mod error;
pub mod ffi;
pub mod service;
pub mod watchdog;

pub use driver::{DEFAULT_DRIVER_LIBRARY, XrtDriver};
pub use emulator::TileEmulator;
pub use error::{AccelError, AccelResult};
pub use service::{GateAccelerator, GateJob};
pub use watchdog::Watchdog;
