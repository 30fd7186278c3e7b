// SPDX-License-Identifier: Apache-2.0
//! Raw C call contract of the tile-array host library.
//!
//! The host library wraps the vendor runtime (device programming, buffer
//! objects, DMA, graph control) behind a single synchronous entry point:
//!
//! ```c
//! int hadamard_host_xrt_c(const char *xclbin_path,
//!                         const cfloat *input,
//!                         cfloat *output,
//!                         size_t len,
//!                         int target,
//!                         int num_qubits);
//! ```
//!
//! `cfloat` is `{ float real; float imag; }`, which has the same layout as
//! `num_complex::Complex32` (`#[repr(C)] { re, im }`). The call blocks until
//! the output buffer has been synced back from the device.

use std::os::raw::{c_char, c_int};

use num_complex::Complex32;

/// Symbol exported by the host library.
pub const HADAMARD_EXECUTE_SYMBOL: &str = "hadamard_host_xrt_c";

/// Signature of [`HADAMARD_EXECUTE_SYMBOL`].
pub type FnHadamardExecute = unsafe extern "C" fn(
    xclbin_path: *const c_char,
    input: *const Complex32,
    output: *mut Complex32,
    len: usize,
    target: c_int,
    num_qubits: c_int,
) -> c_int;

// ===========================================================================
// Status codes
// ===========================================================================

/// Kernel ran and the output buffer is valid.
pub const TILE_SUCCESS: c_int = 0;
/// Input length does not match `2^num_qubits`.
pub const TILE_ERROR_SIZE: c_int = -1;
/// The vendor runtime raised (device open, xclbin load, DMA, graph run).
pub const TILE_ERROR_RUNTIME: c_int = -2;

/// Returns `true` if the status code indicates success.
#[inline]
pub fn is_success(code: c_int) -> bool {
    code == TILE_SUCCESS
}
