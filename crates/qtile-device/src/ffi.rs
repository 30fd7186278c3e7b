// SPDX-License-Identifier: Apache-2.0
//! C entry points.
//!
//! Device lifecycle and calls go through an opaque `TileDevice` handle:
//!
//! - `qtile_device_create` / `qtile_device_destroy`
//! - `qtile_device_allocate_qubits`, `qtile_device_release_qubit`,
//!   `qtile_device_release_all_qubits`, `qtile_device_num_qubits`
//! - `qtile_device_named_operation`, `qtile_device_measure`, `qtile_device_state`
//!
//! `qtile_hadamard_execute_c` runs one gate on split real/imaginary buffers
//! without a device handle.
//!
//! Every call returns `0` on success, [`QTILE_ERROR_NULL`] for a null
//! pointer, and [`DeviceError::code`] otherwise.

use std::ffi::{CStr, c_char, c_int};
use std::sync::Arc;

use num_complex::Complex64;
use qtile_sim::{QubitId, Statevector};

use crate::config::{AcceleratorConfig, DeviceConfig};
use crate::device::{QuantumDevice, TileDevice};
use crate::dispatcher::GateDispatcher;
use crate::error::{DeviceError, DeviceResult};
use crate::events::TracingSink;
use crate::request::GateRequest;

/// Status for success.
pub const QTILE_SUCCESS: c_int = 0;

/// Status for a null pointer argument.
pub const QTILE_ERROR_NULL: c_int = -1;

fn status(result: DeviceResult<()>) -> c_int {
    match result {
        Ok(()) => QTILE_SUCCESS,
        Err(err) => {
            tracing::warn!("qtile call failed: {err}");
            err.code()
        }
    }
}

/// View `len` elements at `ptr`; a zero length accepts a null pointer.
///
/// # Safety
///
/// A non-null `ptr` must be valid for reads of `len` elements.
unsafe fn slice_or_empty<'a, T>(ptr: *const T, len: usize) -> Option<&'a [T]> {
    if len == 0 {
        return Some(&[]);
    }
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and valid for `len` reads per the caller contract.
    Some(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// # Safety
///
/// A non-null `s` must point to a NUL-terminated string.
unsafe fn str_arg<'a>(s: *const c_char) -> Option<Result<&'a str, DeviceError>> {
    if s.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    let s = unsafe { CStr::from_ptr(s) };
    Some(
        s.to_str()
            .map_err(|e| DeviceError::Configuration(format!("argument is not UTF-8: {e}"))),
    )
}

/// Create a device from a kwargs string. Returns null on failure.
///
/// # Safety
///
/// `kwargs` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qtile_device_create(kwargs: *const c_char) -> *mut TileDevice {
    let kwargs = match unsafe { str_arg(kwargs) } {
        Some(Ok(kwargs)) => kwargs,
        Some(Err(err)) => {
            tracing::warn!("qtile_device_create: {err}");
            return std::ptr::null_mut();
        }
        None => return std::ptr::null_mut(),
    };
    match TileDevice::new(kwargs) {
        Ok(device) => Box::into_raw(Box::new(device)),
        Err(err) => {
            tracing::warn!("qtile_device_create: {err}");
            std::ptr::null_mut()
        }
    }
}

/// Destroy a device. Null is ignored.
///
/// # Safety
///
/// `device` must be null or a handle from [`qtile_device_create`] that has
/// not been destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qtile_device_destroy(device: *mut TileDevice) {
    if !device.is_null() {
        // SAFETY: the handle came from Box::into_raw and is destroyed once.
        drop(unsafe { Box::from_raw(device) });
    }
}

/// Allocate `n` qubits; ids are written to `out_ids` when it is non-null.
///
/// # Safety
///
/// `device` must be a live handle. A non-null `out_ids` must be valid for
/// `n` writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qtile_device_allocate_qubits(
    device: *mut TileDevice,
    n: usize,
    out_ids: *mut u32,
) -> c_int {
    // SAFETY: live handle per the caller contract.
    let Some(device) = (unsafe { device.as_mut() }) else {
        return QTILE_ERROR_NULL;
    };
    status(device.allocate_qubits(n).map(|ids| {
        if !out_ids.is_null() {
            // SAFETY: `out_ids` holds `n` elements and `ids.len() == n`.
            let out = unsafe { std::slice::from_raw_parts_mut(out_ids, ids.len()) };
            for (slot, id) in out.iter_mut().zip(&ids) {
                *slot = id.0;
            }
        }
    }))
}

/// Release one qubit.
///
/// # Safety
///
/// `device` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qtile_device_release_qubit(device: *mut TileDevice, id: u32) -> c_int {
    // SAFETY: live handle per the caller contract.
    let Some(device) = (unsafe { device.as_mut() }) else {
        return QTILE_ERROR_NULL;
    };
    device.release_qubit(QubitId(id));
    QTILE_SUCCESS
}

/// Release every qubit.
///
/// # Safety
///
/// `device` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qtile_device_release_all_qubits(device: *mut TileDevice) -> c_int {
    // SAFETY: live handle per the caller contract.
    let Some(device) = (unsafe { device.as_mut() }) else {
        return QTILE_ERROR_NULL;
    };
    device.release_all_qubits();
    QTILE_SUCCESS
}

/// Register width, or [`QTILE_ERROR_NULL`].
///
/// # Safety
///
/// `device` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qtile_device_num_qubits(device: *const TileDevice) -> c_int {
    // SAFETY: live handle per the caller contract.
    match unsafe { device.as_ref() } {
        Some(device) => device.num_qubits() as c_int,
        None => QTILE_ERROR_NULL,
    }
}

/// Apply a named operation.
///
/// Array arguments may be null when their length is zero.
///
/// # Safety
///
/// `device` must be a live handle, `name` a NUL-terminated string, and every
/// non-null array valid for reads of its length.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn qtile_device_named_operation(
    device: *mut TileDevice,
    name: *const c_char,
    params: *const f64,
    num_params: usize,
    wires: *const usize,
    num_wires: usize,
    inverse: bool,
    controlled_wires: *const usize,
    num_controlled_wires: usize,
    controlled_values: *const bool,
    num_controlled_values: usize,
) -> c_int {
    // SAFETY: pointer contracts are the caller's.
    let (device, name, params, wires, controlled_wires, controlled_values) = unsafe {
        (
            device.as_mut(),
            str_arg(name),
            slice_or_empty(params, num_params),
            slice_or_empty(wires, num_wires),
            slice_or_empty(controlled_wires, num_controlled_wires),
            slice_or_empty(controlled_values, num_controlled_values),
        )
    };
    let (
        Some(device),
        Some(name),
        Some(params),
        Some(wires),
        Some(controlled_wires),
        Some(controlled_values),
    ) = (device, name, params, wires, controlled_wires, controlled_values)
    else {
        return QTILE_ERROR_NULL;
    };
    let name = match name {
        Ok(name) => name,
        Err(err) => return err.code(),
    };

    let request = GateRequest::new(name)
        .with_params(params.iter().copied())
        .with_wires(wires.iter().copied())
        .inverse(inverse)
        .with_controls(
            controlled_wires.iter().copied(),
            controlled_values.iter().copied(),
        );
    status(device.named_operation(&request))
}

/// Measure `wire`; the outcome is written to `out_outcome`.
///
/// # Safety
///
/// `device` must be a live handle and `out_outcome` valid for one write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qtile_device_measure(
    device: *mut TileDevice,
    wire: usize,
    postselect: c_int,
    out_outcome: *mut bool,
) -> c_int {
    // SAFETY: pointer contracts are the caller's.
    let Some(device) = (unsafe { device.as_mut() }) else {
        return QTILE_ERROR_NULL;
    };
    if out_outcome.is_null() {
        return QTILE_ERROR_NULL;
    }
    status(device.measure(wire, postselect).map(|outcome| {
        // SAFETY: checked non-null above.
        unsafe { *out_outcome = outcome };
    }))
}

/// Copy the state into `out`, which must hold exactly `len` amplitudes.
///
/// # Safety
///
/// `device` must be a live handle and `out` valid for `len` writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qtile_device_state(
    device: *const TileDevice,
    out: *mut Complex64,
    len: usize,
) -> c_int {
    // SAFETY: live handle per the caller contract.
    let Some(device) = (unsafe { device.as_ref() }) else {
        return QTILE_ERROR_NULL;
    };
    let out: &mut [Complex64] = if len == 0 {
        Default::default()
    } else if out.is_null() {
        return QTILE_ERROR_NULL;
    } else {
        // SAFETY: non-null and valid for `len` writes.
        unsafe { std::slice::from_raw_parts_mut(out, len) }
    };
    status(device.read_state(out))
}

/// Apply a Hadamard on `target` to a split-format state.
///
/// Uses the tile accelerator when `bitstream` exists and the host library
/// loads, and the CPU kernel otherwise. On failure the output buffers are
/// left untouched.
///
/// # Safety
///
/// `bitstream` must be a NUL-terminated string; the four buffers must be
/// valid for `size` elements each.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn qtile_hadamard_execute_c(
    bitstream: *const c_char,
    in_re: *const f64,
    in_im: *const f64,
    out_re: *mut f64,
    out_im: *mut f64,
    target: c_int,
    num_qubits: c_int,
    size: c_int,
) -> c_int {
    if bitstream.is_null()
        || in_re.is_null()
        || in_im.is_null()
        || out_re.is_null()
        || out_im.is_null()
    {
        return QTILE_ERROR_NULL;
    }
    let (Ok(target), Ok(num_qubits), Ok(size)) = (
        usize::try_from(target),
        usize::try_from(num_qubits),
        usize::try_from(size),
    ) else {
        return DeviceError::Configuration("negative target, qubit count or size".into()).code();
    };

    // SAFETY: non-null and valid for `size` elements per the caller contract.
    let (bitstream, in_re, in_im, out_re, out_im) = unsafe {
        (
            str_arg(bitstream),
            std::slice::from_raw_parts(in_re, size),
            std::slice::from_raw_parts(in_im, size),
            std::slice::from_raw_parts_mut(out_re, size),
            std::slice::from_raw_parts_mut(out_im, size),
        )
    };
    let bitstream = match bitstream {
        Some(Ok(path)) => path,
        Some(Err(err)) => return err.code(),
        None => return QTILE_ERROR_NULL,
    };

    status(
        hadamard_split(bitstream, in_re, in_im, target, num_qubits).map(|state| {
            for ((re, im), amp) in out_re
                .iter_mut()
                .zip(out_im.iter_mut())
                .zip(state.amplitudes())
            {
                *re = amp.re;
                *im = amp.im;
            }
        }),
    )
}

fn hadamard_split(
    bitstream: &str,
    re: &[f64],
    im: &[f64],
    target: usize,
    num_qubits: usize,
) -> DeviceResult<Statevector> {
    let expected = 1usize
        .checked_shl(num_qubits as u32)
        .ok_or(DeviceError::TooManyQubits {
            requested: num_qubits,
            limit: qtile_sim::MAX_QUBITS,
        })?;
    if re.len() != expected {
        return Err(DeviceError::SizeMismatch {
            expected,
            actual: re.len(),
        });
    }
    let amplitudes = re
        .iter()
        .zip(im)
        .map(|(&re, &im)| Complex64::new(re, im))
        .collect();
    let mut state = Statevector::from_amplitudes(amplitudes)?;

    let config = DeviceConfig {
        bitstream_path: bitstream.into(),
        ..DeviceConfig::default()
    };
    let sink = Arc::new(TracingSink);
    let resolved = AcceleratorConfig::resolve(&config, None);
    let mut dispatcher = match resolved.service {
        Some(service) => GateDispatcher::with_accelerator(service, resolved.config.bitstream, sink),
        None => GateDispatcher::cpu_only(sink),
    };
    dispatcher.apply_hadamard(&mut state, target)?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::f64::consts::FRAC_1_SQRT_2;

    #[test]
    fn test_null_handles() {
        unsafe {
            assert!(qtile_device_create(std::ptr::null()).is_null());
            assert_eq!(qtile_device_num_qubits(std::ptr::null()), QTILE_ERROR_NULL);
            assert_eq!(
                qtile_device_release_all_qubits(std::ptr::null_mut()),
                QTILE_ERROR_NULL
            );
            qtile_device_destroy(std::ptr::null_mut());
        }
    }

    #[test]
    fn test_device_round_trip() {
        let kwargs = CString::new("{'use_fpga': False}").unwrap();
        let name = CString::new("Hadamard").unwrap();
        unsafe {
            let device = qtile_device_create(kwargs.as_ptr());
            assert!(!device.is_null());

            let mut ids = [u32::MAX; 2];
            assert_eq!(qtile_device_allocate_qubits(device, 2, ids.as_mut_ptr()), 0);
            assert_eq!(ids, [0, 1]);
            assert_eq!(qtile_device_num_qubits(device), 2);

            let wires = [1usize];
            let rc = qtile_device_named_operation(
                device,
                name.as_ptr(),
                std::ptr::null(),
                0,
                wires.as_ptr(),
                1,
                false,
                std::ptr::null(),
                0,
                std::ptr::null(),
                0,
            );
            assert_eq!(rc, 0);

            let mut state = [Complex64::new(0.0, 0.0); 4];
            assert_eq!(qtile_device_state(device, state.as_mut_ptr(), 4), 0);
            assert!((state[0].re - FRAC_1_SQRT_2).abs() < 1e-12);
            assert!((state[2].re - FRAC_1_SQRT_2).abs() < 1e-12);

            let mut short = [Complex64::new(0.0, 0.0); 3];
            assert_eq!(qtile_device_state(device, short.as_mut_ptr(), 3), -2);

            let mut outcome = false;
            assert_eq!(qtile_device_measure(device, 0, -1, &mut outcome), 0);
            assert!(outcome);

            qtile_device_destroy(device);
        }
    }

    #[test]
    fn test_unsupported_operation_code() {
        let kwargs = CString::new("").unwrap();
        let name = CString::new("PauliX").unwrap();
        unsafe {
            let device = qtile_device_create(kwargs.as_ptr());
            qtile_device_allocate_qubits(device, 1, std::ptr::null_mut());
            let wires = [0usize];
            let rc = qtile_device_named_operation(
                device,
                name.as_ptr(),
                std::ptr::null(),
                0,
                wires.as_ptr(),
                1,
                false,
                std::ptr::null(),
                0,
                std::ptr::null(),
                0,
            );
            assert_eq!(rc, -3);
            qtile_device_destroy(device);
        }
    }

    #[test]
    fn test_hadamard_execute_without_bitstream() {
        let dir = tempfile::tempdir().unwrap();
        let bitstream = CString::new(dir.path().join("absent.xclbin").to_str().unwrap()).unwrap();
        let in_re = [1.0, 0.0];
        let in_im = [0.0, 0.0];
        let mut out_re = [0.0; 2];
        let mut out_im = [9.0; 2];
        let rc = unsafe {
            qtile_hadamard_execute_c(
                bitstream.as_ptr(),
                in_re.as_ptr(),
                in_im.as_ptr(),
                out_re.as_mut_ptr(),
                out_im.as_mut_ptr(),
                0,
                1,
                2,
            )
        };
        assert_eq!(rc, 0);
        assert!((out_re[0] - FRAC_1_SQRT_2).abs() < 1e-12);
        assert!((out_re[1] - FRAC_1_SQRT_2).abs() < 1e-12);
        assert_eq!(out_im, [0.0, 0.0]);
    }

    #[test]
    fn test_hadamard_execute_size_mismatch() {
        let bitstream = CString::new("absent.xclbin").unwrap();
        let buf = [0.0; 3];
        let mut out = [0.0; 3];
        let mut out_im = [0.0; 3];
        let rc = unsafe {
            qtile_hadamard_execute_c(
                bitstream.as_ptr(),
                buf.as_ptr(),
                buf.as_ptr(),
                out.as_mut_ptr(),
                out_im.as_mut_ptr(),
                0,
                2,
                3,
            )
        };
        assert_eq!(rc, -2);
    }
}
