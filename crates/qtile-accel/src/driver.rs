// SPDX-License-Identifier: Apache-2.0
//! Load the tile-array host library and call into it.
//!
//! The host library is built against the vendor runtime and exports
//! [`ffi::HADAMARD_EXECUTE_SYMBOL`]. Loading it at runtime keeps the vendor
//! stack an optional install: if the library is missing, the device simply
//! runs on the CPU.

use std::ffi::CString;
use std::os::raw::c_int;
use std::path::Path;

use libloading::Library;
use num_complex::Complex32;
use tracing::{debug, info};

use crate::error::{AccelError, AccelResult};
use crate::ffi;
use crate::service::{GateAccelerator, GateJob};

/// Default file name of the host library.
pub const DEFAULT_DRIVER_LIBRARY: &str = "libhadamard_host_xrt.so";

/// A loaded tile host library with its entry point resolved.
///
/// The library handle is kept alive for the lifetime of this struct so the
/// `.so` is not unloaded while we still hold a function pointer into it.
pub struct XrtDriver {
    _library: Library,
    fn_execute: ffi::FnHadamardExecute,
    library_path: String,
}

impl XrtDriver {
    /// Load the host library at `path` and resolve the Hadamard entry point.
    ///
    /// # Errors
    ///
    /// [`AccelError::LoadFailed`] if the library cannot be opened,
    /// [`AccelError::SymbolNotFound`] if it does not export the entry point.
    pub fn load(path: &Path) -> AccelResult<Self> {
        let path_str = path.display().to_string();

        // SAFETY: we are loading an external shared library. The caller is
        // responsible for ensuring the library is trustworthy.
        let library = unsafe { Library::new(path) }.map_err(|e| AccelError::LoadFailed {
            path: path_str.clone(),
            cause: e.to_string(),
        })?;

        // SAFETY: the symbol type matches the documented C signature.
        let fn_execute = unsafe {
            library
                .get::<ffi::FnHadamardExecute>(ffi::HADAMARD_EXECUTE_SYMBOL.as_bytes())
                .map(|sym| *sym)
                .map_err(|e| AccelError::SymbolNotFound {
                    symbol: ffi::HADAMARD_EXECUTE_SYMBOL.to_string(),
                    cause: e.to_string(),
                })?
        };

        info!("loaded tile host library '{path_str}'");

        Ok(Self {
            _library: library,
            fn_execute,
            library_path: path_str,
        })
    }

    /// Path the library was loaded from.
    pub fn library_path(&self) -> &str {
        &self.library_path
    }
}

impl GateAccelerator for XrtDriver {
    fn name(&self) -> &str {
        "xrt"
    }

    fn execute(&self, job: &GateJob) -> AccelResult<Vec<Complex32>> {
        let bitstream = CString::new(job.bitstream().as_os_str().as_encoded_bytes())
            .map_err(|_| AccelError::InvalidJob("bitstream path contains a NUL byte".into()))?;
        let target = c_int::try_from(job.target())
            .map_err(|_| AccelError::InvalidJob("target exceeds c_int".into()))?;
        let num_qubits = c_int::try_from(job.num_qubits())
            .map_err(|_| AccelError::InvalidJob("qubit count exceeds c_int".into()))?;

        let mut output = vec![Complex32::new(0.0, 0.0); job.len()];

        debug!(
            "tile run: {} amplitudes, target {}, bitstream {}",
            job.len(),
            target,
            job.bitstream().display()
        );

        // SAFETY: `input` and `output` both hold `job.len()` elements and
        // outlive the call; `bitstream` is NUL-terminated. The host library
        // does not retain any pointer after returning.
        let status = unsafe {
            (self.fn_execute)(
                bitstream.as_ptr(),
                job.amplitudes().as_ptr(),
                output.as_mut_ptr(),
                job.len(),
                target,
                num_qubits,
            )
        };

        if ffi::is_success(status) {
            Ok(output)
        } else {
            Err(AccelError::from_status(status))
        }
    }
}

impl std::fmt::Debug for XrtDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XrtDriver")
            .field("library_path", &self.library_path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_nonexistent_library() {
        let result = XrtDriver::load(Path::new("/nonexistent/libhadamard_host_xrt.so"));
        assert!(matches!(result, Err(AccelError::LoadFailed { .. })));
    }

    #[test]
    fn test_load_non_library_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = XrtDriver::load(file.path());
        assert!(matches!(result, Err(AccelError::LoadFailed { .. })));
    }
}
