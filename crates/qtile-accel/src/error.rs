// SPDX-License-Identifier: Apache-2.0
//! Error types for accelerator execution.

use std::time::Duration;

use crate::ffi;

/// Errors arising at the accelerator boundary.
///
/// Every variant means "the accelerated result cannot be used"; callers are
/// expected to fall back to the CPU kernel rather than surface these.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AccelError {
    #[error("failed to load tile host library at '{path}': {cause}")]
    LoadFailed { path: String, cause: String },

    #[error("symbol '{symbol}' not found in tile host library: {cause}")]
    SymbolNotFound { symbol: String, cause: String },

    #[error("tile kernel reported input size mismatch")]
    SizeMismatch,

    #[error("tile runtime fault")]
    Runtime,

    #[error("tile kernel failed with status {0}")]
    Status(i32),

    #[error("invalid gate job: {0}")]
    InvalidJob(String),

    #[error("tile kernel returned {actual} amplitudes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("tile kernel output failed verification: {0}")]
    Corrupted(String),

    #[error("tile kernel did not finish within {0:?}")]
    Timeout(Duration),

    #[error("tile kernel task aborted: {0}")]
    Aborted(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AccelError {
    /// Convert a non-zero status code from the host library into a typed error.
    pub fn from_status(code: i32) -> Self {
        match code {
            ffi::TILE_ERROR_SIZE => AccelError::SizeMismatch,
            ffi::TILE_ERROR_RUNTIME => AccelError::Runtime,
            other => AccelError::Status(other),
        }
    }

    /// The integer status this error corresponds to on the C contract.
    ///
    /// Errors raised on the Rust side of the boundary map to the runtime
    /// fault code.
    pub fn status_code(&self) -> i32 {
        match self {
            AccelError::SizeMismatch | AccelError::LengthMismatch { .. } => ffi::TILE_ERROR_SIZE,
            AccelError::Status(code) => *code,
            _ => ffi::TILE_ERROR_RUNTIME,
        }
    }
}

pub type AccelResult<T> = std::result::Result<T, AccelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_round_trips() {
        for code in [ffi::TILE_ERROR_SIZE, ffi::TILE_ERROR_RUNTIME, 7, -42] {
            assert_eq!(AccelError::from_status(code).status_code(), code);
        }
    }

    #[test]
    fn test_timeout_maps_to_runtime_fault() {
        let err = AccelError::Timeout(Duration::from_millis(5));
        assert_eq!(err.status_code(), ffi::TILE_ERROR_RUNTIME);
    }
}
