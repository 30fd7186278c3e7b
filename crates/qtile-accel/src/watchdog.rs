// SPDX-License-Identifier: Apache-2.0
//! Bounded-time accelerator calls.
//!
//! The host library call blocks until the device finishes; a wedged device
//! would block the caller forever. [`Watchdog`] runs each call on a tokio
//! blocking thread and gives up after a deadline, turning the hang into an
//! [`AccelError::Timeout`] the dispatcher can fall back from.
//!
//! A call that times out keeps running on its blocking thread until the
//! device returns; its result is dropped.
//!
//! `execute` drives its own runtime and must not be called from inside an
//! async context.

use std::sync::Arc;
use std::time::Duration;

use num_complex::Complex32;
use tokio::runtime::{Builder, Runtime};
use tracing::warn;

use crate::error::{AccelError, AccelResult};
use crate::service::{GateAccelerator, GateJob};

/// Decorator that bounds the duration of every accelerator call.
pub struct Watchdog {
    inner: Arc<dyn GateAccelerator>,
    timeout: Duration,
    name: String,
    runtime: Option<Runtime>,
}

impl Watchdog {
    /// Wrap `inner` so each call gives up after `timeout`.
    pub fn new(inner: Arc<dyn GateAccelerator>, timeout: Duration) -> AccelResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_time()
            .thread_name("qtile-watchdog")
            .build()?;
        let name = format!("{}+watchdog", inner.name());
        Ok(Self {
            inner,
            timeout,
            name,
            runtime: Some(runtime),
        })
    }

    /// The configured deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl GateAccelerator for Watchdog {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, job: &GateJob) -> AccelResult<Vec<Complex32>> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| AccelError::Aborted("watchdog runtime shut down".into()))?;

        let inner = Arc::clone(&self.inner);
        let job = job.clone();
        let timeout = self.timeout;

        runtime.block_on(async move {
            let task = tokio::task::spawn_blocking(move || inner.execute(&job));
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(AccelError::Aborted(join_err.to_string())),
                Err(_) => {
                    warn!("tile kernel exceeded {:?}, abandoning call", timeout);
                    Err(AccelError::Timeout(timeout))
                }
            }
        })
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        // Do not wait for abandoned calls still stuck in the device.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("inner", &self.inner.name())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::TileEmulator;

    fn ground() -> GateJob {
        GateJob::new(
            "mock.xclbin",
            vec![Complex32::new(1.0, 0.0), Complex32::new(0.0, 0.0)],
            0,
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_fast_call_passes_through() {
        let dog = Watchdog::new(Arc::new(TileEmulator::new()), Duration::from_secs(5)).unwrap();
        let out = dog.execute(&ground()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(dog.name(), "emulator+watchdog");
    }

    #[test]
    fn test_slow_call_times_out() {
        let slow = TileEmulator::new().with_latency(Duration::from_millis(500));
        let dog = Watchdog::new(Arc::new(slow), Duration::from_millis(20)).unwrap();
        let err = dog.execute(&ground()).unwrap_err();
        assert!(matches!(err, AccelError::Timeout(_)));
    }

    #[test]
    fn test_inner_failure_is_forwarded() {
        let dog =
            Watchdog::new(Arc::new(TileEmulator::failing(-3)), Duration::from_secs(5)).unwrap();
        assert_eq!(dog.execute(&ground()).unwrap_err().status_code(), -3);
    }
}
