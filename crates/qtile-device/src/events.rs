// SPDX-License-Identifier: Apache-2.0
//! Device observability.
//!
//! The device reports what it does through an [`EventSink`] handed to it at
//! construction instead of writing to a shared output stream. The default
//! [`TracingSink`] forwards events to `tracing`; [`MemorySink`] keeps them
//! for inspection.

use std::path::PathBuf;
use std::sync::Mutex;

use qtile_sim::QubitId;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dispatcher::KernelPath;

/// Something the device did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// Device constructed from the given kwargs string.
    Constructed { kwargs: String },
    /// Accelerator availability resolved (once, at construction).
    AcceleratorResolved {
        bitstream: PathBuf,
        available: bool,
        reason: Option<String>,
    },
    /// Qubits added; the register was reset.
    QubitsAllocated { ids: Vec<QubitId>, num_qubits: usize },
    /// One qubit removed; the register was reset.
    QubitReleased { requested: QubitId, num_qubits: usize },
    /// Every qubit removed.
    AllQubitsReleased,
    /// A shot count was set and ignored.
    ShotsIgnored { requested: usize },
    /// A gate was applied on `wire` via `path`.
    GateApplied {
        gate: String,
        wire: usize,
        path: KernelPath,
    },
    /// The accelerator failed; the CPU kernel ran instead.
    AcceleratorFailed {
        wire: usize,
        status: i32,
        error: String,
    },
    /// A named operation was refused.
    OperationRejected { name: String, reason: String },
    /// A wire was measured.
    Measured {
        wire: usize,
        outcome: bool,
        stub: bool,
    },
    /// Tape recording toggled.
    RecordingToggled { active: bool },
    /// The state was read out.
    StateRead { len: usize },
}

/// Receiver for [`DeviceEvent`]s.
pub trait EventSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: &DeviceEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &DeviceEvent) {
        match event {
            DeviceEvent::Constructed { kwargs } => info!("device constructed, kwargs: {kwargs}"),
            DeviceEvent::AcceleratorResolved {
                bitstream,
                available: true,
                ..
            } => info!("tile accelerator enabled, bitstream: {}", bitstream.display()),
            DeviceEvent::AcceleratorResolved {
                bitstream, reason, ..
            } => warn!(
                "tile accelerator disabled ({}), bitstream: {}; using CPU kernel",
                reason.as_deref().unwrap_or("not requested"),
                bitstream.display()
            ),
            DeviceEvent::AcceleratorFailed {
                wire,
                status,
                error,
            } => warn!(
                "tile kernel failed on wire {wire} with status {status} ({error}); falling back to CPU"
            ),
            DeviceEvent::OperationRejected { name, reason } => {
                warn!("unsupported operation '{name}': {reason}")
            }
            other => debug!(?other, "device event"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DeviceEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events recorded so far.
    pub fn events(&self) -> Vec<DeviceEvent> {
        self.lock().clone()
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<DeviceEvent> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&DeviceEvent) -> bool) -> usize {
        self.lock().iter().filter(|e| pred(e)).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DeviceEvent>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &DeviceEvent) {
        self.lock().push(event.clone());
    }
}
