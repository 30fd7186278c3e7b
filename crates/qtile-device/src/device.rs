// SPDX-License-Identifier: Apache-2.0
//! The device facade.
//!
//! [`QuantumDevice`] is the method set the quantum-program runtime calls.
//! [`TileDevice`] implements it over a [`Statevector`], a [`GateDispatcher`]
//! and a [`Measurer`], reporting everything it does to an [`EventSink`].
//!
//! # Example
//!
//! ```rust
//! use qtile_device::{GateRequest, QuantumDevice, TileDevice};
//! use num_complex::Complex64;
//!
//! let mut device = TileDevice::new("{'use_fpga': False}").unwrap();
//! device.allocate_qubits(1).unwrap();
//! device.named_operation(&GateRequest::hadamard(0)).unwrap();
//!
//! let mut state = vec![Complex64::new(0.0, 0.0); 2];
//! device.read_state(&mut state).unwrap();
//! assert!((state[1].re - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
//! ```

use std::sync::Arc;

use num_complex::Complex64;
use qtile_accel::GateAccelerator;
use qtile_sim::{PrecisionRoundTrip, QubitId, Statevector};

use crate::capabilities::DeviceCapabilities;
use crate::config::{AcceleratorConfig, DeviceConfig};
use crate::dispatcher::{DispatchStats, GateDispatcher, KernelPath};
use crate::error::{DeviceError, DeviceResult};
use crate::events::{DeviceEvent, EventSink, TracingSink};
use crate::measure::{MeasurementMode, Measurer};
use crate::request::{GateRequest, SupportedGate};

/// Name reported by [`TileDevice`].
pub const DEVICE_NAME: &str = "qtile.statevector";

/// The runtime-facing device contract.
///
/// Calls are sequential; an implementation owns its state exclusively.
pub trait QuantumDevice {
    /// Add one qubit. The register is reset to `|0…0⟩`.
    fn allocate_qubit(&mut self) -> DeviceResult<QubitId>;

    /// Add `n` qubits. The register is reset to `|0…0⟩`.
    fn allocate_qubits(&mut self, n: usize) -> DeviceResult<Vec<QubitId>>;

    /// Remove one qubit. The register is reset to `|0…0⟩`.
    fn release_qubit(&mut self, id: QubitId);

    /// Remove every qubit.
    fn release_all_qubits(&mut self);

    /// Current register width.
    fn num_qubits(&self) -> usize;

    /// Set the shot count.
    fn set_shots(&mut self, shots: usize);

    /// Current shot count.
    fn shots(&self) -> usize;

    /// Apply a named operation.
    fn named_operation(&mut self, request: &GateRequest) -> DeviceResult<()>;

    /// Measure `wire`. `postselect` is `-1` for none, else `0` or `1`.
    fn measure(&mut self, wire: usize, postselect: i32) -> DeviceResult<bool>;

    /// Begin tape recording.
    fn start_recording(&mut self);

    /// End tape recording.
    fn stop_recording(&mut self);

    /// Copy the full state into `target`, which must match its length exactly.
    fn read_state(&self, target: &mut [Complex64]) -> DeviceResult<()>;
}

/// Statevector device with tile-array Hadamard offload.
pub struct TileDevice {
    config: DeviceConfig,
    accelerator: AcceleratorConfig,
    state: Statevector,
    dispatcher: GateDispatcher,
    measurer: Measurer,
    sink: Arc<dyn EventSink>,
    recording: bool,
}

impl TileDevice {
    /// Construct from the runtime's kwargs string.
    ///
    /// The `QTILE_BITSTREAM` environment variable overrides the bitstream path.
    pub fn new(kwargs: &str) -> DeviceResult<Self> {
        let config = DeviceConfig::parse_kwargs(kwargs)?.with_env_overrides();
        Self::builder().kwargs(kwargs).config(config).build()
    }

    /// Construct from an explicit configuration.
    pub fn from_config(config: DeviceConfig) -> DeviceResult<Self> {
        Self::builder().config(config).build()
    }

    /// Start building a device with injected collaborators.
    pub fn builder() -> TileDeviceBuilder {
        TileDeviceBuilder::default()
    }

    /// The configuration in effect.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Accelerator availability, as resolved at construction.
    pub fn accelerator(&self) -> &AcceleratorConfig {
        &self.accelerator
    }

    /// Whether gates are currently offered to the accelerator.
    ///
    /// May turn false after construction if the accelerator timed out.
    pub fn accelerator_active(&self) -> bool {
        self.dispatcher.accelerator_enabled()
    }

    /// Gate counters per kernel path.
    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// Whether recording is on.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// The current state.
    pub fn state(&self) -> &Statevector {
        &self.state
    }

    /// Describe what this device supports.
    pub fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::statevector(DEVICE_NAME, self.state.max_qubits());
        caps.measurement = self.measurer.mode();
        if self.dispatcher.accelerator_enabled() {
            caps.accelerator = self.dispatcher.accelerator_name().map(str::to_string);
            caps.bitstream = Some(self.accelerator.bitstream.clone());
        }
        caps
    }

    /// Apply a Hadamard on `wire` and report which kernel ran.
    pub fn apply_hadamard(&mut self, wire: usize) -> DeviceResult<KernelPath> {
        self.dispatcher.apply_hadamard(&mut self.state, wire)
    }

    fn reject(&self, name: &str, err: DeviceError) -> DeviceError {
        self.sink.record(&DeviceEvent::OperationRejected {
            name: name.to_string(),
            reason: err.to_string(),
        });
        err
    }
}

impl QuantumDevice for TileDevice {
    fn allocate_qubit(&mut self) -> DeviceResult<QubitId> {
        let id = self.state.allocate_one()?;
        self.sink.record(&DeviceEvent::QubitsAllocated {
            ids: vec![id],
            num_qubits: self.state.num_qubits(),
        });
        Ok(id)
    }

    fn allocate_qubits(&mut self, n: usize) -> DeviceResult<Vec<QubitId>> {
        let ids = self.state.allocate_many(n)?;
        if !ids.is_empty() {
            self.sink.record(&DeviceEvent::QubitsAllocated {
                ids: ids.clone(),
                num_qubits: self.state.num_qubits(),
            });
        }
        Ok(ids)
    }

    fn release_qubit(&mut self, id: QubitId) {
        if self.state.num_qubits() == 0 {
            return;
        }
        self.state.release_one(id);
        self.sink.record(&DeviceEvent::QubitReleased {
            requested: id,
            num_qubits: self.state.num_qubits(),
        });
    }

    fn release_all_qubits(&mut self) {
        self.state.release_all();
        self.sink.record(&DeviceEvent::AllQubitsReleased);
    }

    fn num_qubits(&self) -> usize {
        self.state.num_qubits()
    }

    fn set_shots(&mut self, shots: usize) {
        self.sink.record(&DeviceEvent::ShotsIgnored { requested: shots });
    }

    fn shots(&self) -> usize {
        0
    }

    fn named_operation(&mut self, request: &GateRequest) -> DeviceResult<()> {
        let gate = request
            .validate()
            .map_err(|err| self.reject(&request.name, err))?;
        match gate {
            SupportedGate::Hadamard { wire } => {
                if let Err(err) = self.apply_hadamard(wire) {
                    return Err(self.reject(&request.name, err));
                }
            }
        }
        Ok(())
    }

    fn measure(&mut self, wire: usize, postselect: i32) -> DeviceResult<bool> {
        let outcome = self.measurer.measure(&mut self.state, wire, postselect)?;
        self.sink.record(&DeviceEvent::Measured {
            wire,
            outcome,
            stub: self.measurer.mode() == MeasurementMode::DeterministicStub,
        });
        Ok(outcome)
    }

    fn start_recording(&mut self) {
        self.recording = true;
        self.sink.record(&DeviceEvent::RecordingToggled { active: true });
    }

    fn stop_recording(&mut self) {
        self.recording = false;
        self.sink.record(&DeviceEvent::RecordingToggled { active: false });
    }

    fn read_state(&self, target: &mut [Complex64]) -> DeviceResult<()> {
        self.state.read_into(target)?;
        self.sink.record(&DeviceEvent::StateRead { len: target.len() });
        Ok(())
    }
}

impl std::fmt::Debug for TileDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileDevice")
            .field("num_qubits", &self.state.num_qubits())
            .field("accelerator", &self.accelerator)
            .field("dispatcher", &self.dispatcher)
            .field("recording", &self.recording)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TileDevice`].
#[derive(Default)]
pub struct TileDeviceBuilder {
    kwargs: String,
    config: DeviceConfig,
    sink: Option<Arc<dyn EventSink>>,
    accelerator: Option<Arc<dyn GateAccelerator>>,
}

impl TileDeviceBuilder {
    /// Kwargs string reported in the construction event.
    pub fn kwargs(mut self, kwargs: impl Into<String>) -> Self {
        self.kwargs = kwargs.into();
        self
    }

    pub fn config(mut self, config: DeviceConfig) -> Self {
        self.config = config;
        self
    }

    /// Send events to `sink` instead of `tracing`.
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Use `accelerator` instead of the one the configuration describes.
    ///
    /// Availability rules still apply: with the `xrt` kind the bitstream must
    /// exist.
    pub fn accelerator(mut self, accelerator: Arc<dyn GateAccelerator>) -> Self {
        self.accelerator = Some(accelerator);
        self
    }

    pub fn build(self) -> DeviceResult<TileDevice> {
        let TileDeviceBuilder {
            kwargs,
            config,
            sink,
            accelerator,
        } = self;
        config.validate()?;
        let sink = sink.unwrap_or_else(|| Arc::new(TracingSink));
        sink.record(&DeviceEvent::Constructed { kwargs });

        let resolved = AcceleratorConfig::resolve(&config, accelerator);
        sink.record(&DeviceEvent::AcceleratorResolved {
            bitstream: resolved.config.bitstream.clone(),
            available: resolved.config.available,
            reason: resolved.reason.clone(),
        });

        let precision = PrecisionRoundTrip::new(config.precision_tolerance);
        let dispatcher = match resolved.service {
            Some(service) => GateDispatcher::with_accelerator(
                service,
                resolved.config.bitstream.clone(),
                sink.clone(),
            ),
            None => GateDispatcher::cpu_only(sink.clone()),
        }
        .with_precision(precision)
        .verify_output(config.verify_accelerator_output);

        Ok(TileDevice {
            state: Statevector::with_max_qubits(config.max_qubits),
            measurer: Measurer::new(config.measurement, config.seed),
            accelerator: resolved.config,
            dispatcher,
            sink,
            recording: false,
            config,
        })
    }
}
