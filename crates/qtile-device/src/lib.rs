// SPDX-License-Identifier: Apache-2.0
//! `qtile-device`: statevector device with tile-array Hadamard offload.
//!
//! The device executes exactly one operation, a Hadamard on a single wire.
//! Each gate is offered to the tile accelerator first; if the accelerator is
//! absent, fails, times out or returns a buffer that does not check out, the
//! CPU kernel runs on the untouched state instead. Callers always observe a
//! valid post-gate state.
//!
//! # Layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`device`] | [`QuantumDevice`] contract and the [`TileDevice`] facade |
//! | [`dispatcher`] | Accelerator-or-CPU routing with fallback |
//! | [`config`] | Kwargs parsing and accelerator resolution |
//! | [`events`] | Injectable observability sink |
//! | [`measure`] | Deterministic stub and sampled measurement |
//! | [`request`] | Named-operation validation |
//! | [`capabilities`] | Introspection |
//! | [`ffi`] | C entry points |
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use qtile_accel::TileEmulator;
//! use qtile_device::{DeviceConfig, GateRequest, KernelPath, QuantumDevice, TileDevice};
//! use qtile_device::config::AcceleratorKind;
//!
//! let config = DeviceConfig {
//!     accelerator: AcceleratorKind::Emulated,
//!     ..DeviceConfig::default()
//! };
//! let mut device = TileDevice::builder()
//!     .config(config)
//!     .accelerator(Arc::new(TileEmulator::failing(-2)))
//!     .build()
//!     .unwrap();
//!
//! device.allocate_qubit().unwrap();
//! assert_eq!(device.apply_hadamard(0).unwrap(), KernelPath::CpuFallback);
//! device.named_operation(&GateRequest::hadamard(0)).unwrap();
//! assert_eq!(device.dispatch_stats().fallbacks, 2);
//! ```

pub mod capabilities;
pub mod config;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod ffi;
pub mod measure;
pub mod request;

pub use capabilities::DeviceCapabilities;
pub use config::{AcceleratorConfig, DeviceConfig};
pub use device::{QuantumDevice, TileDevice, TileDeviceBuilder};
pub use dispatcher::{DispatchStats, GateDispatcher, KernelPath};
pub use error::{DeviceError, DeviceResult};
pub use events::{DeviceEvent, EventSink, MemorySink, TracingSink};
pub use measure::{MeasurementMode, STUB_OUTCOME};
pub use request::{GateRequest, SupportedGate};
