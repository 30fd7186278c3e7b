// SPDX-License-Identifier: Apache-2.0
//! Benchmarks for Hadamard dispatch.
//!
//! Run with: cargo bench -p qtile-device

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qtile_accel::TileEmulator;
use qtile_device::{DeviceEvent, EventSink, GateDispatcher};
use qtile_sim::{PrecisionRoundTrip, Statevector};

/// Drops every event.
struct Discard;

impl EventSink for Discard {
    fn record(&self, _event: &DeviceEvent) {}
}

fn register(num_qubits: usize) -> Statevector {
    let mut state = Statevector::new();
    state.allocate_many(num_qubits).unwrap();
    state
}

/// CPU kernel against the emulated accelerator (including the f32 round trip).
fn bench_dispatch_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("hadamard_dispatch");
    let sink: Arc<dyn EventSink> = Arc::new(Discard);

    for num_qubits in [4usize, 10, 16, 20] {
        group.bench_with_input(BenchmarkId::new("cpu", num_qubits), &num_qubits, |b, &n| {
            let mut dispatcher = GateDispatcher::cpu_only(sink.clone());
            let mut state = register(n);
            b.iter(|| dispatcher.apply_hadamard(&mut state, black_box(n - 1)).unwrap());
        });

        group.bench_with_input(
            BenchmarkId::new("emulator", num_qubits),
            &num_qubits,
            |b, &n| {
                let mut dispatcher = GateDispatcher::with_accelerator(
                    Arc::new(TileEmulator::new()),
                    "libadf.xclbin",
                    sink.clone(),
                );
                let mut state = register(n);
                b.iter(|| dispatcher.apply_hadamard(&mut state, black_box(n - 1)).unwrap());
            },
        );
    }

    group.finish();
}

/// Cost of the precision round trip alone.
fn bench_round_trip(c: &mut Criterion) {
    let precision = PrecisionRoundTrip::default();
    let state = register(16);
    c.bench_function("round_trip_16q", |b| {
        b.iter(|| precision.upcast(&precision.downcast(black_box(state.amplitudes()))));
    });
}

criterion_group!(benches, bench_dispatch_paths, bench_round_trip);
criterion_main!(benches);
