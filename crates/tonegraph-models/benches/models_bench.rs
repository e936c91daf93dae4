//! Criterion benchmarks for the circuit models.
//!
//! Run with: `cargo bench -p tonegraph-models`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tonegraph_core::Processor;
use tonegraph_models::{CryBaby, DiodeClipper};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

fn generate_test_signal(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect()
}

fn bench_processor(c: &mut Criterion, name: &str, mut make: impl FnMut() -> Box<dyn Processor>) {
    let mut group = c.benchmark_group(name);

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);
        let mut processor = make();
        processor.prepare(SAMPLE_RATE, block_size);

        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, _| {
                let mut left = input.clone();
                let mut right = input.clone();
                b.iter(|| {
                    left.copy_from_slice(&input);
                    right.copy_from_slice(&input);
                    processor.process_audio(black_box(&mut left), black_box(&mut right));
                    black_box(left[0])
                })
            },
        );
    }

    group.finish();
}

fn bench_diode_clipper(c: &mut Criterion) {
    bench_processor(c, "diode_clipper", || {
        let clipper = DiodeClipper::new();
        clipper.params().set("drive", 0.8);
        Box::new(clipper)
    });
}

fn bench_cry_baby(c: &mut Criterion) {
    bench_processor(c, "cry_baby", || Box::new(CryBaby::new()));
}

/// Worst case for the wah: the pedal moves every block, so every sub-block
/// restamps and inverts the conductance matrix.
fn bench_cry_baby_sweeping(c: &mut Criterion) {
    let mut group = c.benchmark_group("cry_baby_sweeping");
    let input = generate_test_signal(256);
    let mut wah = CryBaby::new();
    wah.prepare(SAMPLE_RATE, 256);
    let mut position = 0.0f32;

    group.bench_function("block256", |b| {
        let mut left = input.clone();
        let mut right = input.clone();
        b.iter(|| {
            position = if position > 0.5 { 0.0 } else { 1.0 };
            wah.params().set("control_freq", position);
            left.copy_from_slice(&input);
            right.copy_from_slice(&input);
            wah.process_audio(&mut left, &mut right);
            black_box(left[0])
        })
    });

    group.finish();
}

criterion_group!(benches, bench_diode_clipper, bench_cry_baby, bench_cry_baby_sweeping);
criterion_main!(benches);
