//! Benchmarks for span calibration and sensitivities.
//!
//! Run with: cargo bench -p stretch-spline

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use stretch_spline::prelude::*;

// =============================================================================
// TEST DATA GENERATORS
// =============================================================================

fn create_knots(n: usize) -> (Vec<f64>, Vec<f64>) {
    let tenors = [0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 7.0, 10.0, 15.0, 20.0, 30.0];
    let x: Vec<f64> = (0..n)
        .map(|i| {
            let base = tenors[i % tenors.len()];
            base + 30.0 * (i / tenors.len()) as f64
        })
        .collect();
    let y: Vec<f64> = x
        .iter()
        .map(|t| 0.03 + 0.02 * (1.0 - (-t / 5.0).exp()) + 0.001 * (t * 0.7).sin())
        .collect();
    (x, y)
}

const SIZES: [usize; 3] = [6, 11, 22];

// =============================================================================
// CALIBRATION
// =============================================================================

fn bench_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_calibration");

    for &size in &SIZES {
        let (x, y) = create_knots(size);
        group.throughput(Throughput::Elements(size as u64));

        for boundary in [BoundaryCondition::Floating, BoundaryCondition::Natural] {
            let builder = SpanBuilder::new("bench").with_boundary(boundary);
            group.bench_with_input(
                BenchmarkId::new(boundary.to_string(), size),
                &(x.clone(), y.clone()),
                |b, (x, y)| b.iter(|| builder.create_calibrated(black_box(x), black_box(y))),
            );
        }
    }

    group.finish();
}

fn bench_local_control(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_control");
    let (x, y) = create_knots(22);
    group.throughput(Throughput::Elements(22));

    for generator in [
        SlopeGenerator::Bessel,
        SlopeGenerator::Hyman83,
        SlopeGenerator::Akima,
    ] {
        let builder = SpanBuilder::new("bench");
        group.bench_function(generator.name(), |b| {
            b.iter(|| builder.create_local_control(black_box(&x), black_box(&y), generator));
        });
    }

    group.finish();
}

fn bench_tension_family(c: &mut Criterion) {
    let (x, y) = create_knots(11);
    let builder = SpanBuilder::new("bench").with_params(SegmentBuilderParams::new(
        BasisSetParams::ExponentialTension { tension: 2.0 },
    ));

    c.bench_function("exponential_tension_11", |b| {
        b.iter(|| builder.create_calibrated(black_box(&x), black_box(&y)));
    });
}

// =============================================================================
// EVALUATION AND SENSITIVITIES
// =============================================================================

fn bench_evaluation(c: &mut Criterion) {
    let (x, y) = create_knots(11);
    let span = SpanBuilder::new("bench").create_calibrated(&x, &y).unwrap();
    let grid: Vec<f64> = (0..=300).map(|i| 0.25 + f64::from(i) * 0.099).collect();

    c.bench_function("response_value_grid_301", |b| {
        b.iter(|| {
            grid.iter()
                .map(|&t| span.response_value(black_box(t)).unwrap_or(0.0))
                .sum::<f64>()
        });
    });
}

fn bench_jacobian(c: &mut Criterion) {
    let mut group = c.benchmark_group("jacobian");
    group.sample_size(50);

    for &size in &SIZES {
        let (x, y) = create_knots(size);
        let natural = SpanBuilder::new("bench")
            .with_boundary(BoundaryCondition::Natural)
            .create_calibrated(&x, &y)
            .unwrap();
        let local = SpanBuilder::new("bench")
            .create_local_control(&x, &y, SlopeGenerator::Bessel)
            .unwrap();
        let mid = 0.5 * (x[0] + x[size - 1]);

        group.bench_with_input(BenchmarkId::new("natural", size), &natural, |b, span| {
            b.iter(|| span.jack_dresponse_dknot_responses(black_box(mid)));
        });
        group.bench_with_input(BenchmarkId::new("local", size), &local, |b, span| {
            b.iter(|| span.jack_dresponse_dknot_responses(black_box(mid)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_sequential,
    bench_local_control,
    bench_tension_family,
    bench_evaluation,
    bench_jacobian,
);

criterion_main!(benches);
