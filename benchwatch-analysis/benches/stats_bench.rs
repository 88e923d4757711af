//! Comparator micro-benchmarks: interval estimation and the pooled t-test
//! dominate the per-pass cost on large reports.

use benchwatch_analysis::stats::{pooled_t_test, required_sample_count, sample_stats};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn sample(n: usize) -> Vec<f64> {
    // Deterministic pseudo-noise around 60.0.
    (0..n)
        .map(|i| 60.0 + (i.wrapping_mul(2_654_435_761) % 1000) as f64 / 1000.0)
        .collect()
}

fn bench_sample_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_stats");
    for n in [3usize, 10, 100, 1000] {
        let data = sample(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &data, |b, data| {
            b.iter(|| sample_stats(black_box(data), 0.95));
        });
    }
    group.finish();
}

fn bench_pooled_t_test(c: &mut Criterion) {
    let mut group = c.benchmark_group("pooled_t_test");
    for n in [3usize, 10, 100] {
        let a = sample(n);
        let b_side = sample(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &(a, b_side), |b, (x, y)| {
            b.iter(|| pooled_t_test(black_box(x), black_box(y)));
        });
    }
    group.finish();
}

fn bench_required_sample_count(c: &mut Criterion) {
    let data = sample(10);
    c.bench_function("required_sample_count", |b| {
        b.iter(|| required_sample_count(black_box(&data), 0.025, 0.95));
    });
}

criterion_group!(
    benches,
    bench_sample_stats,
    bench_pooled_t_test,
    bench_required_sample_count
);
criterion_main!(benches);
