//! Benchmarks for the signal pipeline and its heavier stages.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use signalcore::prelude::*;

/// Generate deterministic pseudo-random daily bars
fn generate_bars(n: usize) -> Vec<Bar> {
  let mut bars = Vec::with_capacity(n);
  let mut price = 500.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0; // Deterministic "random"
    let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

    let o = price;
    let c = price + change;
    let h = o.max(c) + volatility * 0.5;
    let l = o.min(c) - volatility * 0.5;
    let v = 10_000.0 + ((i * 37) % 500) as f64 * 20.0;

    bars.push(Bar::new(i as i64 * 86_400_000, o, h, l, c, v));
    price = c;
  }

  bars
}

fn bench_full_analysis(c: &mut Criterion) {
  let bars = generate_bars(1000);
  let engine = EngineBuilder::new().build().unwrap();
  let feed = SyntheticFeed::default();

  c.bench_function("analyze_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(engine.analyze(black_box(&bars), &feed));
    })
  });
}

fn bench_scaling(c: &mut Criterion) {
  let engine = EngineBuilder::new().build().unwrap();
  let feed = SyntheticFeed::default();

  let mut group = c.benchmark_group("scaling");

  for size in [250, 500, 1000, 5000].iter() {
    let bars = generate_bars(*size);

    group.bench_with_input(BenchmarkId::new("analyze", size), size, |b, _| {
      b.iter(|| {
        let _ = black_box(engine.analyze(black_box(&bars), &feed));
      })
    });
  }

  group.finish();
}

fn bench_parallel_analysis(c: &mut Criterion) {
  let bars1 = generate_bars(1000);
  let bars2 = generate_bars(1000);
  let bars3 = generate_bars(1000);
  let bars4 = generate_bars(1000);

  let engine = EngineBuilder::new().build().unwrap();
  let feed = SyntheticFeed::default();

  let instruments: Vec<(&str, &[Bar])> = vec![
    ("SYM1", bars1.as_slice()),
    ("SYM2", bars2.as_slice()),
    ("SYM3", bars3.as_slice()),
    ("SYM4", bars4.as_slice()),
  ];

  c.bench_function("parallel_analyze_4_instruments", |b| {
    b.iter(|| {
      let _ = black_box(analyze_parallel(black_box(&engine), black_box(instruments.clone()), &feed));
    })
  });
}

fn bench_pattern_history(c: &mut Criterion) {
  let bars = generate_bars(1000);
  let classifier = ClassifierBuilder::new().with_all_defaults().build().unwrap();

  c.bench_function("scan_history_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(classifier.scan_history(black_box(&bars)));
    })
  });
}

fn bench_calculus(c: &mut Criterion) {
  let bars = generate_bars(1000);
  let detector = CalculusDetector::default();

  c.bench_function("calculus_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(detector.analyze(black_box(&bars), 0.0));
    })
  });
}

criterion_group!(
  benches,
  bench_full_analysis,
  bench_scaling,
  bench_parallel_analysis,
  bench_pattern_history,
  bench_calculus,
);

criterion_main!(benches);
