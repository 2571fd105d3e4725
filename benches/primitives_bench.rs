//! Benchmark for the concurrency primitives: AtomicValue, LazyAsyncValue and
//! the delay strategies.

use cadence::atomic::AtomicValue;
use cadence::cancel::CancelSignal;
use cadence::delay::DelayKind;
use cadence::lazy::LazyAsyncValue;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// =============================================================================
// AtomicValue Benchmarks
// =============================================================================

fn benchmark_atomic_value(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("atomic_value");

    let counter = AtomicValue::new(0_u64);
    group.bench_function("increment_uncontended", |bencher| {
        bencher.iter(|| black_box(counter.increment()));
    });

    let float = AtomicValue::new(0.0_f64);
    group.bench_function("float_add_uncontended", |bencher| {
        bencher.iter(|| black_box(float.add(0.5)));
    });

    for threads in [2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("increment_contended", threads),
            &threads,
            |bencher, &threads| {
                bencher.iter(|| {
                    let counter = Arc::new(AtomicValue::new(0_u64));
                    let handles: Vec<_> = (0..threads)
                        .map(|_| {
                            let counter = Arc::clone(&counter);
                            thread::spawn(move || {
                                for _ in 0..1_000 {
                                    counter.increment();
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                    black_box(counter.get())
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// LazyAsyncValue Benchmarks
// =============================================================================

fn benchmark_lazy_async_value(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("lazy_async_value");

    group.bench_function("first_access", |bencher| {
        bencher.iter(|| {
            let lazy = LazyAsyncValue::new(|| async { 42_u64 });
            black_box(lazy.get_value_blocking().unwrap())
        });
    });

    let created = LazyAsyncValue::new(|| async { String::from("cached") });
    created.get_value_blocking().unwrap();
    group.bench_function("created_access", |bencher| {
        bencher.iter(|| black_box(created.get()));
    });

    group.finish();
}

// =============================================================================
// Delay Strategy Benchmarks
// =============================================================================

fn benchmark_delay_strategies(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("delay_strategy");
    group.sample_size(20);

    let signal = CancelSignal::new();
    for kind in DelayKind::ALL {
        let strategy = kind.strategy();
        group.bench_with_input(BenchmarkId::new("wait_1ms", kind), &kind, |bencher, _| {
            bencher.iter(|| black_box(strategy.wait(Duration::from_millis(1), &signal)));
        });
    }

    let triggered = CancelSignal::new();
    triggered.trigger();
    for kind in DelayKind::ALL {
        let strategy = kind.strategy();
        group.bench_with_input(BenchmarkId::new("already_cancelled", kind), &kind, |bencher, _| {
            bencher.iter(|| black_box(strategy.wait(Duration::from_secs(1), &triggered)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_atomic_value,
    benchmark_lazy_async_value,
    benchmark_delay_strategies
);
criterion_main!(benches);
