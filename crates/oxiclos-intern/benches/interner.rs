//! Interning benchmarks.
//!
//! - Interning new names (hash insert and leak)
//! - Interning duplicates (hash lookup only)
//! - Resolving ids back to symbols

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use oxiclos_intern::Interner;

fn bench_intern_new(c: &mut Criterion) {
    let mut group = c.benchmark_group("intern_new");

    for size in [10, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let names: Vec<String> = (0..size).map(|i| format!("slot_{i}")).collect();

            b.iter(|| {
                let mut interner = Interner::with_capacity(size);
                for name in &names {
                    black_box(interner.intern(name));
                }
            });
        });
    }

    group.finish();
}

fn bench_intern_duplicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("intern_duplicates");

    for size in [10, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let names: Vec<String> = (0..size).map(|i| format!("slot_{i}")).collect();
            let mut interner = Interner::new();
            for name in &names {
                interner.intern(name);
            }

            b.iter(|| {
                for name in &names {
                    black_box(interner.intern(name));
                }
            });
        });
    }

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut interner = Interner::new();
    let ids: Vec<u32> = (0..1_000)
        .map(|i| interner.intern(&format!("slot_{i}")).as_u32())
        .collect();

    c.bench_function("resolve_1000", |b| {
        b.iter(|| {
            for &id in &ids {
                black_box(interner.resolve(id));
            }
        });
    });
}

criterion_group!(benches, bench_intern_new, bench_intern_duplicates, bench_resolve);
criterion_main!(benches);
