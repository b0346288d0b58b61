// Generic function dispatch benchmarks
//
// This benchmark suite measures:
// - Single-method dispatch on a user class
// - Dispatch cost as the inheritance chain deepens
// - next-method chains through every level of a hierarchy
// - Instance creation through the make protocol

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use oxiclos::{Class, Runtime, SlotSpec, Value};

// Builds `<level0>` .. `<level{depth}>`, each a subclass of the previous one
fn create_chain(rt: &Runtime, depth: usize) -> Vec<Class> {
    let mut classes: Vec<Class> = Vec::with_capacity(depth + 1);
    for i in 0..=depth {
        let supers: Vec<Class> = classes.last().cloned().into_iter().collect();
        let class = rt
            .define_class(&format!("<level{i}>"), &supers, &[])
            .unwrap();
        classes.push(class);
    }
    classes
}

/// Benchmark one applicable method
fn bench_single_dispatch(c: &mut Criterion) {
    let rt = Runtime::new();
    let point = rt
        .define_class(
            "<point>",
            &[],
            &[SlotSpec::new("x").init_keyword("x").init_value(Value::Int(0)).build(&rt)],
        )
        .unwrap();
    let get_x = rt.define_generic("get-x");
    rt.define_method(&get_x, &[point.clone()], false, |rt, args, _| {
        rt.slot_ref(&args[0], "x")
    })
    .unwrap();
    let p = rt.make(&point, &[rt.keyword("x"), Value::Int(3)]).unwrap();
    let args = [p];

    c.bench_function("single_dispatch", |b| {
        b.iter(|| black_box(rt.apply_generic(&get_x, black_box(&args)).unwrap()))
    });
}

/// Benchmark dispatch on instances of increasingly deep subclasses
fn bench_inheritance_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("inheritance_depth");

    for depth in [1, 5, 10, 20] {
        let rt = Runtime::new();
        let chain = create_chain(&rt, depth);
        let generic = rt.define_generic("depth-lookup");
        rt.define_method(&generic, &[chain[0].clone()], false, |_, _, _| {
            Ok(Value::Int(1))
        })
        .unwrap();
        let leaf = rt.make(&chain[depth], &[]).unwrap();
        let args = [leaf];

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| black_box(rt.apply_generic(&generic, black_box(&args)).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark a next-method chain with one method per level
fn bench_next_method_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("next_method_chain");

    for depth in [2, 8, 16] {
        let rt = Runtime::new();
        let chain = create_chain(&rt, depth);
        let generic = rt.define_generic("sum-levels");
        for class in &chain {
            rt.define_method(&generic, &[class.clone()], false, |rt, _, next| {
                let rest = if next.has_next() {
                    next.call(rt)?.as_int().unwrap_or(0)
                } else {
                    0
                };
                Ok(Value::Int(rest + 1))
            })
            .unwrap();
        }
        let leaf = rt.make(&chain[depth], &[]).unwrap();
        let args = [leaf];

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| black_box(rt.apply_generic(&generic, black_box(&args)).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark make, which itself dispatches three generics
fn bench_make(c: &mut Criterion) {
    let rt = Runtime::new();
    let point = rt
        .define_class(
            "<point>",
            &[],
            &[
                SlotSpec::new("x").init_keyword("x").init_value(Value::Int(0)).build(&rt),
                SlotSpec::new("y").init_keyword("y").init_value(Value::Int(0)).build(&rt),
            ],
        )
        .unwrap();
    let initargs = [rt.keyword("x"), Value::Int(1)];

    c.bench_function("make_instance", |b| {
        b.iter(|| black_box(rt.make(&point, black_box(&initargs)).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_single_dispatch,
    bench_inheritance_depth,
    bench_next_method_chain,
    bench_make
);
criterion_main!(benches);
