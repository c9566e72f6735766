//! Benchmarks for graph resolution.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use taskflow::core::Outputs;
use taskflow::graph::GraphResolver;
use taskflow::units::{Unit, UnitMap};

fn unit(id: String, needs: Vec<String>) -> Unit {
    Unit::builder(id)
        .needs(needs)
        .run(|_ctx| async { Ok(Outputs::new()) })
        .build()
        .expect("valid unit")
}

/// `u0 <- u1 <- ... <- u{n-1}`
fn chain(n: usize) -> UnitMap {
    (0..n)
        .map(|i| {
            let needs = if i == 0 { vec![] } else { vec![format!("u{}", i - 1)] };
            unit(format!("u{i}"), needs)
        })
        .collect()
}

/// Layers of `width` units, each needing every unit of the layer below.
fn layered(layers: usize, width: usize) -> UnitMap {
    (0..layers)
        .flat_map(|layer| (0..width).map(move |w| (layer, w)))
        .map(|(layer, w)| {
            let needs = if layer == 0 {
                vec![]
            } else {
                (0..width).map(|p| format!("l{}-{p}", layer - 1)).collect()
            };
            unit(format!("l{layer}-{w}"), needs)
        })
        .collect()
}

fn resolver_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_chain");
    for n in [10, 100, 1_000] {
        let map = chain(n);
        let target = format!("u{}", n - 1);
        group.bench_with_input(BenchmarkId::from_parameter(n), &map, |b, map| {
            b.iter(|| GraphResolver::resolve(black_box(map), [target.as_str()]));
        });
    }
    group.finish();

    let map = layered(10, 10);
    c.bench_function("resolve_all_layered_10x10", |b| {
        b.iter(|| GraphResolver::resolve_all(black_box(&map)));
    });
}

criterion_group!(benches, resolver_benchmark);
criterion_main!(benches);
