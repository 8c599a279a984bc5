//! Cost-table benchmarks over report-sized populations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spx_fp::distribution::{cost_table_with_cache, MergeCache};

fn benchmark_cost_table(c: &mut Criterion) {
    // Population k·t for a mid-sized few-time parameter set.
    let (t, k) = (1i64 << 10, 14i64);
    let population = t * k;

    c.bench_function("cost_table_cold_cache", |b| {
        b.iter(|| {
            let mut cache = MergeCache::new();
            black_box(cost_table_with_cache(
                black_box(population),
                black_box(k),
                &mut cache,
            ));
        });
    });

    c.bench_function("cost_table_warm_cache", |b| {
        let mut cache = MergeCache::new();
        cost_table_with_cache(population, k, &mut cache);
        b.iter(|| {
            black_box(cost_table_with_cache(
                black_box(population),
                black_box(k),
                &mut cache,
            ));
        });
    });
}

criterion_group!(benches, benchmark_cost_table);
criterion_main!(benches);
