//! Micro-benchmark of batched insert throughput, pre- and post-growth,
//! matching the benchmark harnesses present elsewhere in this corpus
//! (`sky-bench`/`tdb-bench` in the teacher's workspace).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use htdivchn::HtConfig;

fn bench_insert_batch_pre_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_batch/pre_growth");
    for &batch_size in &[64usize, 256, 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| {
                b.iter_batched(
                    || {
                        let table = HtConfig::new()
                            .with_capacity(batch_size as u64 * 4)
                            .with_alpha(1, 1)
                            .build::<u64, u64>()
                            .unwrap();
                        let keys: Vec<u64> = (0..batch_size as u64).collect();
                        let values: Vec<u64> = keys.clone();
                        (table, keys, values)
                    },
                    |(table, keys, values)| {
                        table.insert_batch(black_box(&keys), black_box(&values));
                        table
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

fn bench_insert_batch_across_a_growth_episode(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_batch/across_growth");
    group.bench_function("40k_distinct_keys_no_reserve", |b| {
        b.iter_batched(
            || {
                let table = HtConfig::new().with_alpha(1, 1).build::<u64, u64>().unwrap();
                let keys: Vec<u64> = (0..40_000).collect();
                let values: Vec<u64> = keys.clone();
                (table, keys, values)
            },
            |(table, keys, values)| {
                table.insert_batch(black_box(&keys), black_box(&values));
                table
            },
            criterion::BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn bench_search_after_insert(c: &mut Criterion) {
    let table = HtConfig::new().with_capacity(100_000).with_alpha(1, 1).build::<u64, u64>().unwrap();
    let keys: Vec<u64> = (0..100_000).collect();
    let values: Vec<u64> = keys.clone();
    table.insert_batch(&keys, &values);

    c.bench_function("search/100k_table", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let k = i % 100_000;
            i += 1;
            black_box(table.search(black_box(&k)))
        });
    });
}

criterion_group!(
    benches,
    bench_insert_batch_pre_growth,
    bench_insert_batch_across_a_growth_episode,
    bench_search_after_insert,
);
criterion_main!(benches);
