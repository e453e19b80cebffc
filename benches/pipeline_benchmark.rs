//! Benchmarks for hashing and table normalization.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use untable::{ContentHash, RawTable, TableNormalizer};

/// Benchmark content hashing at various payload sizes.
fn bench_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_hash");

    for size_kb in [16, 256, 1024].iter() {
        let data = vec![0xABu8; size_kb * 1024];
        group.bench_function(format!("{}kb", size_kb), |b| {
            b.iter(|| ContentHash::of_bytes(black_box(&data)));
        });
    }

    group.finish();
}

/// Benchmark normalization of tables at various row counts.
fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let normalizer = TableNormalizer::new();

    for rows in [10, 100, 1000].iter() {
        let mut cells: Vec<Vec<Option<String>>> =
            vec![vec![Some("Name".into()), Some("Value".into()), None]];
        for i in 0..*rows {
            cells.push(vec![
                Some(format!("row {}", i)),
                Some(format!("{}", i * 7)),
                None,
            ]);
        }
        let table = RawTable::new(1, cells);

        group.bench_function(format!("{}_rows", rows), |b| {
            b.iter(|| normalizer.normalize(black_box(&table)));
        });
    }

    group.finish();
}

/// Benchmark the ragged path: rows needing truncation and padding.
fn bench_normalize_ragged(c: &mut Criterion) {
    let normalizer = TableNormalizer::new();
    let mut cells: Vec<Vec<Option<String>>> = vec![vec![
        Some("A".into()),
        Some("B".into()),
        Some("C".into()),
    ]];
    for i in 0..500 {
        let width = 1 + (i % 5);
        cells.push((0..width).map(|j| Some(format!("c{}", j))).collect());
    }
    let table = RawTable::new(1, cells);

    c.bench_function("normalize_ragged_500", |b| {
        b.iter(|| normalizer.normalize(black_box(&table)));
    });
}

criterion_group!(
    benches,
    bench_hashing,
    bench_normalize,
    bench_normalize_ragged
);
criterion_main!(benches);
