use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;

use rowdex::core::types::Value;
use rowdex::query::operator::{FilterOptions, FilterValue, Operator};
use rowdex::store::table::Table;

/// Helper to create a row with a few indexed fields
fn create_test_row(id: u64) -> HashMap<String, Value> {
    let mut rng = rand::thread_rng();
    HashMap::from([
        ("name".to_string(), Value::from(format!("row-{}", id))),
        (
            "category".to_string(),
            Value::from(format!("category_{}", id % 10)),
        ),
        ("score".to_string(), Value::from(rng.gen_range(0.0..100.0))),
        ("active".to_string(), Value::from(id % 2 == 0)),
    ])
}

fn populated_table(rows: u64) -> Table {
    let table = Table::new(Duration::from_secs(3600));
    for id in 0..rows {
        table.insert(create_test_row(id));
    }
    table
}

/// Benchmark single row insertion
fn bench_single_insert(c: &mut Criterion) {
    let table = Table::new(Duration::from_secs(3600));

    c.bench_function("single_row_insert", |b| {
        let mut id = 0;
        b.iter(|| {
            table.insert(create_test_row(id));
            id += 1;
        });
    });
}

/// Benchmark batch insertion at several batch sizes
fn bench_batch_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_insert");

    for batch_size in [10u64, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let table = Table::new(Duration::from_secs(3600));
                b.iter(|| {
                    let batch: Vec<_> = (0..batch_size).map(create_test_row).collect();
                    table.insert_batch(batch).unwrap();
                });
            },
        );
    }

    group.finish();
}

/// Benchmark index probes vs value scans on a populated table
fn bench_filter(c: &mut Criterion) {
    let table = populated_table(10_000);
    let mut group = c.benchmark_group("filter");

    group.bench_function("equals_probe", |b| {
        b.iter(|| {
            black_box(table.filter(
                Operator::Equals,
                "category",
                FilterValue::from("category_3"),
                FilterOptions::default(),
            ))
        });
    });

    group.bench_function("range_scan", |b| {
        b.iter(|| {
            black_box(table.filter(
                Operator::Between,
                "score",
                FilterValue::from([25.0, 30.0]),
                FilterOptions::default(),
            ))
        });
    });

    group.bench_function("regex_scan", |b| {
        b.iter(|| {
            black_box(table.filter(
                Operator::RegExp,
                "name",
                FilterValue::from("^row-1..$"),
                FilterOptions::default(),
            ))
        });
    });

    group.finish();
}

/// Benchmark explain against the same predicates it estimates
fn bench_explain(c: &mut Criterion) {
    let table = populated_table(10_000);

    c.bench_function("explain_equals", |b| {
        b.iter(|| {
            black_box(table.explain(
                Operator::Equals,
                "category",
                &FilterValue::from("category_3"),
            ))
        });
    });
}

criterion_group!(
    benches,
    bench_single_insert,
    bench_batch_insert,
    bench_filter,
    bench_explain
);
criterion_main!(benches);
