//! Benchmarks for graph construction.
//!
//! These benchmarks measure:
//! - Sequential builds at several catalog sizes
//! - Parallel builds over the same objects split across catalogs
//! - Impact and cycle queries on a built graph

// Benchmark code - performance of the benchmark setup is not critical
#![allow(missing_docs)]
#![allow(clippy::format_push_string)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use sqlgraph::{AnalysisConfig, CanonicalKey, GraphBuilder, SqlObject};

/// Generate a procedure body that reads, writes, calls and runs dynamic SQL.
fn generate_procedure(index: usize, tables: usize, procedures: usize) -> String {
    let source = index % tables;
    let target = (index * 7 + 3) % tables;
    let callee = (index + 1) % procedures;
    let mut body = String::new();

    body.push_str(&format!(
        "CREATE PROCEDURE dbo.Proc{index} @id int AS\nBEGIN\n\
         SET NOCOUNT ON;\n\
         WITH recent AS (SELECT id, amount FROM dbo.Table{source} WHERE id > @id)\n\
         INSERT INTO dbo.Table{target} (id, amount)\n\
         SELECT r.id, SUM(r.amount) FROM recent r GROUP BY r.id;\n"
    ));
    body.push_str(&format!(
        "UPDATE t SET t.amount = s.amount\n\
         FROM dbo.Table{target} t JOIN dbo.Table{source} s ON s.id = t.id;\n"
    ));
    body.push_str(&format!(
        "IF EXISTS (SELECT 1 FROM dbo.Table{target}) EXEC dbo.Proc{callee} @id = @id;\n"
    ));
    body.push_str(&format!(
        "EXEC('DELETE FROM dbo.Table{source} WHERE amount < 0');\nEND\n"
    ));
    body
}

/// Objects spread evenly over `catalogs` catalogs.
fn generate_objects(catalogs: usize, tables: usize, procedures: usize) -> Vec<SqlObject> {
    let mut objects = Vec::with_capacity(catalogs * (tables + procedures));
    for c in 0..catalogs {
        let catalog = format!("Catalog{c}");
        for t in 0..tables {
            objects.push(SqlObject::table(catalog.as_str(), "dbo", format!("Table{t}")));
        }
        for p in 0..procedures {
            objects.push(SqlObject::procedure(
                catalog.as_str(),
                "dbo",
                format!("Proc{p}"),
                generate_procedure(p, tables, procedures),
            ));
        }
    }
    objects
}

fn bench_sequential_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_build");
    let builder = GraphBuilder::new(AnalysisConfig::default());

    for procedures in [50, 200, 800] {
        let objects = generate_objects(1, procedures / 2, procedures);
        group.throughput(Throughput::Elements(procedures as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(procedures),
            &objects,
            |b, objects| {
                b.iter(|| {
                    let build = builder.build(objects.clone()).expect("build");
                    black_box(build)
                });
            },
        );
    }

    group.finish();
}

fn bench_parallel_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalogs_800_procedures");
    let builder = GraphBuilder::new(AnalysisConfig::default());

    for catalogs in [1, 4, 8] {
        let objects = generate_objects(catalogs, 400 / catalogs, 800 / catalogs);
        group.bench_with_input(BenchmarkId::new("sequential", catalogs), &objects, |b, objects| {
            b.iter(|| black_box(builder.build(objects.clone()).expect("build")));
        });
        group.bench_with_input(BenchmarkId::new("parallel", catalogs), &objects, |b, objects| {
            b.iter(|| black_box(builder.build_parallel(objects.clone()).expect("build")));
        });
    }

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let build = GraphBuilder::default()
        .build(generate_objects(1, 200, 400))
        .expect("build");
    let table = CanonicalKey::new("Catalog0", "dbo", "Table0");

    c.bench_function("impact_full_depth", |b| {
        b.iter(|| black_box(build.graph.impact(&table, None)));
    });
    c.bench_function("find_cycles", |b| {
        b.iter(|| black_box(build.graph.find_cycles()));
    });
    c.bench_function("serialize_json", |b| {
        b.iter(|| black_box(serde_json::to_string(&build.graph).expect("serialize")));
    });
}

criterion_group!(
    benches,
    bench_sequential_build,
    bench_parallel_build,
    bench_queries,
);

criterion_main!(benches);
