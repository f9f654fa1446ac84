use criterion::{Criterion, black_box, criterion_group, criterion_main};
use dbtree_core::{Database, Project, SqlServer, Table, canonicalize, merge_at};

fn wide_project(servers: usize, dbs: usize, tables: usize, offset: usize) -> Project {
    let servers = (0..servers)
        .map(|s| {
            let databases = (0..dbs)
                .map(|d| {
                    let tables = (0..tables)
                        .map(|t| Table::new(&format!("table_{:04}", (t + offset) % (tables * 2))))
                        .collect();
                    Database::with_tables(&format!("db_{d:03}"), tables)
                })
                .collect();
            SqlServer::with_databases(&format!("server_{s:03}"), databases)
        })
        .collect();
    Project::with_servers("bench", servers)
}

fn bench_merge(c: &mut Criterion) {
    let existing = wide_project(10, 10, 50, 0);
    let incoming = wide_project(10, 10, 50, 25);

    c.bench_function("merge 10x10x50", |b| {
        b.iter(|| {
            merge_at(
                black_box(&existing),
                black_box(&incoming),
                "2026-10-18T09:30:00.000Z",
            )
        })
    });

    c.bench_function("canonicalize 10x10x50", |b| {
        b.iter(|| canonicalize(black_box(&incoming)))
    });
}

criterion_group!(benches, bench_merge);
criterion_main!(benches);
