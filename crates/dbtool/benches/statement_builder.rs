use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use dbtool::builder::{Connector, WhereBuilder, assemble};
use dbtool::{ColumnDefinition, TableDefinition};

/// `n` fragments `col0 = 0`, `col1 = 1`, ... alternating AND/OR.
fn build_filter(n: usize) -> WhereBuilder {
    let mut filter = WhereBuilder::new();
    for i in 0..n {
        filter.equals(&format!("col{i}"), i as i64);
        if i % 2 == 0 {
            filter.or();
        } else {
            filter.and();
        }
    }
    filter
}

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/assemble");

    for n in [1, 5, 10, 50, 100] {
        let fragments: Vec<String> = (0..n).map(|i| format!("col{i} = {i}")).collect();
        let connectors: Vec<Connector> = (0..n).map(|_| Connector::Or).collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(n),
            &(fragments, connectors),
            |b, (fragments, connectors)| {
                b.iter(|| black_box(assemble(fragments, connectors)));
            },
        );
    }

    group.finish();
}

fn bench_filter_build_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/filter_build_and_render");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let filter = build_filter(n);
                black_box(filter.build_clause());
            });
        });
    }

    group.finish();
}

fn bench_table_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/table_build");

    for n in [1, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut table = TableDefinition::new("bench");
                for i in 0..n {
                    table = table.column(
                        ColumnDefinition::new(format!("col{i}"))
                            .type_text()
                            .not_null()
                            .default_value("x"),
                    );
                }
                black_box(table.build().len());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_assemble,
    bench_filter_build_and_render,
    bench_table_build
);
criterion_main!(benches);
