use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlweave::expr::{col, compile, lit, Expr};
use sqlweave::{Database, Entity, OrmResult, TableDef, Value};

#[derive(Default)]
struct BenchRow {
    id: i64,
}

impl Entity for BenchRow {
    fn table() -> TableDef {
        let mut def = TableDef::new("bench", "bench_rows")
            .column("Id")
            .primary_key()
            .auto_id();
        for i in 0..32 {
            def = def.column(format!("Col{i}"));
        }
        def
    }

    fn get(&self, property: &str) -> Value {
        match property {
            "Id" => self.id.into(),
            _ => Value::Null,
        }
    }

    fn set(&mut self, property: &str, value: &Value) -> OrmResult<()> {
        if property == "Id" {
            self.id = value.to_i64(property)?;
        }
        Ok(())
    }
}

/// `(Col0 = 0) AND (Col1 = 1) AND ...` with `n` comparisons.
fn build_conjunction(n: usize) -> Expr {
    let mut expr = col(0, "Col0").eq(0i64);
    for i in 1..n {
        expr = expr.and(col(0, format!("Col{}", i % 32)).eq(i as i64));
    }
    expr
}

fn bench_compile_conjunction(c: &mut Criterion) {
    let scope = [sqlweave::schema::mapping::<BenchRow>().unwrap()];
    let mut group = c.benchmark_group("predicate/compile_conjunction");

    for n in [1, 5, 10, 50, 100] {
        let expr = build_conjunction(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &expr, |b, expr| {
            b.iter(|| black_box(compile(expr, &scope, false).unwrap()));
        });
    }

    group.finish();
}

fn bench_compile_in_list(c: &mut Criterion) {
    let scope = [sqlweave::schema::mapping::<BenchRow>().unwrap()];
    let mut group = c.benchmark_group("predicate/compile_in_list");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        let expr = lit(values).contains(col(0, "Id"));
        group.bench_with_input(BenchmarkId::from_parameter(n), &expr, |b, expr| {
            b.iter(|| black_box(compile(expr, &scope, false).unwrap()));
        });
    }

    group.finish();
}

fn bench_staged_to_sql(c: &mut Criterion) {
    let db = Database::new();
    let predicate = build_conjunction(10);

    c.bench_function("predicate/staged_to_sql", |b| {
        b.iter(|| {
            let stage = db
                .from::<BenchRow>()
                .unwrap()
                .filter(&predicate)
                .unwrap()
                .order_by_asc(&col(0, "Id"))
                .unwrap();
            black_box(stage.to_sql());
        });
    });
}

criterion_group!(
    benches,
    bench_compile_conjunction,
    bench_compile_in_list,
    bench_staged_to_sql
);
criterion_main!(benches);
