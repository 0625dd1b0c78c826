use armature_ot::{
    DocumentState, Operation, TextAttributes, TransformContext, Transformer, WireMessage,
    calculate_diff,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn concurrent_inserts(n: usize) -> Vec<Operation> {
    (0..n)
        .map(|i| Operation::insert(format!("user-{}", i % 8), i * 3, "abc"))
        .collect()
}

fn bench_transform_pair(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform_pair");
    let engine = Transformer::default();
    let ctx = TransformContext::default();

    let insert = Operation::insert("alice", 40, "hello");
    let delete = Operation::delete("bob", 20, 30);
    let format = Operation::format("carol", 10, 50, TextAttributes::new().bold(true));

    group.bench_function("insert_vs_insert", |b| {
        let other = Operation::insert("bob", 40, "world");
        b.iter(|| engine.transform(black_box(&insert), black_box(&other), &ctx).unwrap())
    });

    group.bench_function("insert_inside_delete", |b| {
        b.iter(|| engine.transform(black_box(&insert), black_box(&delete), &ctx).unwrap())
    });

    group.bench_function("format_vs_delete", |b| {
        b.iter(|| engine.transform(black_box(&format), black_box(&delete), &ctx).unwrap())
    });

    group.finish();
}

fn bench_transform_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform_against_operations");
    let engine = Transformer::default();
    let ctx = TransformContext::default();
    let op = Operation::insert("zed", 1, "x");

    for n in [10usize, 100, 1000] {
        let concurrent = concurrent_inserts(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &concurrent, |b, ops| {
            b.iter(|| {
                engine
                    .transform_against_operations(black_box(&op), black_box(ops), &ctx)
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_operation");
    let state = DocumentState::new("lorem ipsum dolor sit amet ".repeat(400));
    let formatted = state
        .apply(&Operation::format("a", 0, 5000, TextAttributes::new().italic(true)))
        .unwrap();

    group.bench_function("insert_plain", |b| {
        let op = Operation::insert("a", 5000, "hello");
        b.iter(|| black_box(&state).apply(black_box(&op)).unwrap())
    });

    group.bench_function("delete_through_spans", |b| {
        let op = Operation::delete("a", 4000, 2000);
        b.iter(|| black_box(&formatted).apply(black_box(&op)).unwrap())
    });

    group.bench_function("format_split", |b| {
        let op = Operation::format("a", 2500, 100, TextAttributes::new().bold(true));
        b.iter(|| black_box(&formatted).apply(black_box(&op)).unwrap())
    });

    group.finish();
}

fn bench_diff_and_wire(c: &mut Criterion) {
    let base = DocumentState::new("");
    let edited = (0..200).fold(base.clone(), |state, i| {
        state
            .apply(&Operation::insert("a", i, "x"))
            .unwrap_or(state)
    });

    c.bench_function("calculate_diff_200", |b| {
        b.iter(|| calculate_diff(black_box(&base), black_box(&edited)))
    });

    let msg = WireMessage::Submit {
        doc_id: "doc".to_string(),
        base_version: 42,
        operation: Operation::insert("alice", 7, "hello"),
    };
    let frame = msg.to_bytes().unwrap();

    c.bench_function("wire_encode", |b| b.iter(|| black_box(&msg).to_bytes().unwrap()));
    c.bench_function("wire_decode", |b| {
        b.iter(|| WireMessage::from_bytes(black_box(&frame)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_transform_pair,
    bench_transform_fold,
    bench_apply,
    bench_diff_and_wire
);
criterion_main!(benches);
