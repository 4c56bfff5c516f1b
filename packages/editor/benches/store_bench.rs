use blockwright_editor::{BlockId, BlockType, DocumentId, DocumentStore, PropertyValue, Registry};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

fn populated(blocks: usize) -> (DocumentStore, Vec<BlockId>) {
    let mut store = DocumentStore::empty(Arc::new(Registry::builtin()), DocumentId::from("bench"));
    let types = [BlockType::from("heading"), BlockType::from("paragraph")];
    let ids = (0..blocks)
        .map(|i| store.insert_block(&types[i % 2], i).unwrap())
        .collect();
    (store, ids)
}

fn insert_blocks(c: &mut Criterion) {
    c.bench_function("insert_100_blocks", |b| {
        b.iter(|| populated(black_box(100)))
    });
}

fn reorder_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("reorder");
    for size in [10, 100, 1_000] {
        let (mut store, ids) = populated(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut flip = false;
            b.iter(|| {
                flip = !flip;
                let to = if flip { size - 1 } else { 0 };
                store.reorder_block(black_box(&ids[0]), to).unwrap()
            })
        });
    }
    group.finish();
}

fn update_property(c: &mut Criterion) {
    let (mut store, ids) = populated(500);
    let mut n = 0u64;
    c.bench_function("update_property_500_blocks", |b| {
        b.iter(|| {
            n += 1;
            store
                .update_property(black_box(&ids[250]), "text", PropertyValue::from(format!("edit {}", n)))
                .unwrap()
        })
    });
}

fn snapshot(c: &mut Criterion) {
    let (store, _) = populated(1_000);
    c.bench_function("snapshot_1000_blocks", |b| b.iter(|| black_box(store.snapshot())));
}

criterion_group!(benches, insert_blocks, reorder_blocks, update_property, snapshot);
criterion_main!(benches);
