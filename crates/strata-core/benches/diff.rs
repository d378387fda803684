//! Benchmarks for scene tree diffing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strata_core::{diff_trees, prop, Rect, SceneNode};

fn list(keys: impl Iterator<Item = usize>, label_suffix: &str) -> SceneNode {
    SceneNode::element("list").with_children(keys.enumerate().map(|(row, k)| {
        SceneNode::element("row")
            .with_key(format!("row-{k}"))
            .with_bounds(Rect::new(0, row as i32, 40, 1))
            .with_child(SceneNode::text(format!("item {k}{label_suffix}")))
    }))
}

fn bench_diff_identical(c: &mut Criterion) {
    let tree = list(0..500, "");
    let copy = tree.clone();

    c.bench_function("diff_identical_500", |b| {
        b.iter(|| diff_trees(black_box(Some(&tree)), black_box(Some(&copy))))
    });
}

fn bench_diff_text_updates(c: &mut Criterion) {
    let old = list(0..500, "");
    let new = list(0..500, "*");

    c.bench_function("diff_text_updates_500", |b| {
        b.iter(|| diff_trees(black_box(Some(&old)), black_box(Some(&new))))
    });
}

fn bench_diff_keyed_rotation(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_keyed_rotation");
    for size in [10usize, 100, 1000] {
        let old = list(0..size, "");
        let new = list((0..size).map(|i| (i + size - 1) % size), "");
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| diff_trees(black_box(Some(&old)), black_box(Some(&new))))
        });
    }
    group.finish();
}

fn bench_diff_props(c: &mut Criterion) {
    let old = SceneNode::element("box")
        .with_prop(prop::FG, "red")
        .with_prop(prop::BOLD, true)
        .with_bounds(Rect::new(0, 0, 80, 24));
    let new = SceneNode::element("box")
        .with_prop(prop::FG, "blue")
        .with_bounds(Rect::new(1, 0, 80, 24));

    c.bench_function("diff_props", |b| {
        b.iter(|| diff_trees(black_box(Some(&old)), black_box(Some(&new))))
    });
}

criterion_group!(
    benches,
    bench_diff_identical,
    bench_diff_text_updates,
    bench_diff_keyed_rotation,
    bench_diff_props,
);
criterion_main!(benches);
