//! Benchmarks for drop resolution and commit.
//!
//! Run with: cargo bench -p wbench-layout

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use wbench_layout::{
    DropTargetRegistry, LayoutConfig, LayoutTree, PaneRole, PartId, Point, Rect, resolve_drop,
};

/// `stacks` stacks of `per_stack` panes docked left to right.
fn build_tree(stacks: usize, per_stack: usize) -> (LayoutTree, Vec<PartId>) {
    let mut tree = LayoutTree::new("root").expect("tree");
    let mut panes = Vec::with_capacity(stacks * per_stack);
    for stack_index in 0..stacks {
        let stack = tree
            .create_stack(format!("stack-{stack_index}"))
            .expect("stack");
        tree.add(tree.root(), stack).expect("add stack");
        for pane_index in 0..per_stack {
            let pane = tree
                .create_pane(
                    format!("pane-{stack_index}-{pane_index}"),
                    PaneRole::View,
                    "Pane",
                )
                .expect("pane");
            tree.add(stack, pane).expect("add pane");
            panes.push(pane);
        }
    }
    (tree, panes)
}

fn bench_resolve_drop(c: &mut Criterion) {
    let mut group = c.benchmark_group("drop/resolve");
    let config = LayoutConfig::default();
    let area = Rect::from_size(240, 80);

    for stacks in [2, 8, 32] {
        let (tree, panes) = build_tree(stacks, 4);
        let registry = DropTargetRegistry::from_layout(&tree.solve_layout(area, &config));
        let source = panes[0];
        group.bench_with_input(BenchmarkId::new("stacks", stacks), &stacks, |b, _| {
            b.iter(|| {
                for x in (0..240).step_by(7) {
                    black_box(resolve_drop(
                        &tree,
                        &registry,
                        source,
                        Point::new(x, 40),
                        &config,
                    ));
                }
            });
        });
    }

    group.finish();
}

fn bench_apply_drop(c: &mut Criterion) {
    let mut group = c.benchmark_group("drop/apply");
    let config = LayoutConfig::default();
    let area = Rect::from_size(240, 80);

    for stacks in [2, 8, 32] {
        let (tree, panes) = build_tree(stacks, 4);
        let registry = DropTargetRegistry::from_layout(&tree.solve_layout(area, &config));
        let source = panes[0];
        let resolution = resolve_drop(&tree, &registry, source, Point::new(235, 40), &config)
            .expect("right edge resolves");
        group.bench_with_input(BenchmarkId::new("stacks", stacks), &stacks, |b, _| {
            b.iter_batched(
                || tree.clone(),
                |mut working| {
                    black_box(working.apply_drop(source, &resolution, &config).ok());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_snapshot_hash(c: &mut Criterion) {
    let (tree, _) = build_tree(16, 6);
    c.bench_function("snapshot/state_hash", |b| b.iter(|| black_box(tree.state_hash())));
}

criterion_group!(benches, bench_resolve_drop, bench_apply_drop, bench_snapshot_hash);
criterion_main!(benches);
