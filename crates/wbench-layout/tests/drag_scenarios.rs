//! End-to-end drag and placeholder scenarios against the public API.

use wbench_layout::{
    DragCancelReason, DragEffect, DragEvent, DragEventKind, DragMachine, DropTargetRegistry,
    LayoutConfig, LayoutTree, PaneRole, PartId, Perspective, Point, Rect, RelativePosition, Side,
    SplitRatio, StaticPartRegistry, resolve_drop,
};

fn fingerprint(tree: &LayoutTree) -> blake3::Hash {
    let json = serde_json::to_string(&tree.to_snapshot()).expect("snapshot serializes");
    blake3::hash(json.as_bytes())
}

struct TwoStacks {
    tree: LayoutTree,
    target: PartId,
    source_pane: PartId,
}

/// `target{t} | source{s}`
fn two_stacks() -> TwoStacks {
    let mut tree = LayoutTree::new("root").expect("tree");
    let target = tree.create_stack("target").expect("stack");
    let source = tree.create_stack("source").expect("stack");
    tree.add(tree.root(), target).expect("add");
    tree.add(tree.root(), source).expect("add");
    let t = tree.create_pane("t", PaneRole::View, "T").expect("pane");
    let s = tree.create_pane("s", PaneRole::View, "S").expect("pane");
    tree.add(target, t).expect("add");
    tree.add(source, s).expect("add");
    TwoStacks {
        tree,
        target,
        source_pane: s,
    }
}

fn event(sequence: u64, kind: DragEventKind) -> DragEvent {
    DragEvent::new(sequence, kind)
}

#[test]
fn quadrants_map_to_split_and_stack() {
    let TwoStacks {
        tree,
        target,
        source_pane,
    } = two_stacks();
    let mut registry = DropTargetRegistry::new();
    registry.register_region(target, Rect::new(0, 0, 100, 100));
    let config = LayoutConfig::default();

    let at = |x, y| {
        resolve_drop(&tree, &registry, source_pane, Point::new(x, y), &config)
            .expect("cursor is over the registered stack")
    };
    let top = at(50, 10);
    assert_eq!((top.target, top.position, top.valid), (target, RelativePosition::SplitTop, true));
    assert_eq!(top.feedback, Rect::new(0, 0, 100, 50));
    let center = at(50, 50);
    assert_eq!((center.target, center.position), (target, RelativePosition::Stack));
    assert_eq!(center.feedback, Rect::new(0, 0, 100, 100));
    let right = at(95, 50);
    assert_eq!((right.target, right.position), (target, RelativePosition::SplitRight));
    assert_eq!(right.feedback, Rect::new(50, 0, 50, 100));

    assert!(resolve_drop(&tree, &registry, source_pane, Point::new(150, 50), &config).is_none());
}

#[test]
fn cancelled_drag_leaves_snapshot_identical() {
    let TwoStacks {
        mut tree,
        source_pane,
        ..
    } = two_stacks();
    let config = LayoutConfig::default();
    let registry =
        DropTargetRegistry::from_layout(&tree.solve_layout(Rect::from_size(80, 24), &config));
    let before_hash = fingerprint(&tree);
    let before_text = tree.describe_layout();

    let mut machine = DragMachine::new(config).expect("config is valid");
    machine
        .apply_event(
            &mut tree,
            &registry,
            &event(
                1,
                DragEventKind::PointerDown {
                    source: source_pane,
                    pointer_id: 7,
                    position: Point::new(60, 5),
                },
            ),
        )
        .expect("down");
    for (sequence, x) in [(2, 50), (3, 30), (4, 10), (5, 20)] {
        machine
            .apply_event(
                &mut tree,
                &registry,
                &event(
                    sequence,
                    DragEventKind::PointerMove {
                        pointer_id: 7,
                        position: Point::new(x, 12),
                    },
                ),
            )
            .expect("move");
        assert_eq!(fingerprint(&tree), before_hash, "moves never mutate the tree");
    }
    let cancel = machine
        .apply_event(
            &mut tree,
            &registry,
            &event(
                6,
                DragEventKind::Cancel {
                    reason: DragCancelReason::PointerCancel,
                },
            ),
        )
        .expect("cancel");
    assert!(matches!(
        cancel.effect,
        DragEffect::Cancelled {
            reason: DragCancelReason::PointerCancel,
            ..
        }
    ));
    assert_eq!(fingerprint(&tree), before_hash);
    assert_eq!(tree.describe_layout(), before_text);

    machine
        .apply_event(
            &mut tree,
            &registry,
            &event(
                7,
                DragEventKind::PointerDown {
                    source: source_pane,
                    pointer_id: 7,
                    position: Point::new(60, 5),
                },
            ),
        )
        .expect("down");
    assert!(machine.force_cancel().is_some());
    assert_eq!(fingerprint(&tree), before_hash);
}

#[test]
fn opening_a_placeholder_keeps_sibling_order() {
    let registry = StaticPartRegistry::new()
        .with("a", "A", PaneRole::View)
        .with("log", "Log", PaneRole::View)
        .with("b", "B", PaneRole::View);
    let mut perspective =
        Perspective::new("root", registry, LayoutConfig::default()).expect("perspective");
    let folder = perspective
        .create_folder("folder", Side::Left, SplitRatio::EVEN, None)
        .expect("folder")
        .expect("docked");
    let a = perspective.add_view(folder, "a").expect("a").expect("added");
    perspective
        .add_placeholder(folder, "log")
        .expect("log")
        .expect("added");
    let b = perspective.add_view(folder, "b").expect("b").expect("added");
    assert_eq!(perspective.tree().describe_layout(), "root(folder{a*, ?log, b})");

    let log = perspective.open_part("log").expect("open").expect("pane");
    assert_eq!(perspective.tree().children(folder), &[a, log, b]);
    assert_eq!(perspective.tree().container(a), Some(folder));
    assert_eq!(perspective.tree().container(b), Some(folder));
    assert_eq!(perspective.tree().describe_layout(), "root(folder{a, log*, b})");

    let placeholder = perspective.close_part(log).expect("close").expect("placeholder");
    assert_eq!(perspective.tree().children(folder), &[a, placeholder, b]);
    assert_eq!(perspective.tree().describe_layout(), "root(folder{a*, ?log, b})");
}

#[test]
fn smallest_then_deepest_candidate_wins() {
    let TwoStacks {
        tree,
        target,
        source_pane,
    } = two_stacks();
    let config = LayoutConfig::default();

    let mut nested = DropTargetRegistry::new();
    nested.register_region(tree.root(), Rect::new(0, 0, 100, 100));
    nested.register_region(target, Rect::new(10, 10, 30, 30));
    let resolution = resolve_drop(&tree, &nested, source_pane, Point::new(25, 25), &config)
        .expect("resolves");
    assert_eq!(resolution.target, target);
    assert_eq!(resolution.position, RelativePosition::Stack);

    let mut tied = DropTargetRegistry::new();
    tied.register_region(tree.root(), Rect::new(0, 0, 100, 100));
    tied.register_region(target, Rect::new(0, 0, 100, 100));
    let resolution = resolve_drop(&tree, &tied, source_pane, Point::new(50, 50), &config)
        .expect("resolves");
    assert_eq!(resolution.target, target, "deeper registration wins a tie");
}

#[test]
fn unbound_container_placeholder_is_skipped() {
    let TwoStacks {
        mut tree,
        source_pane,
        ..
    } = two_stacks();
    let collapsed = tree.create_container_placeholder("collapsed").expect("cph");
    tree.add(tree.root(), collapsed).expect("add");
    let mut registry = DropTargetRegistry::new();
    registry.register_region(collapsed, Rect::new(0, 0, 50, 50));
    registry.register_region(tree.root(), Rect::new(0, 0, 100, 100));

    let resolution = resolve_drop(
        &tree,
        &registry,
        source_pane,
        Point::new(10, 40),
        &LayoutConfig::default(),
    )
    .expect("falls through to the root");
    assert_eq!(resolution.target, tree.root());
    assert_eq!(resolution.position, RelativePosition::SplitLeft);
    assert!(resolution.valid);
}

#[test]
fn release_over_a_tab_reorders_into_that_stack() {
    let mut tree = LayoutTree::new("root").expect("tree");
    let left = tree.create_stack("left").expect("stack");
    let right = tree.create_stack("right").expect("stack");
    tree.add(tree.root(), left).expect("add");
    tree.add(tree.root(), right).expect("add");
    let a = tree.create_pane("a", PaneRole::View, "A").expect("pane");
    let b = tree.create_pane("b", PaneRole::View, "B").expect("pane");
    let c = tree.create_pane("c", PaneRole::View, "C").expect("pane");
    tree.add(left, a).expect("add");
    tree.add(left, b).expect("add");
    tree.add(right, c).expect("add");

    let config = LayoutConfig::default();
    let registry =
        DropTargetRegistry::from_layout(&tree.solve_layout(Rect::from_size(100, 20), &config));
    let mut machine = DragMachine::new(config).expect("config");
    let steps = [
        DragEventKind::PointerDown {
            source: c,
            pointer_id: 1,
            position: Point::new(60, 0),
        },
        // Hover the right stack first; the release position decides.
        DragEventKind::PointerMove {
            pointer_id: 1,
            position: Point::new(75, 10),
        },
        DragEventKind::PointerUp {
            pointer_id: 1,
            position: Point::new(30, 0),
        },
    ];
    let mut last = None;
    for (index, kind) in steps.into_iter().enumerate() {
        last = Some(
            machine
                .apply_event(&mut tree, &registry, &event(index as u64 + 1, kind))
                .expect("event applies"),
        );
    }
    let Some(DragEffect::Committed { resolution, .. }) = last.map(|t| t.effect) else {
        unreachable!("release over a tab commits");
    };
    assert_eq!(resolution.target, b);
    assert_eq!(resolution.position, RelativePosition::Before);
    assert_eq!(tree.children(left), &[a, c, b]);
    assert!(tree.part(right).is_none(), "emptied stack is removed");
    assert_eq!(tree.describe_layout(), "root(left{a, c*, b})");
}

#[test]
fn malformed_registrations_fall_through_to_a_valid_region() {
    let TwoStacks {
        mut tree,
        target,
        source_pane,
    } = two_stacks();
    let stale = tree.create_stack("stale").expect("stack");
    let mut registry = DropTargetRegistry::new();
    registry.register_region(
        PartId::new(999).expect("non-zero id"),
        Rect::new(40, 40, 20, 20),
    );
    registry.register_region(target, Rect::new(50, 50, 0, 0));
    registry.register_tab(PartId::new(998).expect("non-zero id"), Rect::new(48, 48, 4, 4));
    registry.register_region(stale, Rect::new(45, 45, 10, 10));
    assert!(tree.discard(stale).is_applied());
    registry.register_region(target, Rect::new(0, 0, 100, 100));
    let config = LayoutConfig::default();

    let resolution = resolve_drop(&tree, &registry, source_pane, Point::new(50, 50), &config)
        .expect("the valid region still resolves");
    assert_eq!(resolution.target, target);
    assert_eq!(resolution.position, RelativePosition::Stack);
    assert!(resolution.valid);

    let mut machine = DragMachine::new(config).expect("config");
    let steps = [
        DragEventKind::PointerDown {
            source: source_pane,
            pointer_id: 3,
            position: Point::new(150, 50),
        },
        DragEventKind::PointerMove {
            pointer_id: 3,
            position: Point::new(50, 50),
        },
        DragEventKind::PointerUp {
            pointer_id: 3,
            position: Point::new(50, 50),
        },
    ];
    let mut last = None;
    for (index, kind) in steps.into_iter().enumerate() {
        last = Some(
            machine
                .apply_event(&mut tree, &registry, &event(index as u64 + 1, kind))
                .expect("event applies"),
        );
    }
    assert!(matches!(
        last.map(|transition| transition.effect),
        Some(DragEffect::Committed { .. })
    ));
    assert_eq!(tree.container(source_pane), Some(target));
    tree.validate().expect("tree stays valid");
}

#[test]
fn drops_are_pointless_while_zoomed() {
    let TwoStacks {
        mut tree,
        target,
        source_pane,
    } = two_stacks();
    let mut registry = DropTargetRegistry::new();
    registry.register_region(target, Rect::new(0, 0, 100, 100));
    let config = LayoutConfig::default();
    let before_zoom = resolve_drop(&tree, &registry, source_pane, Point::new(50, 50), &config)
        .expect("resolves");
    assert!(before_zoom.valid);

    assert!(tree.zoom_in(target).is_applied());
    let zoomed = resolve_drop(&tree, &registry, source_pane, Point::new(50, 50), &config)
        .expect("resolves");
    assert!(!zoomed.valid);

    let outcome = tree
        .apply_drop(source_pane, &before_zoom, &config)
        .expect("drop commits");
    assert!(!tree.is_zoomed());
    assert_eq!(outcome.moved, vec![source_pane]);
    assert_eq!(tree.container(source_pane), Some(target));
}

