use wbench_layout::{
    LAYOUT_SNAPSHOT_SCHEMA_VERSION, LayoutConfig, LayoutSnapshot, LayoutTree, PaneRole,
    Perspective, Side, SnapshotError, SplitRatio, StaticPartRegistry,
};

fn collapsed_perspective() -> LayoutTree {
    let registry = StaticPartRegistry::new()
        .with("doc", "Document", PaneRole::Editor)
        .with("outline", "Outline", PaneRole::View)
        .with("tasks", "Tasks", PaneRole::View);
    let mut perspective =
        Perspective::new("root", registry, LayoutConfig::default()).expect("perspective");
    let editors = perspective
        .create_folder("editors", Side::Left, SplitRatio::EVEN, None)
        .expect("folder")
        .expect("docked");
    perspective.add_view(editors, "doc").expect("doc");
    let side = perspective
        .create_folder("side", Side::Bottom, SplitRatio::ONE_TO_THREE, Some("editors"))
        .expect("folder")
        .expect("docked");
    let outline = perspective
        .add_view(side, "outline")
        .expect("outline")
        .expect("added");
    perspective.add_placeholder(side, "tasks").expect("tasks");
    perspective.close_part(outline).expect("close");
    perspective.into_tree()
}

#[test]
fn json_round_trip_preserves_bound_placeholders() {
    let tree = collapsed_perspective();
    assert_eq!(
        tree.describe_layout(),
        "root((editors{doc*} /3:1/ <side>=side{?outline, ?tasks}))"
    );

    let json = serde_json::to_string_pretty(&tree.to_snapshot()).expect("serialize");
    let snapshot: LayoutSnapshot = serde_json::from_str(&json).expect("deserialize");
    let restored = LayoutTree::from_snapshot(snapshot).expect("restore");
    assert_eq!(restored, tree);
    assert_eq!(restored.state_hash(), tree.state_hash());
    assert_eq!(restored.describe_layout(), tree.describe_layout());

    let again = serde_json::to_string_pretty(&restored.to_snapshot()).expect("serialize");
    assert_eq!(blake3::hash(again.as_bytes()), blake3::hash(json.as_bytes()));
}

#[test]
fn missing_schema_version_defaults_to_current() {
    let tree = collapsed_perspective();
    let mut value = serde_json::to_value(tree.to_snapshot()).expect("serialize");
    let removed = value
        .as_object_mut()
        .and_then(|object| object.remove("schema_version"));
    assert!(removed.is_some());
    let snapshot: LayoutSnapshot = serde_json::from_value(value).expect("deserialize");
    assert_eq!(snapshot.schema_version, LAYOUT_SNAPSHOT_SCHEMA_VERSION);
    assert!(LayoutTree::from_snapshot(snapshot).is_ok());
}

#[test]
fn shuffled_parts_restore_to_the_same_tree() {
    let tree = collapsed_perspective();
    let mut snapshot = tree.to_snapshot();
    snapshot.parts.reverse();
    assert_eq!(snapshot.state_hash(), tree.to_snapshot().state_hash());
    let restored = LayoutTree::from_snapshot(snapshot).expect("restore");
    assert_eq!(restored, tree);
}

#[test]
fn broken_binding_is_rejected() {
    let tree = collapsed_perspective();
    let mut snapshot = tree.to_snapshot();
    for part in &mut snapshot.parts {
        part.proxied_by = None;
    }
    assert!(matches!(
        LayoutTree::from_snapshot(snapshot),
        Err(SnapshotError::Invalid(_))
    ));
}
