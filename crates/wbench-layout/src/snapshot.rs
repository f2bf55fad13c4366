//! Serializable layout snapshots and deterministic layout fingerprints.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::part::{ContainerSlot, LayoutPart, PartId, PartKind};
use crate::sash::{SashNode, SplitAxis, SplitRatio};
use crate::tree::LayoutTree;

/// Current layout snapshot schema version.
pub const LAYOUT_SNAPSHOT_SCHEMA_VERSION: u16 = 1;

/// Canonical serialized layout shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub root: PartId,
    pub next_id: PartId,
    pub parts: Vec<LayoutPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoomed: Option<PartId>,
}

fn default_schema_version() -> u16 {
    LAYOUT_SNAPSHOT_SCHEMA_VERSION
}

impl LayoutSnapshot {
    /// Order parts by ID for deterministic serialization.
    pub fn canonicalize(&mut self) {
        self.parts.sort_by_key(|part| part.id);
    }

    /// Deterministic hash over the snapshot contents.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        snapshot_state_hash(self)
    }
}

/// Reasons a snapshot cannot become a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    UnsupportedSchemaVersion { version: u16 },
    DuplicatePartId { part: PartId },
    MissingRoot { root: PartId },
    NextIdNotGreater { next_id: PartId, max_id: PartId },
    InvalidRatio { sash: PartId },
    Invalid(LayoutError),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedSchemaVersion { version } => write!(
                f,
                "unsupported layout schema version {version} (expected {LAYOUT_SNAPSHOT_SCHEMA_VERSION})"
            ),
            Self::DuplicatePartId { part } => write!(f, "duplicate part id {}", part.get()),
            Self::MissingRoot { root } => write!(f, "root part {} not present", root.get()),
            Self::NextIdNotGreater { next_id, max_id } => write!(
                f,
                "next_id {} must be greater than the largest part id {}",
                next_id.get(),
                max_id.get()
            ),
            Self::InvalidRatio { sash } => {
                write!(f, "sash {} has a split ratio with a zero side", sash.get())
            }
            Self::Invalid(error) => write!(f, "snapshot violates layout invariants: {error}"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Self::Invalid(error) = self {
            return Some(error);
        }
        None
    }
}

impl LayoutTree {
    /// Export to canonical snapshot form.
    #[must_use]
    pub fn to_snapshot(&self) -> LayoutSnapshot {
        let mut snapshot = LayoutSnapshot {
            schema_version: LAYOUT_SNAPSHOT_SCHEMA_VERSION,
            root: self.root,
            next_id: self.next_id,
            parts: self.parts.values().cloned().collect(),
            zoomed: self.zoomed,
        };
        snapshot.canonicalize();
        snapshot
    }

    /// Rebuild a tree from a snapshot, checking every structural invariant.
    pub fn from_snapshot(mut snapshot: LayoutSnapshot) -> Result<Self, SnapshotError> {
        if snapshot.schema_version != LAYOUT_SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedSchemaVersion {
                version: snapshot.schema_version,
            });
        }
        snapshot.canonicalize();
        let mut parts = BTreeMap::new();
        for part in snapshot.parts {
            let id = part.id;
            if let PartKind::Sash(sash) = &part.kind
                && sash.layout.as_ref().is_some_and(has_zero_ratio)
            {
                return Err(SnapshotError::InvalidRatio { sash: id });
            }
            if parts.insert(id, part).is_some() {
                return Err(SnapshotError::DuplicatePartId { part: id });
            }
        }
        if !parts.contains_key(&snapshot.root) {
            return Err(SnapshotError::MissingRoot {
                root: snapshot.root,
            });
        }
        if let Some(max_id) = parts.keys().next_back().copied()
            && snapshot.next_id <= max_id
        {
            return Err(SnapshotError::NextIdNotGreater {
                next_id: snapshot.next_id,
                max_id,
            });
        }
        let tree = Self {
            root: snapshot.root,
            next_id: snapshot.next_id,
            parts,
            zoomed: snapshot.zoomed,
        };
        tree.validate().map_err(SnapshotError::Invalid)?;
        Ok(tree)
    }

    /// Deterministic fingerprint of the whole tree.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.to_snapshot().state_hash()
    }

    /// Human-readable description of the attached layout.
    ///
    /// Sashes render their split layout as `key(a | b)` (side by side) or
    /// `key(a / b)` (stacked), with `|1:3|` when the split is uneven. Stacks
    /// render as `key{a*, ?b}` where `*` marks the selected tab and `?` a
    /// placeholder. Container placeholders render as `<key>`, followed by
    /// `=` and the real container when bound. Two trees describe the same
    /// way exactly when their attached layouts match.
    #[must_use]
    pub fn describe_layout(&self) -> String {
        let mut out = String::new();
        if let Some(zoomed) = self.zoomed.and_then(|id| self.parts.get(&id)) {
            let _ = write!(out, "zoomed:{} ", zoomed.key);
        }
        self.describe_part(self.root, &mut out, self.parts.len());
        out
    }

    fn describe_part(&self, id: PartId, out: &mut String, budget: usize) {
        let Some(record) = self.parts.get(&id) else {
            out.push_str("<missing>");
            return;
        };
        if budget == 0 {
            out.push_str("...");
            return;
        }
        match &record.kind {
            PartKind::Pane(_) => {
                if !record.visible {
                    out.push('~');
                }
                out.push_str(&record.key);
            }
            PartKind::Placeholder => {
                out.push('?');
                out.push_str(&record.key);
            }
            PartKind::Stack(stack) => {
                out.push_str(&record.key);
                out.push('{');
                for (index, child) in stack.children.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    self.describe_part(*child, out, budget - 1);
                    if stack.selected == Some(*child) {
                        out.push('*');
                    }
                }
                out.push('}');
            }
            PartKind::Sash(sash) => {
                out.push_str(&record.key);
                out.push('(');
                if let Some(layout) = &sash.layout {
                    self.describe_node(layout, out, budget - 1);
                }
                out.push(')');
            }
            PartKind::ContainerPlaceholder(slot) => {
                let _ = write!(out, "<{}>", record.key);
                match slot {
                    ContainerSlot::Bound { real } => {
                        out.push('=');
                        self.describe_part(*real, out, budget - 1);
                    }
                    ContainerSlot::Unbound { children } if !children.is_empty() => {
                        out.push('[');
                        for (index, child) in children.iter().enumerate() {
                            if index > 0 {
                                out.push_str(", ");
                            }
                            self.describe_part(*child, out, budget - 1);
                        }
                        out.push(']');
                    }
                    ContainerSlot::Unbound { .. } => {}
                }
            }
        }
    }

    fn describe_node(&self, node: &SashNode, out: &mut String, budget: usize) {
        match node {
            SashNode::Leaf { part } => self.describe_part(*part, out, budget),
            SashNode::Split {
                axis,
                ratio,
                first,
                second,
            } => {
                let divider = match axis {
                    SplitAxis::Horizontal => '|',
                    SplitAxis::Vertical => '/',
                };
                out.push('(');
                self.describe_node(first, out, budget);
                if *ratio == SplitRatio::EVEN {
                    let _ = write!(out, " {divider} ");
                } else {
                    let _ = write!(
                        out,
                        " {divider}{}:{}{divider} ",
                        ratio.numerator(),
                        ratio.denominator()
                    );
                }
                self.describe_node(second, out, budget);
                out.push(')');
            }
        }
    }
}

fn has_zero_ratio(node: &SashNode) -> bool {
    match node {
        SashNode::Leaf { .. } => false,
        SashNode::Split {
            ratio,
            first,
            second,
            ..
        } => {
            ratio.numerator() == 0
                || ratio.denominator() == 0
                || has_zero_ratio(first)
                || has_zero_ratio(second)
        }
    }
}

fn snapshot_state_hash(snapshot: &LayoutSnapshot) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0001_0000_01b3;

    fn mix(hash: &mut u64, byte: u8) {
        *hash ^= u64::from(byte);
        *hash = hash.wrapping_mul(PRIME);
    }

    fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
        for byte in bytes {
            mix(hash, *byte);
        }
    }

    fn mix_u16(hash: &mut u64, value: u16) {
        mix_bytes(hash, &value.to_le_bytes());
    }

    fn mix_u32(hash: &mut u64, value: u32) {
        mix_bytes(hash, &value.to_le_bytes());
    }

    fn mix_u64(hash: &mut u64, value: u64) {
        mix_bytes(hash, &value.to_le_bytes());
    }

    fn mix_bool(hash: &mut u64, value: bool) {
        mix(hash, u8::from(value));
    }

    fn mix_opt_part_id(hash: &mut u64, value: Option<PartId>) {
        match value {
            Some(value) => {
                mix(hash, 1);
                mix_u64(hash, value.get());
            }
            None => mix(hash, 0),
        }
    }

    fn mix_str(hash: &mut u64, value: &str) {
        mix_u64(hash, value.len() as u64);
        mix_bytes(hash, value.as_bytes());
    }

    fn mix_ids(hash: &mut u64, ids: &[PartId]) {
        mix_u64(hash, ids.len() as u64);
        for id in ids {
            mix_u64(hash, id.get());
        }
    }

    fn mix_node(hash: &mut u64, node: &SashNode) {
        match node {
            SashNode::Leaf { part } => {
                mix(hash, 1);
                mix_u64(hash, part.get());
            }
            SashNode::Split {
                axis,
                ratio,
                first,
                second,
            } => {
                mix(hash, 2);
                mix(
                    hash,
                    match axis {
                        SplitAxis::Horizontal => 1,
                        SplitAxis::Vertical => 2,
                    },
                );
                mix_u32(hash, ratio.numerator());
                mix_u32(hash, ratio.denominator());
                mix_node(hash, first);
                mix_node(hash, second);
            }
        }
    }

    let mut canonical = snapshot.clone();
    canonical.canonicalize();

    let mut hash = OFFSET_BASIS;
    mix_u16(&mut hash, canonical.schema_version);
    mix_u64(&mut hash, canonical.root.get());
    mix_u64(&mut hash, canonical.next_id.get());
    mix_u64(&mut hash, canonical.parts.len() as u64);
    mix_opt_part_id(&mut hash, canonical.zoomed);

    for part in &canonical.parts {
        mix_u64(&mut hash, part.id.get());
        mix_str(&mut hash, &part.key);
        mix_opt_part_id(&mut hash, part.container);
        mix_bool(&mut hash, part.visible);
        mix_opt_part_id(&mut hash, part.proxied_by);

        match &part.kind {
            PartKind::Pane(pane) => {
                mix(&mut hash, 1);
                mix(&mut hash, pane.role as u8);
                mix_str(&mut hash, &pane.label);
            }
            PartKind::Placeholder => mix(&mut hash, 2),
            PartKind::Stack(stack) => {
                mix(&mut hash, 3);
                mix_ids(&mut hash, &stack.children);
                mix_opt_part_id(&mut hash, stack.selected);
            }
            PartKind::Sash(sash) => {
                mix(&mut hash, 4);
                mix_ids(&mut hash, &sash.children);
                match &sash.layout {
                    Some(layout) => {
                        mix(&mut hash, 1);
                        mix_node(&mut hash, layout);
                    }
                    None => mix(&mut hash, 0),
                }
            }
            PartKind::ContainerPlaceholder(ContainerSlot::Unbound { children }) => {
                mix(&mut hash, 5);
                mix_ids(&mut hash, children);
            }
            PartKind::ContainerPlaceholder(ContainerSlot::Bound { real }) => {
                mix(&mut hash, 6);
                mix_u64(&mut hash, real.get());
            }
        }
    }

    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::PaneRole;
    use wbench_core::geometry::Side;

    fn sample() -> LayoutTree {
        let mut tree = LayoutTree::new("root").expect("tree");
        let left = tree.create_stack("left").expect("stack");
        tree.add(tree.root(), left).expect("add");
        let a = tree.create_pane("a", PaneRole::View, "A").expect("pane");
        let b = tree.create_placeholder("b").expect("placeholder");
        tree.add(left, a).expect("add");
        tree.add(left, b).expect("add");
        let editors = tree.create_stack("editors").expect("stack");
        tree.add_relative(
            tree.root(),
            editors,
            Side::Right,
            SplitRatio::ONE_TO_THREE.swapped(),
            Some(left),
        )
        .expect("add");
        let doc = tree.create_pane("doc", PaneRole::Editor, "Doc").expect("pane");
        tree.add(editors, doc).expect("add");
        tree
    }

    #[test]
    fn describe_layout_shows_structure() {
        let tree = sample();
        assert_eq!(tree.describe_layout(), "root((left{a*, ?b} |1:3| editors{doc*}))");
    }

    #[test]
    fn snapshot_restores_identical_tree() {
        let tree = sample();
        let restored = LayoutTree::from_snapshot(tree.to_snapshot()).expect("valid snapshot");
        assert_eq!(restored, tree);
        assert_eq!(restored.state_hash(), tree.state_hash());
    }

    #[test]
    fn hash_tracks_changes() {
        let mut tree = sample();
        let before = tree.state_hash();
        let a = tree.find_by_key("a").expect("pane a");
        let _ = tree.set_visible(a, false);
        assert_ne!(tree.state_hash(), before);
        assert!(tree.describe_layout().contains("~a"));
    }

    #[test]
    fn rejects_bad_snapshots() {
        let tree = sample();

        let mut snapshot = tree.to_snapshot();
        snapshot.schema_version = 9;
        assert_eq!(
            LayoutTree::from_snapshot(snapshot),
            Err(SnapshotError::UnsupportedSchemaVersion { version: 9 })
        );

        let mut snapshot = tree.to_snapshot();
        let duplicate = snapshot.parts[1].clone();
        snapshot.parts.push(duplicate);
        assert!(matches!(
            LayoutTree::from_snapshot(snapshot),
            Err(SnapshotError::DuplicatePartId { .. })
        ));

        let mut snapshot = tree.to_snapshot();
        snapshot.next_id = snapshot.parts[0].id;
        assert!(matches!(
            LayoutTree::from_snapshot(snapshot),
            Err(SnapshotError::NextIdNotGreater { .. })
        ));

        let mut snapshot = tree.to_snapshot();
        for part in &mut snapshot.parts {
            if part.key == "a" {
                part.container = None;
            }
        }
        assert!(matches!(
            LayoutTree::from_snapshot(snapshot),
            Err(SnapshotError::Invalid(LayoutError::ParentMismatch { .. }))
        ));
    }

    #[test]
    fn zero_ratio_in_serialized_layout_is_rejected() {
        let tree = sample();
        let json = serde_json::to_string(&tree.to_snapshot()).expect("serialize");
        let tampered = json.replacen("\"denominator\":3", "\"denominator\":0", 1);
        assert_ne!(json, tampered);
        let snapshot: LayoutSnapshot = serde_json::from_str(&tampered).expect("parse");
        assert!(matches!(
            LayoutTree::from_snapshot(snapshot),
            Err(SnapshotError::InvalidRatio { .. })
        ));
    }

    #[test]
    fn zoom_survives_a_round_trip() {
        let mut tree = sample();
        let unzoomed_hash = tree.state_hash();
        let left = tree.find_by_key("left").expect("left stack");
        assert!(tree.zoom_in(left).is_applied());
        assert_eq!(
            tree.describe_layout(),
            "zoomed:left root((left{a*, ?b} |1:3| editors{doc*}))"
        );
        assert_ne!(tree.state_hash(), unzoomed_hash);

        let restored = LayoutTree::from_snapshot(tree.to_snapshot()).expect("valid snapshot");
        assert_eq!(restored.zoomed(), Some(left));
        assert_eq!(restored, tree);

        let mut dangling = tree.to_snapshot();
        dangling.zoomed = tree.find_by_key("a");
        assert!(matches!(
            LayoutTree::from_snapshot(dangling),
            Err(SnapshotError::Invalid(LayoutError::InvalidZoom { .. }))
        ));
    }
}

