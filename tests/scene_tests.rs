use std::collections::HashMap;

use egui::{pos2, Stroke};
use graph_atlas::graph_utils::model::{Node, NodeKind, Properties, Relationship};
use graph_atlas::view::scene::{build_scene, truncate_label, Primitive, PrimitiveKey};
use graph_atlas::view::style::{
    node_style, relationship_color, EDGE_COLOR, FALLBACK_COLOR, RELATIONSHIP_TYPES, SELECTED_STROKE,
};
use uuid::Uuid;

fn node(name: &str, kind: NodeKind) -> Node {
    Node { id: Uuid::now_v7(), name: name.to_string(), kind, properties: Properties::new() }
}

fn two_nodes() -> (Vec<Node>, Vec<Relationship>, HashMap<Uuid, egui::Pos2>) {
    let acme = node("Acme", NodeKind::Company);
    let ada = node("Ada Lovelace-Byron", NodeKind::Employee);
    let rel = Relationship { id: Uuid::now_v7(), source: acme.id, target: ada.id, kind: "EMPLOYS".into(), properties: Properties::new() };
    let positions = HashMap::from([(acme.id, pos2(100.0, 100.0)), (ada.id, pos2(300.0, 100.0))]);
    (vec![acme, ada], vec![rel], positions)
}

#[test]
fn styles_follow_node_kind() {
    assert_eq!(node_style(&NodeKind::Company).radius, 40.0);
    assert_eq!(node_style(&NodeKind::Project).radius, 30.0);
    assert_eq!(node_style(&NodeKind::Employee).radius, 25.0);
    assert_eq!(node_style(&NodeKind::parse("Vendor")).radius, 20.0);
    assert_eq!(relationship_color("NOT_A_TYPE"), FALLBACK_COLOR);
}

#[test]
fn every_offered_relationship_type_has_a_colour() {
    assert!(RELATIONSHIP_TYPES.contains(&"REPORTS_TO"));
    assert!(RELATIONSHIP_TYPES.contains(&"COLLABORATES_WITH"));
    for kind in RELATIONSHIP_TYPES {
        assert_ne!(relationship_color(kind), FALLBACK_COLOR, "{}", kind);
    }
    // Sample data uses HANDLES, which stays styled
    assert_ne!(relationship_color("HANDLES"), FALLBACK_COLOR);
}

#[test]
fn labels_truncate_after_twelve_chars() {
    assert_eq!(truncate_label("Acme"), "Acme");
    assert_eq!(truncate_label("exactly12chr"), "exactly12chr");
    assert_eq!(truncate_label("Ada Lovelace-Byron"), "Ada Lovelace...");
}

#[test]
fn edges_stop_at_node_borders() {
    let (nodes, rels, positions) = two_nodes();
    let scene = build_scene(&nodes, &rels, &positions, None);
    assert_eq!(scene.len(), 6);

    match scene.get(&PrimitiveKey::Edge(rels[0].id)) {
        Some(Primitive::Edge { from, to, color, .. }) => {
            assert_eq!(*from, pos2(140.0, 100.0));
            assert_eq!(*to, pos2(275.0, 100.0));
            assert_eq!(*color, EDGE_COLOR);
        }
        other => panic!("unexpected edge primitive: {:?}", other),
    }
    match scene.get(&PrimitiveKey::EdgeLabel(rels[0].id)) {
        Some(Primitive::Label { pos, text, .. }) => {
            assert_eq!(text, "EMPLOYS");
            assert_eq!(*pos, pos2(207.5, 95.0));
        }
        other => panic!("unexpected label primitive: {:?}", other),
    }
    match scene.get(&PrimitiveKey::NodeLabel(nodes[1].id)) {
        Some(Primitive::Label { text, .. }) => assert_eq!(text, "Ada Lovelace..."),
        other => panic!("unexpected node label: {:?}", other),
    }
}

#[test]
fn edges_are_painted_below_nodes() {
    let (nodes, rels, positions) = two_nodes();
    let scene = build_scene(&nodes, &rels, &positions, None);
    let keys: Vec<PrimitiveKey> = scene.iter().map(|(k, _)| *k).collect();
    let last_edge = keys.iter().rposition(|k| matches!(k, PrimitiveKey::Edge(_) | PrimitiveKey::EdgeLabel(_))).unwrap();
    let first_node = keys.iter().position(|k| matches!(k, PrimitiveKey::Node(_))).unwrap();
    assert!(last_edge < first_node);
}

#[test]
fn unpositioned_relationships_are_skipped() {
    let (nodes, rels, mut positions) = two_nodes();
    positions.remove(&nodes[1].id);
    let scene = build_scene(&nodes, &rels, &positions, None);
    assert!(scene.get(&PrimitiveKey::Edge(rels[0].id)).is_none());
    assert_eq!(scene.len(), 2);
}

#[test]
fn diff_reports_selection_and_moves() {
    let (nodes, rels, mut positions) = two_nodes();
    let before = build_scene(&nodes, &rels, &positions, None);
    assert!(before.diff(&before).is_empty());

    let selected = build_scene(&nodes, &rels, &positions, Some(nodes[0].id));
    let diff = selected.diff(&before);
    assert_eq!(diff.changed, vec![PrimitiveKey::Node(nodes[0].id)]);
    assert!(diff.added.is_empty() && diff.removed.is_empty());
    match selected.get(&PrimitiveKey::Node(nodes[0].id)) {
        Some(Primitive::Circle { stroke, .. }) => assert_eq!(*stroke, Stroke::new(3.0, SELECTED_STROKE)),
        other => panic!("unexpected node primitive: {:?}", other),
    }

    positions.insert(nodes[1].id, pos2(100.0, 300.0));
    let moved = build_scene(&nodes, &rels, &positions, None);
    let diff = moved.diff(&before);
    assert!(diff.changed.contains(&PrimitiveKey::Node(nodes[1].id)));
    assert!(diff.changed.contains(&PrimitiveKey::Edge(rels[0].id)));
    assert!(!diff.changed.contains(&PrimitiveKey::Node(nodes[0].id)));

    let empty = build_scene(&[], &[], &HashMap::new(), None);
    let diff = empty.diff(&before);
    assert_eq!(diff.removed.len(), before.len());
}
