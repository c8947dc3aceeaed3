use egui::{pos2, vec2, Pos2};
use graph_atlas::graph_utils::model::{Node, NodeKind, Properties};
use graph_atlas::view::layout::{
    grid_columns, grid_layout, ring_base_radius, ring_layout, LayoutEngine, LayoutMode, PointerOutcome, GRID_MARGIN,
};
use uuid::Uuid;

fn node(name: &str, kind: NodeKind) -> Node {
    Node { id: Uuid::now_v7(), name: name.to_string(), kind, properties: Properties::new() }
}

fn company_with_employees(n: usize) -> Vec<Node> {
    let mut nodes = vec![node("Acme", NodeKind::Company)];
    nodes.extend((0..n).map(|i| node(&format!("e{}", i), NodeKind::Employee)));
    nodes
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[test]
fn ring_puts_hub_in_the_centre() {
    let nodes = company_with_employees(4);
    let viewport = vec2(1000.0, 600.0);
    let pos = ring_layout(&nodes, "Company", viewport);
    assert_eq!(pos.len(), 5);
    assert_eq!(pos[&nodes[0].id], pos2(500.0, 300.0));

    let r0 = ring_base_radius(viewport);
    assert!(close(r0, 240.0));
    for n in &nodes[1..] {
        assert!(close(pos[&n.id].distance(pos2(500.0, 300.0)), r0));
    }
}

#[test]
fn ring_overflow_moves_to_a_wider_ring() {
    let nodes = company_with_employees(12);
    let viewport = vec2(800.0, 800.0);
    let center = pos2(400.0, 400.0);
    let r0 = ring_base_radius(viewport);
    let pos = ring_layout(&nodes, "Company", viewport);

    for n in &nodes[1..11] {
        assert!(close(pos[&n.id].distance(center), r0), "first ten on the inner ring");
    }
    for n in &nodes[11..] {
        assert!(close(pos[&n.id].distance(center), r0 * 1.3), "overflow on ring two");
    }
    // Two nodes on the outer ring sit opposite each other
    let a = pos[&nodes[11].id];
    let b = pos[&nodes[12].id];
    assert!(close(a.distance(b), 2.0 * r0 * 1.3));
}

#[test]
fn ring_without_hub_places_everyone_on_rings() {
    let nodes: Vec<Node> = (0..3).map(|i| node(&format!("p{}", i), NodeKind::Project)).collect();
    let viewport = vec2(500.0, 500.0);
    let pos = ring_layout(&nodes, "Company", viewport);
    let center = pos2(250.0, 250.0);
    assert!(nodes.iter().all(|n| close(pos[&n.id].distance(center), ring_base_radius(viewport))));
}

#[test]
fn grid_columns_is_ceil_sqrt() {
    assert_eq!(grid_columns(0), 0);
    assert_eq!(grid_columns(1), 1);
    assert_eq!(grid_columns(4), 2);
    assert_eq!(grid_columns(5), 3);
    assert_eq!(grid_columns(9), 3);
    assert_eq!(grid_columns(10), 4);
}

#[test]
fn grid_stays_inside_margins() {
    let nodes = company_with_employees(9);
    let viewport = vec2(600.0, 400.0);
    let pos = grid_layout(&nodes, viewport);
    assert_eq!(pos.len(), 10);
    for p in pos.values() {
        assert!(p.x >= GRID_MARGIN && p.x <= viewport.x - GRID_MARGIN, "x {} out of bounds", p.x);
        assert!(p.y >= GRID_MARGIN && p.y <= viewport.y - GRID_MARGIN, "y {} out of bounds", p.y);
    }
    // Row-major: first two nodes share a row, the fifth starts the next one
    let p0 = pos[&nodes[0].id];
    let p1 = pos[&nodes[1].id];
    let p4 = pos[&nodes[4].id];
    assert!(close(p0.y, p1.y) && p1.x > p0.x);
    assert!(p4.y > p0.y && close(p4.x, p0.x));
}

#[test]
fn grid_on_tiny_viewport_collapses_to_middle() {
    let nodes = company_with_employees(1);
    let pos = grid_layout(&nodes, vec2(60.0, 60.0));
    assert!(pos.values().all(|p| *p == pos2(30.0, 30.0)));
}

fn engine_with(nodes: &[Node]) -> LayoutEngine {
    let mut engine = LayoutEngine::new(LayoutMode::Ring, "Company");
    assert!(engine.sync(nodes, 1, vec2(800.0, 800.0)));
    engine
}

#[test]
fn sync_only_recomputes_on_change() {
    let nodes = company_with_employees(3);
    let mut engine = engine_with(&nodes);
    assert!(!engine.sync(&nodes, 1, vec2(800.0, 800.0)));
    assert!(engine.sync(&nodes, 2, vec2(800.0, 800.0)));
    assert!(engine.sync(&nodes[..2], 2, vec2(800.0, 800.0)));
    assert!(engine.sync(&nodes[..2], 2, vec2(900.0, 800.0)));
}

#[test]
fn click_selects_and_empty_click_clears() {
    let nodes = company_with_employees(3);
    let mut engine = engine_with(&nodes);
    let hub = engine.position(nodes[0].id).unwrap();

    assert_eq!(engine.pointer_down(hub), PointerOutcome::None);
    // Jitter inside the slop is still a click
    assert_eq!(engine.pointer_move(hub + vec2(1.0, 1.0)), PointerOutcome::None);
    assert_eq!(engine.pointer_up(hub), PointerOutcome::Selected(nodes[0].id));
    assert_eq!(engine.selected(), Some(nodes[0].id));
    assert_eq!(engine.position(nodes[0].id), Some(hub));

    assert_eq!(engine.pointer_down(pos2(1.0, 1.0)), PointerOutcome::Cleared);
    assert_eq!(engine.selected(), None);
    assert_eq!(engine.pointer_up(pos2(1.0, 1.0)), PointerOutcome::None);
}

#[test]
fn drag_moves_node_without_selecting() {
    let nodes = company_with_employees(3);
    let mut engine = engine_with(&nodes);
    let id = nodes[1].id;
    let start = engine.position(id).unwrap();

    engine.pointer_down(start);
    let target = pos2(120.0, 130.0);
    assert_eq!(engine.pointer_move(target), PointerOutcome::Moved(id));
    assert_eq!(engine.dragging(), Some(id));
    assert_eq!(engine.pointer_up(target), PointerOutcome::None);
    assert_eq!(engine.position(id), Some(target));
    assert_eq!(engine.selected(), None);

    // Other nodes keep their places
    let hub_before = engine.position(nodes[0].id);
    engine.pointer_down(engine.position(id).unwrap());
    engine.pointer_move(pos2(-50.0, 5000.0));
    engine.pointer_up(Pos2::ZERO);
    assert_eq!(engine.position(id), Some(pos2(0.0, 800.0)), "drags are clamped to the canvas");
    assert_eq!(engine.position(nodes[0].id), hub_before);
}

#[test]
fn reset_and_mode_switch_discard_drags() {
    let nodes = company_with_employees(3);
    let mut engine = engine_with(&nodes);
    let id = nodes[2].id;
    let start_pos = engine.position(id).unwrap();
    engine.pointer_down(start_pos);
    engine.pointer_move(pos2(10.0, 10.0));
    engine.pointer_up(pos2(10.0, 10.0));

    engine.reset();
    assert_eq!(engine.position(id), Some(start_pos));

    engine.toggle_mode();
    assert_eq!(engine.mode(), LayoutMode::Grid);
    let expected = grid_layout(&nodes, vec2(800.0, 800.0));
    assert_eq!(engine.position(id), expected.get(&id).copied());
}

#[test]
fn selection_is_dropped_when_node_disappears() {
    let nodes = company_with_employees(3);
    let mut engine = engine_with(&nodes);
    engine.select(Some(nodes[3].id));
    assert_eq!(engine.selected(), Some(nodes[3].id));
    engine.sync(&nodes[..3], 2, vec2(800.0, 800.0));
    assert_eq!(engine.selected(), None);

    engine.select(Some(Uuid::now_v7()));
    assert_eq!(engine.selected(), None, "unknown ids cannot be selected");
}

#[test]
fn changing_the_hub_kind_recentres_the_ring() {
    let mut nodes = company_with_employees(3);
    nodes.push(node("Apollo", NodeKind::Project));
    let mut engine = engine_with(&nodes);
    let centre = pos2(400.0, 400.0);
    assert_eq!(engine.hub_kind(), "Company");
    assert_eq!(engine.position(nodes[0].id), Some(centre));

    engine.set_hub_kind("Project");
    assert_eq!(engine.hub_kind(), "Project");
    assert_eq!(engine.position(nodes[4].id), Some(centre));
    let expected = ring_layout(&nodes, "Project", vec2(800.0, 800.0));
    assert_eq!(engine.position(nodes[0].id), expected.get(&nodes[0].id).copied());
    assert_ne!(engine.position(nodes[0].id), Some(centre));
}
