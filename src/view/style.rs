use std::collections::HashMap;

use egui::Color32;
use once_cell::sync::Lazy;

use crate::graph_utils::model::NodeKind;

pub const EDGE_COLOR: Color32 = Color32::from_rgb(0x4b, 0x55, 0x63);
pub const LABEL_COLOR: Color32 = Color32::WHITE;
pub const NODE_STROKE: Color32 = Color32::WHITE;
pub const SELECTED_STROKE: Color32 = Color32::from_rgb(0xf5, 0x9e, 0x0b);
pub const FALLBACK_COLOR: Color32 = Color32::from_rgb(0x6b, 0x72, 0x80);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStyle {
    pub radius: f32,
    pub fill: Color32,
}

const DEFAULT_NODE_STYLE: NodeStyle = NodeStyle { radius: 20.0, fill: FALLBACK_COLOR };

pub fn node_style(kind: &NodeKind) -> NodeStyle {
    match kind {
        NodeKind::Company => NodeStyle { radius: 40.0, fill: Color32::from_rgb(0x1e, 0x40, 0xaf) },
        NodeKind::Project => NodeStyle { radius: 30.0, fill: Color32::from_rgb(0x7c, 0x3a, 0xed) },
        NodeKind::Employee => NodeStyle { radius: 25.0, fill: Color32::from_rgb(0x05, 0x96, 0x69) },
        NodeKind::Other(_) => DEFAULT_NODE_STYLE,
    }
}

/// Types offered when creating a relationship.
pub const RELATIONSHIP_TYPES: [&str; 7] =
    ["EMPLOYS", "WORKS_ON", "LEADS", "OWNS", "MANAGES", "REPORTS_TO", "COLLABORATES_WITH"];

// Overview chips
static RELATIONSHIP_COLORS: Lazy<HashMap<&'static str, Color32>> = Lazy::new(|| {
    HashMap::from([
        ("EMPLOYS", Color32::from_rgb(0x63, 0x66, 0xf1)),
        ("WORKS_ON", Color32::from_rgb(0x14, 0xb8, 0xa6)),
        ("MANAGES", Color32::from_rgb(0xef, 0x44, 0x44)),
        ("LEADS", Color32::from_rgb(0xea, 0xb3, 0x08)),
        ("HANDLES", Color32::from_rgb(0xec, 0x48, 0x99)),
        ("OWNS", Color32::from_rgb(0x06, 0xb6, 0xd4)),
        ("REPORTS_TO", Color32::from_rgb(0xf9, 0x73, 0x16)),
        ("COLLABORATES_WITH", Color32::from_rgb(0x84, 0xcc, 0x16)),
    ])
});

static NODE_TYPE_COLORS: Lazy<HashMap<&'static str, Color32>> = Lazy::new(|| {
    HashMap::from([
        ("Company", Color32::from_rgb(0x3b, 0x82, 0xf6)),
        ("Employee", Color32::from_rgb(0x22, 0xc5, 0x5e)),
        ("Project", Color32::from_rgb(0xa8, 0x55, 0xf7)),
        ("Department", Color32::from_rgb(0xf9, 0x73, 0x16)),
    ])
});

pub fn relationship_color(kind: &str) -> Color32 {
    RELATIONSHIP_COLORS.get(kind).copied().unwrap_or(FALLBACK_COLOR)
}

pub fn node_type_color(kind: &str) -> Color32 {
    NODE_TYPE_COLORS.get(kind).copied().unwrap_or(FALLBACK_COLOR)
}
