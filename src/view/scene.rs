//! Declarative drawing list for the canvas.
//!
//! A [`Scene`] is derived from positions, relationships and selection only, so two scenes
//! can be diffed to see what changed between frames.

use std::collections::{BTreeMap, HashMap};

use egui::{Align2, Color32, FontId, Painter, Pos2, Shape, Stroke, Vec2};

use super::style::{node_style, EDGE_COLOR, LABEL_COLOR, NODE_STROKE, SELECTED_STROKE};
use crate::graph_utils::model::{Node, NodeId, Relationship, RelationshipId};

pub const LABEL_MAX_CHARS: usize = 12;
const EDGE_WIDTH: f32 = 2.0;
const ARROW_LEN: f32 = 10.0;
const ARROW_HALF_WIDTH: f32 = 3.5;
const NODE_FONT: f32 = 12.0;
const EDGE_FONT: f32 = 10.0;

// Ordering of the variants is the paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKey {
    Edge(RelationshipId),
    EdgeLabel(RelationshipId),
    Node(NodeId),
    NodeLabel(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Edge { from: Pos2, to: Pos2, color: Color32, width: f32 },
    Circle { center: Pos2, radius: f32, fill: Color32, stroke: Stroke },
    Label { pos: Pos2, text: String, color: Color32, size: f32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneDiff {
    pub added: Vec<PrimitiveKey>,
    pub removed: Vec<PrimitiveKey>,
    pub changed: Vec<PrimitiveKey>,
}

impl SceneDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    primitives: BTreeMap<PrimitiveKey, Primitive>,
}

pub fn truncate_label(name: &str) -> String {
    if name.chars().count() > LABEL_MAX_CHARS {
        let head: String = name.chars().take(LABEL_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

/// Build the drawing list. Relationships with an unpositioned end are skipped.
pub fn build_scene(
    nodes: &[Node],
    relationships: &[Relationship],
    positions: &HashMap<NodeId, Pos2>,
    selected: Option<NodeId>,
) -> Scene {
    let mut primitives = BTreeMap::new();
    let radius: HashMap<NodeId, f32> = nodes.iter().map(|n| (n.id, node_style(&n.kind).radius)).collect();

    for rel in relationships {
        let (Some(&a), Some(&b)) = (positions.get(&rel.source), positions.get(&rel.target)) else {
            continue;
        };
        let d = b - a;
        let len = d.length();
        let (from, to) = if len > f32::EPSILON {
            let dir = d / len;
            let ra = radius.get(&rel.source).copied().unwrap_or_default();
            let rb = radius.get(&rel.target).copied().unwrap_or_default();
            (a + dir * ra, b - dir * rb)
        } else {
            (a, b)
        };
        primitives.insert(
            PrimitiveKey::Edge(rel.id),
            Primitive::Edge { from, to, color: EDGE_COLOR, width: EDGE_WIDTH },
        );
        let mid = from + (to - from) * 0.5;
        primitives.insert(
            PrimitiveKey::EdgeLabel(rel.id),
            Primitive::Label { pos: mid - Vec2::new(0.0, 5.0), text: rel.kind.clone(), color: EDGE_COLOR, size: EDGE_FONT },
        );
    }

    for node in nodes {
        let Some(&center) = positions.get(&node.id) else {
            continue;
        };
        let style = node_style(&node.kind);
        let stroke = if selected == Some(node.id) {
            Stroke::new(3.0, SELECTED_STROKE)
        } else {
            Stroke::new(1.5, NODE_STROKE)
        };
        primitives.insert(
            PrimitiveKey::Node(node.id),
            Primitive::Circle { center, radius: style.radius, fill: style.fill, stroke },
        );
        primitives.insert(
            PrimitiveKey::NodeLabel(node.id),
            Primitive::Label { pos: center, text: truncate_label(&node.name), color: LABEL_COLOR, size: NODE_FONT },
        );
    }

    Scene { primitives }
}

impl Scene {
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn get(&self, key: &PrimitiveKey) -> Option<&Primitive> {
        self.primitives.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PrimitiveKey, &Primitive)> {
        self.primitives.iter()
    }

    pub fn diff(&self, previous: &Scene) -> SceneDiff {
        let mut diff = SceneDiff::default();
        for (key, prim) in &self.primitives {
            match previous.primitives.get(key) {
                None => diff.added.push(*key),
                Some(old) if old != prim => diff.changed.push(*key),
                Some(_) => {}
            }
        }
        diff.removed = previous.primitives.keys().filter(|k| !self.primitives.contains_key(k)).copied().collect();
        diff
    }

    /// Paint with scene coordinates shifted by `offset` (the canvas origin on screen).
    pub fn paint(&self, painter: &Painter, offset: Vec2) {
        for prim in self.primitives.values() {
            match prim {
                Primitive::Edge { from, to, color, width } => {
                    let (a, b) = (*from + offset, *to + offset);
                    painter.line_segment([a, b], Stroke::new(*width, *color));
                    let d = b - a;
                    let len = d.length();
                    if len > ARROW_LEN {
                        let dir = d / len;
                        let normal = Vec2::new(-dir.y, dir.x);
                        let base = b - dir * ARROW_LEN;
                        painter.add(Shape::convex_polygon(
                            vec![b, base + normal * ARROW_HALF_WIDTH, base - normal * ARROW_HALF_WIDTH],
                            *color,
                            Stroke::NONE,
                        ));
                    }
                }
                Primitive::Circle { center, radius, fill, stroke } => {
                    painter.circle_filled(*center + offset, *radius, *fill);
                    painter.circle_stroke(*center + offset, *radius, *stroke);
                }
                Primitive::Label { pos, text, color, size } => {
                    painter.text(*pos + offset, Align2::CENTER_CENTER, text, FontId::proportional(*size), *color);
                }
            }
        }
    }
}
