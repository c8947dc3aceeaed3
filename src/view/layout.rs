//! Node placement for the canvas: concentric rings around a hub node, or a plain grid.
//!
//! Positions are recomputed when the node set, the viewport, the mode or the hub kind
//! changes, and on an explicit reset. A dragged node keeps its position until then.

use std::collections::HashMap;
use std::f32::consts::TAU;

use egui::{pos2, Pos2, Vec2};
use serde::{Deserialize, Serialize};

use super::style::node_style;
use crate::graph_utils::model::{Node, NodeId, NodeKind};

pub const RING_CAPACITY: usize = 10;
pub const RING_GROWTH: f32 = 0.3;
pub const GRID_MARGIN: f32 = 50.0;
/// Pointer travel (in points) below which a press-release on a node counts as a click.
pub const CLICK_SLOP: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Ring,
    Grid,
}

impl LayoutMode {
    pub fn toggled(self) -> Self {
        match self {
            LayoutMode::Ring => LayoutMode::Grid,
            LayoutMode::Grid => LayoutMode::Ring,
        }
    }
}

pub fn ring_base_radius(viewport: Vec2) -> f32 {
    viewport.x.min(viewport.y) / 2.5
}

/// Ring placement. The first node of `hub_kind` sits at the viewport centre; the rest
/// fill rings of [`RING_CAPACITY`] nodes, ring `k` at radius `r0 * (1 + 0.3k)`.
pub fn ring_layout(nodes: &[Node], hub_kind: &str, viewport: Vec2) -> HashMap<NodeId, Pos2> {
    let entries: Vec<(NodeId, &NodeKind)> = nodes.iter().map(|n| (n.id, &n.kind)).collect();
    ring_positions(&entries, hub_kind, viewport)
}

fn ring_positions(entries: &[(NodeId, &NodeKind)], hub_kind: &str, viewport: Vec2) -> HashMap<NodeId, Pos2> {
    let center = pos2(viewport.x / 2.0, viewport.y / 2.0);
    let r0 = ring_base_radius(viewport);
    let hub = entries.iter().find(|(_, kind)| kind.as_str() == hub_kind).map(|(id, _)| *id);

    let mut out = HashMap::with_capacity(entries.len());
    if let Some(hub) = hub {
        out.insert(hub, center);
    }
    let others: Vec<NodeId> = entries.iter().map(|(id, _)| *id).filter(|id| Some(*id) != hub).collect();
    let total = others.len();
    for (i, id) in others.into_iter().enumerate() {
        let ring = i / RING_CAPACITY;
        let in_ring = (total - ring * RING_CAPACITY).min(RING_CAPACITY);
        let angle = (i % RING_CAPACITY) as f32 * TAU / in_ring as f32;
        let radius = r0 * (1.0 + ring as f32 * RING_GROWTH);
        out.insert(id, pos2(center.x + angle.cos() * radius, center.y + angle.sin() * radius));
    }
    out
}

pub fn grid_columns(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let mut cols = (n as f64).sqrt() as usize;
    while cols * cols < n {
        cols += 1;
    }
    cols
}

// Cell centre along one axis, kept inside the margins. Axes too short for both margins collapse to the middle.
fn grid_axis(index: usize, cells: usize, extent: f32) -> f32 {
    let lo = GRID_MARGIN;
    let hi = extent - GRID_MARGIN;
    if hi < lo {
        return extent / 2.0;
    }
    let cell = (hi - lo) / cells as f32;
    (lo + cell * (index as f32 + 0.5)).clamp(lo, hi)
}

/// Row-major grid with `ceil(sqrt(n))` columns inside a [`GRID_MARGIN`] inset.
pub fn grid_layout(nodes: &[Node], viewport: Vec2) -> HashMap<NodeId, Pos2> {
    let ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
    grid_positions(&ids, viewport)
}

fn grid_positions(ids: &[NodeId], viewport: Vec2) -> HashMap<NodeId, Pos2> {
    let cols = grid_columns(ids.len());
    if cols == 0 {
        return HashMap::new();
    }
    let rows = ids.len().div_ceil(cols);
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let x = grid_axis(i % cols, cols, viewport.x);
            let y = grid_axis(i / cols, rows, viewport.y);
            (*id, pos2(x, y))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    None,
    Selected(NodeId),
    Cleared,
    Moved(NodeId),
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    id: NodeId,
    press: Pos2,
    moved: bool,
}

/// Positions plus the select/drag state machine for the canvas.
pub struct LayoutEngine {
    mode: LayoutMode,
    hub_kind: String,
    viewport: Vec2,
    entries: Vec<(NodeId, NodeKind)>,
    revision: Option<u64>,
    positions: HashMap<NodeId, Pos2>,
    drag: Option<Drag>,
    selected: Option<NodeId>,
}

impl LayoutEngine {
    pub fn new(mode: LayoutMode, hub_kind: impl Into<String>) -> Self {
        Self {
            mode,
            hub_kind: hub_kind.into(),
            viewport: Vec2::ZERO,
            entries: Vec::new(),
            revision: None,
            positions: HashMap::new(),
            drag: None,
            selected: None,
        }
    }

    pub fn mode(&self) -> LayoutMode { self.mode }
    pub fn hub_kind(&self) -> &str { &self.hub_kind }
    pub fn viewport(&self) -> Vec2 { self.viewport }
    pub fn positions(&self) -> &HashMap<NodeId, Pos2> { &self.positions }
    pub fn position(&self, id: NodeId) -> Option<Pos2> { self.positions.get(&id).copied() }
    pub fn selected(&self) -> Option<NodeId> { self.selected }
    pub fn dragging(&self) -> Option<NodeId> { self.drag.filter(|d| d.moved).map(|d| d.id) }

    pub fn select(&mut self, id: Option<NodeId>) {
        self.selected = id.filter(|id| self.positions.contains_key(id));
    }

    /// Recompute when the node set, its revision or the viewport changed. Returns true when it did.
    pub fn sync(&mut self, nodes: &[Node], revision: u64, viewport: Vec2) -> bool {
        let same_nodes = self.entries.len() == nodes.len()
            && self.entries.iter().zip(nodes).all(|((id, kind), n)| *id == n.id && *kind == n.kind);
        if same_nodes && self.revision == Some(revision) && self.viewport == viewport {
            return false;
        }
        self.entries = nodes.iter().map(|n| (n.id, n.kind.clone())).collect();
        self.revision = Some(revision);
        self.viewport = viewport;
        self.recompute();
        true
    }

    pub fn set_mode(&mut self, mode: LayoutMode) {
        if self.mode != mode {
            self.mode = mode;
            self.recompute();
        }
    }

    pub fn toggle_mode(&mut self) {
        self.set_mode(self.mode.toggled());
    }

    pub fn set_hub_kind(&mut self, hub_kind: impl Into<String>) {
        let hub_kind = hub_kind.into();
        if self.hub_kind != hub_kind {
            self.hub_kind = hub_kind;
            self.recompute();
        }
    }

    /// Throw away manual drags and place every node again.
    pub fn reset(&mut self) {
        self.recompute();
    }

    fn recompute(&mut self) {
        self.drag = None;
        self.positions = match self.mode {
            LayoutMode::Ring => {
                let refs: Vec<(NodeId, &NodeKind)> = self.entries.iter().map(|(id, k)| (*id, k)).collect();
                ring_positions(&refs, &self.hub_kind, self.viewport)
            }
            LayoutMode::Grid => {
                let ids: Vec<NodeId> = self.entries.iter().map(|(id, _)| *id).collect();
                grid_positions(&ids, self.viewport)
            }
        };
        if let Some(sel) = self.selected
            && !self.positions.contains_key(&sel)
        {
            self.selected = None;
        }
    }

    /// Topmost node under `pos`; later nodes are drawn above earlier ones.
    pub fn node_at(&self, pos: Pos2) -> Option<NodeId> {
        self.entries.iter().rev().find_map(|(id, kind)| {
            let center = self.positions.get(id)?;
            (center.distance(pos) <= node_style(kind).radius).then_some(*id)
        })
    }

    pub fn pointer_down(&mut self, pos: Pos2) -> PointerOutcome {
        match self.node_at(pos) {
            Some(id) => {
                self.drag = Some(Drag { id, press: pos, moved: false });
                PointerOutcome::None
            }
            None => {
                self.drag = None;
                self.selected = None;
                PointerOutcome::Cleared
            }
        }
    }

    pub fn pointer_move(&mut self, pos: Pos2) -> PointerOutcome {
        let Some(drag) = self.drag.as_mut() else {
            return PointerOutcome::None;
        };
        if !drag.moved && drag.press.distance(pos) <= CLICK_SLOP {
            return PointerOutcome::None;
        }
        drag.moved = true;
        let id = drag.id;
        let clamped = pos2(pos.x.clamp(0.0, self.viewport.x.max(0.0)), pos.y.clamp(0.0, self.viewport.y.max(0.0)));
        self.positions.insert(id, clamped);
        PointerOutcome::Moved(id)
    }

    pub fn pointer_up(&mut self, _pos: Pos2) -> PointerOutcome {
        match self.drag.take() {
            Some(Drag { id, moved: false, .. }) => {
                self.selected = Some(id);
                PointerOutcome::Selected(id)
            }
            _ => PointerOutcome::None,
        }
    }
}
