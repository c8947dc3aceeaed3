use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::graph_utils::model::{Node, NodeId, NodeKind, Relationship};

/// Aggregate counts for the overview panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphOverview {
    pub node_types: BTreeMap<String, usize>,
    pub relationship_types: BTreeMap<String, usize>,
    pub total_nodes: usize,
    pub total_relationships: usize,
    pub property_keys: BTreeSet<String>,
}

impl GraphOverview {
    pub fn compute(nodes: &[Node], relationships: &[Relationship]) -> Self {
        let mut overview = GraphOverview {
            total_nodes: nodes.len(),
            total_relationships: relationships.len(),
            ..Default::default()
        };
        for node in nodes {
            *overview.node_types.entry(node.kind.to_string()).or_default() += 1;
            overview.property_keys.extend(node.properties.keys().cloned());
        }
        for rel in relationships {
            *overview.relationship_types.entry(rel.kind.clone()).or_default() += 1;
            overview.property_keys.extend(rel.properties.keys().cloned());
        }
        overview
    }
}

/// At most one type filter is active; picking one replaces the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TypeFilter {
    #[default]
    All,
    NodeType(String),
    RelationshipType(String),
}

impl TypeFilter {
    pub fn is_active(&self) -> bool {
        !matches!(self, TypeFilter::All)
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            TypeFilter::All => None,
            TypeFilter::NodeType(t) | TypeFilter::RelationshipType(t) => Some(t),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredView {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
}

/// Narrow the graph to a type's neighbourhood. Collection order is preserved.
///
/// A node type keeps its nodes, every relationship touching one of them and the nodes at the
/// other end. A relationship type keeps its relationships and every node they touch.
pub fn apply_filter(nodes: &[Node], relationships: &[Relationship], filter: &TypeFilter) -> FilteredView {
    match filter {
        TypeFilter::All => FilteredView { nodes: nodes.to_vec(), relationships: relationships.to_vec() },
        TypeFilter::NodeType(kind) => {
            let seeds: HashSet<NodeId> = nodes.iter().filter(|n| n.kind.as_str() == kind).map(|n| n.id).collect();
            let rels: Vec<Relationship> = relationships
                .iter()
                .filter(|r| seeds.contains(&r.source) || seeds.contains(&r.target))
                .cloned()
                .collect();
            let mut keep = seeds;
            for r in &rels {
                keep.insert(r.source);
                keep.insert(r.target);
            }
            FilteredView {
                nodes: nodes.iter().filter(|n| keep.contains(&n.id)).cloned().collect(),
                relationships: rels,
            }
        }
        TypeFilter::RelationshipType(kind) => {
            let rels: Vec<Relationship> = relationships.iter().filter(|r| r.kind == *kind).cloned().collect();
            let keep: HashSet<NodeId> = rels.iter().flat_map(|r| [r.source, r.target]).collect();
            FilteredView {
                nodes: nodes.iter().filter(|n| keep.contains(&n.id)).cloned().collect(),
                relationships: rels,
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanyStats {
    pub total_employees: usize,
    pub active_projects: usize,
    pub departments: usize,
    pub avg_experience: Option<i64>,
}

impl CompanyStats {
    pub fn compute(nodes: &[Node]) -> Self {
        let employees: Vec<&Node> = nodes.iter().filter(|n| n.kind == NodeKind::Employee).collect();
        let departments: HashSet<String> = employees
            .iter()
            .filter_map(|n| n.properties.get("department"))
            .map(|v| v.to_string())
            .collect();
        let years: Vec<i64> = employees
            .iter()
            .filter_map(|n| n.properties.get("experience"))
            .filter_map(|v| v.to_string().trim().parse::<i64>().ok())
            .collect();
        let avg_experience = (!years.is_empty())
            .then(|| (years.iter().sum::<i64>() as f64 / years.len() as f64).round() as i64);
        CompanyStats {
            total_employees: employees.len(),
            active_projects: nodes.iter().filter(|n| n.kind == NodeKind::Project).count(),
            departments: departments.len(),
            avg_experience,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDetails {
    pub node: Node,
    /// Relationships targeting the node, with their source.
    pub incoming: Vec<(Relationship, Node)>,
    /// Relationships sourced at the node, with their target.
    pub outgoing: Vec<(Relationship, Node)>,
    pub connectivity_percent: u32,
}

pub fn node_details(nodes: &[Node], relationships: &[Relationship], id: NodeId) -> Option<NodeDetails> {
    let by_id: HashMap<NodeId, &Node> = nodes.iter().map(|n| (n.id, n)).collect();
    let node = (*by_id.get(&id)?).clone();
    let incoming: Vec<(Relationship, Node)> = relationships
        .iter()
        .filter(|r| r.target == id)
        .filter_map(|r| by_id.get(&r.source).map(|n| (r.clone(), (*n).clone())))
        .collect();
    let outgoing: Vec<(Relationship, Node)> = relationships
        .iter()
        .filter(|r| r.source == id)
        .filter_map(|r| by_id.get(&r.target).map(|n| (r.clone(), (*n).clone())))
        .collect();
    let others = nodes.len().saturating_sub(1).max(1);
    let connectivity_percent = (((incoming.len() + outgoing.len()) as f64 / others as f64) * 100.0).round() as u32;
    Some(NodeDetails { node, incoming, outgoing, connectivity_percent })
}
