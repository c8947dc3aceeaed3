use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::GraphError;
use super::model::{
    GraphSnapshot, Node, NodeId, NodeKind, Properties, Relationship, RelationshipId, RelationshipPatch,
    is_valid_tag,
};

pub const UNNAMED: &str = "Unnamed";

/// Backend-side graph store. Ids are UUIDv7, so sorting by id gives creation order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphDatabase {
    pub nodes: HashMap<NodeId, Node>,
    pub relationships: HashMap<RelationshipId, Relationship>,
}

impl GraphDatabase {
    // Instantiate a new, empty graph database
    pub fn new() -> Self {
        GraphDatabase {
            nodes: HashMap::new(),
            relationships: HashMap::new(),
        }
    }

    /// Rebuild a database from a snapshot. Duplicate ids and dangling relationships are rejected.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self, GraphError> {
        let mut db = GraphDatabase::new();
        for node in snapshot.nodes {
            db.insert_node(node)?;
        }
        for rel in snapshot.relationships {
            db.insert_relationship(rel)?;
        }
        Ok(db)
    }

    // Add a node and return its new ID
    pub fn add_node(&mut self, name: String, kind: NodeKind, properties: Properties) -> Result<NodeId, GraphError> {
        if !is_valid_tag(kind.as_str()) {
            return Err(GraphError::Validation(format!("invalid node type: {:?}", kind.as_str())));
        }
        let name = if name.trim().is_empty() { UNNAMED.to_string() } else { name };
        let id = Uuid::now_v7();
        self.nodes.insert(id, Node { id, name, kind, properties });
        Ok(id)
    }

    /// Insert a node carrying its own id (snapshot import, seeding).
    pub fn insert_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateId(node.id));
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    // Add a relationship if both ends exist; returns the relationship ID
    pub fn add_relationship(
        &mut self,
        source: NodeId,
        target: NodeId,
        kind: String,
        properties: Properties,
    ) -> Result<RelationshipId, GraphError> {
        if !is_valid_tag(&kind) {
            return Err(GraphError::Validation(format!("invalid relationship type: {:?}", kind)));
        }
        if !self.nodes.contains_key(&source) || !self.nodes.contains_key(&target) {
            return Err(GraphError::InvalidEndpoint { from: source, to: target });
        }
        let id = Uuid::now_v7();
        self.relationships.insert(id, Relationship { id, source, target, kind, properties });
        Ok(id)
    }

    pub fn insert_relationship(&mut self, rel: Relationship) -> Result<(), GraphError> {
        if self.relationships.contains_key(&rel.id) {
            return Err(GraphError::DuplicateId(rel.id));
        }
        if !self.nodes.contains_key(&rel.source) || !self.nodes.contains_key(&rel.target) {
            return Err(GraphError::InvalidEndpoint { from: rel.source, to: rel.target });
        }
        self.relationships.insert(rel.id, rel);
        Ok(())
    }

    /// Merge `properties` into the node's property map. Name and type are left alone.
    pub fn merge_node_properties(&mut self, id: NodeId, properties: Properties) -> Result<&Node, GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.properties.extend(properties);
        Ok(node)
    }

    pub fn update_relationship(&mut self, id: RelationshipId, patch: RelationshipPatch) -> Result<&Relationship, GraphError> {
        let current = self.relationships.get(&id).ok_or(GraphError::RelationshipNotFound(id))?;
        let source = patch.source.unwrap_or(current.source);
        let target = patch.target.unwrap_or(current.target);
        if !self.nodes.contains_key(&source) || !self.nodes.contains_key(&target) {
            return Err(GraphError::InvalidEndpoint { from: source, to: target });
        }
        if let Some(kind) = &patch.kind
            && !is_valid_tag(kind)
        {
            return Err(GraphError::Validation(format!("invalid relationship type: {:?}", kind)));
        }
        let rel = self.relationships.get_mut(&id).ok_or(GraphError::RelationshipNotFound(id))?;
        rel.source = source;
        rel.target = target;
        if let Some(kind) = patch.kind {
            rel.kind = kind;
        }
        Ok(rel)
    }

    // Delete operations
    pub fn remove_relationship(&mut self, id: RelationshipId) -> bool {
        self.relationships.remove(&id).is_some()
    }

    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if self.nodes.remove(&id).is_some() {
            // Cascade delete relationships involving this node
            self.relationships.retain(|_, rel| !rel.touches(id));
            true
        } else {
            false
        }
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> { self.nodes.get(&id) }
    pub fn get_relationship(&self, id: RelationshipId) -> Option<&Relationship> { self.relationships.get(&id) }
    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn relationship_count(&self) -> usize { self.relationships.len() }

    // Fetch helpers, creation ordered. `None` matches every type.
    pub fn find_node_ids_by_kind(&self, kind: Option<&str>) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .nodes
            .iter()
            .filter_map(|(&id, node)| match kind {
                Some(k) if node.kind.as_str() != k => None,
                _ => Some(id),
            })
            .collect();
        ids.sort();
        ids
    }

    pub fn find_relationship_ids_by_kind(&self, kind: Option<&str>) -> Vec<RelationshipId> {
        let mut ids: Vec<RelationshipId> = self
            .relationships
            .iter()
            .filter_map(|(&id, rel)| match kind {
                Some(k) if rel.kind != k => None,
                _ => Some(id),
            })
            .collect();
        ids.sort();
        ids
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let mut nodes: Vec<Node> = self.nodes.values().cloned().collect();
        nodes.sort_by_key(|n| n.id);
        let mut relationships: Vec<Relationship> = self.relationships.values().cloned().collect();
        relationships.sort_by_key(|r| r.id);
        GraphSnapshot { nodes, relationships }
    }
}
