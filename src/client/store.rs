use std::collections::HashSet;

use super::backend::GraphBackend;
use super::error::{StoreError, StoreResult};
use crate::gql::query_interface::BatchReport;
use crate::graph_utils::model::{
    GraphSnapshot, NewNode, NewRelationship, Node, NodeId, NodeKind, Properties, Relationship, RelationshipId,
    RelationshipPatch, Scalar,
};

/// Client-side cache of the whole graph.
///
/// Every mutation is a confirmed round trip: the cache is only patched after the backend
/// accepted the write, so it is never ahead of the canonical graph. Failures are logged,
/// kept in [`GraphStore::last_error`] and returned to the caller.
pub struct GraphStore<B: GraphBackend> {
    backend: B,
    nodes: Vec<Node>,
    relationships: Vec<Relationship>,
    loading: bool,
    last_error: Option<String>,
    revision: u64,
}

impl<B: GraphBackend> GraphStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            nodes: Vec::new(),
            relationships: Vec::new(),
            loading: false,
            last_error: None,
            revision: 0,
        }
    }

    pub fn backend(&self) -> &B { &self.backend }
    pub fn nodes(&self) -> &[Node] { &self.nodes }
    pub fn relationships(&self) -> &[Relationship] { &self.relationships }
    pub fn is_loading(&self) -> bool { self.loading }
    pub fn last_error(&self) -> Option<&str> { self.last_error.as_deref() }
    pub fn clear_error(&mut self) { self.last_error = None; }

    /// Bumped on every cache change.
    pub fn revision(&self) -> u64 { self.revision }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn relationship(&self, id: RelationshipId) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.id == id)
    }

    fn fail(&mut self, op: &str, err: StoreError) -> StoreError {
        match &err {
            StoreError::Validation(_) => log::warn!("{} blocked: {}", op, err),
            StoreError::Unavailable(_) => log::error!("{} failed: {}", op, err),
            _ => log::warn!("{} failed: {}", op, err),
        }
        self.last_error = Some(err.to_string());
        err
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Replace the cache with the backend's collections. On failure the previous cache stays visible.
    pub async fn load(&mut self) -> StoreResult<()> {
        self.begin_load();
        let result = self.backend.fetch_graph().await;
        self.finish_load(result)
    }

    /// Marks a fetch as in flight until [`GraphStore::finish_load`] sees its result.
    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    pub fn finish_load(&mut self, result: StoreResult<GraphSnapshot>) -> StoreResult<()> {
        self.loading = false;
        let snapshot = match result {
            Ok(s) => s,
            Err(e) => return Err(self.fail("load graph", e)),
        };

        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(snapshot.nodes.len());
        for node in snapshot.nodes {
            if seen.insert(node.id) {
                nodes.push(node);
            } else {
                log::warn!("backend returned duplicate node id {}; keeping the first", node.id);
            }
        }
        seen.clear();
        let mut relationships = Vec::with_capacity(snapshot.relationships.len());
        for rel in snapshot.relationships {
            if seen.insert(rel.id) {
                relationships.push(rel);
            } else {
                log::warn!("backend returned duplicate relationship id {}; keeping the first", rel.id);
            }
        }

        log::debug!("loaded {} nodes, {} relationships", nodes.len(), relationships.len());
        self.nodes = nodes;
        self.relationships = relationships;
        self.last_error = None;
        self.touch();
        Ok(())
    }

    pub async fn create_node(&mut self, name: &str, kind: NodeKind, properties: Properties) -> StoreResult<Node> {
        let req = self.node_request(name, kind, properties);
        let result = self.backend.create_node(&req).await;
        self.finish_create_node(result)
    }

    pub fn node_request(&self, name: &str, kind: NodeKind, properties: Properties) -> NewNode {
        NewNode { name: name.trim().to_string(), kind, properties }
    }

    pub fn finish_create_node(&mut self, result: StoreResult<Node>) -> StoreResult<Node> {
        let node = match result {
            Ok(n) => n,
            Err(e) => return Err(self.fail("create node", e)),
        };
        if self.node(node.id).is_some() {
            return Err(self.fail("create node", StoreError::DuplicateId(node.id)));
        }
        self.nodes.push(node.clone());
        self.touch();
        Ok(node)
    }

    pub async fn update_node(&mut self, id: NodeId, properties: Properties) -> StoreResult<Node> {
        let result = self.backend.update_node(id, &properties).await;
        self.finish_update_node(id, result)
    }

    pub fn finish_update_node(&mut self, id: NodeId, result: StoreResult<Node>) -> StoreResult<Node> {
        let node = match result {
            Ok(n) => n,
            Err(e) => return Err(self.fail("update node", e)),
        };
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(slot) => *slot = node.clone(),
            None => self.nodes.push(node.clone()),
        }
        self.touch();
        Ok(node)
    }

    /// Removes the node and every relationship that references it.
    pub async fn delete_node(&mut self, id: NodeId) -> StoreResult<()> {
        let result = self.backend.delete_node(id).await;
        self.finish_delete_node(id, result)
    }

    pub fn finish_delete_node(&mut self, id: NodeId, result: StoreResult<()>) -> StoreResult<()> {
        if let Err(e) = result {
            return Err(self.fail("delete node", e));
        }
        self.nodes.retain(|n| n.id != id);
        self.relationships.retain(|r| !r.touches(id));
        self.touch();
        Ok(())
    }

    pub async fn create_relationship(
        &mut self,
        source: Option<NodeId>,
        target: Option<NodeId>,
        kind: &str,
    ) -> StoreResult<Relationship> {
        let req = self.relationship_request(source, target, kind)?;
        let result = self.backend.create_relationship(&req).await;
        self.finish_create_relationship(result)
    }

    /// Blocks the request client-side when a dropdown is still empty.
    pub fn relationship_request(
        &mut self,
        source: Option<NodeId>,
        target: Option<NodeId>,
        kind: &str,
    ) -> StoreResult<NewRelationship> {
        let kind = kind.trim();
        match (source, target) {
            (Some(source), Some(target)) if !kind.is_empty() => {
                Ok(NewRelationship { source, target, kind: kind.to_string(), properties: Properties::new() })
            }
            _ => {
                let err = StoreError::Validation("Please select source, target and relationship type".to_string());
                Err(self.fail("create relationship", err))
            }
        }
    }

    pub fn finish_create_relationship(&mut self, result: StoreResult<Relationship>) -> StoreResult<Relationship> {
        let rel = match result {
            Ok(r) => r,
            Err(e) => return Err(self.fail("create relationship", e)),
        };
        if self.relationship(rel.id).is_some() {
            return Err(self.fail("create relationship", StoreError::DuplicateId(rel.id)));
        }
        self.relationships.push(rel.clone());
        self.touch();
        Ok(rel)
    }

    pub async fn update_relationship(&mut self, id: RelationshipId, patch: RelationshipPatch) -> StoreResult<Relationship> {
        self.check_relationship_patch(&patch)?;
        let result = self.backend.update_relationship(id, &patch).await;
        self.finish_update_relationship(id, result)
    }

    pub fn check_relationship_patch(&mut self, patch: &RelationshipPatch) -> StoreResult<()> {
        if matches!(&patch.kind, Some(k) if k.trim().is_empty()) {
            let err = StoreError::Validation("Relationship type cannot be empty".to_string());
            return Err(self.fail("update relationship", err));
        }
        Ok(())
    }

    pub fn finish_update_relationship(
        &mut self,
        id: RelationshipId,
        result: StoreResult<Relationship>,
    ) -> StoreResult<Relationship> {
        let rel = match result {
            Ok(r) => r,
            Err(e) => return Err(self.fail("update relationship", e)),
        };
        match self.relationships.iter_mut().find(|r| r.id == id) {
            Some(slot) => *slot = rel.clone(),
            None => self.relationships.push(rel.clone()),
        }
        self.touch();
        Ok(rel)
    }

    pub async fn delete_relationship(&mut self, id: RelationshipId) -> StoreResult<()> {
        let result = self.backend.delete_relationship(id).await;
        self.finish_delete_relationship(id, result)
    }

    pub fn finish_delete_relationship(&mut self, id: RelationshipId, result: StoreResult<()>) -> StoreResult<()> {
        if let Err(e) = result {
            return Err(self.fail("delete relationship", e));
        }
        self.relationships.retain(|r| r.id != id);
        self.touch();
        Ok(())
    }

    /// Run a `;`-separated batch on the backend and reload when any statement changed the graph.
    pub async fn execute_queries(&mut self, queries: &str) -> StoreResult<BatchReport> {
        self.check_queries(queries)?;
        let result = self.backend.execute_queries(queries).await;
        let report = self.finish_execute_queries(result)?;
        if report.mutated {
            // A failed reload leaves last_error set; the report is still returned.
            let _ = self.load().await;
        }
        Ok(report)
    }

    pub fn check_queries(&mut self, queries: &str) -> StoreResult<()> {
        if queries.split(';').all(|s| s.trim().is_empty()) {
            return Err(self.fail("execute queries", StoreError::Validation("No valid queries found".to_string())));
        }
        Ok(())
    }

    /// Records a batch outcome. A mutating report means the cache is stale until the next load.
    pub fn finish_execute_queries(&mut self, result: StoreResult<BatchReport>) -> StoreResult<BatchReport> {
        let report = match result {
            Ok(r) => r,
            Err(e) => return Err(self.fail("execute queries", e)),
        };
        if !report.success {
            log::warn!("{}", report.message);
        }
        Ok(report)
    }
}

/// Build a property map from form rows. Fully blank rows are skipped; empty or repeated keys are rejected.
pub fn build_properties<K: AsRef<str>, V: AsRef<str>>(rows: &[(K, V)]) -> StoreResult<Properties> {
    let mut props = Properties::new();
    for (key, value) in rows {
        let key = key.as_ref().trim();
        let value = value.as_ref();
        if key.is_empty() {
            if value.trim().is_empty() {
                continue;
            }
            return Err(StoreError::Validation("Property key cannot be empty".to_string()));
        }
        if props.insert(key.to_string(), Scalar::text(value)).is_some() {
            return Err(StoreError::Validation(format!("Duplicate property key: {}", key)));
        }
    }
    Ok(props)
}
