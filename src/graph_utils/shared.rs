use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::error::GraphError;
use super::graph::GraphDatabase;
use super::model::{
    GraphSnapshot, NewNode, NewRelationship, Node, NodeId, Properties, Relationship, RelationshipId,
    RelationshipPatch,
};
use crate::gql::query_interface::{self, BatchReport, Params, QueryOutcome};
use crate::persistence::persist;

/// Thread-safe handle over the backend database, shared by HTTP handlers and the embedded backend.
#[derive(Clone, Default)]
pub struct SharedGraph {
    inner: Arc<Mutex<GraphDatabase>>,
    snapshot_path: Option<PathBuf>,
}

impl SharedGraph {
    pub fn new(db: GraphDatabase) -> Self {
        Self { inner: Arc::new(Mutex::new(db)), snapshot_path: None }
    }

    /// Same as [`SharedGraph::new`], but every confirmed write is followed by a snapshot to `path`.
    pub fn with_autosave(db: GraphDatabase, path: PathBuf) -> Self {
        Self { inner: Arc::new(Mutex::new(db)), snapshot_path: Some(path) }
    }

    fn lock(&self) -> MutexGuard<'_, GraphDatabase> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn autosave(&self, db: &GraphDatabase) {
        if let Some(path) = &self.snapshot_path
            && let Err(e) = persist::save_graph(path, &db.snapshot())
        {
            log::error!("autosave to {} failed: {}", path.display(), e);
        }
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.lock().snapshot()
    }

    pub fn counts(&self) -> (usize, usize) {
        let db = self.lock();
        (db.node_count(), db.relationship_count())
    }

    pub fn create_node(&self, req: NewNode) -> Result<Node, GraphError> {
        let mut db = self.lock();
        let id = db.add_node(req.name, req.kind, req.properties)?;
        let node = db.get_node(id).cloned().ok_or(GraphError::NodeNotFound(id))?;
        self.autosave(&db);
        Ok(node)
    }

    pub fn update_node(&self, id: NodeId, properties: Properties) -> Result<Node, GraphError> {
        let mut db = self.lock();
        let node = db.merge_node_properties(id, properties)?.clone();
        self.autosave(&db);
        Ok(node)
    }

    /// Returns whether the node existed. Relationships touching it are removed with it.
    pub fn delete_node(&self, id: NodeId) -> bool {
        let mut db = self.lock();
        let removed = db.remove_node(id);
        if removed {
            self.autosave(&db);
        }
        removed
    }

    pub fn create_relationship(&self, req: NewRelationship) -> Result<Relationship, GraphError> {
        let mut db = self.lock();
        let id = db.add_relationship(req.source, req.target, req.kind, req.properties)?;
        let rel = db.get_relationship(id).cloned().ok_or(GraphError::RelationshipNotFound(id))?;
        self.autosave(&db);
        Ok(rel)
    }

    pub fn update_relationship(&self, id: RelationshipId, patch: RelationshipPatch) -> Result<Relationship, GraphError> {
        let mut db = self.lock();
        let rel = db.update_relationship(id, patch)?.clone();
        self.autosave(&db);
        Ok(rel)
    }

    pub fn delete_relationship(&self, id: RelationshipId) -> bool {
        let mut db = self.lock();
        let removed = db.remove_relationship(id);
        if removed {
            self.autosave(&db);
        }
        removed
    }

    /// Single request; the first failing statement aborts the rest.
    pub fn run_query(&self, query: &str, params: &Params) -> Result<QueryOutcome, GraphError> {
        let mut db = self.lock();
        match query_interface::execute_with_params(&mut db, query, params) {
            Ok(outcome) => {
                if outcome.mutated {
                    self.autosave(&db);
                }
                Ok(outcome)
            }
            Err(e) => {
                // Statements before the failing one may already have been applied
                self.autosave(&db);
                Err(GraphError::Query(e.to_string()))
            }
        }
    }

    pub fn execute_batch(&self, queries: &str) -> Result<BatchReport, GraphError> {
        let mut db = self.lock();
        let report = query_interface::execute_batch(&mut db, queries)
            .map_err(|e| GraphError::Validation(e.to_string()))?;
        if report.mutated {
            self.autosave(&db);
        }
        Ok(report)
    }
}
