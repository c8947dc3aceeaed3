use async_trait::async_trait;

use super::error::StoreResult;
use crate::gql::query_interface::BatchReport;
use crate::graph_utils::model::{
    GraphSnapshot, NewNode, NewRelationship, Node, NodeId, Properties, Relationship, RelationshipId,
    RelationshipPatch,
};
use crate::graph_utils::shared::SharedGraph;

/// Request/response seam between the Graph Store and whatever holds the canonical graph.
///
/// Implemented by:
/// - `EmbeddedBackend`: in-process, no network (tests, single-binary use)
/// - `RemoteBackend`: a running `atlas-server` over HTTP
#[async_trait]
pub trait GraphBackend: Send + Sync {
    async fn fetch_graph(&self) -> StoreResult<GraphSnapshot>;

    async fn create_node(&self, req: &NewNode) -> StoreResult<Node>;

    /// Merge `properties` into the node. Name and type are untouched.
    async fn update_node(&self, id: NodeId, properties: &Properties) -> StoreResult<Node>;

    async fn delete_node(&self, id: NodeId) -> StoreResult<()>;

    async fn create_relationship(&self, req: &NewRelationship) -> StoreResult<Relationship>;

    async fn update_relationship(&self, id: RelationshipId, patch: &RelationshipPatch) -> StoreResult<Relationship>;

    async fn delete_relationship(&self, id: RelationshipId) -> StoreResult<()>;

    async fn execute_queries(&self, queries: &str) -> StoreResult<BatchReport>;
}

#[derive(Clone, Default)]
pub struct EmbeddedBackend {
    graph: SharedGraph,
}

impl EmbeddedBackend {
    pub fn new(graph: SharedGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }
}

#[async_trait]
impl GraphBackend for EmbeddedBackend {
    async fn fetch_graph(&self) -> StoreResult<GraphSnapshot> {
        Ok(self.graph.snapshot())
    }

    async fn create_node(&self, req: &NewNode) -> StoreResult<Node> {
        Ok(self.graph.create_node(req.clone())?)
    }

    async fn update_node(&self, id: NodeId, properties: &Properties) -> StoreResult<Node> {
        Ok(self.graph.update_node(id, properties.clone())?)
    }

    async fn delete_node(&self, id: NodeId) -> StoreResult<()> {
        self.graph.delete_node(id);
        Ok(())
    }

    async fn create_relationship(&self, req: &NewRelationship) -> StoreResult<Relationship> {
        Ok(self.graph.create_relationship(req.clone())?)
    }

    async fn update_relationship(&self, id: RelationshipId, patch: &RelationshipPatch) -> StoreResult<Relationship> {
        Ok(self.graph.update_relationship(id, patch.clone())?)
    }

    async fn delete_relationship(&self, id: RelationshipId) -> StoreResult<()> {
        self.graph.delete_relationship(id);
        Ok(())
    }

    async fn execute_queries(&self, queries: &str) -> StoreResult<BatchReport> {
        Ok(self.graph.execute_batch(queries)?)
    }
}
