use thiserror::Error;
use uuid::Uuid;

use super::model::{NodeId, RelationshipId};

/// Failures raised by the backend graph database and the statement executor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("relationship not found: {0}")]
    RelationshipNotFound(RelationshipId),
    #[error("invalid endpoint(s) for relationship: from={from} to={to}")]
    InvalidEndpoint { from: NodeId, to: NodeId },
    #[error("duplicate id: {0}")]
    DuplicateId(Uuid),
    #[error("{0}")]
    Validation(String),
    #[error("query error: {0}")]
    Query(String),
}
