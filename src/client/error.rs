use thiserror::Error;
use uuid::Uuid;

use crate::graph_utils::error::GraphError;

/// Errors surfaced by the Graph Store. None of them are fatal to the session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Backend could not be reached
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Backend answered with an error status
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    /// Blocked client-side, nothing was sent
    #[error("{0}")]
    Validation(String),

    #[error("duplicate id in cache: {0}")]
    DuplicateId(Uuid),

    #[error("could not decode backend response: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            StoreError::Rejected { status: status.as_u16(), message: err.to_string() }
        } else {
            StoreError::Unavailable(err.to_string())
        }
    }
}

// Embedded backend errors are mapped onto the same statuses the HTTP API answers with.
impl From<GraphError> for StoreError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::NodeNotFound(_) | GraphError::RelationshipNotFound(_) => StoreError::NotFound(err.to_string()),
            GraphError::DuplicateId(_) => StoreError::Rejected { status: 409, message: err.to_string() },
            GraphError::InvalidEndpoint { .. } | GraphError::Validation(_) | GraphError::Query(_) => {
                StoreError::Rejected { status: 400, message: err.to_string() }
            }
        }
    }
}
