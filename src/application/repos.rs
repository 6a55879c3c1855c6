//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::inputs::{RecordId, WritePayload};
use crate::domain::resource::Resource;

/// A raw record as returned by the backing store.
pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error("operation `{operation}` is not supported for `{resource}`")]
    Unsupported {
        resource: Resource,
        operation: &'static str,
    },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// A mutation against one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert a record. For `settings` this is a bulk upsert of key/value pairs.
    Create(WritePayload),
    Update { id: i64, payload: WritePayload },
    Delete { id: i64 },
}

impl WriteOp {
    pub fn name(&self) -> &'static str {
        match self {
            WriteOp::Create(_) => "create",
            WriteOp::Update { .. } => "update",
            WriteOp::Delete { .. } => "delete",
        }
    }
}

/// Data-access collaborator backing the collection cache.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Load every row of `resource` in its public listing order.
    async fn fetch_all(&self, resource: Resource) -> Result<Vec<Row>, RepoError>;

    /// Load a single row, bypassing any cache.
    async fn fetch_one(&self, resource: Resource, id: &RecordId)
    -> Result<Option<Row>, RepoError>;

    /// Apply a mutation. Returns the affected row where the store reports one.
    async fn write(&self, resource: Resource, op: WriteOp) -> Result<Option<Row>, RepoError>;
}
