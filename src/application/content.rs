//! Content reads and writes on top of the collection cache.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::application::repos::{CollectionStore, RepoError, Row, WriteOp};
use crate::cache::{CacheError, CollectionCache, Payload};
use crate::domain::error::DomainError;
use crate::domain::inputs::{RecordId, WritePayload, parse_id};
use crate::domain::resource::Resource;

const PUBLISHED_STATUS: &str = "published";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("{resource} record not found")]
    NotFound { resource: Resource },
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct ContentService {
    cache: Arc<CollectionCache>,
    store: Arc<dyn CollectionStore>,
}

impl ContentService {
    pub fn new(cache: Arc<CollectionCache>, store: Arc<dyn CollectionStore>) -> Self {
        Self { cache, store }
    }

    pub fn cache(&self) -> &Arc<CollectionCache> {
        &self.cache
    }

    pub async fn list(&self, resource: Resource) -> Result<Arc<Payload>, ContentError> {
        Ok(self.cache.get(resource).await?)
    }

    /// Posts whose status is `published`, in listing order.
    pub async fn published_posts(&self) -> Result<Vec<Value>, ContentError> {
        let posts = self.cache.get(Resource::Posts).await?;
        let published = posts
            .as_records()
            .unwrap_or_default()
            .iter()
            .filter(|post| post.get("status").and_then(Value::as_str) == Some(PUBLISHED_STATUS))
            .cloned()
            .collect();
        Ok(published)
    }

    pub async fn post_by_slug(&self, slug: &str) -> Result<Row, ContentError> {
        self.fetch_one(Resource::Posts, RecordId::Slug(slug.to_string()))
            .await
    }

    pub async fn record(&self, resource: Resource, id: i64) -> Result<Row, ContentError> {
        self.fetch_one(resource, RecordId::Id(id)).await
    }

    async fn fetch_one(&self, resource: Resource, id: RecordId) -> Result<Row, ContentError> {
        debug!(resource = %resource, id = ?id, "Loading single record from store");
        self.store
            .fetch_one(resource, &id)
            .await?
            .ok_or(ContentError::NotFound { resource })
    }

    pub async fn create(&self, resource: Resource, body: Value) -> Result<Row, ContentError> {
        let payload = WritePayload::parse(resource, body)?;
        self.cache
            .write(resource, WriteOp::Create(payload))
            .await?
            .ok_or(ContentError::NotFound { resource })
    }

    /// Replace one record. `raw_id` is the path segment as received.
    pub async fn update(
        &self,
        resource: Resource,
        raw_id: &str,
        body: Value,
    ) -> Result<Row, ContentError> {
        let id = record_id(resource, raw_id, "update")?;
        let payload = WritePayload::parse(resource, body)?;
        self.cache
            .write(resource, WriteOp::Update { id, payload })
            .await
            .map_err(not_found_as_content)?
            .ok_or(ContentError::NotFound { resource })
    }

    pub async fn delete(&self, resource: Resource, raw_id: &str) -> Result<(), ContentError> {
        let id = record_id(resource, raw_id, "delete")?;
        self.cache
            .write(resource, WriteOp::Delete { id })
            .await
            .map_err(not_found_as_content)?;
        Ok(())
    }

    /// Upsert every key of a `{"settings": {...}}` body.
    pub async fn save_settings(&self, body: Value) -> Result<(), ContentError> {
        let payload = WritePayload::parse(Resource::Settings, body)?;
        self.cache
            .write(Resource::Settings, WriteOp::Create(payload))
            .await?;
        Ok(())
    }
}

/// Mapping resources have no addressable records; only bulk writes apply.
fn record_id(resource: Resource, raw_id: &str, operation: &'static str) -> Result<i64, ContentError> {
    if resource.is_mapping() {
        return Err(RepoError::Unsupported {
            resource,
            operation,
        }
        .into());
    }
    Ok(parse_id(raw_id)?)
}

fn not_found_as_content(err: CacheError) -> ContentError {
    match err.repo_error() {
        RepoError::NotFound => ContentError::NotFound {
            resource: err.resource(),
        },
        _ => ContentError::Cache(err),
    }
}
