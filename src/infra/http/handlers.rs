//! JSON handlers for the content API.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::cache::Payload;
use crate::domain::inputs::parse_id;
use crate::domain::resource::Resource;

use super::HttpState;
use super::error::ApiError;

/// Serializes a shared cache payload without copying it.
pub struct PayloadBody(Arc<Payload>);

impl Serialize for PayloadBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

pub async fn health() -> impl IntoResponse {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({ "status": "ok", "timestamp": timestamp }))
}

pub async fn list(
    State(state): State<HttpState>,
    resource: Resource,
) -> Result<impl IntoResponse, ApiError> {
    let payload = state.content.list(resource).await?;
    Ok(Json(PayloadBody(payload)))
}

pub async fn published_posts(
    State(state): State<HttpState>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.content.published_posts().await?;
    Ok(Json(posts))
}

pub async fn post_by_slug(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.content.post_by_slug(&slug).await?;
    Ok(Json(post))
}

pub async fn record(
    State(state): State<HttpState>,
    resource: Resource,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let row = state.content.record(resource, id).await?;
    Ok(Json(row))
}

pub async fn create(
    State(state): State<HttpState>,
    resource: Resource,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state.content.create(resource, body).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn update(
    State(state): State<HttpState>,
    resource: Resource,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state.content.update(resource, &id, body).await?;
    Ok(Json(row))
}

pub async fn delete(
    State(state): State<HttpState>,
    resource: Resource,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.content.delete(resource, &id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn save_settings(
    State(state): State<HttpState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    state.content.save_settings(body).await?;
    Ok(Json(
        json!({ "success": true, "message": "Settings updated successfully" }),
    ))
}

pub async fn cache_status(State(state): State<HttpState>) -> impl IntoResponse {
    let cache = state.content.cache();
    Json(json!({
        "freshness_window_seconds": cache.freshness_window().as_secs(),
        "entries": cache.snapshots(),
    }))
}

pub async fn flush_cache(State(state): State<HttpState>) -> impl IntoResponse {
    state.content.cache().invalidate_all();
    StatusCode::NO_CONTENT
}
