mod error;
mod handlers;
mod middleware;

pub use error::{ApiError, ApiErrorBody, ApiErrorMessage, codes};

use axum::{
    Json, Router,
    extract::{Path, State},
    middleware as axum_middleware,
    routing::{MethodRouter, get, post, put},
};
use serde_json::Value;

use crate::application::content::ContentService;
use crate::domain::resource::Resource;

use self::middleware::log_responses;

#[derive(Clone)]
pub struct HttpState {
    pub content: ContentService,
}

impl HttpState {
    pub fn new(content: ContentService) -> Self {
        Self { content }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/settings",
            get(|state: State<HttpState>| handlers::list(state, Resource::Settings)),
        )
        .route("/api/settings/bulk", post(handlers::save_settings))
        .route("/api/settings/{key}", setting_key())
        .route("/api/experiences", collection(Resource::Experiences))
        .route("/api/experiences/{id}", record(Resource::Experiences))
        .route("/api/certifications", collection(Resource::Certifications))
        .route("/api/certifications/{id}", record(Resource::Certifications))
        .route("/api/projects", collection(Resource::Projects))
        .route("/api/projects/{id}", record(Resource::Projects))
        .route("/api/posts", collection(Resource::Posts))
        .route("/api/posts/published", get(handlers::published_posts))
        .route("/api/posts/{key}", post_record())
        .route(
            "/api/cache",
            get(handlers::cache_status).delete(handlers::flush_cache),
        )
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
}

/// List and create on a collection root.
fn collection(resource: Resource) -> MethodRouter<HttpState> {
    get(move |state: State<HttpState>| handlers::list(state, resource)).post(
        move |state: State<HttpState>, body: Json<Value>| handlers::create(state, resource, body),
    )
}

/// Read, update and delete a single record by numeric id.
fn record(resource: Resource) -> MethodRouter<HttpState> {
    get(move |state: State<HttpState>, id: Path<String>| handlers::record(state, resource, id))
        .put(
            move |state: State<HttpState>, id: Path<String>, body: Json<Value>| {
                handlers::update(state, resource, id, body)
            },
        )
        .delete(move |state: State<HttpState>, id: Path<String>| {
            handlers::delete(state, resource, id)
        })
}

/// Settings are only saved in bulk; per-key writes are answered with 405.
fn setting_key() -> MethodRouter<HttpState> {
    put(
        |state: State<HttpState>, key: Path<String>, body: Json<Value>| {
            handlers::update(state, Resource::Settings, key, body)
        },
    )
    .delete(|state: State<HttpState>, key: Path<String>| {
        handlers::delete(state, Resource::Settings, key)
    })
}

/// Posts are read by slug but written by id on the same path.
fn post_record() -> MethodRouter<HttpState> {
    get(handlers::post_by_slug)
        .put(
            |state: State<HttpState>, id: Path<String>, body: Json<Value>| {
                handlers::update(state, Resource::Posts, id, body)
            },
        )
        .delete(|state: State<HttpState>, id: Path<String>| {
            handlers::delete(state, Resource::Posts, id)
        })
}
