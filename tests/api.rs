mod support;

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use folio::application::content::ContentService;
use folio::application::repos::CollectionStore;
use folio::cache::{CacheConfig, CollectionCache};
use folio::domain::resource::Resource;
use folio::infra::http::{HttpState, build_router};

use support::MemoryStore;

fn store() -> Arc<MemoryStore> {
    Arc::new(
        MemoryStore::new()
            .with_rows(
                Resource::Settings,
                vec![json!({ "key": "site_title", "value": "Folio" })],
            )
            .with_rows(
                Resource::Posts,
                vec![
                    json!({ "id": 1, "title": "Live", "slug": "live", "status": "published", "tags": null }),
                    json!({ "id": 2, "title": "Draft", "slug": "draft", "status": "draft", "tags": null }),
                ],
            )
            .with_rows(
                Resource::Projects,
                vec![json!({ "id": 4, "title": "Folio", "tags": ["rust"] })],
            ),
    )
}

fn router(store: Arc<MemoryStore>) -> Router {
    let store: Arc<dyn CollectionStore> = store;
    let cache = Arc::new(CollectionCache::new(store.clone(), &CacheConfig::default()));
    build_router(HttpState::new(ContentService::new(cache, store)))
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(request.body(body).expect("request"))
        .await
        .expect("router response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let router = router(store());
    let (status, body) = send(&router, Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn settings_are_served_as_a_mapping() {
    let router = router(store());
    let (status, body) = send(&router, Method::GET, "/api/settings", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "site_title": "Folio" }));
}

#[tokio::test]
async fn listing_is_cached_between_requests() {
    let store = store();
    let router = router(store.clone());

    let (first, _) = send(&router, Method::GET, "/api/projects", None).await;
    let (second, body) = send(&router, Method::GET, "/api/projects", None).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(body[0]["title"], "Folio");
    assert_eq!(store.fetch_count(Resource::Projects), 1);
}

#[tokio::test]
async fn published_posts_hide_drafts() {
    let router = router(store());
    let (status, body) = send(&router, Method::GET, "/api/posts/published", None).await;

    assert_eq!(status, StatusCode::OK);
    let slugs: Vec<_> = body
        .as_array()
        .expect("array")
        .iter()
        .map(|post| post["slug"].clone())
        .collect();
    assert_eq!(slugs, vec![json!("live")]);
    assert_eq!(body[0]["tags"], json!([]));
}

#[tokio::test]
async fn post_is_read_by_slug() {
    let router = router(store());

    let (status, body) = send(&router, Method::GET, "/api/posts/draft", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Draft");

    let (status, body) = send(&router, Method::GET, "/api/posts/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn creating_a_post_invalidates_the_listing() {
    let store = store();
    let router = router(store.clone());
    send(&router, Method::GET, "/api/posts", None).await;

    let (status, created) = send(
        &router,
        Method::POST,
        "/api/posts",
        Some(json!({ "title": "Fresh Thoughts", "status": "published" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "fresh-thoughts");
    assert_eq!(created["category"], "Jurnal & Catatan");

    let (_, listing) = send(&router, Method::GET, "/api/posts", None).await;
    assert_eq!(store.fetch_count(Resource::Posts), 2);
    assert!(
        listing
            .as_array()
            .expect("array")
            .iter()
            .any(|post| post["slug"] == "fresh-thoughts")
    );
}

#[tokio::test]
async fn create_without_title_is_rejected_before_the_store() {
    let store = store();
    let router = router(store.clone());

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/projects",
        Some(json!({ "description": "untitled" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn update_of_missing_record_is_not_found() {
    let router = router(store());
    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/projects/99",
        Some(json!({ "title": "Ghost" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn non_numeric_id_is_a_bad_request() {
    let router = router(store());
    let (status, body) = send(&router, Method::DELETE, "/api/projects/abc", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_id");
}

#[tokio::test]
async fn delete_reports_success_and_drops_the_record() {
    let store = store();
    let router = router(store.clone());

    let (status, body) = send(&router, Method::DELETE, "/api/posts/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (_, listing) = send(&router, Method::GET, "/api/posts", None).await;
    assert_eq!(listing.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn bulk_settings_upsert_replaces_values() {
    let router = router(store());
    send(&router, Method::GET, "/api/settings", None).await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/settings/bulk",
        Some(json!({ "settings": { "site_title": "Renamed", "show_blog": true } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, settings) = send(&router, Method::GET, "/api/settings", None).await;
    assert_eq!(settings["site_title"], "Renamed");
    assert_eq!(settings["show_blog"], "true");
}

#[tokio::test]
async fn single_setting_writes_are_not_allowed() {
    let store = store();
    let router = router(store.clone());

    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/settings/site_title",
        Some(json!({ "settings": { "site_title": "Renamed" } })),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "unsupported");

    let (status, body) = send(&router, Method::DELETE, "/api/settings/1", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "unsupported");

    assert_eq!(store.write_count(), 0);
    let (_, settings) = send(&router, Method::GET, "/api/settings", None).await;
    assert_eq!(settings["site_title"], "Folio");
}

#[tokio::test]
async fn store_outage_maps_to_server_error() {
    let store = store();
    store.fail_fetches(Resource::Projects);
    let router = router(store);

    let (status, body) = send(&router, Method::GET, "/api/projects", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "repo_error");
}

#[tokio::test]
async fn cache_status_and_flush() {
    let router = router(store());
    send(&router, Method::GET, "/api/projects", None).await;

    let (status, body) = send(&router, Method::GET, "/api/cache", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["freshness_window_seconds"], 300);
    let entries = body["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 5);
    let projects = entries
        .iter()
        .find(|entry| entry["resource"] == "projects")
        .expect("projects entry");
    assert_eq!(projects["state"], "fresh");
    assert_eq!(projects["items"], 1);

    let (status, _) = send(&router, Method::DELETE, "/api/cache", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&router, Method::GET, "/api/cache", None).await;
    assert!(
        body["entries"]
            .as_array()
            .expect("entries")
            .iter()
            .all(|entry| entry["state"] == "empty")
    );
}
