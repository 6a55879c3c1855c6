use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::application::error::ErrorReport;

const TARGET: &str = "folio::http::response";

/// Log each API response with its collection; failures include the error chain.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started_at = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started_at.elapsed().as_millis() as u64;
    let collection = collection_of(&path);

    let Some(report) = response.extensions_mut().remove::<ErrorReport>() else {
        debug!(
            target: TARGET,
            status = status.as_u16(),
            method = %method,
            path = %path,
            collection,
            elapsed_ms,
            "request served"
        );
        return response;
    };

    if status.is_server_error() {
        error!(
            target: TARGET,
            status = status.as_u16(),
            method = %method,
            path = %path,
            collection,
            elapsed_ms,
            source = report.source,
            detail = %report.headline(),
            chain = ?report.messages,
            "request failed"
        );
    } else {
        warn!(
            target: TARGET,
            status = status.as_u16(),
            method = %method,
            path = %path,
            collection,
            elapsed_ms,
            source = report.source,
            detail = %report.headline(),
            "request rejected"
        );
    }

    response
}

/// `/api/posts/7` -> `posts`.
fn collection_of(path: &str) -> &str {
    path.trim_start_matches("/api/")
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::collection_of;

    #[test]
    fn collection_is_first_segment_after_api() {
        assert_eq!(collection_of("/api/posts/7"), "posts");
        assert_eq!(collection_of("/api/settings/bulk"), "settings");
        assert_eq!(collection_of("/api/"), "-");
    }
}
