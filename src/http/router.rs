//! Request routing.
//!
//! # Responsibilities
//! - Build the axum Router shared by every listener
//! - Serve synthetic payloads for `/<length>` when no static root is set
//! - Delegate to file serving when a static root is set
//! - Mount the fixed demo endpoints
//!
//! # Design Decisions
//! - Immutable after construction; shared across listeners without locks
//! - Demo routes are more specific than the fallback and stay active with a
//!   static root
//! - Malformed lengths are an expected outcome: 400 with an empty body

use axum::{
    body::Body,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::RouteConfig;
use crate::http::demo;
use crate::observability::metrics;
use crate::payload::{PayloadStream, MAX_PAYLOAD_LEN};

/// Build the router used by every listener.
pub fn build_router(config: &RouteConfig) -> Router {
    let router = Router::new()
        .route("/demo/tile", get(demo::tile))
        .route("/demo/tiles", get(demo::tiles))
        .route("/demo/echo", axum::routing::post(demo::echo))
        .route("/demo/upload", get(demo::upload_form).post(demo::upload));

    let router = match &config.static_root {
        Some(root) => {
            tracing::info!(root = %root.display(), "Serving static files");
            router.fallback_service(ServeDir::new(root))
        }
        None => router.fallback(synthetic_payload),
    };

    router.layer(TraceLayer::new_for_http())
}

/// Parse a request target such as `/1048576` into a payload length.
///
/// Every `/` is removed before parsing, so `/1/024` is `1024`. The query
/// string is part of the target, which makes `/10?x=1` invalid.
pub fn parse_payload_len(target: &str) -> Option<u64> {
    let digits: String = target.chars().filter(|c| *c != '/').collect();
    let len: i64 = digits.parse().ok()?;
    if len <= 0 || len as u64 > MAX_PAYLOAD_LEN {
        return None;
    }
    Some(len as u64)
}

async fn synthetic_payload(method: Method, uri: Uri) -> Response {
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    tracing::debug!(method = %method, target = %target, "Synthetic payload request");

    let Some(len) = parse_payload_len(target) else {
        metrics::record_request("payload", StatusCode::BAD_REQUEST);
        return StatusCode::BAD_REQUEST.into_response();
    };

    metrics::record_request("payload", StatusCode::OK);
    metrics::record_payload_bytes(len);

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        Body::from_stream(PayloadStream::new(len)),
    )
        .into_response()
}
