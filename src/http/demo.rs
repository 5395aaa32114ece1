//! Fixed demo endpoints.
//!
//! `/demo/tile` and `/demo/tiles` synthesize many small concurrent requests
//! for load testing. `/demo/echo` and `/demo/upload` exercise request bodies.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use futures_util::StreamExt;

use crate::observability::metrics;

/// A 40x40 PNG, used as a fixed test fixture.
pub const TILE_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d,
    0x49, 0x48, 0x44, 0x52, 0x00, 0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0x28,
    0x01, 0x03, 0x00, 0x00, 0x00, 0xb6, 0x30, 0x2a, 0x2e, 0x00, 0x00, 0x00,
    0x03, 0x50, 0x4c, 0x54, 0x45, 0x5a, 0xc3, 0x5a, 0xad, 0x38, 0xaa, 0xdb,
    0x00, 0x00, 0x00, 0x0b, 0x49, 0x44, 0x41, 0x54, 0x78, 0x01, 0x63, 0x18,
    0x61, 0x00, 0x00, 0x00, 0xf0, 0x00, 0x01, 0xe2, 0xb8, 0x75, 0x22, 0x00,
    0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Number of tiles referenced by the tiles page.
pub const TILE_COUNT: usize = 200;

pub async fn tile() -> Response {
    metrics::record_request("tile", StatusCode::OK);
    ([(header::CONTENT_TYPE, "image/png")], TILE_PNG).into_response()
}

/// Render the tiles page: [`TILE_COUNT`] images, each with its own
/// cache-busting query so the client fetches every one of them.
pub fn tiles_page() -> String {
    let mut html = String::with_capacity(64 + TILE_COUNT * 40);
    html.push_str("<html><head><style>img{width:40px;height:40px;}</style></head><body>");
    for i in 0..TILE_COUNT {
        html.push_str(&format!(r#"<img src="/demo/tile?cachebust={}">"#, i));
    }
    html.push_str("</body></html>");
    html
}

pub async fn tiles() -> Html<String> {
    metrics::record_request("tiles", StatusCode::OK);
    Html(tiles_page())
}

pub async fn echo(body: Body) -> Response {
    metrics::record_request("echo", StatusCode::OK);
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        body,
    )
        .into_response()
}

const UPLOAD_FORM: &str = r#"<html><body>
<form action="/demo/upload" method="post" enctype="application/octet-stream">
<input type="file" name="uploadfile"><br>
<input type="submit">
</form>
</body></html>"#;

pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

/// Drain the request body and report how many bytes arrived.
pub async fn upload(body: Body) -> Response {
    let mut stream = body.into_data_stream();
    let mut received: u64 = 0;

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => received += bytes.len() as u64,
            Err(e) => {
                tracing::warn!(error = %e, received, "Upload aborted");
                metrics::record_request("upload", StatusCode::BAD_REQUEST);
                return (StatusCode::BAD_REQUEST, "upload aborted").into_response();
            }
        }
    }

    tracing::debug!(received, "Upload complete");
    metrics::record_request("upload", StatusCode::OK);
    format!("{} bytes received\n", received).into_response()
}
