use crate::server::AppState;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Json, Response};
use rust_embed::Embed;
use serde_json::json;
use std::sync::Arc;

/// The static dashboard, embedded at compile time.
#[derive(Embed)]
#[folder = "../dashboard/"]
#[prefix = ""]
struct DashboardAssets;

/// Guess a MIME type from file extension.
fn mime_from_ext(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Serve an embedded file by path, or 404.
fn serve_embedded(path: &str) -> Response {
    match DashboardAssets::get(path) {
        Some(file) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime_from_ext(path)),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            file.data.into_owned(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// `GET /` — the request monitor page.
pub async fn dashboard_index() -> impl IntoResponse {
    serve_embedded("index.html")
}

/// `GET /config.json` — endpoint paths and poll interval for the page script.
pub async fn dashboard_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "ingest_path": state.ingest_path,
        "query_path": state.query_path,
        "refresh_interval_secs": state.dashboard_refresh_secs,
    }))
}

/// Fallback — any other path is looked up among the embedded assets.
pub async fn dashboard_assets(method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::NOT_FOUND.into_response();
    }
    let path = uri.path().trim_start_matches('/');
    if path.is_empty() {
        return serve_embedded("index.html");
    }
    serve_embedded(path)
}
