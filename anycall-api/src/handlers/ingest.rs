use crate::server::AppState;
use axum::body::{Bytes, to_bytes};
use axum::extract::{ConnectInfo, Request, State};
use axum::response::Json;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// `ANY {ingest_path}` — record the request, then echo its query and body.
///
/// Always answers 200. A body over `max_body_bytes` (or one that fails to
/// stream) is recorded as `null` instead of rejecting the call.
pub async fn record_call(State(state): State<Arc<AppState>>, request: Request) -> Json<Value> {
    let (parts, body) = request.into_parts();
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let bytes = match to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(
                method = %parts.method,
                limit = state.max_body_bytes,
                error = %e,
                "Request body not recorded"
            );
            Bytes::new()
        }
    };

    let entry = state
        .capture
        .capture(&parts.method, &parts.uri, &parts.headers, &bytes, peer);
    let echo = json!({
        "query": entry.query,
        "body": entry.body,
    });

    debug!(
        method = %entry.method,
        ip = entry.ip.as_deref().unwrap_or("-"),
        browser = entry.browser.as_deref().unwrap_or("-"),
        body_bytes = bytes.len(),
        "Call recorded"
    );

    state.store.append(entry);
    state
        .metrics
        .record_ingest(parts.method.as_str(), bytes.len(), state.store.len());

    Json(echo)
}
