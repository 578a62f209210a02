use crate::server::AppState;
use anycall_core::LogEntry;
use axum::extract::State;
use axum::response::Json;
use std::sync::Arc;

/// `GET {query_path}` — every recorded call, oldest first.
pub async fn list_logs(State(state): State<Arc<AppState>>) -> Json<Vec<Arc<LogEntry>>> {
    state.metrics.record_query();
    Json(state.store.list())
}
