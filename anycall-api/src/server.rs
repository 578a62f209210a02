use crate::handlers;
use anycall_core::config::{AnyCallConfig, DASHBOARD_CONFIG_PATH, HEALTH_PATH};
use anycall_core::{AnyCallError, RequestCapture};
use anycall_observability::MetricsCollector;
use anycall_store::LogStore;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared state for every HTTP handler.
pub struct AppState {
    pub store: LogStore,
    pub capture: RequestCapture,
    pub metrics: Arc<MetricsCollector>,
    pub ingest_path: String,
    pub query_path: String,
    pub max_body_bytes: usize,
    pub cors: bool,
    pub dashboard_enabled: bool,
    pub dashboard_refresh_secs: u64,
    pub metrics_path: String,
}

impl AppState {
    pub fn new(config: &AnyCallConfig, store: LogStore, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            store,
            capture: RequestCapture::new(&config.capture),
            metrics,
            ingest_path: config.server.ingest_path.clone(),
            query_path: config.server.query_path.clone(),
            max_body_bytes: config.server.max_body_bytes,
            cors: config.server.cors,
            dashboard_enabled: config.dashboard.enabled,
            dashboard_refresh_secs: config.dashboard.refresh_interval_secs,
            metrics_path: config.metrics.path.clone(),
        }
    }
}

/// Build the Axum router (public so integration tests can use it without
/// binding a TCP port).
pub fn build_router(state: Arc<AppState>) -> Router {
    let ingest_root = state.ingest_path.trim_end_matches('/').to_string();
    let ingest_nested = format!("{ingest_root}/{{*rest}}");

    let mut app = Router::new()
        // Ingest: every method, the path itself and anything below it
        .route(&ingest_root, any(handlers::ingest::record_call))
        .route(&ingest_nested, any(handlers::ingest::record_call))
        // Query
        .route(&state.query_path, get(handlers::logs::list_logs))
        // Health
        .route(HEALTH_PATH, get(handlers::health::health_check));

    if state.metrics.is_enabled() {
        app = app.route(&state.metrics_path, get(metrics_handler));
    }

    if state.dashboard_enabled {
        app = app
            .route("/", get(handlers::dashboard::dashboard_index))
            .route(DASHBOARD_CONFIG_PATH, get(handlers::dashboard::dashboard_config))
            .fallback(handlers::dashboard::dashboard_assets);
    }

    let cors = state.cors;
    let app = app.with_state(state);
    if cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<F>(addr: &str, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| AnyCallError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    serve_listener(listener, state, shutdown).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_listener<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener.local_addr()?;
    info!(
        addr = %local,
        ingest = %state.ingest_path,
        query = %state.query_path,
        dashboard = state.dashboard_enabled,
        "AnyCall listening"
    );

    let app = build_router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    info!("AnyCall HTTP server stopped");
    Ok(())
}

/// Prometheus metrics endpoint handler.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            let err = AnyCallError::Internal(e.to_string());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                err.to_json_body(),
            )
                .into_response()
        }
    }
}
