use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnyCallConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// HTTP listener and endpoint paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Every method on this path (and below it) is recorded.
    #[serde(default = "default_ingest_path")]
    pub ingest_path: String,
    #[serde(default = "default_query_path")]
    pub query_path: String,
    /// Bodies larger than this are recorded as `null`.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Permissive CORS so pages on any origin can send calls.
    #[serde(default = "default_true")]
    pub cors: bool,
}

/// What gets recorded from each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Header preferred over the peer address for the client IP.
    #[serde(default = "default_forwarded_header")]
    pub forwarded_header: String,
    /// Mask credential-bearing headers before storing.
    #[serde(default)]
    pub redact_sensitive_headers: bool,
}

/// Embedded browser dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// When false, no prometheus counters are touched on ingest.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

/// Terminal monitor (`anycall watch`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_monitor_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_monitor_timeout")]
    pub timeout_ms: u64,
}

/// Fixed routes served next to the configurable ones.
pub const HEALTH_PATH: &str = "/health";
pub const DASHBOARD_CONFIG_PATH: &str = "/config.json";

// ── Defaults ──────────────────────────────────────────────────

fn default_addr() -> String { "0.0.0.0:3000".into() }
fn default_ingest_path() -> String { "/api/call".into() }
fn default_query_path() -> String { "/api/data".into() }
fn default_max_body_bytes() -> usize { 2 * 1024 * 1024 }
fn default_true() -> bool { true }
fn default_forwarded_header() -> String { "x-forwarded-for".into() }
fn default_refresh_interval() -> u64 { 5 }
fn default_metrics_path() -> String { "/metrics".into() }
fn default_monitor_endpoint() -> String { "http://127.0.0.1:3000/api/data".into() }
fn default_monitor_timeout() -> u64 { 3000 }

// ── Impls ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            ingest_path: default_ingest_path(),
            query_path: default_query_path(),
            max_body_bytes: default_max_body_bytes(),
            cors: true,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            forwarded_header: default_forwarded_header(),
            redact_sensitive_headers: false,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_metrics_path(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_monitor_endpoint(),
            refresh_interval_secs: default_refresh_interval(),
            timeout_ms: default_monitor_timeout(),
        }
    }
}

impl AnyCallConfig {
    /// Load configuration from a YAML file + `ANYCALL_` env overrides.
    ///
    /// Sections and keys are separated by a double underscore, so
    /// `ANYCALL_SERVER__INGEST_PATH` sets `server.ingest_path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: AnyCallConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("ANYCALL_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the router cannot be built from.
    pub fn validate(&self) -> Result<(), crate::AnyCallError> {
        for (name, path) in [
            ("server.ingest_path", &self.server.ingest_path),
            ("server.query_path", &self.server.query_path),
            ("metrics.path", &self.metrics.path),
        ] {
            if !path.starts_with('/') || path.trim_end_matches('/').is_empty() {
                return Err(crate::AnyCallError::Config(format!(
                    "{name} must be an absolute, non-root path, got {path:?}"
                )));
            }
            if path.contains(['{', '}', '*']) {
                return Err(crate::AnyCallError::Config(format!(
                    "{name} must not contain route captures, got {path:?}"
                )));
            }
        }
        self.check_route_collisions()?;
        if self.monitor.refresh_interval_secs == 0 || self.dashboard.refresh_interval_secs == 0 {
            return Err(crate::AnyCallError::Config(
                "refresh intervals must be at least one second".into(),
            ));
        }
        Ok(())
    }

    /// Every fixed route must be distinct and must sit outside the ingest
    /// path, which captures everything below it.
    fn check_route_collisions(&self) -> Result<(), crate::AnyCallError> {
        let ingest = self.server.ingest_path.trim_end_matches('/');
        let mut routes = vec![
            ("server.query_path", self.server.query_path.trim_end_matches('/')),
            ("health endpoint", HEALTH_PATH),
        ];
        if self.metrics.enabled {
            routes.push(("metrics.path", self.metrics.path.trim_end_matches('/')));
        }
        if self.dashboard.enabled {
            routes.push(("dashboard config", DASHBOARD_CONFIG_PATH));
        }

        for (name, path) in &routes {
            let nested = path
                .strip_prefix(ingest)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
            if nested {
                return Err(crate::AnyCallError::Config(format!(
                    "{name} {path:?} is shadowed by server.ingest_path {ingest:?}"
                )));
            }
        }
        for (i, (name, path)) in routes.iter().enumerate() {
            if let Some((other, _)) = routes[i + 1..].iter().find(|(_, p)| p == path) {
                return Err(crate::AnyCallError::Config(format!(
                    "{name} and {other} both use {path:?}"
                )));
            }
        }
        Ok(())
    }
}
