use crate::error::MonitorError;
use anycall_core::LogEntry;
use async_trait::async_trait;
use std::time::Duration;

/// Anything that can produce the current request log.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<LogEntry>, MonitorError>;
}

/// Reads the log from a running AnyCall query endpoint.
pub struct LogClient {
    http: reqwest::Client,
    endpoint: String,
}

impl LogClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, MonitorError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LogSource for LogClient {
    async fn fetch(&self) -> Result<Vec<LogEntry>, MonitorError> {
        let resp = self.http.get(&self.endpoint).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MonitorError::Status(status.as_u16()));
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
