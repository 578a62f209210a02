use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Query endpoint answered {0}")]
    Status(u16),

    #[error("Invalid log payload: {0}")]
    Decode(#[from] serde_json::Error),
}
