use thiserror::Error;

/// Unified error type for AnyCall.
///
/// The log store itself never fails; these cover configuration, startup and
/// the HTTP boundary.
#[derive(Error, Debug)]
pub enum AnyCallError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Bind error on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Internal: {0}")]
    Internal(String),
}

impl AnyCallError {
    /// Map to HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            AnyCallError::Serde(_) => 400,
            _ => 500,
        }
    }

    /// JSON error body.
    pub fn to_json_body(&self) -> Vec<u8> {
        serde_json::json!({
            "error": self.to_string(),
            "status": self.status_code(),
        })
        .to_string()
        .into_bytes()
    }
}
