pub mod capture;
pub mod config;
pub mod entry;
pub mod error;
pub mod user_agent;

pub use capture::RequestCapture;
pub use config::AnyCallConfig;
pub use entry::{HeaderMap, HeaderValue, LogEntry};
pub use error::AnyCallError;
