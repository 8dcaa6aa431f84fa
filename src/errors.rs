//! Error types for the filter layer

use thiserror::Error;

/// Errors that can occur while loading filter options or configuration
#[derive(Error, Debug, Clone)]
pub enum FilterError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Backend reported an error: {0}")]
    Backend(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown date preset: {0}")]
    InvalidPreset(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Filter command channel closed")]
    ChannelClosed,
}

impl From<reqwest::Error> for FilterError {
    fn from(err: reqwest::Error) -> Self {
        FilterError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for FilterError {
    fn from(err: serde_json::Error) -> Self {
        FilterError::JsonParse(err.to_string())
    }
}

impl From<config::ConfigError> for FilterError {
    fn from(err: config::ConfigError) -> Self {
        FilterError::InvalidConfig(err.to_string())
    }
}

/// Result type for filter operations
pub type FilterResult<T> = std::result::Result<T, FilterError>;
