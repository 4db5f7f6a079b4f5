// ABOUTME: Error types with structured exit codes for CLI
// ABOUTME: Maps sync/API error categories to specific exit codes for shell scripting

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Notion API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Notion API rate limit exceeded (retry budget exhausted)")]
    RateLimited,

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            Error::Network(_) => 3,
            Error::Api { .. } => 4,
            Error::RateLimited => 5,
            Error::Parse(_) => 6,
            Error::Sync(_) => 7,
            Error::Filesystem(_) => 8,
        }
    }

    /// Rate-limit responses are the only retryable category.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::Api { status: 429, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
