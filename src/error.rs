use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read policy from {source_name}: {message}")]
    PolicySource {
        source_name: String,
        message: String,
    },

    #[error("Scanning engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Engine API error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected engine response: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScanError {
    /// Exit code for fatal errors. Everything in this taxonomy is a tooling
    /// failure rather than a findings-based WARN/FAIL outcome.
    pub fn exit_code(&self) -> i32 {
        3
    }
}
