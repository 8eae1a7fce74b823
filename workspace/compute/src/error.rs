use thiserror::Error;

/// Error types for the compute module
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the HTTP transport
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Archive answered with a non-success status
    #[error("Archive returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Archive body was not the expected JSON
    #[error("Response parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Error from an invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;
