use thiserror::Error;

/// Error types for reading and writing the dashboard snapshot
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error from the underlying file system
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot written by an incompatible version
    #[error("Unsupported snapshot version {found}, expected {expected}")]
    Version { found: u32, expected: u32 },

    /// Shared in-memory storage lock was poisoned
    #[error("Storage lock poisoned: {0}")]
    Poisoned(String),
}

/// Type alias for Result with StorageError
pub type Result<T> = std::result::Result<T, StorageError>;
