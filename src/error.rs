use thiserror::Error;

/// Errors produced while snapshotting, chunking or driving a page
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Failed to parse DOM: {0}")]
    DomParseFailed(String),

    #[error("Invalid chunk index: {0}")]
    InvalidChunkIndex(i64),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("Host not listening: {0}")]
    HostUnavailable(String),

    #[error("Image analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Content runtime unreachable after {attempts} attempts: {reason}")]
    Unreachable { attempts: u32, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ChunkError>;
