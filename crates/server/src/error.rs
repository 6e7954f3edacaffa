//! Server error types

use thiserror::Error;

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound
    #[error("failed to bind {address}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Listener I/O failure
    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline stage failed to start
    #[error(transparent)]
    Pipeline(#[from] bulkd_pipeline::PipelineError),
}

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;
