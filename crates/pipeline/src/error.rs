//! Pipeline error types

use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Put against a queue that has already been closed
    #[error("queue closed for writes")]
    Closed,

    /// A stage worker thread could not be spawned
    #[error("failed to spawn {stage} worker")]
    Spawn {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
