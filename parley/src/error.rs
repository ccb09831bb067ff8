//! Errors surfaced by the chat service and CLI.

use parley_types::{PipelineError, RegistryError};

/// Top-level error for the `parley` crate.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    /// Invalid or incomplete configuration.
    #[error("config error: {0}")]
    Config(String),
    /// The request was rejected before a turn started.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Building the tool registry failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A pipeline handler failed.
    #[error(transparent)]
    Pipeline(PipelineError),
    /// Reading input or configuration failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Input or configuration was not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<PipelineError> for ParleyError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Rejected(reason) => Self::InvalidRequest(reason),
            other => Self::Pipeline(other),
        }
    }
}
