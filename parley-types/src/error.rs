//! Error types for all parley crates.

use std::time::Duration;

use crate::types::ToolResult;

/// One schema violation in a tool's arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The offending field (`$` for the argument object itself).
    pub field: String,
    /// What was wrong with it.
    pub reason: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Tool arguments failed schema checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid arguments for {tool}: {}", join_fields(.fields))]
pub struct ValidationError {
    /// The tool whose schema was violated.
    pub tool: String,
    /// Every offending field.
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    /// A validation error with a single offending field.
    #[must_use]
    pub fn single(
        tool: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            fields: vec![FieldError {
                field: field.into(),
                reason: reason.into(),
            }],
        }
    }

    /// Names of the offending fields.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.field.as_str()).collect()
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from tool operations.
///
/// None of these ever escape the registry boundary: [`ToolError::into_result`]
/// turns each one into an unsuccessful [`ToolResult`].
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool not found in registry.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// Arguments failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Tool execution failed.
    #[error("execution failed: {source}")]
    ExecutionFailed {
        /// Error code reported in the result envelope.
        code: String,
        /// The underlying failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Tool panicked during execution.
    #[error("tool {0} panicked")]
    Panicked(String),
    /// Tool did not finish within its time budget.
    #[error("tool {tool} timed out after {after:?}")]
    Timeout {
        /// Name of the tool.
        tool: String,
        /// The elapsed budget.
        after: Duration,
    },
    /// Tool execution was cancelled.
    #[error("cancelled")]
    Cancelled,
}

impl ToolError {
    /// Stable error code for the result envelope.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::NotFound(_) => "TOOL_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ExecutionFailed { code, .. } => code,
            Self::Panicked(_) => "TOOL_PANICKED",
            Self::Timeout { .. } => "TOOL_TIMEOUT",
            Self::Cancelled => "TOOL_CANCELLED",
        }
    }

    /// Convert into an unsuccessful [`ToolResult`] with a user-facing summary.
    #[must_use]
    pub fn into_result(self) -> ToolResult {
        let summary = match &self {
            Self::NotFound(name) => format!("The tool \"{name}\" is not available."),
            Self::Validation(e) => format!(
                "The tool \"{}\" was called with invalid arguments ({}).",
                e.tool,
                join_fields(&e.fields)
            ),
            Self::ExecutionFailed { source, .. } => format!("The tool failed: {source}."),
            Self::Panicked(name) => format!("The tool \"{name}\" crashed while running."),
            Self::Timeout { tool, after } => format!(
                "The tool \"{tool}\" did not respond within {} seconds.",
                after.as_secs()
            ),
            Self::Cancelled => "The tool call was cancelled.".to_string(),
        };
        let code = self.code().to_string();
        let mut result = ToolResult::failure(code, self.to_string());
        result.message = summary;
        result
    }
}

/// Errors from tool registration.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A tool with this name is already registered.
    #[error("duplicate tool: {0}")]
    DuplicateTool(String),
}

/// Errors from the model-calling collaborator.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    // Retryable errors
    /// Network-level error (connection reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Rate limited by the model service.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested retry delay, if provided by the API.
        retry_after: Option<Duration>,
    },
    /// Request timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// Service is temporarily unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    // Terminal errors
    /// Authentication/authorization failure.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Malformed or invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Requested model does not exist.
    #[error("model not found: {0}")]
    ModelNotFound(String),
    /// The response could not be understood.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    // Catch-all
    /// Error while reading a streamed response.
    #[error("stream error: {0}")]
    Stream(String),
    /// Any other model error.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ModelError {
    /// Whether this error is likely transient and the request can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::RateLimit { .. }
                | Self::Timeout(_)
                | Self::ServiceUnavailable(_)
        )
    }
}

/// Errors from the middleware pipeline.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A handler called its continuation more than once.
    #[error("handler {index} called next more than once")]
    InvalidContinuation {
        /// Position of the offending handler in registration order.
        index: usize,
    },
    /// A handler rejected the request.
    #[error("rejected: {0}")]
    Rejected(String),
    /// A handler failed.
    #[error(transparent)]
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

impl PipelineError {
    /// Wrap any error raised inside a handler.
    pub fn handler(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Handler(err.into())
    }
}

/// Conditions that end a conversation turn abnormally.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The model-calling collaborator failed.
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    /// The turn ran past its deadline.
    #[error("turn deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
    /// The consumer stopped reading the event stream.
    #[error("consumer disconnected")]
    ConsumerGone,
    /// The turn driver panicked.
    #[error("turn driver panicked")]
    Panicked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_field() {
        let err = ValidationError {
            tool: "weather".into(),
            fields: vec![
                FieldError {
                    field: "location".into(),
                    reason: "missing required field".into(),
                },
                FieldError {
                    field: "units".into(),
                    reason: "expected string, got number".into(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("location"));
        assert!(text.contains("units"));
        assert_eq!(err.field_names(), vec!["location", "units"]);
    }

    #[test]
    fn tool_error_into_result_is_unsuccessful() {
        let result = ToolError::NotFound("nope".into()).into_result();
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error_code(), Some("TOOL_NOT_FOUND"));
        assert!(!result.message.is_empty());
    }

    #[test]
    fn execution_failure_keeps_tool_code() {
        let err = ToolError::ExecutionFailed {
            code: "WEATHER_ERROR".into(),
            source: "boom".into(),
        };
        let result = err.into_result();
        assert_eq!(result.error_code(), Some("WEATHER_ERROR"));
        assert!(result.message.contains("boom"));
    }

    #[test]
    fn retryable_model_errors() {
        assert!(ModelError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(ModelError::RateLimit { retry_after: None }.is_retryable());
        assert!(!ModelError::Authentication("bad key".into()).is_retryable());
        assert!(!ModelError::MalformedResponse("{".into()).is_retryable());
    }
}
