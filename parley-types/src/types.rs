//! Core message and tool data types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human user. Supplied by the caller.
    User,
    /// The assistant. Produced by the orchestrator.
    Assistant,
}

/// A record of a tool call that was already issued.
///
/// Purely informational; retained so a transcript can be reconstructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    /// Name of the tool that was called.
    pub name: String,
    /// The call arguments, serialized as JSON text.
    #[serde(rename = "argsSerialized", alias = "args")]
    pub args_serialized: String,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// The text content.
    pub content: String,
    /// Tool calls issued while producing this message (assistant only).
    #[serde(
        rename = "toolCalls",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tool_calls: Vec<ToolInvocationRecord>,
}

impl Message {
    /// Create a user message.
    ///
    /// # Example
    ///
    /// ```
    /// use parley_types::Message;
    /// let msg = Message::user("What's the weather in Paris?");
    /// ```
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Attach tool call records to this message.
    #[must_use]
    pub fn with_tool_calls(mut self, calls: Vec<ToolInvocationRecord>) -> Self {
        self.tool_calls = calls;
        self
    }
}

// --- Tool types ---

/// Model-facing description of a tool.
///
/// The set of descriptors forms the function-calling manifest sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// The tool name (unique within a registry).
    pub name: String,
    /// Description of what the tool does.
    pub description: String,
    /// Semantic version of the tool.
    #[serde(default = "default_version")]
    pub version: String,
    /// JSON Schema for the tool's parameters.
    #[serde(rename = "parametersSchema")]
    pub parameters_schema: serde_json::Value,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Machine-readable failure details attached to an unsuccessful [`ToolResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    /// Stable error code, e.g. `WEATHER_ERROR` or `VALIDATION_ERROR`.
    pub code: String,
    /// Error description.
    pub message: String,
}

/// Structured outcome of a tool invocation.
///
/// When `success` is false, `data` is absent and `error` is populated.
/// `message` is always present and is what the end user sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool succeeded.
    pub success: bool,
    /// Structured result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Failure details (only when `success` is false).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
    /// Human-readable summary.
    pub message: String,
}

impl ToolResult {
    /// A successful result with structured data and a summary.
    #[must_use]
    pub fn ok(data: serde_json::Value, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            fallback_summary(&data)
        } else {
            message
        };
        Self {
            success: true,
            data: Some(data),
            error: None,
            message,
        }
    }

    /// A failed result. `data` is always absent.
    #[must_use]
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let summary = if message.is_empty() {
            "The tool failed without a description.".to_string()
        } else {
            message.clone()
        };
        Self {
            success: false,
            data: None,
            error: Some(ToolFailure {
                code: code.into(),
                message,
            }),
            message: summary,
        }
    }

    /// The error code, if this result is a failure.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

/// Summary used only when a tool supplies none: the serialized payload.
fn fallback_summary(data: &serde_json::Value) -> String {
    match data {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "Done.".to_string(),
        other => other.to_string(),
    }
}

/// A tool call requested by the model during one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Call identifier assigned by the model (may be empty).
    #[serde(default)]
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON arguments.
    pub args: serde_json::Value,
}

impl ToolCallRequest {
    /// Create a request without a model-assigned id.
    #[must_use]
    pub fn new(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            args,
        }
    }

    /// Set the model-assigned id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// The arguments serialized as compact JSON text.
    ///
    /// Together with `name` this is the identity used to match
    /// pending and completed tool-step events.
    #[must_use]
    pub fn args_serialized(&self) -> String {
        self.args.to_string()
    }

    /// Transcript record for this call.
    #[must_use]
    pub fn record(&self) -> ToolInvocationRecord {
        ToolInvocationRecord {
            name: self.name.clone(),
            args_serialized: self.args_serialized(),
        }
    }
}

/// Runtime context provided to tools during execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Identifier of the conversation turn driving this call.
    pub turn_id: String,
    /// Environment variables available to the tool.
    pub environment: HashMap<String, String>,
    /// Token for cooperative cancellation.
    pub cancellation_token: CancellationToken,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            turn_id: String::new(),
            environment: HashMap::new(),
            cancellation_token: CancellationToken::new(),
        }
    }
}

impl ToolContext {
    /// Create a context for the given turn.
    #[must_use]
    pub fn for_turn(turn_id: impl Into<String>) -> Self {
        Self {
            turn_id: turn_id.into(),
            ..Self::default()
        }
    }

    /// Look up a variable in the tool environment.
    #[must_use]
    pub fn env(&self, key: &str) -> Option<&str> {
        self.environment.get(key).map(String::as_str)
    }
}
