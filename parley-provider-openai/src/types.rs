//! OpenAI Chat Completions wire types.
//!
//! Only the fields parley reads or writes are modelled; everything else in
//! a response is ignored.

use serde::{Deserialize, Serialize};

/// Chat Completions request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier (e.g. "gpt-4o-mini").
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Tools available to the model.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ChatTool>,
    /// Whether to stream the response as server-sent events.
    pub stream: bool,
}

/// A message in Chat Completions format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user", "assistant", or "tool".
    pub role: String,
    /// Text content. Null on assistant messages that only call tools.
    pub content: Option<String>,
    /// Tool calls issued by the assistant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatToolCall>>,
    /// The call this message answers (role "tool" only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub(crate) fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// A tool call issued by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatToolCall {
    /// Call identifier.
    pub id: String,
    /// Always "function".
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    /// The function invocation.
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// Function name plus JSON-encoded arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name.
    pub name: String,
    /// Arguments as JSON text.
    #[serde(default)]
    pub arguments: String,
}

/// Tool definition sent to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTool {
    /// Always "function".
    #[serde(rename = "type")]
    pub tool_type: String,
    /// The function definition.
    pub function: FunctionDefinition,
}

/// Function definition within a tool.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    /// Function name.
    pub name: String,
    /// What the function does.
    pub description: String,
    /// JSON Schema for the arguments.
    pub parameters: serde_json::Value,
}

/// Non-streaming response body.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Response choices; parley reads the first.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// One choice of a non-streaming response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The generated message.
    pub message: ChatMessage,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// One `data:` payload of a streamed response.
#[derive(Debug, Deserialize)]
pub struct ChatChunk {
    /// Delta choices; parley reads the first.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Present when the service reports a failure mid-stream.
    #[serde(default)]
    pub error: Option<ApiErrorDetail>,
}

/// One choice of a streamed chunk.
#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    /// The incremental content.
    #[serde(default)]
    pub delta: Delta,
    /// Set on the last chunk of the choice.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental assistant content.
#[derive(Debug, Default, Deserialize)]
pub struct Delta {
    /// Text fragment.
    #[serde(default)]
    pub content: Option<String>,
    /// Tool-call fragments, keyed by `index`.
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// A fragment of one tool call.
#[derive(Debug, Deserialize)]
pub struct ToolCallDelta {
    /// Position of the call within the step.
    #[serde(default)]
    pub index: usize,
    /// Call identifier; present on the first fragment.
    #[serde(default)]
    pub id: Option<String>,
    /// Name and argument fragments.
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

/// Name and argument fragments of a tool call.
#[derive(Debug, Deserialize)]
pub struct FunctionDelta {
    /// Function name; present on the first fragment.
    #[serde(default)]
    pub name: Option<String>,
    /// A slice of the JSON argument text.
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Error envelope returned by the API.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    /// The error details.
    pub error: ApiErrorDetail,
}

/// Error details.
#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    /// Human-readable description.
    #[serde(default)]
    pub message: String,
    /// Error category, e.g. "rate_limit_error".
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}
