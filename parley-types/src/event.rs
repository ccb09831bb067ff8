//! Wire-level step events emitted during one conversation turn.
//!
//! Events serialize to the JSON-line shapes consumed by clients:
//!
//! ```text
//! { "type": "tool-step", "step": { "type": "tool", "name", "args", "timestamp", "status", "result"?, "summary"? } }
//! { "type": "content-update", "content", "steps": [...], "isToolResponse"?, "isFinal"? }
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{ToolCallRequest, ToolResult};

/// Lifecycle status of one tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    /// Requested by the model, not yet resolved.
    Pending,
    /// Resolved with `success = true`.
    Complete,
    /// Resolved with `success = false`.
    Error,
}

impl ToolStatus {
    /// Whether this status ends the tool call's lifecycle.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Kind tag carried by every step payload. Only tool steps exist on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// A tool invocation.
    #[default]
    Tool,
}

/// One tool call's state as shown to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolStep {
    /// Always [`StepKind::Tool`].
    #[serde(rename = "type", default)]
    pub kind: StepKind,
    /// Tool name.
    pub name: String,
    /// Arguments serialized as JSON text.
    pub args: String,
    /// Milliseconds since the unix epoch when the call was requested.
    pub timestamp: i64,
    /// Lifecycle status.
    pub status: ToolStatus,
    /// Serialized result payload (or error details) once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Human-readable summary once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ToolStep {
    /// A pending step for a requested call, stamped with the current time.
    #[must_use]
    pub fn pending(call: &ToolCallRequest) -> Self {
        Self {
            kind: StepKind::Tool,
            name: call.name.clone(),
            args: call.args_serialized(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            status: ToolStatus::Pending,
            result: None,
            summary: None,
        }
    }

    /// Resolve this step with the tool's result.
    pub fn resolve(&mut self, result: &ToolResult) {
        self.status = if result.success {
            ToolStatus::Complete
        } else {
            ToolStatus::Error
        };
        self.result = Some(match (&result.data, &result.error) {
            (Some(data), _) => data.to_string(),
            (None, Some(err)) => serde_json::json!({ "code": err.code, "message": err.message })
                .to_string(),
            (None, None) => String::new(),
        });
        self.summary = Some(result.message.clone());
    }

    /// Whether this step and `other` describe the same invocation key.
    #[must_use]
    pub fn same_call(&self, other: &ToolStep) -> bool {
        self.name == other.name && self.args == other.args
    }
}

/// A content snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUpdate {
    /// Content to display.
    pub content: String,
    /// Every tool step recorded so far in this turn, in request order.
    #[serde(default)]
    pub steps: Vec<ToolStep>,
    /// Set when the update follows a round of tool results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_tool_response: Option<bool>,
    /// Set on the terminal event of the turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_final: Option<bool>,
}

/// One unit of the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StepEvent {
    /// A tool call's lifecycle transition.
    #[serde(rename = "tool-step")]
    ToolStep {
        /// The step after the transition.
        step: ToolStep,
    },
    /// A text/content snapshot.
    #[serde(rename = "content-update")]
    ContentUpdate(ContentUpdate),
}

impl StepEvent {
    /// Whether this is the terminal event of a turn.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, Self::ContentUpdate(update) if update.is_final == Some(true))
    }

    /// The tool step carried by this event, if any.
    #[must_use]
    pub fn tool_step(&self) -> Option<&ToolStep> {
        match self {
            Self::ToolStep { step } => Some(step),
            Self::ContentUpdate(_) => None,
        }
    }

    /// The content update carried by this event, if any.
    #[must_use]
    pub fn content_update(&self) -> Option<&ContentUpdate> {
        match self {
            Self::ContentUpdate(update) => Some(update),
            Self::ToolStep { .. } => None,
        }
    }
}
