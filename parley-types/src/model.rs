//! The model-calling collaborator: one generation step per call.

use std::future::Future;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::types::{Message, ToolCallRequest, ToolDescriptor, ToolResult};

/// A step that already ran in the current turn, fed back to the model.
///
/// `results` pairs 1:1 by position with `calls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedStep {
    /// Text the model produced alongside its tool calls.
    pub text: String,
    /// Tool calls the model requested.
    pub calls: Vec<ToolCallRequest>,
    /// Results of those calls, in request order.
    pub results: Vec<ToolResult>,
}

/// Everything the model needs to produce the next step.
#[derive(Debug, Clone, Default)]
pub struct StepRequest {
    /// System instruction describing the assistant and its tools.
    pub system: String,
    /// Caller-supplied conversation history.
    pub history: Vec<Message>,
    /// Steps already run in this turn, in order.
    pub steps: Vec<CompletedStep>,
    /// The function-calling manifest.
    pub tools: Vec<ToolDescriptor>,
    /// 1-based round number within the turn.
    pub round: usize,
}

/// One incremental piece of a generation step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepChunk {
    /// A text fragment.
    Text(String),
    /// A complete tool-call request.
    ToolCall(ToolCallRequest),
}

/// A lazily-consumed generation step.
pub type StepStream = Pin<Box<dyn Stream<Item = Result<StepChunk, ModelError>> + Send>>;

/// A fully materialised generation step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelStep {
    /// The produced text (possibly empty).
    pub text: String,
    /// Requested tool calls.
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelStep {
    /// A text-only step.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A step requesting tool calls.
    #[must_use]
    pub fn tools(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            text: String::new(),
            tool_calls,
        }
    }

    /// Convert into a stream that yields the text (if any) followed by the calls.
    #[must_use]
    pub fn into_stream(self) -> StepStream {
        let mut chunks = Vec::with_capacity(self.tool_calls.len() + 1);
        if !self.text.is_empty() {
            chunks.push(Ok(StepChunk::Text(self.text)));
        }
        chunks.extend(self.tool_calls.into_iter().map(|c| Ok(StepChunk::ToolCall(c))));
        Box::pin(futures::stream::iter(chunks))
    }

    /// Drain a step stream into a materialised step.
    pub async fn collect(mut stream: StepStream) -> Result<Self, ModelError> {
        let mut step = Self::default();
        while let Some(chunk) = stream.next().await {
            match chunk? {
                StepChunk::Text(t) => step.text.push_str(&t),
                StepChunk::ToolCall(c) => step.tool_calls.push(c),
            }
        }
        Ok(step)
    }
}

/// Model-calling collaborator. Implement this for each LLM backend.
///
/// Uses RPITIT (return position impl trait in trait).
/// Not object-safe; use generics `<M: ModelClient>` to compose.
pub trait ModelClient: Send + Sync {
    /// Request one generation step.
    fn generate_step(
        &self,
        request: StepRequest,
    ) -> impl Future<Output = Result<StepStream, ModelError>> + Send;
}

impl<M: ModelClient> ModelClient for std::sync::Arc<M> {
    fn generate_step(
        &self,
        request: StepRequest,
    ) -> impl Future<Output = Result<StepStream, ModelError>> + Send {
        (**self).generate_step(request)
    }
}
