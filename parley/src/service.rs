//! The chat service: request validation and timing around one turn.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_orchestrator::Orchestrator;
use parley_pipeline::{Handler, Next, Pipeline};
use parley_stream::EventStream;
use parley_types::{
    BoxedFuture, Message, ModelClient, PipelineError, Role, StepEvent, ToolStep, Transcript,
};
use serde::{Deserialize, Serialize};

use crate::error::ParleyError;

/// Incoming chat request: the conversation so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation history; the last message must come from the user.
    pub messages: Vec<Message>,
}

/// Non-streaming reply: the final content and every tool step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Final assistant content.
    pub content: String,
    /// Every tool step of the turn, in request order.
    pub steps: Vec<ToolStep>,
}

/// How the caller wants the turn delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Hand back the live event stream.
    Stream,
    /// Wait for the turn and return a [`ChatResponse`].
    Complete,
}

/// Context threaded through the service pipeline.
#[derive(Debug)]
pub struct ChatContext {
    /// The request under way.
    pub messages: Vec<Message>,
    /// Requested delivery mode.
    pub delivery: Delivery,
    /// Set by the turn handler in [`Delivery::Stream`] mode.
    pub events: Option<EventStream<StepEvent>>,
    /// Set by the turn handler in [`Delivery::Complete`] mode.
    pub response: Option<ChatResponse>,
    /// Set by the timing handler on the way out.
    pub elapsed: Option<Duration>,
}

impl ChatContext {
    /// A fresh context for `messages`.
    #[must_use]
    pub fn new(messages: Vec<Message>, delivery: Delivery) -> Self {
        Self {
            messages,
            delivery,
            events: None,
            response: None,
            elapsed: None,
        }
    }
}

/// Rejects requests that cannot start a turn.
pub struct ValidateRequest;

impl Handler<ChatContext> for ValidateRequest {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut ChatContext,
        mut next: Next<'a, ChatContext>,
    ) -> BoxedFuture<'a, Result<(), PipelineError>> {
        Box::pin(async move {
            let Some(last) = ctx.messages.last() else {
                return Err(PipelineError::Rejected("messages must not be empty".into()));
            };
            if last.role != Role::User {
                return Err(PipelineError::Rejected(
                    "the last message must come from the user".into(),
                ));
            }
            if last.content.trim().is_empty() {
                return Err(PipelineError::Rejected(
                    "the last message must not be blank".into(),
                ));
            }
            next.run(ctx).await
        })
    }
}

/// Measures and logs how long the rest of the chain took.
///
/// In streaming mode this covers starting the turn, not the whole turn.
pub struct TimeRequest;

impl Handler<ChatContext> for TimeRequest {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut ChatContext,
        mut next: Next<'a, ChatContext>,
    ) -> BoxedFuture<'a, Result<(), PipelineError>> {
        Box::pin(async move {
            let started = Instant::now();
            let result = next.run(ctx).await;
            let elapsed = started.elapsed();
            ctx.elapsed = Some(elapsed);
            tracing::info!(
                event = "parley.chat.handled",
                delivery = ?ctx.delivery,
                messages = ctx.messages.len(),
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                ok = result.is_ok(),
            );
            result
        })
    }
}

/// Terminal handler: runs the turn on the orchestrator.
struct RunTurn<M> {
    orchestrator: Orchestrator<M>,
}

impl<M: ModelClient + 'static> Handler<ChatContext> for RunTurn<M> {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut ChatContext,
        _next: Next<'a, ChatContext>,
    ) -> BoxedFuture<'a, Result<(), PipelineError>> {
        Box::pin(async move {
            let events = self.orchestrator.run(ctx.messages.clone());
            match ctx.delivery {
                Delivery::Stream => ctx.events = Some(events),
                Delivery::Complete => {
                    let mut transcript = Transcript::new();
                    transcript.extend(&events.collect_all().await);
                    ctx.response = Some(ChatResponse {
                        content: transcript.content().to_string(),
                        steps: transcript.steps().to_vec(),
                    });
                }
            }
            Ok(())
        })
    }
}

/// A chat endpoint: `validate -> time -> [layers] -> turn`.
///
/// ```ignore
/// let service = ChatService::new(Orchestrator::new(model, registry));
/// let reply = service.complete(vec![Message::user("What's the weather in Paris?")]).await?;
/// println!("{}", reply.content);
/// ```
pub struct ChatService {
    pipeline: Pipeline<ChatContext>,
}

impl ChatService {
    /// The default chain around `orchestrator`.
    #[must_use]
    pub fn new<M: ModelClient + 'static>(orchestrator: Orchestrator<M>) -> Self {
        Self::with_layers(orchestrator, Vec::new())
    }

    /// Insert extra handlers between timing and the turn.
    #[must_use]
    pub fn with_layers<M: ModelClient + 'static>(
        orchestrator: Orchestrator<M>,
        layers: Vec<Arc<dyn Handler<ChatContext>>>,
    ) -> Self {
        let mut pipeline = Pipeline::new();
        pipeline.add_handler(ValidateRequest).add_handler(TimeRequest);
        for layer in layers {
            pipeline.add_shared(layer);
        }
        pipeline.add_handler(RunTurn { orchestrator });
        Self { pipeline }
    }

    /// Run the chain and return the context it produced.
    ///
    /// # Errors
    ///
    /// [`ParleyError::InvalidRequest`] when a handler rejects the request,
    /// [`ParleyError::Pipeline`] for any other handler failure.
    pub async fn handle(&self, ctx: ChatContext) -> Result<ChatContext, ParleyError> {
        Ok(self.pipeline.execute(ctx).await?)
    }

    /// Start a turn and return its live event stream.
    ///
    /// # Errors
    ///
    /// As [`handle`](Self::handle); also [`ParleyError::InvalidRequest`] if a
    /// layer ended the chain without starting the turn.
    pub async fn stream(&self, messages: Vec<Message>) -> Result<EventStream<StepEvent>, ParleyError> {
        self.handle(ChatContext::new(messages, Delivery::Stream))
            .await?
            .events
            .ok_or_else(not_handled)
    }

    /// Run a turn to completion and return its final content and steps.
    ///
    /// # Errors
    ///
    /// As [`stream`](Self::stream).
    pub async fn complete(&self, messages: Vec<Message>) -> Result<ChatResponse, ParleyError> {
        self.handle(ChatContext::new(messages, Delivery::Complete))
            .await?
            .response
            .ok_or_else(not_handled)
    }
}

fn not_handled() -> ParleyError {
    ParleyError::InvalidRequest("the request was not handled".into())
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("handlers", &self.pipeline.len())
            .finish()
    }
}
