//! The turn driver.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use parley_stream::{EventStream, StreamEmitter};
use parley_tool::ToolRegistry;
use parley_types::{
    CompletedStep, ContentUpdate, Message, ModelClient, ModelError, OrchestratorError, StepChunk,
    StepEvent, StepRequest, ToolCallRequest, ToolContext, ToolDescriptor, ToolError, ToolResult,
    ToolStep,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::OrchestratorConfig;
use crate::prompt::system_instruction;
use crate::session::{Phase, TurnOutcome, TurnState, TurnSummary};

/// Drives one conversation turn at a time over a model and a tool registry.
///
/// Each turn runs a bounded number of model-generation rounds. Tool calls
/// requested in a round are dispatched concurrently through the
/// [`ToolRegistry`] and their results fed into the next round. Progress is
/// reported as [`StepEvent`]s; every turn ends with exactly one event
/// carrying `isFinal = true`, after which the stream closes.
///
/// Turns share nothing but the model, the registry, and the configuration.
pub struct Orchestrator<M> {
    model: Arc<M>,
    registry: Arc<ToolRegistry>,
    config: OrchestratorConfig,
    environment: HashMap<String, String>,
}

impl<M> Clone for Orchestrator<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
            environment: self.environment.clone(),
        }
    }
}

impl<M: ModelClient> Orchestrator<M> {
    /// Create an orchestrator with the default configuration.
    #[must_use]
    pub fn new(model: M, registry: Arc<ToolRegistry>) -> Self {
        Self {
            model: Arc::new(model),
            registry,
            config: OrchestratorConfig::default(),
            environment: HashMap::new(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Variables made available to tools through [`ToolContext::environment`].
    #[must_use]
    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The tool registry turns dispatch through.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// The model-calling collaborator.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Drive one turn to completion, emitting events through `emitter`.
    ///
    /// Always emits a terminal event (unless the consumer is gone) and always
    /// closes the emitter before returning.
    pub async fn drive(
        &self,
        history: Vec<Message>,
        emitter: &StreamEmitter<StepEvent>,
    ) -> TurnSummary {
        let turn_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("parley.turn", turn_id = %turn_id);
        self.drive_turn(TurnState::new(turn_id), history, emitter)
            .instrument(span)
            .await
    }

    async fn drive_turn(
        &self,
        mut state: TurnState,
        history: Vec<Message>,
        emitter: &StreamEmitter<StepEvent>,
    ) -> TurnSummary {
        tracing::info!(
            event = "parley.turn.start",
            messages = history.len(),
            max_rounds = self.config.max_rounds,
        );
        let cancel = CancellationToken::new();

        let body = AssertUnwindSafe(self.run_rounds(&mut state, history, &cancel, emitter))
            .catch_unwind()
            .map(|outcome| outcome.unwrap_or_else(|_| Err(OrchestratorError::Panicked)));
        let deadline = self.config.turn_deadline;
        let result = tokio::select! {
            result = async {
                match deadline {
                    Some(limit) => tokio::time::timeout(limit, body)
                        .await
                        .unwrap_or(Err(OrchestratorError::DeadlineExceeded(limit))),
                    None => body.await,
                }
            } => result,
            () = emitter.consumer_gone() => Err(OrchestratorError::ConsumerGone),
        };
        cancel.cancel();

        let summary = match result {
            Ok(()) => self.finalize(state, emitter).await,
            Err(OrchestratorError::ConsumerGone) => {
                tracing::warn!(event = "parley.turn.consumer_gone", round = state.round);
                state.enter(Phase::Errored);
                let content = state.final_content();
                state.into_summary(TurnOutcome::ConsumerGone, content)
            }
            Err(err) => self.fail(state, err, emitter).await,
        };

        if !emitter.done() {
            tracing::debug!(event = "parley.turn.already_closed");
        }
        tracing::info!(
            event = "parley.turn.finish",
            outcome = ?summary.outcome,
            rounds = summary.rounds,
            steps = summary.steps.len(),
        );
        summary
    }

    async fn run_rounds(
        &self,
        state: &mut TurnState,
        history: Vec<Message>,
        cancel: &CancellationToken,
        emitter: &StreamEmitter<StepEvent>,
    ) -> Result<(), OrchestratorError> {
        let tools = self.registry.describe();
        let system = system_instruction(&self.config.system_preamble, &tools);
        let ctx = ToolContext {
            turn_id: state.turn_id.clone(),
            environment: self.environment.clone(),
            cancellation_token: cancel.child_token(),
        };

        let max_rounds = self.config.max_rounds.max(1);
        while state.round < max_rounds {
            state.round += 1;
            state.enter(Phase::StepRunning);

            let (text, calls) = self
                .generate(state, &system, &history, &tools, emitter)
                .await?;

            if calls.is_empty() {
                if !text.is_empty() {
                    state.last_text = Some(text);
                }
                state.enter(Phase::StreamingText);
                return Ok(());
            }

            if !text.is_empty() {
                state.last_text = Some(text.clone());
            }
            self.run_tools(state, text, calls, &ctx, emitter).await?;
        }

        tracing::warn!(
            event = "parley.turn.budget_exhausted",
            rounds = state.round,
            steps = state.steps.len(),
        );
        state.budget_exhausted = true;
        state.enter(Phase::StreamingText);
        Ok(())
    }

    /// One model-generation step. Streams cumulative text while the turn
    /// has no tool steps yet.
    async fn generate(
        &self,
        state: &mut TurnState,
        system: &str,
        history: &[Message],
        tools: &[ToolDescriptor],
        emitter: &StreamEmitter<StepEvent>,
    ) -> Result<(String, Vec<ToolCallRequest>), OrchestratorError> {
        let request = StepRequest {
            system: system.to_string(),
            history: history.to_vec(),
            steps: state.completed.clone(),
            tools: tools.to_vec(),
            round: state.round,
        };
        tracing::debug!(event = "parley.step.request", round = state.round);

        let mut stream = self.model.generate_step(request).await.inspect_err(log_model_error)?;

        let mut text = String::new();
        let mut calls = Vec::new();
        while let Some(chunk) = stream.next().await {
            match chunk.inspect_err(log_model_error)? {
                StepChunk::Text(fragment) if fragment.is_empty() => {}
                StepChunk::Text(fragment) => {
                    text.push_str(&fragment);
                    state.accumulated_text.push_str(&fragment);
                    if state.steps.is_empty() {
                        state.enter(Phase::StreamingText);
                        let update = ContentUpdate {
                            content: state.accumulated_text.clone(),
                            ..ContentUpdate::default()
                        };
                        emit(emitter, StepEvent::ContentUpdate(update)).await?;
                    }
                }
                StepChunk::ToolCall(call) => calls.push(call),
            }
        }

        tracing::debug!(
            event = "parley.step.complete",
            round = state.round,
            text_len = text.len(),
            tool_calls = calls.len(),
        );
        Ok((text, calls))
    }

    async fn run_tools(
        &self,
        state: &mut TurnState,
        text: String,
        calls: Vec<ToolCallRequest>,
        ctx: &ToolContext,
        emitter: &StreamEmitter<StepEvent>,
    ) -> Result<(), OrchestratorError> {
        state.enter(Phase::ToolsPending);
        let first = state.steps.len();

        for call in &calls {
            tracing::debug!(event = "parley.tool.pending", tool = %call.name, round = state.round);
            let step = ToolStep::pending(call);
            state.steps.push(step.clone());
            emit(emitter, StepEvent::ToolStep { step }).await?;
        }

        let mut results: Vec<Option<ToolResult>> = vec![None; calls.len()];
        {
            let mut completions = self.registry.dispatch_unordered(&calls, ctx);
            while let Some((index, result)) = completions.next().await {
                let step = &mut state.steps[first + index];
                step.resolve(&result);
                let step = step.clone();
                results[index] = Some(result);
                emit(emitter, StepEvent::ToolStep { step }).await?;
            }
        }
        state.enter(Phase::ToolsComplete);

        let results: Vec<ToolResult> = results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| ToolError::Cancelled.into_result()))
            .collect();

        let update = ContentUpdate {
            content: text.clone(),
            steps: state.steps.clone(),
            is_tool_response: Some(true),
            is_final: None,
        };
        emit(emitter, StepEvent::ContentUpdate(update)).await?;

        state.completed.push(CompletedStep {
            text,
            calls,
            results,
        });
        Ok(())
    }

    async fn finalize(
        &self,
        mut state: TurnState,
        emitter: &StreamEmitter<StepEvent>,
    ) -> TurnSummary {
        state.enter(Phase::Finalizing);
        let content = state.final_content();
        let update = ContentUpdate {
            content: content.clone(),
            steps: state.steps.clone(),
            is_tool_response: None,
            is_final: Some(true),
        };
        if !emitter.update(StepEvent::ContentUpdate(update)).await {
            tracing::warn!(event = "parley.turn.final_dropped");
        }
        state.enter(Phase::Done);
        let outcome = if state.budget_exhausted {
            TurnOutcome::BudgetExhausted
        } else {
            TurnOutcome::Completed
        };
        state.into_summary(outcome, content)
    }

    async fn fail(
        &self,
        mut state: TurnState,
        err: OrchestratorError,
        emitter: &StreamEmitter<StepEvent>,
    ) -> TurnSummary {
        tracing::error!(event = "parley.turn.error", round = state.round, error = %err);
        state.enter(Phase::Errored);

        // Calls interrupted mid-dispatch still get their terminal step.
        let mut open = true;
        for step in state.steps.iter_mut().filter(|s| !s.status.is_terminal()) {
            let result = match &err {
                OrchestratorError::DeadlineExceeded(limit) => ToolError::Timeout {
                    tool: step.name.clone(),
                    after: *limit,
                }
                .into_result(),
                _ => ToolError::Cancelled.into_result(),
            };
            step.resolve(&result);
            tracing::debug!(event = "parley.tool.abandoned", tool = %step.name, code = ?result.error_code());
            if open {
                open = emitter.update(StepEvent::ToolStep { step: step.clone() }).await;
            }
        }

        let content = self.config.error_message.clone();
        let update = ContentUpdate {
            content: content.clone(),
            steps: state.steps.clone(),
            is_tool_response: None,
            is_final: Some(true),
        };
        if !emitter.update(StepEvent::ContentUpdate(update)).await {
            tracing::warn!(event = "parley.turn.error_dropped");
        }
        state.into_summary(TurnOutcome::Errored(err.to_string()), content)
    }
}

impl<M: ModelClient + 'static> Orchestrator<M> {
    /// Start a turn on the current tokio runtime and return its event stream.
    #[must_use]
    pub fn run(&self, history: Vec<Message>) -> EventStream<StepEvent> {
        self.spawn(history).0
    }

    /// Like [`run`](Self::run), also returning a handle that resolves to the
    /// turn's [`TurnSummary`] once the producer has stopped.
    pub fn spawn(&self, history: Vec<Message>) -> (EventStream<StepEvent>, JoinHandle<TurnSummary>) {
        let (emitter, events) = parley_stream::channel(self.config.channel_capacity);
        let this = self.clone();
        let handle = tokio::spawn(async move { this.drive(history, &emitter).await });
        (events, handle)
    }
}

async fn emit(
    emitter: &StreamEmitter<StepEvent>,
    event: StepEvent,
) -> Result<(), OrchestratorError> {
    if emitter.update(event).await {
        Ok(())
    } else {
        Err(OrchestratorError::ConsumerGone)
    }
}

fn log_model_error(err: &ModelError) {
    tracing::error!(
        event = "parley.model.error",
        retryable = err.is_retryable(),
        error = %err,
    );
}
