//! Per-turn state owned by the orchestrator while a turn runs.

use parley_types::{CompletedStep, ToolStep};

/// States of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Building the manifest and system instruction.
    Init,
    /// Waiting on a model-generation step.
    StepRunning,
    /// Tool calls requested and being dispatched.
    ToolsPending,
    /// Every tool call of the step has resolved.
    ToolsComplete,
    /// Text is being produced with no further tool calls expected.
    StreamingText,
    /// Emitting the terminal event.
    Finalizing,
    /// The turn finished and its stream is closed.
    Done,
    /// The turn failed; a terminal error event was emitted and the stream closed.
    Errored,
}

impl Phase {
    /// Whether the turn is over.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Errored)
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model stopped requesting tools.
    Completed,
    /// The round budget ran out while the model still requested tools.
    BudgetExhausted,
    /// The turn failed; carries the internal error description.
    Errored(String),
    /// The consumer dropped the event stream.
    ConsumerGone,
}

/// What a finished turn did, for the caller that drove it.
#[derive(Debug, Clone)]
pub struct TurnSummary {
    /// Identifier of the turn (also the `turn_id` span field).
    pub turn_id: String,
    /// How the turn ended.
    pub outcome: TurnOutcome,
    /// Model-generation rounds started.
    pub rounds: usize,
    /// Content of the terminal event.
    pub content: String,
    /// Every tool step, in request order.
    pub steps: Vec<ToolStep>,
    /// Phase transitions, in order.
    pub phases: Vec<Phase>,
}

#[derive(Debug)]
pub(crate) struct TurnState {
    pub(crate) turn_id: String,
    pub(crate) round: usize,
    pub(crate) steps: Vec<ToolStep>,
    pub(crate) accumulated_text: String,
    pub(crate) last_text: Option<String>,
    pub(crate) completed: Vec<CompletedStep>,
    pub(crate) budget_exhausted: bool,
    phases: Vec<Phase>,
}

impl TurnState {
    pub(crate) fn new(turn_id: String) -> Self {
        Self {
            turn_id,
            round: 0,
            steps: Vec::new(),
            accumulated_text: String::new(),
            last_text: None,
            completed: Vec::new(),
            budget_exhausted: false,
            phases: vec![Phase::Init],
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phases.last().copied().unwrap_or(Phase::Init)
    }

    pub(crate) fn enter(&mut self, phase: Phase) {
        let from = self.phase();
        if from == phase || from.is_terminal() {
            return;
        }
        tracing::trace!(event = "parley.turn.phase", from = ?from, to = ?phase);
        self.phases.push(phase);
    }

    /// The last textual step, else the streamed text, else the tool summaries.
    pub(crate) fn final_content(&self) -> String {
        if let Some(text) = &self.last_text {
            return text.clone();
        }
        if !self.accumulated_text.is_empty() {
            return self.accumulated_text.clone();
        }
        self.steps
            .iter()
            .filter_map(|s| s.summary.as_deref())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub(crate) fn into_summary(self, outcome: TurnOutcome, content: String) -> TurnSummary {
        TurnSummary {
            turn_id: self.turn_id,
            outcome,
            rounds: self.round,
            content,
            steps: self.steps,
            phases: self.phases,
        }
    }
}
