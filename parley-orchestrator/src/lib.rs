#![deny(missing_docs)]
//! Streaming conversation orchestrator for parley.
//!
//! An [`Orchestrator`] turns caller-supplied history into a stream of
//! [`StepEvent`](parley_types::StepEvent)s:
//!
//! 1. builds the tool manifest and system instruction from the registry
//! 2. runs up to `max_rounds` model-generation rounds
//! 3. for each requested tool call emits a `pending` tool step, dispatches
//!    all calls concurrently, and emits each `complete`/`error` step as it
//!    resolves
//! 4. streams cumulative text while no tool step exists yet
//! 5. emits one terminal `content-update` with `isFinal = true`, then closes
//!    the stream
//!
//! Model failures end the turn with a user-safe error message as the
//! terminal event. Tool failures never do: they arrive as unsuccessful
//! results and the turn carries on.

mod config;
mod orchestrator;
mod prompt;
mod session;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use config::{DEFAULT_ERROR_MESSAGE, DEFAULT_SYSTEM_PREAMBLE, OrchestratorConfig};
pub use orchestrator::Orchestrator;
pub use session::{Phase, TurnOutcome, TurnSummary};
