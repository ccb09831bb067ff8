//! ScriptedModel: replays a fixed sequence of generation steps.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use parley_types::{
    ModelClient, ModelError, ModelStep, StepChunk, StepRequest, StepStream, ToolCallRequest,
};

/// A [`ModelClient`] that replays scripted steps in order, one per call.
///
/// Every request is recorded for later inspection. Once the script runs out
/// the model fails with [`ModelError::MalformedResponse`], unless
/// [`looping`](Self::looping) was set, in which case the last step repeats
/// forever.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    steps: Vec<ModelStep>,
    repeat_last: bool,
    fail_on_round: Option<usize>,
    break_stream_on_round: Option<usize>,
    fragment_chars: Option<usize>,
    delay: Option<Duration>,
    requests: Mutex<Vec<StepRequest>>,
}

impl ScriptedModel {
    /// Replay `steps` in order.
    #[must_use]
    pub fn new(steps: Vec<ModelStep>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// A model that answers with `text` and never calls tools.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![ModelStep::text(text)])
    }

    /// A model that requests `call`, then answers with `text`.
    #[must_use]
    pub fn tool_then_text(call: ToolCallRequest, text: impl Into<String>) -> Self {
        Self::new(vec![ModelStep::tools(vec![call]), ModelStep::text(text)])
    }

    /// Repeat the last step once the script is exhausted.
    #[must_use]
    pub fn looping(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    /// Fail the request for round `round` (1-based) before streaming anything.
    #[must_use]
    pub fn failing_on_round(mut self, round: usize) -> Self {
        self.fail_on_round = Some(round);
        self
    }

    /// On round `round`, stream the step's text and then a stream error.
    #[must_use]
    pub fn breaking_stream_on_round(mut self, round: usize) -> Self {
        self.break_stream_on_round = Some(round);
        self
    }

    /// Split step text into fragments of at most `chars` characters.
    #[must_use]
    pub fn streaming_fragments(mut self, chars: usize) -> Self {
        self.fragment_chars = Some(chars.max(1));
        self
    }

    /// Wait `delay` before answering each request.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<StepRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next_step(&self, request: StepRequest) -> Option<ModelStep> {
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let index = requests.len();
        requests.push(request);
        self.steps
            .get(index)
            .or_else(|| self.repeat_last.then(|| self.steps.last()).flatten())
            .cloned()
    }

    fn chunks(&self, step: ModelStep, broken: bool) -> Vec<Result<StepChunk, ModelError>> {
        let mut chunks: Vec<Result<StepChunk, ModelError>> = Vec::new();
        if !step.text.is_empty() {
            match self.fragment_chars {
                Some(size) => {
                    let chars: Vec<char> = step.text.chars().collect();
                    chunks.extend(
                        chars
                            .chunks(size)
                            .map(|c| Ok(StepChunk::Text(c.iter().collect()))),
                    );
                }
                None => chunks.push(Ok(StepChunk::Text(step.text))),
            }
        }
        if broken {
            chunks.push(Err(ModelError::Stream("scripted stream interruption".into())));
            return chunks;
        }
        chunks.extend(step.tool_calls.into_iter().map(|c| Ok(StepChunk::ToolCall(c))));
        chunks
    }
}

impl ModelClient for ScriptedModel {
    async fn generate_step(&self, request: StepRequest) -> Result<StepStream, ModelError> {
        let round = request.round;
        let step = self.next_step(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on_round == Some(round) {
            return Err(ModelError::ServiceUnavailable(format!(
                "scripted failure on round {round}"
            )));
        }
        let step = step.ok_or_else(|| ModelError::MalformedResponse("script exhausted".into()))?;

        let broken = self.break_stream_on_round == Some(round);
        Ok(Box::pin(futures::stream::iter(self.chunks(step, broken))))
    }
}
