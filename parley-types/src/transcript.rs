//! Consumer-side reconstruction of a turn from its event stream.

use crate::event::{StepEvent, ToolStep};
use crate::types::{Message, ToolInvocationRecord};

/// Folds [`StepEvent`]s into a coherent local view of one turn.
///
/// Tool-step events update in place by `(name, args)`; the last write for a
/// key wins. Content updates replace the displayed content, and their step
/// lists are merged the same way.
///
/// # Example
///
/// ```
/// use parley_types::{StepEvent, ContentUpdate, Transcript};
///
/// let mut transcript = Transcript::new();
/// transcript.apply(&StepEvent::ContentUpdate(ContentUpdate {
///     content: "Hello".into(),
///     is_final: Some(true),
///     ..Default::default()
/// }));
/// assert!(transcript.is_final());
/// assert_eq!(transcript.content(), "Hello");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    steps: Vec<ToolStep>,
    content: String,
    is_final: bool,
    events: usize,
}

impl Transcript {
    /// An empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event.
    pub fn apply(&mut self, event: &StepEvent) {
        self.events += 1;
        match event {
            StepEvent::ToolStep { step } => self.upsert(step),
            StepEvent::ContentUpdate(update) => {
                self.content.clone_from(&update.content);
                for step in &update.steps {
                    self.upsert(step);
                }
                if update.is_final == Some(true) {
                    self.is_final = true;
                }
            }
        }
    }

    fn upsert(&mut self, step: &ToolStep) {
        match self.steps.iter_mut().rev().find(|s| s.same_call(step)) {
            Some(existing) => *existing = step.clone(),
            None => self.steps.push(step.clone()),
        }
    }

    /// Reconciled tool steps, in first-seen order.
    #[must_use]
    pub fn steps(&self) -> &[ToolStep] {
        &self.steps
    }

    /// Latest displayed content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the terminal event has been applied.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Number of events applied.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events
    }

    /// The assistant message this turn produced.
    #[must_use]
    pub fn to_message(&self) -> Message {
        let records = self
            .steps
            .iter()
            .map(|s| ToolInvocationRecord {
                name: s.name.clone(),
                args_serialized: s.args.clone(),
            })
            .collect();
        Message::assistant(self.content.clone()).with_tool_calls(records)
    }
}

impl<'a> Extend<&'a StepEvent> for Transcript {
    fn extend<I: IntoIterator<Item = &'a StepEvent>>(&mut self, iter: I) {
        for event in iter {
            self.apply(event);
        }
    }
}
