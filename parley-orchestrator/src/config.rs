//! Configuration for a conversation turn.

use std::time::Duration;

/// Default instruction placed ahead of the tool listing.
pub const DEFAULT_SYSTEM_PREAMBLE: &str = "You are a helpful assistant with access to various tools. \
You can use these tools to provide real-time information.";

/// Default content of the terminal event when a turn fails.
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred while generating the response.";

/// Configuration for the [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum number of model-generation rounds per turn.
    pub max_rounds: usize,
    /// Instruction text preceding the generated tool listing.
    pub system_preamble: String,
    /// Capacity of the per-turn event channel.
    pub channel_capacity: usize,
    /// Wall-clock bound on one turn. `None` means only the round budget applies.
    pub turn_deadline: Option<Duration>,
    /// User-safe content emitted when a turn fails.
    pub error_message: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            system_preamble: DEFAULT_SYSTEM_PREAMBLE.to_string(),
            channel_capacity: 64,
            turn_deadline: Some(Duration::from_secs(120)),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }
}

impl OrchestratorConfig {
    /// Set the round budget. Values below one are raised to one.
    #[must_use]
    pub fn max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }

    /// Set the system preamble.
    #[must_use]
    pub fn system_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.system_preamble = preamble.into();
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set or clear the turn deadline.
    #[must_use]
    pub fn turn_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.turn_deadline = deadline;
        self
    }

    /// Set the user-facing error message.
    #[must_use]
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }
}
