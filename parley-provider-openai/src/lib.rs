//! OpenAI Chat Completions model client for parley.
//!
//! [`OpenAi`] implements [`ModelClient`](parley_types::ModelClient): each
//! generation step becomes one Chat Completions call. The system
//! instruction is sent as a `system` message, earlier steps of the turn as
//! assistant `tool_calls` followed by `tool` messages carrying each
//! result's JSON, and the registry manifest as function tools.
//!
//! With streaming enabled (the default) text deltas are yielded as they
//! arrive and tool-call fragments are assembled by index; otherwise a single
//! response is parsed into the same chunks.
//!
//! ```no_run
//! use parley_provider_openai::OpenAi;
//!
//! let model = OpenAi::new(std::env::var("OPENAI_API_KEY").unwrap_or_default())
//!     .model("gpt-4o-mini");
//! ```

pub mod client;
pub(crate) mod error;
pub mod mapping;
pub(crate) mod streaming;
pub mod types;

pub use client::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAi};
