#![deny(missing_docs)]
//! # parley
//!
//! Streaming chat orchestration with tool calling. This crate ties the
//! workspace together: configuration, a [`ChatService`] that runs requests
//! through validation and timing handlers before handing them to the
//! orchestrator, and the `parley` command-line binary.
//!
//! The building blocks are re-exported so most users need only this crate:
//!
//! ```ignore
//! use parley::prelude::*;
//!
//! let config = ParleyConfig::load(None)?;
//! let registry = Arc::new(config.build_registry()?);
//! let orchestrator = Orchestrator::new(config.build_model()?, registry)
//!     .with_config(config.orchestrator_config());
//! let service = ChatService::new(orchestrator);
//! let mut events = service.stream(vec![Message::user("What's the weather in Paris?")]).await?;
//! while let Some(event) = events.next().await {
//!     println!("{}", serde_json::to_string(&event)?);
//! }
//! ```

pub mod config;
pub mod error;
pub mod service;

pub use config::{DEFAULT_CONFIG_FILE, ParleyConfig};
pub use error::ParleyError;
pub use service::{ChatContext, ChatRequest, ChatResponse, ChatService, Delivery, TimeRequest, ValidateRequest};

pub use parley_orchestrator;
pub use parley_pipeline;
pub use parley_provider_openai;
pub use parley_stream;
pub use parley_tool;
pub use parley_types;

/// Common imports.
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::{ChatRequest, ChatResponse, ChatService, ParleyConfig, ParleyError};
    pub use parley_orchestrator::{Orchestrator, OrchestratorConfig, TurnOutcome, TurnSummary};
    pub use parley_pipeline::{Handler, Next, Pipeline};
    pub use parley_provider_openai::OpenAi;
    pub use parley_stream::EventStream;
    pub use parley_tool::ToolRegistry;
    pub use parley_types::{
        ContentUpdate, Message, ModelClient, Role, StepEvent, Tool, ToolResult,
        ToolStatus, ToolStep, Transcript,
    };
}
