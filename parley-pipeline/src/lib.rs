#![deny(missing_docs)]
//! Async middleware pipeline for parley.
//!
//! A [`Pipeline`] is an ordered chain of [`Handler`]s composed by
//! continuation passing. Each handler receives the shared mutable context
//! and a [`Next`] it may run zero or one times:
//!
//! - running it executes every downstream handler, then resumes here
//! - skipping it short-circuits the rest of the chain
//! - running it twice is a defect and fails with
//!   [`PipelineError::InvalidContinuation`](parley_types::PipelineError)
//!
//! Execution is sequential per context.

mod handler;
mod pipeline;

pub use handler::{Handler, Next, handler_fn};
pub use pipeline::Pipeline;
