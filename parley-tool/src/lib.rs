//! Tool registry for parley.
//!
//! A [`ToolRegistry`] owns a set of named tools, builds the model-facing
//! manifest from them, validates call arguments against each tool's
//! parameter schema, and dispatches calls concurrently. Tool failures of
//! every kind come back as unsuccessful [`parley_types::ToolResult`]s.

pub mod builtin;
pub mod registry;
pub mod schema;

pub use builtin::*;
pub use registry::*;
pub use schema::*;
