//! Core traits: Tool, ToolDyn.

use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;

use crate::error::{ToolError, ValidationError};
use crate::types::{ToolContext, ToolDescriptor, ToolResult};

/// A boxed, `Send` future. Used wherever a trait must stay dyn-compatible.
pub type BoxedFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Strongly-typed tool trait. Implement this for your tools.
///
/// The blanket impl of [`ToolDyn`] handles JSON deserialization so you
/// work with concrete Rust types.
///
/// # Example
///
/// ```ignore
/// use parley_types::*;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, schemars::JsonSchema)]
/// struct EchoArgs { text: String }
///
/// struct EchoTool;
/// impl Tool for EchoTool {
///     const NAME: &'static str = "echo";
///     type Args = EchoArgs;
///     type Error = std::convert::Infallible;
///
///     fn describe(&self) -> ToolDescriptor { todo!() }
///     async fn execute(&self, args: EchoArgs, _ctx: &ToolContext)
///         -> Result<ToolResult, Self::Error>
///     {
///         Ok(ToolResult::ok(serde_json::json!({"text": args.text}), "echoed"))
///     }
/// }
/// ```
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    const NAME: &'static str;
    /// The deserialized argument type.
    type Args: DeserializeOwned + schemars::JsonSchema + Send;
    /// The tool-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the model-facing descriptor (name, description, schema).
    fn describe(&self) -> ToolDescriptor;

    /// Semantic checks on already-deserialized arguments.
    ///
    /// Structural schema checks happen in the registry before this runs.
    fn validate(&self, _args: &Self::Args) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Execute the tool with typed arguments.
    fn execute(
        &self,
        args: Self::Args,
        ctx: &ToolContext,
    ) -> impl Future<Output = Result<ToolResult, Self::Error>> + Send;
}

/// Type-erased tool for dynamic dispatch. Blanket-implemented for all [`Tool`] impls.
///
/// This enables heterogeneous tool collections (`Vec<Arc<dyn ToolDyn>>`)
/// while preserving type safety at the implementation level.
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name.
    fn name(&self) -> &str;
    /// The tool descriptor.
    fn describe(&self) -> ToolDescriptor;
    /// Execute the tool with raw JSON arguments.
    fn execute_dyn<'a>(
        &'a self,
        args: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> BoxedFuture<'a, Result<ToolResult, ToolError>>;
}

/// Blanket implementation: any `Tool` automatically becomes a `ToolDyn`.
///
/// Handles:
/// - Deserializing `serde_json::Value` into `T::Args`
/// - Running `T::validate` on the typed arguments
/// - Mapping `T::Error` into `ToolError::ExecutionFailed` with code `<NAME>_ERROR`
impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn describe(&self) -> ToolDescriptor {
        Tool::describe(self)
    }

    fn execute_dyn<'a>(
        &'a self,
        args: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> BoxedFuture<'a, Result<ToolResult, ToolError>> {
        Box::pin(async move {
            let args: T::Args = serde_json::from_value(args)
                .map_err(|e| ValidationError::single(T::NAME, "$", e.to_string()))?;
            self.validate(&args)?;

            self.execute(args, ctx)
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    code: error_code_for(T::NAME),
                    source: Box::new(e),
                })
        })
    }
}

/// Error code reported when a tool's execute function fails, e.g. `WEATHER_ERROR`.
#[must_use]
pub fn error_code_for(tool_name: &str) -> String {
    format!("{}_ERROR", tool_name.to_ascii_uppercase())
}
