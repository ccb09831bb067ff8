//! Tool registry: register, describe, validate, and dispatch tools.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, Stream, StreamExt};
use parley_types::{
    RegistryError, Tool, ToolCallRequest, ToolContext, ToolDescriptor, ToolDyn, ToolError,
    ToolResult, ValidationError,
};

use crate::schema::validate_args;

/// Limits applied while dispatching tool calls.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum number of tool executions in flight for one batch of calls.
    pub max_concurrent_calls: usize,
    /// Time budget for a single tool execution.
    pub call_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 10,
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Registry of tools, passed explicitly to whoever dispatches calls.
///
/// Tools are stored as type-erased [`ToolDyn`] trait objects in registration
/// order. Names are unique.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolDyn>>,
    index: HashMap<String, usize>,
    config: RegistryConfig,
}

impl ToolRegistry {
    /// Create an empty registry with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with the given limits.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            config,
        }
    }

    /// The dispatch limits in effect.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a strongly-typed tool (auto-erased to `ToolDyn`).
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<&mut Self, RegistryError> {
        self.register_dyn(Arc::new(tool))
    }

    /// Register a pre-erased tool.
    pub fn register_dyn(&mut self, tool: Arc<dyn ToolDyn>) -> Result<&mut Self, RegistryError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        tracing::debug!(event = "parley.tool.registered", tool = %name);
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(self)
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolDyn>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    /// Whether a tool with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names of all registered tools, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name())
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Descriptors for every registered tool, in registration order.
    ///
    /// Built from the tools on every call, so the manifest always reflects
    /// the current registrations.
    #[must_use]
    pub fn describe(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.describe()).collect()
    }

    /// Check raw arguments against a tool's declared schema without running it.
    pub fn validate(&self, name: &str, args: &serde_json::Value) -> Result<(), ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        validate_descriptor(&tool.describe(), args)?;
        Ok(())
    }

    /// Dispatch one call, surfacing registry-level failures as [`ToolError`].
    ///
    /// Validation runs before the tool. Execution is bounded by
    /// [`RegistryConfig::call_timeout`], observes the context's cancellation
    /// token, and catches panics.
    pub async fn try_dispatch(
        &self,
        call: &ToolCallRequest,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        validate_descriptor(&tool.describe(), &call.args)?;

        if ctx.cancellation_token.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        let timeout = self.config.call_timeout;
        let run = AssertUnwindSafe(tool.execute_dyn(call.args.clone(), ctx)).catch_unwind();

        tokio::select! {
            biased;
            () = ctx.cancellation_token.cancelled() => Err(ToolError::Cancelled),
            outcome = tokio::time::timeout(timeout, run) => match outcome {
                Err(_elapsed) => Err(ToolError::Timeout {
                    tool: call.name.clone(),
                    after: timeout,
                }),
                Ok(Err(payload)) => {
                    tracing::warn!(
                        event = "parley.tool.panicked",
                        tool = %call.name,
                        panic = panic_message(payload.as_ref()),
                    );
                    Err(ToolError::Panicked(call.name.clone()))
                }
                Ok(Ok(result)) => result,
            },
        }
    }

    /// Dispatch one call. Never fails: every error becomes an unsuccessful
    /// [`ToolResult`].
    pub async fn dispatch(&self, call: &ToolCallRequest, ctx: &ToolContext) -> ToolResult {
        tracing::debug!(event = "parley.tool.dispatch", tool = %call.name, args = %call.args);
        match self.try_dispatch(call, ctx).await {
            Ok(result) => {
                tracing::debug!(
                    event = "parley.tool.complete",
                    tool = %call.name,
                    success = result.success,
                );
                result
            }
            Err(err) => {
                tracing::warn!(
                    event = "parley.tool.failed",
                    tool = %call.name,
                    code = err.code(),
                    error = %err,
                );
                err.into_result()
            }
        }
    }

    /// Dispatch a batch of calls concurrently; results come back in request order.
    pub async fn dispatch_all(
        &self,
        calls: &[ToolCallRequest],
        ctx: &ToolContext,
    ) -> Vec<ToolResult> {
        futures::stream::iter(calls.iter().map(|call| self.dispatch(call, ctx)))
            .buffered(self.concurrency())
            .collect()
            .await
    }

    /// Dispatch a batch of calls concurrently, yielding each result as soon as
    /// it resolves, tagged with the position of its request.
    pub fn dispatch_unordered<'a>(
        &'a self,
        calls: &'a [ToolCallRequest],
        ctx: &'a ToolContext,
    ) -> impl Stream<Item = (usize, ToolResult)> + Send + 'a {
        futures::stream::iter(
            calls
                .iter()
                .enumerate()
                .map(move |(i, call)| self.dispatch(call, ctx).map(move |r| (i, r))),
        )
        .buffer_unordered(self.concurrency())
    }

    fn concurrency(&self) -> usize {
        self.config.max_concurrent_calls.max(1)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

fn validate_descriptor(
    descriptor: &ToolDescriptor,
    args: &serde_json::Value,
) -> Result<(), ValidationError> {
    validate_args(&descriptor.name, args, &descriptor.parameters_schema)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
