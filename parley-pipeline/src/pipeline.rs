use std::sync::{Arc, OnceLock};

use parley_types::PipelineError;

use crate::handler::{Handler, Next};

/// An ordered chain of async handlers sharing one mutable context.
///
/// Handlers run in registration order with nested (onion) ordering: the
/// "before" part of handler *i* runs, then the whole chain from *i + 1*,
/// then the "after" part of handler *i*. An error from any handler
/// propagates out through every enclosing handler that uses `?` on its
/// continuation.
pub struct Pipeline<C> {
    handlers: Vec<Arc<dyn Handler<C>>>,
}

impl<C: Send + 'static> Pipeline<C> {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Append a handler to the chain.
    pub fn add_handler(&mut self, handler: impl Handler<C> + 'static) -> &mut Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Append a shared handler to the chain.
    pub fn add_shared(&mut self, handler: Arc<dyn Handler<C>>) -> &mut Self {
        self.handlers.push(handler);
        self
    }

    /// Builder-style [`add_handler`](Self::add_handler).
    #[must_use]
    pub fn with_handler(mut self, handler: impl Handler<C> + 'static) -> Self {
        self.add_handler(handler);
        self
    }

    /// Number of handlers in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the chain over `initial` and hand back the final context.
    ///
    /// # Errors
    ///
    /// The first error raised by a handler, or
    /// [`PipelineError::InvalidContinuation`] if any handler ran its
    /// continuation twice, even when that handler discarded the error.
    pub async fn execute(&self, initial: C) -> Result<C, PipelineError> {
        let mut ctx = initial;
        let violation = OnceLock::new();
        tracing::debug!(event = "parley.pipeline.execute", handlers = self.handlers.len());

        let outcome = Next::new(&self.handlers, 0, &violation).run(&mut ctx).await;

        if let Some(&index) = violation.get() {
            return Err(PipelineError::InvalidContinuation { index });
        }
        outcome.map(|()| ctx)
    }
}

impl<C: Send + 'static> Default for Pipeline<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for Pipeline<C> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<C> std::fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
