//! Handlers and the continuation they receive.
//!
//! The pattern mirrors axum's `from_fn`: each handler receives a [`Next`]
//! it can run to continue the chain, or skip to short-circuit. Work done
//! before `next.run` happens on the way in; work after it happens on the
//! way out, once every downstream handler has finished.

use std::sync::{Arc, OnceLock};

use parley_types::{BoxedFuture, PipelineError};

/// One stage of a [`Pipeline`](crate::Pipeline).
///
/// Uses boxed futures for dyn-compatibility (heterogeneous handler collections).
pub trait Handler<C>: Send + Sync {
    /// Process the context, optionally delegating to the rest of the chain.
    fn handle<'a>(
        &'a self,
        ctx: &'a mut C,
        next: Next<'a, C>,
    ) -> BoxedFuture<'a, Result<(), PipelineError>>;
}

/// The remainder of the chain after the current handler.
///
/// May be run at most once. A second [`Next::run`] returns
/// [`PipelineError::InvalidContinuation`] and the violation is also reported
/// by [`Pipeline::execute`](crate::Pipeline::execute), so it cannot be
/// swallowed by the offending handler.
pub struct Next<'a, C> {
    handlers: &'a [Arc<dyn Handler<C>>],
    position: usize,
    called: bool,
    violation: &'a OnceLock<usize>,
}

impl<'a, C: Send> Next<'a, C> {
    pub(crate) fn new(
        handlers: &'a [Arc<dyn Handler<C>>],
        position: usize,
        violation: &'a OnceLock<usize>,
    ) -> Self {
        Self {
            handlers,
            position,
            called: false,
            violation,
        }
    }

    /// Run every downstream handler, then return here.
    pub async fn run(&mut self, ctx: &mut C) -> Result<(), PipelineError> {
        if self.called {
            // The continuation belongs to the handler just before `position`.
            let index = self.position.saturating_sub(1);
            tracing::error!(event = "parley.pipeline.invalid_continuation", handler = index);
            self.violation.get_or_init(|| index);
            return Err(PipelineError::InvalidContinuation { index });
        }
        self.called = true;

        match self.handlers.get(self.position) {
            Some(handler) => {
                tracing::trace!(event = "parley.pipeline.enter", handler = self.position);
                let next = Next::new(self.handlers, self.position + 1, self.violation);
                handler.handle(ctx, next).await
            }
            None => Ok(()),
        }
    }

    /// Whether this continuation has already been run.
    #[must_use]
    pub fn was_called(&self) -> bool {
        self.called
    }
}

/// Wrapper that implements `Handler` for a closure returning a boxed future.
struct HandlerFn<F> {
    f: F,
}

impl<C, F> Handler<C> for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut C, Next<'a, C>) -> BoxedFuture<'a, Result<(), PipelineError>>
        + Send
        + Sync,
{
    fn handle<'a>(
        &'a self,
        ctx: &'a mut C,
        next: Next<'a, C>,
    ) -> BoxedFuture<'a, Result<(), PipelineError>> {
        (self.f)(ctx, next)
    }
}

/// Create a handler from a closure (like axum's `from_fn`).
///
/// The closure must return a `Box::pin(async move { ... })` future.
///
/// # Example
///
/// ```ignore
/// use parley_pipeline::{handler_fn, Pipeline};
///
/// let mut pipeline = Pipeline::<Vec<&'static str>>::new();
/// pipeline.add_handler(handler_fn(|log: &mut Vec<&'static str>, mut next| {
///     Box::pin(async move {
///         log.push("before");
///         next.run(log).await?;
///         log.push("after");
///         Ok(())
///     })
/// }));
/// let log = pipeline.execute(Vec::new()).await.unwrap();
/// assert_eq!(log, ["before", "after"]);
/// ```
#[must_use]
pub fn handler_fn<C, F>(f: F) -> impl Handler<C>
where
    F: for<'a> Fn(&'a mut C, Next<'a, C>) -> BoxedFuture<'a, Result<(), PipelineError>>
        + Send
        + Sync,
{
    HandlerFn { f }
}
