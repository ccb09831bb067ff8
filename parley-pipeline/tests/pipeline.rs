use parley_pipeline::*;
use parley_types::{BoxedFuture, PipelineError};

#[derive(Debug, Default)]
struct Ctx {
    log: Vec<String>,
    value: u32,
}

/// Records `"<name>:in"` and `"<name>:out"` around its continuation.
struct Tracer(&'static str);

impl Handler<Ctx> for Tracer {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut Ctx,
        mut next: Next<'a, Ctx>,
    ) -> BoxedFuture<'a, Result<(), PipelineError>> {
        Box::pin(async move {
            ctx.log.push(format!("{}:in", self.0));
            next.run(ctx).await?;
            ctx.log.push(format!("{}:out", self.0));
            Ok(())
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("handler blew up")]
struct Blowup;

#[tokio::test]
async fn onion_ordering() {
    let pipeline = Pipeline::<Ctx>::new()
        .with_handler(Tracer("a"))
        .with_handler(Tracer("b"))
        .with_handler(Tracer("c"));
    let ctx = pipeline.execute(Ctx::default()).await.unwrap();
    assert_eq!(
        ctx.log,
        ["a:in", "b:in", "c:in", "c:out", "b:out", "a:out"]
    );
}

#[tokio::test]
async fn empty_pipeline_returns_context_untouched() {
    let pipeline = Pipeline::<Ctx>::new();
    let ctx = pipeline.execute(Ctx { value: 7, ..Ctx::default() }).await.unwrap();
    assert_eq!(ctx.value, 7);
    assert!(ctx.log.is_empty());
}

#[tokio::test]
async fn skipping_next_short_circuits() {
    let mut pipeline = Pipeline::<Ctx>::new();
    pipeline
        .add_handler(Tracer("outer"))
        .add_handler(handler_fn(|ctx: &mut Ctx, _next| {
            Box::pin(async move {
                ctx.log.push("gate".into());
                Ok(())
            })
        }))
        .add_handler(Tracer("never"));

    let ctx = pipeline.execute(Ctx::default()).await.unwrap();
    assert_eq!(ctx.log, ["outer:in", "gate", "outer:out"]);
}

#[tokio::test]
async fn handler_error_surfaces_from_execute() {
    let pipeline = Pipeline::<Ctx>::new()
        .with_handler(Tracer("a"))
        .with_handler(Tracer("b"))
        .with_handler(handler_fn(|ctx: &mut Ctx, _next| {
            Box::pin(async move {
                ctx.log.push("fail".into());
                Err(PipelineError::handler(Blowup))
            })
        }))
        .with_handler(Tracer("unreached"));

    let err = pipeline.execute(Ctx::default()).await.unwrap_err();
    assert_eq!(err.to_string(), "handler blew up");
}

#[tokio::test]
async fn error_surfaces_after_partial_log() {
    use std::sync::{Arc, Mutex};
    let sink = Arc::new(Mutex::new(Vec::<String>::new()));

    let record = |name: &'static str, sink: Arc<Mutex<Vec<String>>>| {
        handler_fn(move |ctx: &mut Ctx, mut next| {
            let sink = Arc::clone(&sink);
            Box::pin(async move {
                sink.lock().unwrap().push(format!("{name}:in"));
                next.run(ctx).await?;
                sink.lock().unwrap().push(format!("{name}:out"));
                Ok(())
            })
        })
    };

    let pipeline = Pipeline::<Ctx>::new()
        .with_handler(record("a", Arc::clone(&sink)))
        .with_handler(handler_fn(|_ctx: &mut Ctx, _next| {
            Box::pin(async move { Err(PipelineError::Rejected("no".into())) })
        }))
        .with_handler(record("z", Arc::clone(&sink)));

    let err = pipeline.execute(Ctx::default()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Rejected(_)));
    assert_eq!(*sink.lock().unwrap(), ["a:in"]);
}

#[tokio::test]
async fn calling_next_twice_is_rejected() {
    let pipeline = Pipeline::<Ctx>::new()
        .with_handler(Tracer("outer"))
        .with_handler(handler_fn(|ctx: &mut Ctx, mut next| {
            Box::pin(async move {
                next.run(ctx).await?;
                next.run(ctx).await
            })
        }))
        .with_handler(Tracer("inner"));

    let err = pipeline.execute(Ctx::default()).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidContinuation { index: 1 }));
}

#[tokio::test]
async fn swallowed_double_call_is_still_reported() {
    let pipeline = Pipeline::<Ctx>::new().with_handler(handler_fn(|ctx: &mut Ctx, mut next| {
        Box::pin(async move {
            next.run(ctx).await?;
            let _ignored = next.run(ctx).await;
            Ok(())
        })
    }));

    let err = pipeline.execute(Ctx::default()).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidContinuation { index: 0 }));
}

#[tokio::test]
async fn first_double_call_is_the_one_reported() {
    let swallow = || {
        handler_fn(|ctx: &mut Ctx, mut next| {
            Box::pin(async move {
                next.run(ctx).await?;
                let _ignored = next.run(ctx).await;
                Ok(())
            })
        })
    };
    let pipeline = Pipeline::<Ctx>::new()
        .with_handler(swallow())
        .with_handler(swallow());

    let err = pipeline.execute(Ctx::default()).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidContinuation { index: 1 }));
}

#[tokio::test]
async fn handlers_share_mutable_context() {
    let pipeline = Pipeline::<Ctx>::new()
        .with_handler(handler_fn(|ctx: &mut Ctx, mut next| {
            Box::pin(async move {
                ctx.value += 1;
                next.run(ctx).await?;
                ctx.value *= 10;
                Ok(())
            })
        }))
        .with_handler(handler_fn(|ctx: &mut Ctx, mut next| {
            Box::pin(async move {
                ctx.value += 2;
                next.run(ctx).await
            })
        }));

    let ctx = pipeline.execute(Ctx::default()).await.unwrap();
    assert_eq!(ctx.value, 30);
}

#[tokio::test]
async fn pipeline_is_reusable() {
    let pipeline = Pipeline::<Ctx>::new().with_handler(Tracer("only"));
    for _ in 0..3 {
        let ctx = pipeline.execute(Ctx::default()).await.unwrap();
        assert_eq!(ctx.log.len(), 2);
    }
}
