//! Property tests for turn termination, tool-step ordering, and finality.

#![cfg(feature = "test-utils")]

use std::sync::Arc;

use parley_orchestrator::test_utils::ScriptedModel;
use parley_orchestrator::*;
use parley_tool::{ToolRegistry, WeatherTool};
use parley_types::*;
use proptest::prelude::*;

fn registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(WeatherTool).unwrap();
    Arc::new(registry)
}

fn call_strategy() -> impl Strategy<Value = ToolCallRequest> {
    prop_oneof![
        4 => "[A-Z][a-z]{1,8}".prop_map(|city| {
            ToolCallRequest::new("weather", serde_json::json!({ "location": city }))
        }),
        1 => Just(ToolCallRequest::new("teleport", serde_json::json!({}))),
        1 => Just(ToolCallRequest::new("weather", serde_json::json!({ "units": "kelvin" }))),
    ]
}

fn step_strategy() -> impl Strategy<Value = ModelStep> {
    (
        prop::option::of("[a-z ]{1,20}"),
        prop::collection::vec(call_strategy(), 0..4),
    )
        .prop_map(|(text, tool_calls)| ModelStep {
            text: text.unwrap_or_default(),
            tool_calls,
        })
}

fn model_strategy() -> impl Strategy<Value = (Vec<ModelStep>, bool, Option<usize>)> {
    (
        prop::collection::vec(step_strategy(), 1..8),
        any::<bool>(),
        prop::option::of(1usize..7),
    )
}

fn run_turn(model: ScriptedModel) -> (Vec<StepEvent>, TurnSummary, usize) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let orchestrator = Orchestrator::new(model, registry());
        let (events, handle) = orchestrator.spawn(vec![Message::user("go")]);
        let events = events.collect_all().await;
        let summary = handle.await.unwrap();
        (events, summary, orchestrator.model().call_count())
    })
}

/// The tool-call batches the orchestrator dispatched, one per model round
/// that returned calls.
fn dispatched_batches(
    steps: &[ModelStep],
    looping: bool,
    fail_on: Option<usize>,
    calls: usize,
) -> Vec<Vec<ToolCallRequest>> {
    let mut batches = Vec::new();
    for round in 1..=calls {
        if fail_on == Some(round) {
            break;
        }
        let step = match steps.get(round - 1) {
            Some(step) => step,
            None if looping => steps.last().unwrap(),
            None => break,
        };
        if step.tool_calls.is_empty() {
            break;
        }
        batches.push(step.tool_calls.clone());
    }
    batches
}

fn build(steps: Vec<ModelStep>, looping: bool, fail_on: Option<usize>) -> ScriptedModel {
    let mut model = ScriptedModel::new(steps).streaming_fragments(3);
    if looping {
        model = model.looping();
    }
    if let Some(round) = fail_on {
        model = model.failing_on_round(round);
    }
    model
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_turn_terminates_within_budget((steps, looping, fail_on) in model_strategy()) {
        let (events, summary, calls) = run_turn(build(steps, looping, fail_on));
        prop_assert!(calls <= 5);
        prop_assert!(summary.rounds <= 5);
        prop_assert!(summary.phases.last().is_some_and(|p| p.is_terminal()));
        prop_assert!(!events.is_empty());
    }

    #[test]
    fn exactly_one_final_event_and_it_is_last((steps, looping, fail_on) in model_strategy()) {
        let (events, _, _) = run_turn(build(steps, looping, fail_on));
        let finals: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_final())
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(finals, vec![events.len() - 1]);
    }

    #[test]
    fn pending_steps_precede_resolutions_in_request_order(
        (steps, looping, fail_on) in model_strategy()
    ) {
        let (events, _, calls) = run_turn(build(steps.clone(), looping, fail_on));
        let batches = dispatched_batches(&steps, looping, fail_on, calls);

        // Tool steps in emission order: each batch is its pending run
        // followed by the batch's resolutions.
        let tool_steps: Vec<&ToolStep> = events.iter().filter_map(StepEvent::tool_step).collect();
        let mut cursor = 0;
        for batch in &batches {
            let pending = &tool_steps[cursor..cursor + batch.len()];
            for (step, call) in pending.iter().zip(batch) {
                prop_assert_eq!(step.status, ToolStatus::Pending);
                prop_assert_eq!(&step.name, &call.name);
                prop_assert_eq!(&step.args, &call.args_serialized());
            }
            cursor += batch.len();

            let resolved = &tool_steps[cursor..cursor + batch.len()];
            let mut want: Vec<String> = batch.iter().map(|c| format!("{}{}", c.name, c.args)).collect();
            let mut got: Vec<String> = resolved
                .iter()
                .map(|s| {
                    assert!(s.status.is_terminal());
                    format!("{}{}", s.name, s.args)
                })
                .collect();
            want.sort();
            got.sort();
            prop_assert_eq!(want, got);
            cursor += batch.len();
        }
        prop_assert_eq!(cursor, tool_steps.len());
    }
}
