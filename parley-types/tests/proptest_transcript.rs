use parley_types::*;
use proptest::prelude::*;

/// Distinct calls with a success flag each, plus a completion order.
fn batch() -> impl Strategy<Value = (Vec<(ToolCallRequest, bool)>, Vec<usize>)> {
    prop::collection::vec(any::<bool>(), 1..8).prop_flat_map(|flags| {
        let calls: Vec<(ToolCallRequest, bool)> = flags
            .into_iter()
            .enumerate()
            .map(|(i, ok)| {
                let call = ToolCallRequest::new("weather", serde_json::json!({ "location": format!("city-{i}") }));
                (call, ok)
            })
            .collect();
        let order: Vec<usize> = (0..calls.len()).collect();
        (Just(calls), Just(order).prop_shuffle())
    })
}

fn result_for(ok: bool) -> ToolResult {
    if ok {
        ToolResult::ok(serde_json::json!({ "temperature": 22 }), "Sunny.")
    } else {
        ToolResult::failure("WEATHER_ERROR", "station offline")
    }
}

proptest! {
    #[test]
    fn completion_order_does_not_change_the_reconciled_steps((calls, order) in batch()) {
        let pending: Vec<ToolStep> = calls.iter().map(|(c, _)| ToolStep::pending(c)).collect();

        let mut transcript = Transcript::new();
        for step in &pending {
            transcript.apply(&StepEvent::ToolStep { step: step.clone() });
        }
        for &i in &order {
            let mut step = pending[i].clone();
            step.resolve(&result_for(calls[i].1));
            transcript.apply(&StepEvent::ToolStep { step });
        }

        let steps = transcript.steps();
        prop_assert_eq!(steps.len(), calls.len());
        for (step, (call, ok)) in steps.iter().zip(&calls) {
            prop_assert_eq!(&step.args, &call.args_serialized());
            let expected = if *ok { ToolStatus::Complete } else { ToolStatus::Error };
            prop_assert_eq!(step.status, expected);
            prop_assert!(step.summary.as_deref().is_some_and(|s| !s.is_empty()));
        }
        prop_assert!(!transcript.is_final());
        prop_assert_eq!(transcript.event_count(), calls.len() * 2);
    }

    #[test]
    fn final_update_wins_over_earlier_content(texts in prop::collection::vec("[a-z ]{0,12}", 1..6)) {
        let mut transcript = Transcript::new();
        let last = texts.len() - 1;
        for (i, text) in texts.iter().enumerate() {
            transcript.apply(&StepEvent::ContentUpdate(ContentUpdate {
                content: text.clone(),
                is_final: (i == last).then_some(true),
                ..ContentUpdate::default()
            }));
        }
        prop_assert_eq!(transcript.content(), texts[last].as_str());
        prop_assert!(transcript.is_final());
        prop_assert_eq!(transcript.to_message().content, texts[last].clone());
    }
}
