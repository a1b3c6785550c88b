//! Integration tests for graph evaluation.


use core::time::Duration;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use stratus_graph::prelude::*;
use test_utils::{ScriptedProvider, resource, resource_after};

fn build(descriptors: Vec<ResourceDescriptor>) -> DependencyGraph {
    DependencyGraph::build(descriptors).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT PROPAGATION
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn dependent_receives_concrete_output() {
    let graph = build(vec![
        resource("a"),
        resource("b").with_input("x", Value::output("a", "out")),
    ]);
    let provider = ScriptedProvider::new().with_output("a", "out", "v1");

    let evaluation = Evaluator::new().evaluate(&graph, &provider).await;

    assert!(evaluation.is_complete());
    assert_eq!(provider.call_ids(), vec!["a", "b"]);
    let b = provider.call("b").unwrap();
    assert_eq!(b.inputs["x"], json!("v1"));
}

#[tokio::test]
async fn composite_values_are_fully_substituted() {
    let graph = build(vec![
        resource("bucket"),
        resource("policy").with_input(
            "document",
            Value::json(Value::map([(
                "Resource",
                Value::list([
                    Value::output("bucket", "arn"),
                    Value::concat([Value::output("bucket", "arn"), "/*".into()]),
                ]),
            )])),
        ),
    ]);
    let provider = ScriptedProvider::new().with_output("bucket", "arn", "arn:sim:s3:::spill");

    let outputs = Evaluator::new()
        .evaluate(&graph, &provider)
        .await
        .into_result()
        .unwrap();

    let document = provider.call("policy").unwrap().inputs["document"].clone();
    let parsed: serde_json::Value = serde_json::from_str(document.as_str().unwrap()).unwrap();
    assert_eq!(
        parsed,
        json!({ "Resource": ["arn:sim:s3:::spill", "arn:sim:s3:::spill/*"] })
    );
    assert_eq!(outputs.len(), 2);
}

#[tokio::test]
async fn outputs_are_recorded_per_resource() {
    let graph = build(vec![resource("a"), resource_after("b", &["a"])]);
    let provider = ScriptedProvider::new();

    let evaluation = Evaluator::new().evaluate(&graph, &provider).await;
    let outputs = evaluation.outputs();

    assert_eq!(outputs.field("a", "id"), Some(&json!("a-id")));
    assert_eq!(outputs.field("b", "from_a"), Some(&json!("a-id")));
    assert_eq!(evaluation.state("b"), Some(ResourceState::Materialized));
}

// ═══════════════════════════════════════════════════════════════════════════════
// FAILURE
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn failure_halts_and_keeps_earlier_outputs() {
    let graph = build(vec![
        resource("a"),
        resource_after("b", &["a"]),
        resource_after("c", &["b"]),
    ]);
    let provider = ScriptedProvider::new().failing("b", "quota exceeded");

    let evaluation = Evaluator::new().evaluate(&graph, &provider).await;

    assert_eq!(provider.call_ids(), vec!["a", "b"]);
    assert_eq!(evaluation.state("a"), Some(ResourceState::Materialized));
    assert_eq!(evaluation.state("b"), Some(ResourceState::Failed));
    assert_eq!(evaluation.state("c"), Some(ResourceState::Declared));
    assert!(evaluation.outputs().contains("a"));
    assert!(!evaluation.outputs().contains("b"));

    let failure = evaluation.failure().unwrap();
    assert_eq!(failure.resource.as_str(), "b");
    assert!(matches!(failure.cause, ProvisionCause::Provider(_)));
    assert!(failure.to_string().contains("quota exceeded"));

    let unreached: Vec<&str> = evaluation.unreached().iter().map(|id| id.as_str()).collect();
    assert_eq!(unreached, vec!["c"]);

    assert!(matches!(
        evaluation.into_result(),
        Err(EvaluationError::Provisioning(_))
    ));
}

#[tokio::test]
async fn missing_output_field_fails_the_consumer() {
    let graph = build(vec![
        resource("a"),
        resource("b").with_input("x", Value::output("a", "nope")),
    ]);
    let provider = ScriptedProvider::new();

    let evaluation = Evaluator::new().evaluate(&graph, &provider).await;

    assert_eq!(provider.call_ids(), vec!["a"]);
    let failure = evaluation.failure().unwrap();
    assert_eq!(failure.resource.as_str(), "b");
    assert!(matches!(
        failure.cause,
        ProvisionCause::Input(ResolveError::MissingField { .. })
    ));
}

#[tokio::test]
async fn in_flight_calls_drain_after_failure() {
    let graph = build(vec![resource("slow"), resource("bad"), resource("later")]);
    let provider = ScriptedProvider::new()
        .with_delay("slow", Duration::from_millis(50))
        .failing("bad", "boom");

    let evaluation = Evaluator::new()
        .with_max_concurrency(2)
        .evaluate(&graph, &provider)
        .await;

    assert_eq!(evaluation.state("slow"), Some(ResourceState::Materialized));
    assert_eq!(evaluation.state("bad"), Some(ResourceState::Failed));
    assert_eq!(evaluation.state("later"), Some(ResourceState::Queued));
    assert!(provider.call("later").is_none());
    assert!(evaluation.outputs().contains("slow"));
}

#[tokio::test]
async fn every_failure_during_drain_is_kept() {
    let graph = build(vec![resource("a"), resource("b"), resource("c")]);
    let provider = ScriptedProvider::new()
        .with_delay("b", Duration::from_millis(20))
        .failing("a", "quota exceeded")
        .failing("b", "access denied");

    let evaluation = Evaluator::new()
        .with_max_concurrency(2)
        .evaluate(&graph, &provider)
        .await;

    let failed: Vec<&str> = evaluation
        .failures()
        .iter()
        .map(|err| err.resource.as_str())
        .collect();
    assert_eq!(failed, vec!["a", "b"]);
    assert_eq!(evaluation.failure().unwrap().resource.as_str(), "a");
    assert_eq!(evaluation.state("c"), Some(ResourceState::Queued));
    assert!(provider.call("c").is_none());
}

#[tokio::test]
async fn states_distinguish_blocked_from_ready() {
    let graph = build(vec![
        resource("root"),
        resource("sibling"),
        resource_after("child", &["root"]),
        resource_after("grandchild", &["child"]),
    ]);
    let provider = ScriptedProvider::new().failing("root", "boom");

    let evaluation = Evaluator::new().evaluate(&graph, &provider).await;

    assert_eq!(evaluation.state("root"), Some(ResourceState::Failed));
    assert_eq!(evaluation.state("sibling"), Some(ResourceState::Queued));
    assert_eq!(evaluation.state("child"), Some(ResourceState::Declared));
    assert_eq!(evaluation.state("grandchild"), Some(ResourceState::Declared));
    assert_eq!(evaluation.unreached().len(), 3);
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONCURRENCY
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn sequential_by_default() {
    let graph = build(vec![resource("a"), resource("b"), resource("c")]);
    let provider = ScriptedProvider::new()
        .with_delay("a", Duration::from_millis(10))
        .with_delay("b", Duration::from_millis(10));

    let evaluation = Evaluator::new().evaluate(&graph, &provider).await;

    assert!(evaluation.is_complete());
    assert_eq!(provider.max_in_flight(), 1);
    let order: Vec<&str> = evaluation.order().iter().map(|id| id.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn independent_resources_run_concurrently() {
    let graph = build(vec![
        resource("a"),
        resource("b"),
        resource("c"),
        resource_after("d", &["a", "b", "c"]),
    ]);
    let provider = ScriptedProvider::new()
        .with_delay("a", Duration::from_millis(30))
        .with_delay("b", Duration::from_millis(30))
        .with_delay("c", Duration::from_millis(30));

    let evaluation = Evaluator::new()
        .with_max_concurrency(3)
        .evaluate(&graph, &provider)
        .await;

    assert!(evaluation.is_complete());
    assert_eq!(provider.max_in_flight(), 3);
    assert_eq!(provider.call_ids().last().map(String::as_str), Some("d"));
}

#[tokio::test]
async fn concurrency_never_runs_dependents_early() {
    let graph = build(vec![
        resource("a"),
        resource_after("b", &["a"]),
        resource_after("c", &["b"]),
    ]);
    let provider = ScriptedProvider::new().with_delay("a", Duration::from_millis(20));

    let evaluation = Evaluator::new()
        .with_max_concurrency(8)
        .evaluate(&graph, &provider)
        .await;

    assert!(evaluation.is_complete());
    assert_eq!(provider.max_in_flight(), 1);
    assert_eq!(provider.call_ids(), vec!["a", "b", "c"]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// CANCELLATION
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn cancelled_before_start_makes_no_calls() {
    let graph = build(vec![resource("a"), resource("b")]);
    let provider = ScriptedProvider::new();
    let evaluator = Evaluator::new();
    evaluator.cancellation_handle().cancel();

    let evaluation = evaluator.evaluate(&graph, &provider).await;

    assert!(provider.calls().is_empty());
    assert!(evaluation.is_cancelled());
    assert!(!evaluation.is_complete());
    assert!(matches!(
        evaluation.into_result(),
        Err(EvaluationError::Cancelled { materialized: 0, total: 2 })
    ));
}

#[tokio::test]
async fn cancellation_mid_run_stops_new_calls() {
    let graph = build(vec![resource("a"), resource("b"), resource("c")]);
    let provider = ScriptedProvider::new();

    let mut evaluator = Evaluator::new();
    let handle = evaluator.cancellation_handle();
    evaluator
        .hooks_mut()
        .register_observer("cancel-after-a", move |event| {
            if let EvaluationEvent::ResourceMaterialized { resource, .. } = event
                && resource.as_str() == "a"
            {
                handle.cancel();
            }
        })
        .unwrap();

    let evaluation = evaluator.evaluate(&graph, &provider).await;

    assert_eq!(provider.call_ids(), vec!["a"]);
    assert!(evaluation.is_cancelled());
    assert_eq!(evaluation.state("a"), Some(ResourceState::Materialized));
    assert_eq!(evaluation.unreached().len(), 2);
}

#[tokio::test]
async fn cancellation_drains_concurrent_calls() {
    let graph = build(vec![resource("slow"), resource("a"), resource("c")]);
    let provider = ScriptedProvider::new().with_delay("slow", Duration::from_millis(50));

    let mut evaluator = Evaluator::new().with_max_concurrency(2);
    let handle = evaluator.cancellation_handle();
    evaluator
        .hooks_mut()
        .register_observer("cancel-after-a", move |event| {
            if let EvaluationEvent::ResourceMaterialized { resource, .. } = event
                && resource.as_str() == "a"
            {
                handle.cancel();
            }
        })
        .unwrap();

    let evaluation = evaluator.evaluate(&graph, &provider).await;

    assert!(evaluation.is_cancelled());
    assert_eq!(evaluation.state("a"), Some(ResourceState::Materialized));
    assert_eq!(evaluation.state("slow"), Some(ResourceState::Materialized));
    assert!(evaluation.outputs().contains("slow"));
    assert_eq!(evaluation.state("c"), Some(ResourceState::Queued));
    assert!(provider.call("c").is_none());
    assert!(matches!(
        evaluation.into_result(),
        Err(EvaluationError::Cancelled { materialized: 2, total: 3 })
    ));
}

#[tokio::test]
async fn cancellation_applies_to_one_run() {
    let graph = build(vec![resource("a"), resource_after("b", &["a"])]);
    let evaluator = Evaluator::new();
    evaluator.cancellation_handle().cancel();

    let first = ScriptedProvider::new();
    let cancelled = evaluator.evaluate(&graph, &first).await;
    assert!(cancelled.is_cancelled());
    assert!(first.calls().is_empty());

    let second = ScriptedProvider::new();
    let evaluation = evaluator.evaluate(&graph, &second).await;

    assert!(!evaluation.is_cancelled());
    assert!(evaluation.is_complete());
    assert_eq!(second.call_ids(), vec!["a", "b"]);
    assert!(
        evaluation
            .states()
            .values()
            .all(|state| *state == ResourceState::Materialized)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOOKS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn lifecycle_events_are_delivered_in_order() {
    let graph = build(vec![resource("a"), resource_after("b", &["a"])]);
    let provider = ScriptedProvider::new();
    let events = Arc::new(Mutex::new(Vec::new()));

    let mut hooks = Hooks::new();
    let sink = Arc::clone(&events);
    hooks
        .register_observer("recorder", move |event| {
            let label = match event {
                EvaluationEvent::EvaluationStart { resource_count } => {
                    format!("start:{resource_count}")
                }
                EvaluationEvent::ResourceStart { resource, .. } => format!("begin:{resource}"),
                EvaluationEvent::ResourceMaterialized { resource, .. } => {
                    format!("done:{resource}")
                }
                EvaluationEvent::EvaluationComplete { materialized, .. } => {
                    format!("complete:{materialized}")
                }
                other => format!("{other:?}"),
            };
            sink.lock().push(label);
        })
        .unwrap();

    Evaluator::new()
        .with_hooks(hooks)
        .evaluate(&graph, &provider)
        .await;

    assert_eq!(
        *events.lock(),
        vec!["start:2", "begin:a", "done:a", "begin:b", "done:b", "complete:2"]
    );
}

#[tokio::test]
async fn failure_events_name_the_resource() {
    let graph = build(vec![resource("a")]);
    let provider = ScriptedProvider::new().failing("a", "denied");
    let failures = Arc::new(Mutex::new(Vec::new()));

    let mut evaluator = Evaluator::new();
    let sink = Arc::clone(&failures);
    evaluator
        .hooks_mut()
        .register_observer("failures", move |event| {
            if let EvaluationEvent::ResourceFailed { resource, error, .. } = event {
                sink.lock().push((resource.to_string(), error.clone()));
            }
        })
        .unwrap();

    evaluator.evaluate(&graph, &provider).await;

    let failures = failures.lock();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "a");
    assert!(failures[0].1.contains("denied"));
}
