//! Property tests for graph construction and evaluation.


use proptest::prelude::*;
use serde_json::json;
use stratus_graph::prelude::*;
use serde_json::Value as JsonValue;
use test_utils::{ScriptedProvider, resource, resource_after};
use tokio::runtime::Runtime;

/// Random DAG as a dependency list per node. Node `i` may only depend on
/// nodes declared before it, then the declaration order is shuffled.
fn arb_dag() -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
    (1usize..12)
        .prop_flat_map(|n| {
            (0..n)
                .map(|i| proptest::collection::vec(any::<bool>(), i))
                .collect::<Vec<_>>()
        })
        .prop_flat_map(|deps| {
            let nodes: Vec<(String, Vec<String>)> = deps
                .into_iter()
                .enumerate()
                .map(|(i, mask)| {
                    let parents = mask
                        .iter()
                        .enumerate()
                        .filter(|(_, on)| **on)
                        .map(|(j, _)| format!("r{j}"))
                        .collect();
                    (format!("r{i}"), parents)
                })
                .collect();
            Just(nodes).prop_shuffle()
        })
}

/// Arbitrary JSON without floats, nested up to a few levels of lists and
/// objects.
fn arb_json() -> impl Strategy<Value = JsonValue> {
    let leaf = prop_oneof![
        Just(JsonValue::Null),
        any::<bool>().prop_map(JsonValue::Bool),
        any::<i64>().prop_map(JsonValue::from),
        "[a-z0-9 /:*-]{0,12}".prop_map(JsonValue::String),
    ];
    leaf.prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(JsonValue::Array),
            proptest::collection::btree_map("[a-zA-Z_]{1,8}", inner, 0..6)
                .prop_map(|entries| JsonValue::Object(entries.into_iter().collect())),
        ]
    })
}

fn descriptors(nodes: &[(String, Vec<String>)]) -> Vec<ResourceDescriptor> {
    nodes
        .iter()
        .map(|(id, deps)| {
            let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
            resource_after(id, &deps)
        })
        .collect()
}

proptest! {
    #[test]
    fn order_places_dependencies_first(nodes in arb_dag()) {
        let graph = DependencyGraph::build(descriptors(&nodes)).unwrap();
        let order: Vec<&str> = graph.topological_order().map(|d| d.id().as_str()).collect();

        prop_assert_eq!(order.len(), nodes.len());
        for (id, deps) in &nodes {
            let at = order.iter().position(|o| o == id).unwrap();
            for dep in deps {
                let dep_at = order.iter().position(|o| o == dep).unwrap();
                prop_assert!(dep_at < at);
            }
        }
    }

    #[test]
    fn build_is_deterministic(nodes in arb_dag()) {
        let first = DependencyGraph::build(descriptors(&nodes)).unwrap();
        let second = DependencyGraph::build(descriptors(&nodes)).unwrap();

        let a: Vec<&ResourceId> = first.topological_order().map(|d| d.id()).collect();
        let b: Vec<&ResourceId> = second.topological_order().map(|d| d.id()).collect();
        prop_assert_eq!(a, b);
        prop_assert_eq!(first.edges(), second.edges());
    }

    #[test]
    fn every_resource_is_provisioned_once(nodes in arb_dag(), concurrency in 1usize..4) {
        let graph = DependencyGraph::build(descriptors(&nodes)).unwrap();
        let provider = ScriptedProvider::new();

        let evaluation = Runtime::new().unwrap().block_on(
            Evaluator::new()
                .with_max_concurrency(concurrency)
                .evaluate(&graph, &provider),
        );

        prop_assert!(evaluation.is_complete());
        let calls = provider.call_ids();
        prop_assert_eq!(calls.len(), nodes.len());
        for (id, deps) in &nodes {
            let at = calls.iter().position(|c| c == id).unwrap();
            for dep in deps {
                let dep_at = calls.iter().position(|c| c == dep).unwrap();
                prop_assert!(dep_at < at);
            }
            let call = provider.call(id).unwrap();
            for dep in deps {
                prop_assert_eq!(&call.inputs[&format!("from_{dep}")], &json!(format!("{dep}-id")));
            }
        }
    }

    #[test]
    fn literal_exports_round_trip(text in ".*", number in any::<i64>(), flag in any::<bool>()) {
        let mut stack = Stack::new("literals");
        stack.export("text", text.clone()).unwrap();
        stack.export("number", number).unwrap();
        stack.export("flag", flag).unwrap();

        let report = Runtime::new()
            .unwrap()
            .block_on(Evaluator::new().deploy(&stack, &ScriptedProvider::new()))
            .unwrap();

        prop_assert_eq!(report.exports().get("text").unwrap(), &json!(text));
        prop_assert_eq!(report.exports().get("number").unwrap(), &json!(number));
        prop_assert_eq!(report.exports().get("flag").unwrap(), &json!(flag));
    }

    #[test]
    fn nested_literals_pass_through_unchanged(payload in arb_json()) {
        let mut stack = Stack::new("nested");
        let holder = stack
            .declare(resource("holder").with_input("payload", Value::literal(payload.clone())))
            .unwrap();
        stack.export("direct", Value::literal(payload.clone())).unwrap();
        stack.export("through_resource", holder.output("payload")).unwrap();
        stack.export("encoded", Value::json(Value::literal(payload.clone()))).unwrap();

        let provider = ScriptedProvider::new();
        let report = Runtime::new()
            .unwrap()
            .block_on(Evaluator::new().deploy(&stack, &provider))
            .unwrap();

        prop_assert!(report.is_success());
        prop_assert_eq!(&provider.call("holder").unwrap().inputs["payload"], &payload);
        prop_assert_eq!(report.exports().get("direct").unwrap(), &payload);
        prop_assert_eq!(report.exports().get("through_resource").unwrap(), &payload);

        let encoded = report.exports().get("encoded").unwrap().as_str().unwrap().to_string();
        let decoded: JsonValue = serde_json::from_str(&encoded).unwrap();
        prop_assert_eq!(decoded, payload);
    }
}
