use proptest::prelude::*;

use compile_engine::{compile_part, stable_hash, stable_string, NormalizeOptions};
use serde_json::{json, Value};
use trueform_types::builder::*;
use trueform_types::{Feature, IntentPart, Overrides, UnitSystem};

// ── Stable hash ─────────────────────────────────────────────────────────────

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z0-9]{0,12}".prop_map(Value::String),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn hash_is_stable_under_clone(value in json_value()) {
        prop_assert_eq!(stable_hash(&value), stable_hash(&value.clone()));
    }

    #[test]
    fn hash_ignores_object_insertion_order(pairs in prop::collection::btree_map("[a-z]{1,8}", 0i64..1000, 1..8)) {
        let forward: serde_json::Map<String, Value> = pairs
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        let reversed: serde_json::Map<String, Value> = pairs
            .iter()
            .rev()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        prop_assert_eq!(
            stable_hash(&Value::Object(forward)),
            stable_hash(&Value::Object(reversed))
        );
    }

    #[test]
    fn canonical_string_round_trips_as_json(value in json_value()) {
        let canonical = stable_string(&value);
        let reparsed: Value = serde_json::from_str(&canonical).expect("canonical form is JSON");
        prop_assert_eq!(stable_string(&reparsed), canonical);
    }
}

// ── Scheduler determinism ───────────────────────────────────────────────────

fn combo_features() -> Vec<Feature> {
    vec![
        sketch2d(
            "sk",
            vec![
                profile("profile:a", rect(mm(10.0), mm(10.0))),
                profile("profile:b", circle(mm(2.0))),
            ],
        ),
        extrude("base", profile_ref("profile:a"), mm(4.0), "body:base", vec![]),
        extrude("tool", profile_ref("profile:b"), mm(6.0), "body:tool", vec![]),
        boolean_subtract(
            "cut",
            selector_named("body:base"),
            selector_named("body:tool"),
        ),
        fillet("round", selector_named("edge:base-top-front"), mm(1.0)).with_deps(vec!["cut"]),
    ]
}

fn schedule_of(features: Vec<Feature>) -> Vec<String> {
    let part = IntentPart::new("combo", features);
    compile_part(
        &part,
        &Overrides::new(),
        &NormalizeOptions::default(),
        UnitSystem::Mm,
    )
    .expect("part compiles")
    .order
}

proptest! {
    #[test]
    fn order_is_a_function_of_nodes_and_edges(shuffled in Just(combo_features()).prop_shuffle()) {
        let baseline = schedule_of(combo_features());
        prop_assert_eq!(schedule_of(shuffled), baseline);
    }
}
