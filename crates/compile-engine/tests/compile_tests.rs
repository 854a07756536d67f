use pretty_assertions::assert_eq;

use compile_engine::{
    build_part, cache_key, compile_part, merge, BuildError, BuildMode, BuildOptions, CancelToken,
    NormalizeOptions, PartialBuild, StagedPolicy, ValidationMode,
};
use kernel_api::{
    meta_keys, KernelObject, KernelResult, KernelSelection, MetaValue, MockBackend, ObjectKind,
    SelectionKind,
};
use trueform_types::builder::*;
use trueform_types::{
    BuildContext, Feature, FeatureOp, IntentDocument, IntentPart, Overrides, UnitSystem,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

/// S1 part: a rectangular plate.
fn plate() -> IntentPart {
    part(
        "plate",
        vec![
            sketch2d("sk", vec![profile("profile:base", rect(mm(10.0), mm(5.0)))]),
            extrude("e", profile_ref("profile:base"), mm(2.0), "body:main", vec!["sk"]),
        ],
    )
}

/// Plate with a fillet on one named top edge.
fn plate_with_fillet() -> IntentPart {
    let mut p = plate();
    p.features.push(
        fillet("f", selector_named("edge:e-top-front"), mm(1.0)).with_deps(vec!["e"]),
    );
    p
}

fn build(part: &IntentPart) -> compile_engine::BuildResult {
    let mut backend = MockBackend::new();
    build_part(
        &mut backend,
        part,
        &Overrides::new(),
        &BuildOptions::default(),
        UnitSystem::Mm,
        None,
    )
    .expect("build succeeds")
}

fn compile(part: &IntentPart) -> Result<compile_engine::CompiledPart, compile_engine::CompileError>
{
    compile_part(
        part,
        &Overrides::new(),
        &NormalizeOptions::default(),
        UnitSystem::Mm,
    )
}

// ── Basic build (S1) ────────────────────────────────────────────────────────

#[test]
fn plate_builds_in_order() {
    let result = build(&plate());
    assert_eq!(result.order, vec!["sk", "e"]);
    assert!(result.final_result.outputs.contains_key("body:main"));
    assert_eq!(result.diagnostics.mode, BuildMode::Full);
    assert_eq!(result.diagnostics.executed_feature_ids, vec!["sk", "e"]);
}

#[test]
fn extrude_publishes_selectable_topology() {
    let result = build(&plate());
    let faces = result
        .final_result
        .selections
        .iter()
        .filter(|s| s.kind == SelectionKind::Face)
        .count();
    let edges = result
        .final_result
        .selections
        .iter()
        .filter(|s| s.kind == SelectionKind::Edge)
        .count();
    assert_eq!(faces, 6);
    assert_eq!(edges, 12);
}

// ── Dependency inference (S2) ───────────────────────────────────────────────

#[test]
fn profile_reference_schedules_sketch_first() {
    // Declared in reverse order; the profile reference still wires sk → e.
    let p = part(
        "plate",
        vec![
            extrude("e", profile_ref("profile:base"), mm(2.0), "body:main", vec![]),
            sketch2d("sk", vec![profile("profile:base", rect(mm(10.0), mm(5.0)))]),
        ],
    );
    let compiled = compile(&p).unwrap();
    assert_eq!(compiled.order, vec!["sk", "e"]);
}

#[test]
fn missing_profile_is_rejected() {
    let p = part(
        "plate",
        vec![extrude(
            "e",
            profile_ref("profile:base"),
            mm(2.0),
            "body:main",
            vec![],
        )],
    );
    let err = compile(&p).unwrap_err();
    assert_eq!(err.code(), "profile_missing");
}

// ── Named output inference (S3) ─────────────────────────────────────────────

fn two_bodies_and_boolean(declare_base_result: bool) -> IntentPart {
    let mut base = extrude("base", profile_ref("profile:a"), mm(4.0), "body:base", vec![]);
    if !declare_base_result {
        base.result = None;
    }
    part(
        "combo",
        vec![
            sketch2d(
                "sk",
                vec![
                    profile("profile:a", rect(mm(10.0), mm(10.0))),
                    profile("profile:b", circle(mm(2.0))),
                ],
            ),
            base,
            extrude("tool", profile_ref("profile:b"), mm(6.0), "body:tool", vec![]),
            boolean_subtract(
                "cut",
                selector_named("body:base"),
                selector_named("body:tool"),
            ),
        ],
    )
}

#[test]
fn named_outputs_schedule_boolean_last() {
    let compiled = compile(&two_bodies_and_boolean(true)).unwrap();
    assert_eq!(compiled.order, vec!["sk", "base", "tool", "cut"]);

    let mut backend = MockBackend::new();
    let result = build_part(
        &mut backend,
        &two_bodies_and_boolean(true),
        &Overrides::new(),
        &BuildOptions::default(),
        UnitSystem::Mm,
        None,
    )
    .unwrap();
    assert!(result.final_result.outputs.contains_key("body:cut"));
}

#[test]
fn undeclared_named_output_is_rejected() {
    let err = compile(&two_bodies_and_boolean(false)).unwrap_err();
    assert_eq!(err.code(), "selector_named_missing");
}

// ── Anchorless selectors (S4) ───────────────────────────────────────────────

#[test]
fn anchorless_selector_is_rejected() {
    let p = part(
        "plate",
        vec![
            sketch2d("sk", vec![profile("profile:base", rect(mm(10.0), mm(5.0)))]),
            extrude("base", profile_ref("profile:base"), mm(2.0), "body:main", vec![]),
            fillet("f", selector_edge(vec![pred_role("edge")], vec![]), mm(1.0)),
        ],
    );
    let err = compile(&p).unwrap_err();
    assert_eq!(err.code(), "selector_anchor_missing");
}

#[test]
fn explicit_deps_anchor_the_selector() {
    let p = part(
        "plate",
        vec![
            sketch2d("sk", vec![profile("profile:base", rect(mm(10.0), mm(5.0)))]),
            extrude("base", profile_ref("profile:base"), mm(2.0), "body:main", vec![]),
            fillet("f", selector_edge(vec![pred_role("edge")], vec![]), mm(1.0))
                .with_deps(vec!["base"]),
        ],
    );
    assert!(compile(&p).is_ok());
}

#[test]
fn created_by_predicate_anchors_the_selector() {
    let p = part(
        "plate",
        vec![
            sketch2d("sk", vec![profile("profile:base", rect(mm(10.0), mm(5.0)))]),
            extrude("base", profile_ref("profile:base"), mm(2.0), "body:main", vec![]),
            fillet(
                "f",
                selector_edge(vec![pred_created_by("base"), pred_role("edge")], vec![]),
                mm(1.0),
            ),
        ],
    );
    let compiled = compile(&p).unwrap();
    assert_eq!(compiled.order, vec!["sk", "base", "f"]);
}

// ── Incremental rebuild (S5) ────────────────────────────────────────────────

#[test]
fn incremental_reuses_unchanged_prefix() {
    let p = plate_with_fillet();
    let mut backend = MockBackend::new();
    let overrides = Overrides::new();

    let first = build_part(
        &mut backend,
        &p,
        &overrides,
        &BuildOptions::default(),
        UnitSystem::Mm,
        None,
    )
    .unwrap();
    assert_eq!(first.diagnostics.executed_feature_ids, vec!["sk", "e", "f"]);

    let options = BuildOptions {
        partial: Some(PartialBuild {
            changed_feature_ids: vec!["f".to_string()],
        }),
        ..BuildOptions::default()
    };
    let second = build_part(
        &mut backend,
        &p,
        &overrides,
        &options,
        UnitSystem::Mm,
        Some(&first),
    )
    .unwrap();
    assert_eq!(second.diagnostics.mode, BuildMode::Incremental);
    assert_eq!(second.diagnostics.executed_feature_ids, vec!["f"]);
    assert_eq!(second.diagnostics.reused_feature_ids, vec!["sk", "e"]);
    assert_eq!(second.diagnostics.invalidated_feature_ids, vec!["f"]);
}

#[test]
fn incremental_invalidates_downstream_closure() {
    let p = plate_with_fillet();
    let mut backend = MockBackend::new();
    let overrides = Overrides::new();

    let first = build_part(
        &mut backend,
        &p,
        &overrides,
        &BuildOptions::default(),
        UnitSystem::Mm,
        None,
    )
    .unwrap();

    let options = BuildOptions {
        partial: Some(PartialBuild {
            changed_feature_ids: vec!["e".to_string()],
        }),
        ..BuildOptions::default()
    };
    let second = build_part(
        &mut backend,
        &p,
        &overrides,
        &options,
        UnitSystem::Mm,
        Some(&first),
    )
    .unwrap();
    assert_eq!(second.diagnostics.executed_feature_ids, vec!["e", "f"]);
    assert_eq!(second.diagnostics.reused_feature_ids, vec!["sk"]);
}

#[test]
fn incremental_final_equals_full_final() {
    let p = plate_with_fillet();
    let mut backend = MockBackend::new();
    let overrides = Overrides::new();

    let first = build_part(
        &mut backend,
        &p,
        &overrides,
        &BuildOptions::default(),
        UnitSystem::Mm,
        None,
    )
    .unwrap();
    let options = BuildOptions {
        partial: Some(PartialBuild {
            changed_feature_ids: vec!["f".to_string()],
        }),
        ..BuildOptions::default()
    };
    let second = build_part(
        &mut backend,
        &p,
        &overrides,
        &options,
        UnitSystem::Mm,
        Some(&first),
    )
    .unwrap();
    assert_eq!(second.final_result, first.final_result);
}

#[test]
fn unknown_changed_feature_is_rejected() {
    let p = plate_with_fillet();
    let mut backend = MockBackend::new();
    let first = build(&p);
    let options = BuildOptions {
        partial: Some(PartialBuild {
            changed_feature_ids: vec!["ghost".to_string()],
        }),
        ..BuildOptions::default()
    };
    let err = build_part(
        &mut backend,
        &p,
        &Overrides::new(),
        &options,
        UnitSystem::Mm,
        Some(&first),
    )
    .unwrap_err();
    assert!(matches!(err, BuildError::UnknownChangedFeature { .. }));
}

// ── Selection invalidation (§4.7) ───────────────────────────────────────────

#[test]
fn rework_invalidates_owner_selections() {
    let result = build(&plate_with_fillet());
    let ids: Vec<&str> = result
        .final_result
        .selections
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    // The fillet re-published body:main, so the extrude's selections are gone.
    assert!(!ids.contains(&"face:e-top"));
    assert!(!ids.contains(&"edge:e-top-front"));
    assert!(ids.iter().any(|id| id.starts_with("face:f-fillet")));
}

#[test]
fn merge_overwrites_in_place_and_appends() {
    let mut current = KernelResult::default();
    current
        .outputs
        .insert("body:a".to_string(), KernelObject::new("a1", ObjectKind::Solid));
    current
        .outputs
        .insert("body:b".to_string(), KernelObject::new("b1", ObjectKind::Solid));
    current.selections.push(
        KernelSelection::new("face:1", SelectionKind::Face)
            .with_meta(meta_keys::OWNER_KEY, MetaValue::Text("body:a".into())),
    );
    current.selections.push(
        KernelSelection::new("face:2", SelectionKind::Face)
            .with_meta(meta_keys::OWNER_KEY, MetaValue::Text("body:b".into())),
    );

    let mut step = KernelResult::default();
    step.outputs
        .insert("body:a".to_string(), KernelObject::new("a2", ObjectKind::Solid));
    step.outputs
        .insert("body:c".to_string(), KernelObject::new("c1", ObjectKind::Solid));
    step.selections.push(
        KernelSelection::new("face:3", SelectionKind::Face)
            .with_meta(meta_keys::OWNER_KEY, MetaValue::Text("body:a".into())),
    );

    merge(&mut current, &step);

    let keys: Vec<&str> = current.outputs.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["body:a", "body:b", "body:c"]);
    assert_eq!(current.outputs["body:a"].id, "a2");

    let ids: Vec<&str> = current.selections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["face:2", "face:3"]);
}

// ── Scheduler determinism ───────────────────────────────────────────────────

#[test]
fn order_ignores_declaration_order() {
    let baseline = compile(&two_bodies_and_boolean(true)).unwrap().order;
    let mut shuffled = two_bodies_and_boolean(true);
    shuffled.features.reverse();
    let order = compile(&shuffled).unwrap().order;
    assert_eq!(order, baseline);
}

#[test]
fn dependency_cycle_is_rejected() {
    let p = part(
        "loop",
        vec![
            sketch2d("a", vec![profile("profile:a", rect(mm(1.0), mm(1.0)))])
                .with_deps(vec!["b"]),
            sketch2d("b", vec![profile("profile:b", rect(mm(1.0), mm(1.0)))])
                .with_deps(vec!["a"]),
        ],
    );
    let err = compile(&p).unwrap_err();
    assert_eq!(err.code(), "graph_cycle");
}

// ── Selector resolution through the build ───────────────────────────────────

fn hole_on(selector: trueform_types::Selector) -> IntentPart {
    part(
        "plate",
        vec![
            sketch2d("sk", vec![profile("profile:base", rect(mm(10.0), mm(5.0)))]),
            extrude("e", profile_ref("profile:base"), mm(2.0), "body:main", vec![]),
            hole("h", selector, mm(3.0)).with_deps(vec!["e"]),
        ],
    )
}

#[test]
fn rank_max_z_picks_the_top_face() {
    let p = hole_on(selector_face(vec![pred_planar()], vec![rank_max_z()]));
    let result = build(&p);
    assert_eq!(result.order, vec!["sk", "e", "h"]);
    assert!(result
        .final_result
        .selections
        .iter()
        .any(|s| s.created_by() == Some("h")));
}

#[test]
fn rank_closest_to_uses_the_anchor_center() {
    let p = hole_on(selector_face(
        vec![pred_planar()],
        vec![rank_closest_to(selector_named("edge:e-top-front"))],
    ));
    // Nearest planar face to the front top edge is the front wall.
    assert!(matches!(
        build_checked(&p),
        Ok(result) if result.final_result.outputs.contains_key("body:main")
    ));
}

fn build_checked(p: &IntentPart) -> Result<compile_engine::BuildResult, BuildError> {
    let mut backend = MockBackend::new();
    build_part(
        &mut backend,
        p,
        &Overrides::new(),
        &BuildOptions::default(),
        UnitSystem::Mm,
        None,
    )
}

#[test]
fn ambiguous_selector_fails_the_build() {
    let p = hole_on(selector_face(vec![pred_planar()], vec![]));
    let err = build_checked(&p).unwrap_err();
    match err {
        BuildError::Resolve { feature, source } => {
            assert_eq!(feature, "h");
            assert!(source.to_string().starts_with("Selector ambiguity"));
        }
        other => panic!("expected resolve error, got {other:?}"),
    }
}

#[test]
fn unmatched_selector_fails_the_build() {
    let p = hole_on(selector_face(vec![pred_role("nope")], vec![]));
    let err = build_checked(&p).unwrap_err();
    match err {
        BuildError::Resolve { source, .. } => {
            assert_eq!(source.to_string(), "Selector matched 0 candidates");
        }
        other => panic!("expected resolve error, got {other:?}"),
    }
}

#[test]
fn normal_predicate_narrows_end_caps() {
    let p = hole_on(selector_face(
        vec![pred_planar(), pred_normal(trueform_types::AxisDir::PosZ)],
        vec![],
    ));
    assert!(build_checked(&p).is_ok());
}

// ── Capability negotiation ──────────────────────────────────────────────────

#[test]
fn unsupported_kind_is_gated_before_execution() {
    let mut backend = MockBackend::with_feature_kinds(vec!["sketch2d"]);
    let err = build_part(
        &mut backend,
        &plate(),
        &Overrides::new(),
        &BuildOptions::default(),
        UnitSystem::Mm,
        None,
    )
    .unwrap_err();
    assert_eq!(err.code(), "backend_unsupported_feature");
}

// ── Staged features ─────────────────────────────────────────────────────────

fn staged_part() -> IntentPart {
    let mut pipe = Feature {
        id: "ps".to_string(),
        deps: Vec::new(),
        tags: Vec::new(),
        result: Some("body:pipe".to_string()),
        pattern: None,
        op: FeatureOp::PipeSweep {
            path: profile_ref("profile:path"),
            diameter: mm(5.0),
        },
    };
    pipe.deps.push("sk".to_string());
    part(
        "piping",
        vec![
            sketch2d("sk", vec![profile("profile:path", rect(mm(20.0), mm(1.0)))]),
            pipe,
        ],
    )
}

#[test]
fn staged_feature_policy_warn_records_a_warning() {
    let compiled = compile_part(
        &staged_part(),
        &Overrides::new(),
        &NormalizeOptions {
            staged_features: StagedPolicy::Warn,
            ..NormalizeOptions::default()
        },
        UnitSystem::Mm,
    )
    .unwrap();
    let warnings = &compiled.normalized.warnings;
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].key, "pipeSweep");
}

#[test]
fn staged_feature_policy_error_rejects() {
    let err = compile_part(
        &staged_part(),
        &Overrides::new(),
        &NormalizeOptions {
            staged_features: StagedPolicy::Error,
            ..NormalizeOptions::default()
        },
        UnitSystem::Mm,
    )
    .unwrap_err();
    assert_eq!(err.code(), "staged_feature");
}

#[test]
fn staged_feature_policy_allow_is_silent() {
    let compiled = compile_part(
        &staged_part(),
        &Overrides::new(),
        &NormalizeOptions {
            staged_features: StagedPolicy::Allow,
            ..NormalizeOptions::default()
        },
        UnitSystem::Mm,
    )
    .unwrap();
    assert!(compiled.normalized.warnings.is_empty());
}

#[test]
fn strict_validation_escalates_staged_warnings() {
    let err = compile_part(
        &staged_part(),
        &Overrides::new(),
        &NormalizeOptions {
            validation: ValidationMode::Strict,
            staged_features: StagedPolicy::Warn,
        },
        UnitSystem::Mm,
    )
    .unwrap_err();
    assert_eq!(err.code(), "staged_feature");
}

// ── Normalization details ───────────────────────────────────────────────────

#[test]
fn parameters_inline_into_features() {
    let mut p = part(
        "plate",
        vec![
            sketch2d("sk", vec![profile("profile:base", rect(mm(10.0), mm(5.0)))]),
            extrude("e", profile_ref("profile:base"), param("t"), "body:main", vec!["sk"]),
        ],
    );
    p.params = vec![param_length("t", lit_unit(1.0, trueform_types::Unit::In))];

    let compiled = compile(&p).unwrap();
    let e = compiled.normalized.part.find_feature("e").unwrap();
    match &e.op {
        FeatureOp::Extrude { distance, .. } => {
            assert_eq!(*distance, lit(25.4));
        }
        other => panic!("unexpected op {other:?}"),
    }
    assert_eq!(compiled.normalized.params["t"].value, 25.4);
}

#[test]
fn unitless_literals_follow_the_document_unit_system() {
    let p = part(
        "plate",
        vec![
            sketch2d("sk", vec![profile("profile:base", rect(lit(1.0), lit(1.0)))]),
            extrude("e", profile_ref("profile:base"), lit(2.0), "body:main", vec!["sk"]),
        ],
    );
    let compiled = compile_part(
        &p,
        &Overrides::new(),
        &NormalizeOptions::default(),
        UnitSystem::In,
    )
    .unwrap();
    let e = compiled.normalized.part.find_feature("e").unwrap();
    match &e.op {
        FeatureOp::Extrude { distance, .. } => assert_eq!(*distance, lit(50.8)),
        other => panic!("unexpected op {other:?}"),
    }
}

#[test]
fn comma_separated_named_selector_canonicalizes_to_id_list() {
    let p = part(
        "plate",
        vec![
            sketch2d("sk", vec![profile("profile:base", rect(mm(10.0), mm(5.0)))]),
            extrude("e", profile_ref("profile:base"), mm(2.0), "body:main", vec![]),
            fillet(
                "f",
                selector_named("edge:e-top-front, edge:e-top-back"),
                mm(1.0),
            )
            .with_deps(vec!["e"]),
        ],
    );
    let compiled = compile(&p).unwrap();
    let f = compiled.normalized.part.find_feature("f").unwrap();
    match &f.op {
        FeatureOp::Fillet { edges, .. } => match edges {
            trueform_types::Selector::Ids { ids } => {
                assert_eq!(ids, &vec!["edge:e-top-front".to_string(), "edge:e-top-back".to_string()]);
            }
            other => panic!("expected id list, got {other:?}"),
        },
        other => panic!("unexpected op {other:?}"),
    }
}

#[test]
fn duplicate_output_keys_are_rejected() {
    let p = part(
        "plate",
        vec![
            sketch2d("sk", vec![profile("profile:base", rect(mm(10.0), mm(5.0)))]),
            extrude("e1", profile_ref("profile:base"), mm(2.0), "body:main", vec![]),
            extrude("e2", profile_ref("profile:base"), mm(4.0), "body:main", vec![]),
        ],
    );
    let err = compile(&p).unwrap_err();
    assert_eq!(err.code(), "output_duplicate");
}

#[test]
fn duplicate_feature_ids_are_rejected() {
    let p = part(
        "plate",
        vec![
            sketch2d("sk", vec![profile("profile:base", rect(mm(1.0), mm(1.0)))]),
            sketch2d("sk", vec![profile("profile:other", rect(mm(1.0), mm(1.0)))]),
        ],
    );
    assert_eq!(compile(&p).unwrap_err().code(), "feature_duplicate");
}

#[test]
fn missing_explicit_dep_is_rejected() {
    let p = part(
        "plate",
        vec![sketch2d("sk", vec![profile("profile:base", rect(mm(1.0), mm(1.0)))])
            .with_deps(vec!["ghost"])],
    );
    assert_eq!(compile(&p).unwrap_err().code(), "dep_missing");
}

#[test]
fn non_finite_axis_vector_is_rejected() {
    let p = part(
        "plate",
        vec![datum_plane(
            "dp",
            trueform_types::AxisSpec::Vector {
                vector: [0.0, 0.0, f64::NAN],
                origin: None,
            },
            mm(0.0),
        )],
    );
    assert_eq!(compile(&p).unwrap_err().code(), "axis_invalid");
}

// ── Document gates ──────────────────────────────────────────────────────────

#[test]
fn unknown_schema_is_rejected() {
    let mut doc = IntentDocument::new("doc", vec![plate()], BuildContext::default());
    doc.schema = "trueform.ir.v999".to_string();
    let err = compile_engine::check_document(&doc).unwrap_err();
    assert_eq!(err.code(), "unsupported_schema");
}

#[test]
fn unsupported_version_is_rejected() {
    let mut doc = IntentDocument::new("doc", vec![plate()], BuildContext::default());
    doc.ir_version = 99;
    let err = compile_engine::check_document(&doc).unwrap_err();
    assert_eq!(err.code(), "unsupported_version");
}

// ── Cancellation ────────────────────────────────────────────────────────────

#[test]
fn cancellation_is_honored_at_step_boundaries() {
    let token = CancelToken::new();
    token.cancel();
    let options = BuildOptions {
        cancel: Some(token),
        ..BuildOptions::default()
    };
    let mut backend = MockBackend::new();
    let err = build_part(
        &mut backend,
        &plate(),
        &Overrides::new(),
        &options,
        UnitSystem::Mm,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, BuildError::Cancelled));
}

// ── Async executor ──────────────────────────────────────────────────────────

#[tokio::test]
async fn async_build_matches_sync_build() {
    let p = plate_with_fillet();
    let sync_result = build(&p);

    let mut backend = kernel_api::BlockingBackend(MockBackend::new());
    let async_result = compile_engine::build_part_async(
        &mut backend,
        &p,
        &Overrides::new(),
        &BuildOptions::default(),
        UnitSystem::Mm,
        None,
    )
    .await
    .unwrap();

    assert_eq!(async_result.order, sync_result.order);
    assert_eq!(async_result.final_result, sync_result.final_result);
}

// ── Cache keys ──────────────────────────────────────────────────────────────

#[test]
fn equal_inputs_yield_byte_equal_cache_keys() {
    let context = BuildContext::default();
    let overrides = Overrides::new();
    let a = cache_key(&compile(&plate()).unwrap(), &context, &overrides);
    let b = cache_key(&compile(&plate()).unwrap(), &context, &overrides);
    assert_eq!(a.canonical(), b.canonical());
    assert_eq!(a.digest(), b.digest());
    assert!(a.overrides_hash.is_none());
}

#[test]
fn feature_change_moves_the_cache_key() {
    let context = BuildContext::default();
    let overrides = Overrides::new();
    let a = cache_key(&compile(&plate()).unwrap(), &context, &overrides);

    let mut thicker = plate();
    if let FeatureOp::Extrude { distance, .. } = &mut thicker.features[1].op {
        *distance = mm(3.0);
    }
    let b = cache_key(&compile(&thicker).unwrap(), &context, &overrides);
    assert_eq!(a.feature_hashes["sk"], b.feature_hashes["sk"]);
    assert_ne!(a.feature_hashes["e"], b.feature_hashes["e"]);
    assert_ne!(a.digest(), b.digest());
}

#[test]
fn overrides_participate_in_the_cache_key() {
    let mut p = plate();
    p.params = vec![param_length("t", mm(2.0))];
    if let FeatureOp::Extrude { distance, .. } = &mut p.features[1].op {
        *distance = param("t");
    }
    let context = BuildContext::default();

    let plain = cache_key(
        &compile_part(&p, &Overrides::new(), &NormalizeOptions::default(), UnitSystem::Mm).unwrap(),
        &context,
        &Overrides::new(),
    );

    let mut overrides = Overrides::new();
    overrides.insert("t".to_string(), trueform_types::ParamOverride::Number(4.0));
    let overridden = cache_key(
        &compile_part(&p, &overrides, &NormalizeOptions::default(), UnitSystem::Mm).unwrap(),
        &context,
        &overrides,
    );

    assert!(overridden.overrides_hash.is_some());
    assert_ne!(plain.digest(), overridden.digest());
}
