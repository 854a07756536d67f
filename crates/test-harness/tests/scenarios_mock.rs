//! End-to-end scenarios over the mock backend, covering the wider feature
//! surface: booleans, patterns, rework features, split bodies, and staged
//! kinds.

use compile_engine::{BuildError, StagedPolicy};
use kernel_api::{Backend, KernelObject, MeshOptions, MockBackend, ObjectKind, SelectionKind, StepOptions, StepSchema};
use test_harness::assertions::{
    assert_order, assert_output, assert_owners_resolve, assert_selection_count,
    assert_step_nonempty,
};
use test_harness::helpers::{bracket_part, filleted_plate_part, patterned_part, plate_part};
use test_harness::{init_test_logging, Scenario};
use trueform_types::builder::*;
use trueform_types::{AxisDir, Feature, FeatureOp};

fn feat(id: &str, op: FeatureOp) -> Feature {
    Feature {
        id: id.to_string(),
        deps: Vec::new(),
        tags: Vec::new(),
        result: None,
        pattern: None,
        op,
    }
}

// ── Plate and bracket ───────────────────────────────────────────────────────

#[test]
fn plate_scenario_builds_clean() {
    init_test_logging();
    let result = Scenario::new(plate_part()).build().unwrap();
    assert_order(&result, &["sk", "e"]).unwrap();
    assert_output(&result, "body:main").unwrap();
    assert_owners_resolve(&result).unwrap();
    assert_selection_count(&result, SelectionKind::Face, 6).unwrap();
}

#[test]
fn bracket_scenario_cuts_and_drills() {
    init_test_logging();
    let result = Scenario::new(bracket_part()).build().unwrap();
    assert_order(&result, &["sk", "base", "boss", "cut", "vent"]).unwrap();
    assert_output(&result, "body:cut").unwrap();
    assert_step_nonempty(&result, "vent").unwrap();
    // The vent reworked body:cut, so the boolean seam is gone.
    assert!(!result
        .final_result
        .selections
        .iter()
        .any(|s| s.id == "face:cut-seam"));
}

#[test]
fn bracket_accepts_parameter_overrides() {
    let result = Scenario::new(bracket_part())
        .with_override("height", 25.0)
        .build()
        .unwrap();
    assert_output(&result, "body:cut").unwrap();
}

#[test]
fn patterned_part_orders_pattern_before_consumer() {
    let result = Scenario::new(patterned_part()).build().unwrap();
    assert_order(&result, &["dp", "grid3", "sk", "pad"]).unwrap();
    assert_output(&result, "pattern:grid3").unwrap();
    assert_output(&result, "body:pad").unwrap();
}

// ── Editing and incremental rebuilds ────────────────────────────────────────

#[test]
fn editing_a_fillet_rebuilds_only_the_fillet() {
    let mut scenario = Scenario::new(filleted_plate_part());
    let first = scenario.build().unwrap();

    scenario.edit(|p| {
        if let FeatureOp::Fillet { radius, .. } = &mut p.features[2].op {
            *radius = mm(3.0);
        }
    });
    let second = scenario.rebuild(&first, &["f"]).unwrap();
    assert_eq!(second.diagnostics.executed_feature_ids, vec!["f"]);
    assert_eq!(second.diagnostics.reused_feature_ids, vec!["sk", "e"]);
    assert_eq!(second.final_result, first.final_result);
}

// ── Rework features ─────────────────────────────────────────────────────────

#[test]
fn shell_reworks_the_owning_body() {
    let mut p = plate_part();
    p.features.push(
        feat(
            "hollow",
            FeatureOp::Shell {
                open_faces: vec![selector_face(
                    vec![pred_created_by("e"), pred_normal(AxisDir::PosZ)],
                    vec![],
                )],
                thickness: mm(1.5),
            },
        ),
    );
    let result = Scenario::new(p).build().unwrap();
    assert_output(&result, "body:main").unwrap();
    assert_owners_resolve(&result).unwrap();
    assert!(result
        .final_result
        .selections
        .iter()
        .any(|s| s.created_by() == Some("hollow")));
}

#[test]
fn chamfer_follows_named_edge_list() {
    let mut p = plate_part();
    p.features.push(
        chamfer(
            "edgebreak",
            selector_named("edge:e-top-front, edge:e-top-back"),
            mm(0.5),
        )
        .with_deps(vec!["e"]),
    );
    let result = Scenario::new(p).build().unwrap();
    // Two chamfered edges produce two chamfer faces on the reworked body.
    let chamfer_faces = result
        .final_result
        .selections
        .iter()
        .filter(|s| s.created_by() == Some("edgebreak") && s.kind == SelectionKind::Face)
        .count();
    assert_eq!(chamfer_faces, 2);
}

#[test]
fn split_body_publishes_both_halves() {
    let mut p = plate_part();
    p.features.push(
        feat(
            "knife",
            FeatureOp::Plane {
                normal: axis(AxisDir::PosX),
                offset: mm(20.0),
            },
        )
        .with_result("surface:knife"),
    );
    p.features.push(
        feat(
            "halves",
            FeatureOp::SplitBody {
                target: selector_named("body:main"),
                tool: selector_named("surface:knife"),
            },
        )
        .with_result("body:halves"),
    );
    let result = Scenario::new(p).build().unwrap();
    assert_output(&result, "body:halves").unwrap();
    assert_output(&result, "body:halves-split").unwrap();
}

#[test]
fn mirror_without_merge_creates_a_second_body() {
    let mut p = plate_part();
    p.features.push(datum_plane("dp", axis(AxisDir::PosY), mm(0.0)));
    p.features.push(
        feat(
            "mirrored",
            FeatureOp::Mirror {
                source: selector_named("body:main"),
                plane: selector_named("datum:dp"),
                merge: false,
            },
        )
        .with_result("body:mirrored"),
    );
    let result = Scenario::new(p).build().unwrap();
    assert_output(&result, "body:main").unwrap();
    assert_output(&result, "body:mirrored").unwrap();
}

#[test]
fn move_body_keeps_the_output_key() {
    let mut p = plate_part();
    p.features.push(feat(
        "nudge",
        FeatureOp::MoveBody {
            target: selector_named("body:main"),
            translate: Some([mm(5.0), mm(0.0), mm(0.0)]),
            rotate: None,
        },
    ));
    let result = Scenario::new(p).build().unwrap();
    assert_output(&result, "body:main").unwrap();
    assert_eq!(
        result.final_result.outputs["body:main"].id,
        "solid-nudge"
    );
}

#[test]
fn revolve_consumes_a_profile() {
    let p = part(
        "spindle",
        vec![
            sketch2d("sk", vec![profile("profile:section", circle(mm(6.0)))]),
            revolve(
                "spin",
                profile_ref("profile:section"),
                axis(AxisDir::PosZ),
                deg(360.0),
            )
            .with_result("body:spindle"),
        ],
    );
    let result = Scenario::new(p).build().unwrap();
    assert_output(&result, "body:spindle").unwrap();
}

// ── Staged kinds ────────────────────────────────────────────────────────────

fn threaded_plate() -> trueform_types::IntentPart {
    let mut p = plate_part();
    p.features.push(feat(
        "tap",
        FeatureOp::Thread {
            face: selector_face(
                vec![pred_created_by("e"), pred_normal(AxisDir::PosX)],
                vec![],
            ),
            pitch: mm(1.25),
            depth: None,
            handedness: Default::default(),
            cosmetic: true,
        },
    ));
    p
}

#[test]
fn staged_thread_is_allowed_when_policy_allows() {
    let result = Scenario::new(threaded_plate())
        .with_staged_policy(StagedPolicy::Allow)
        .build()
        .unwrap();
    assert_output(&result, "body:main").unwrap();
}

#[test]
fn staged_thread_is_rejected_when_policy_errors() {
    let err = Scenario::new(threaded_plate())
        .with_staged_policy(StagedPolicy::Error)
        .build()
        .unwrap_err();
    match err {
        BuildError::Compile(e) => assert_eq!(e.code(), "staged_feature"),
        other => panic!("expected compile error, got {other:?}"),
    }
}

// ── Export contract smoke tests ─────────────────────────────────────────────

#[test]
fn mock_backend_meshes_and_exports() {
    let mut backend = MockBackend::new();
    let solid = KernelObject::new("solid-e", ObjectKind::Solid);

    let mesh = backend.mesh(&solid, &MeshOptions::default()).unwrap();
    assert_eq!(mesh.positions.len(), 9);
    assert_eq!(mesh.indices.as_deref(), Some(&[0, 1, 2][..]));

    let export_profile = kernel_api::MeshProfile::Export.options();
    let detailed = backend.mesh(&solid, &export_profile).unwrap();
    assert!(detailed.edge_positions.is_some());

    let step = backend
        .export_step(
            &solid,
            &StepOptions {
                schema: StepSchema::AP203,
                ..StepOptions::default()
            },
        )
        .unwrap();
    let text = String::from_utf8(step).unwrap();
    assert!(text.contains("AP203"));
    assert!(text.contains("solid-e"));
}
