//! Canned parts and error types shared by the harness.

use trueform_types::builder::*;
use trueform_types::{AxisDir, IntentPart};

/// Unified error type for harness assertions.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("build failed: {0}")]
    Build(#[from] compile_engine::BuildError),

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("missing output: {key}")]
    MissingOutput { key: String },

    #[error("missing step for feature: {feature}")]
    MissingStep { feature: String },
}

/// A rectangular plate: one sketch, one extrude publishing `body:main`.
pub fn plate_part() -> IntentPart {
    part(
        "plate",
        vec![
            sketch2d("sk", vec![profile("profile:base", rect(mm(40.0), mm(20.0)))]),
            extrude("e", profile_ref("profile:base"), mm(5.0), "body:main", vec!["sk"]),
        ],
    )
}

/// A plate with a filleted top edge, for invalidation scenarios.
pub fn filleted_plate_part() -> IntentPart {
    let mut p = plate_part();
    p.features
        .push(fillet("f", selector_named("edge:e-top-front"), mm(2.0)).with_deps(vec!["e"]));
    p
}

/// A parametric bracket exercising booleans, holes, and selector queries:
/// base body minus a circular boss hole, shelled, with a top-face hole
/// located by predicate + rank.
pub fn bracket_part() -> IntentPart {
    let mut p = part(
        "bracket",
        vec![
            sketch2d(
                "sk",
                vec![
                    profile("profile:base", rect(param("width"), param("depth"))),
                    profile("profile:boss", circle(mm(4.0))),
                ],
            ),
            extrude("base", profile_ref("profile:base"), param("height"), "body:base", vec![]),
            extrude("boss", profile_ref("profile:boss"), param("height"), "body:boss", vec![]),
            boolean_subtract(
                "cut",
                selector_named("body:base"),
                selector_named("body:boss"),
            )
            .with_result("body:cut"),
            hole(
                "vent",
                selector_face(
                    vec![pred_created_by("cut"), pred_planar()],
                    vec![rank_max_area()],
                ),
                mm(3.0),
            )
            .with_deps(vec!["cut"]),
        ],
    );
    p.params = vec![
        param_length("width", mm(60.0)),
        param_length("depth", mm(30.0)),
        param_length("height", add(mm(8.0), mm(2.0))),
    ];
    p
}

/// A part using a linear pattern reference and a datum plane.
pub fn patterned_part() -> IntentPart {
    part(
        "grid",
        vec![
            datum_plane("dp", axis(AxisDir::PosZ), mm(0.0)),
            sketch2d("sk", vec![profile("profile:pad", rect(mm(10.0), mm(10.0)))])
                .with_deps(vec!["dp"]),
            pattern_linear("grid3", axis(AxisDir::PosX), lit(3.0), mm(15.0)),
            extrude("pad", profile_ref("profile:pad"), mm(4.0), "body:pad", vec![])
                .with_pattern("grid3", trueform_types::PatternKind::Linear),
        ],
    )
}
