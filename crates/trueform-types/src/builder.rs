//! Constructors for IR values. Parts written with these read close to the
//! JSON wire form while staying strongly typed.

use crate::document::IntentPart;
use crate::expr::{BinOp, Expr, ParamDef, ParamType, Unit};
use crate::feature::{AxisSpec, BoolOp, Feature, FeatureOp, PatternKind, PatternRef};
use crate::profile::{Profile, ProfileRef, SketchProfile};
use crate::selector::{AxisDir, Predicate, RankRule, Selector};

// ── Expressions ─────────────────────────────────────────────────────────────

pub fn lit(value: f64) -> Expr {
    Expr::lit(value)
}

pub fn lit_unit(value: f64, unit: Unit) -> Expr {
    Expr::lit_unit(value, unit)
}

pub fn mm(value: f64) -> Expr {
    Expr::lit_unit(value, Unit::Mm)
}

pub fn deg(value: f64) -> Expr {
    Expr::lit_unit(value, Unit::Deg)
}

pub fn param(id: impl Into<String>) -> Expr {
    Expr::Param { id: id.into() }
}

pub fn neg(value: Expr) -> Expr {
    Expr::Neg {
        value: Box::new(value),
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn add(left: Expr, right: Expr) -> Expr {
    binary(BinOp::Add, left, right)
}

pub fn sub(left: Expr, right: Expr) -> Expr {
    binary(BinOp::Sub, left, right)
}

pub fn mul(left: Expr, right: Expr) -> Expr {
    binary(BinOp::Mul, left, right)
}

pub fn div(left: Expr, right: Expr) -> Expr {
    binary(BinOp::Div, left, right)
}

pub fn param_length(id: impl Into<String>, value: Expr) -> ParamDef {
    ParamDef {
        id: id.into(),
        ty: ParamType::Length,
        value,
    }
}

pub fn param_angle(id: impl Into<String>, value: Expr) -> ParamDef {
    ParamDef {
        id: id.into(),
        ty: ParamType::Angle,
        value,
    }
}

pub fn param_count(id: impl Into<String>, value: Expr) -> ParamDef {
    ParamDef {
        id: id.into(),
        ty: ParamType::Count,
        value,
    }
}

// ── Profiles ────────────────────────────────────────────────────────────────

pub fn rect(width: Expr, height: Expr) -> Profile {
    Profile::Rect { width, height }
}

pub fn circle(radius: Expr) -> Profile {
    Profile::Circle { radius }
}

pub fn profile(name: impl Into<String>, profile: Profile) -> SketchProfile {
    SketchProfile {
        name: name.into(),
        profile,
    }
}

pub fn profile_ref(name: impl Into<String>) -> ProfileRef {
    ProfileRef::new(name)
}

// ── Selectors ───────────────────────────────────────────────────────────────

pub fn selector_face(predicates: Vec<Predicate>, rank: Vec<RankRule>) -> Selector {
    Selector::Face { predicates, rank }
}

pub fn selector_edge(predicates: Vec<Predicate>, rank: Vec<RankRule>) -> Selector {
    Selector::Edge { predicates, rank }
}

pub fn selector_solid(predicates: Vec<Predicate>, rank: Vec<RankRule>) -> Selector {
    Selector::Solid { predicates, rank }
}

pub fn selector_named(name: impl Into<String>) -> Selector {
    Selector::Named { name: name.into() }
}

pub fn pred_planar() -> Predicate {
    Predicate::Planar
}

pub fn pred_normal(axis: AxisDir) -> Predicate {
    Predicate::Normal { axis }
}

pub fn pred_created_by(feature: impl Into<String>) -> Predicate {
    Predicate::CreatedBy {
        feature: feature.into(),
    }
}

pub fn pred_role(role: impl Into<String>) -> Predicate {
    Predicate::Role { role: role.into() }
}

pub fn rank_max_area() -> RankRule {
    RankRule::MaxArea
}

pub fn rank_max_z() -> RankRule {
    RankRule::MaxZ
}

pub fn rank_min_z() -> RankRule {
    RankRule::MinZ
}

pub fn rank_closest_to(selector: Selector) -> RankRule {
    RankRule::ClosestTo {
        selector: Box::new(selector),
    }
}

pub fn axis(dir: AxisDir) -> AxisSpec {
    AxisSpec::Dir { axis: dir }
}

pub fn axis_datum(datum: impl Into<String>) -> AxisSpec {
    AxisSpec::Datum {
        datum: datum.into(),
    }
}

// ── Features ────────────────────────────────────────────────────────────────

fn feature(id: impl Into<String>, op: FeatureOp) -> Feature {
    Feature {
        id: id.into(),
        deps: Vec::new(),
        tags: Vec::new(),
        result: None,
        pattern: None,
        op,
    }
}

impl Feature {
    pub fn with_deps(mut self, deps: Vec<&str>) -> Self {
        self.deps = deps.into_iter().map(String::from).collect();
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_pattern(mut self, feature: impl Into<String>, kind: PatternKind) -> Self {
        self.pattern = Some(PatternRef {
            feature: feature.into(),
            kind,
        });
        self
    }
}

pub fn sketch2d(id: impl Into<String>, profiles: Vec<SketchProfile>) -> Feature {
    feature(id, FeatureOp::Sketch2d { on: None, profiles })
}

pub fn extrude(
    id: impl Into<String>,
    profile: ProfileRef,
    distance: Expr,
    result: impl Into<String>,
    deps: Vec<&str>,
) -> Feature {
    feature(
        id,
        FeatureOp::Extrude {
            profile,
            distance,
            direction: None,
            symmetric: false,
        },
    )
    .with_result(result)
    .with_deps(deps)
}

pub fn revolve(
    id: impl Into<String>,
    profile: ProfileRef,
    axis: AxisSpec,
    angle: Expr,
) -> Feature {
    feature(
        id,
        FeatureOp::Revolve {
            profile,
            axis,
            angle,
        },
    )
}

pub fn fillet(id: impl Into<String>, edges: Selector, radius: Expr) -> Feature {
    feature(id, FeatureOp::Fillet { edges, radius })
}

pub fn chamfer(id: impl Into<String>, edges: Selector, distance: Expr) -> Feature {
    feature(id, FeatureOp::Chamfer { edges, distance })
}

pub fn shell(id: impl Into<String>, open_faces: Vec<Selector>, thickness: Expr) -> Feature {
    feature(
        id,
        FeatureOp::Shell {
            open_faces,
            thickness,
        },
    )
}

pub fn hole(id: impl Into<String>, on: Selector, diameter: Expr) -> Feature {
    feature(
        id,
        FeatureOp::Hole {
            on,
            diameter,
            depth: None,
            style: Default::default(),
        },
    )
}

pub fn boolean(id: impl Into<String>, op: BoolOp, left: Selector, right: Selector) -> Feature {
    feature(id, FeatureOp::Boolean { op, left, right })
}

pub fn boolean_union(id: impl Into<String>, left: Selector, right: Selector) -> Feature {
    boolean(id, BoolOp::Union, left, right)
}

pub fn boolean_subtract(id: impl Into<String>, left: Selector, right: Selector) -> Feature {
    boolean(id, BoolOp::Subtract, left, right)
}

pub fn pattern_linear(
    id: impl Into<String>,
    direction: AxisSpec,
    count: Expr,
    spacing: Expr,
) -> Feature {
    feature(
        id,
        FeatureOp::PatternLinear {
            direction,
            count,
            spacing,
        },
    )
}

pub fn datum_plane(id: impl Into<String>, normal: AxisSpec, offset: Expr) -> Feature {
    feature(
        id,
        FeatureOp::DatumPlane {
            on: None,
            normal,
            offset,
        },
    )
}

pub fn part(id: impl Into<String>, features: Vec<Feature>) -> IntentPart {
    IntentPart::new(id, features)
}
