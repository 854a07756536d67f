use serde::{Deserialize, Serialize};

use crate::expr::{Expr, ParamType};
use crate::profile::{PathSegment, Profile, ProfileRef, SketchProfile};
use crate::selector::{AxisDir, RankRule, Selector};

/// An axis specification: a token, a free vector, or a datum-axis feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AxisSpec {
    Dir {
        axis: AxisDir,
    },
    Vector {
        vector: [f64; 3],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<[f64; 3]>,
    },
    Datum {
        datum: String,
    },
}

/// Boolean combination mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoolOp {
    Union,
    Subtract,
    Intersect,
}

/// Hole cross-section style.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HoleStyle {
    #[default]
    Simple,
    Counterbore { bore_diameter: Expr, bore_depth: Expr },
    Countersink { sink_diameter: Expr, sink_angle: Expr },
}

/// Thread handedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Handedness {
    #[default]
    Right,
    Left,
}

/// Surface-feature construction mode. Staged maturity is tracked per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceMode {
    Extrude,
    Revolve,
    Loft,
    Patch,
}

impl SurfaceMode {
    pub fn token(self) -> &'static str {
        match self {
            SurfaceMode::Extrude => "extrude",
            SurfaceMode::Revolve => "revolve",
            SurfaceMode::Loft => "loft",
            SurfaceMode::Patch => "patch",
        }
    }
}

/// Rotation applied by `moveBody`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub axis: AxisSpec,
    pub angle: Expr,
}

/// Which pattern kind a pattern reference expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternKind {
    #[serde(rename = "pattern.linear")]
    Linear,
    #[serde(rename = "pattern.circular")]
    Circular,
}

/// Reference from a feature to the pattern feature that repeats it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRef {
    pub feature: String,
    pub kind: PatternKind,
}

fn default_true() -> bool {
    true
}

/// A feature: one node of a part's build program. Common fields live here;
/// the kind-specific payload is the flattened [`FeatureOp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<PatternRef>,
    #[serde(flatten)]
    pub op: FeatureOp,
}

/// The kind-specific payload of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FeatureOp {
    #[serde(rename = "datum.plane")]
    DatumPlane {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on: Option<Selector>,
        normal: AxisSpec,
        offset: Expr,
    },
    #[serde(rename = "datum.axis")]
    DatumAxis {
        axis: AxisSpec,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<[f64; 3]>,
    },
    #[serde(rename = "datum.frame")]
    DatumFrame {
        origin: [f64; 3],
        x_axis: [f64; 3],
        z_axis: [f64; 3],
    },
    Sketch2d {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on: Option<Selector>,
        profiles: Vec<SketchProfile>,
    },
    Extrude {
        profile: ProfileRef,
        distance: Expr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        direction: Option<AxisSpec>,
        #[serde(default)]
        symmetric: bool,
    },
    Revolve {
        profile: ProfileRef,
        axis: AxisSpec,
        angle: Expr,
    },
    Loft {
        profiles: Vec<ProfileRef>,
        #[serde(default)]
        ruled: bool,
    },
    Sweep {
        profile: ProfileRef,
        path: ProfileRef,
    },
    Pipe {
        path: ProfileRef,
        diameter: Expr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        wall: Option<Expr>,
    },
    PipeSweep {
        path: ProfileRef,
        diameter: Expr,
    },
    HexTubeSweep {
        path: ProfileRef,
        across_flats: Expr,
        wall: Expr,
    },
    Hole {
        on: Selector,
        diameter: Expr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        depth: Option<Expr>,
        #[serde(default)]
        style: HoleStyle,
    },
    Fillet {
        edges: Selector,
        radius: Expr,
    },
    #[serde(rename = "fillet.variable")]
    FilletVariable {
        edges: Selector,
        start_radius: Expr,
        end_radius: Expr,
    },
    Chamfer {
        edges: Selector,
        distance: Expr,
    },
    #[serde(rename = "chamfer.variable")]
    ChamferVariable {
        edges: Selector,
        start_distance: Expr,
        end_distance: Expr,
    },
    Thicken {
        face: Selector,
        thickness: Expr,
    },
    Shell {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        open_faces: Vec<Selector>,
        thickness: Expr,
    },
    Surface {
        mode: SurfaceMode,
        profile: ProfileRef,
    },
    Plane {
        normal: AxisSpec,
        offset: Expr,
    },
    Mirror {
        source: Selector,
        plane: Selector,
        #[serde(default)]
        merge: bool,
    },
    MoveBody {
        target: Selector,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        translate: Option<[Expr; 3]>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rotate: Option<Rotation>,
    },
    MoveFace {
        face: Selector,
        offset: Expr,
    },
    DeleteFace {
        face: Selector,
        #[serde(default = "default_true")]
        heal: bool,
    },
    ReplaceFace {
        face: Selector,
        replacement: Selector,
    },
    Draft {
        faces: Vec<Selector>,
        neutral: Selector,
        angle: Expr,
        pull: AxisSpec,
    },
    Thread {
        face: Selector,
        pitch: Expr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        depth: Option<Expr>,
        #[serde(default)]
        handedness: Handedness,
        #[serde(default)]
        cosmetic: bool,
    },
    SplitBody {
        target: Selector,
        tool: Selector,
    },
    SplitFace {
        face: Selector,
        tool: Selector,
    },
    #[serde(rename = "pattern.linear")]
    PatternLinear {
        direction: AxisSpec,
        count: Expr,
        spacing: Expr,
    },
    #[serde(rename = "pattern.circular")]
    PatternCircular {
        axis: AxisSpec,
        count: Expr,
        angle: Expr,
    },
    Boolean {
        op: BoolOp,
        left: Selector,
        right: Selector,
    },
}

impl FeatureOp {
    /// The wire token for this kind, matching the serde tag.
    pub fn kind_key(&self) -> &'static str {
        match self {
            FeatureOp::DatumPlane { .. } => "datum.plane",
            FeatureOp::DatumAxis { .. } => "datum.axis",
            FeatureOp::DatumFrame { .. } => "datum.frame",
            FeatureOp::Sketch2d { .. } => "sketch2d",
            FeatureOp::Extrude { .. } => "extrude",
            FeatureOp::Revolve { .. } => "revolve",
            FeatureOp::Loft { .. } => "loft",
            FeatureOp::Sweep { .. } => "sweep",
            FeatureOp::Pipe { .. } => "pipe",
            FeatureOp::PipeSweep { .. } => "pipeSweep",
            FeatureOp::HexTubeSweep { .. } => "hexTubeSweep",
            FeatureOp::Hole { .. } => "hole",
            FeatureOp::Fillet { .. } => "fillet",
            FeatureOp::FilletVariable { .. } => "fillet.variable",
            FeatureOp::Chamfer { .. } => "chamfer",
            FeatureOp::ChamferVariable { .. } => "chamfer.variable",
            FeatureOp::Thicken { .. } => "thicken",
            FeatureOp::Shell { .. } => "shell",
            FeatureOp::Surface { .. } => "surface",
            FeatureOp::Plane { .. } => "plane",
            FeatureOp::Mirror { .. } => "mirror",
            FeatureOp::MoveBody { .. } => "moveBody",
            FeatureOp::MoveFace { .. } => "moveFace",
            FeatureOp::DeleteFace { .. } => "deleteFace",
            FeatureOp::ReplaceFace { .. } => "replaceFace",
            FeatureOp::Draft { .. } => "draft",
            FeatureOp::Thread { .. } => "thread",
            FeatureOp::SplitBody { .. } => "splitBody",
            FeatureOp::SplitFace { .. } => "splitFace",
            FeatureOp::PatternLinear { .. } => "pattern.linear",
            FeatureOp::PatternCircular { .. } => "pattern.circular",
            FeatureOp::Boolean { .. } => "boolean",
        }
    }
}

impl Feature {
    pub fn kind_key(&self) -> &'static str {
        self.op.kind_key()
    }

    /// Key used for staged-feature and capability lookups. Surface features
    /// stage per construction mode.
    pub fn stage_key(&self) -> String {
        match &self.op {
            FeatureOp::Surface { mode, .. } => format!("surface.{}", mode.token()),
            _ => self.kind_key().to_string(),
        }
    }

    /// Every selector-typed field on this feature, in declaration order.
    pub fn selectors(&self) -> Vec<&Selector> {
        let mut out = Vec::new();
        match &self.op {
            FeatureOp::DatumPlane { on, .. } | FeatureOp::Sketch2d { on, .. } => {
                out.extend(on.as_ref());
            }
            FeatureOp::Hole { on, .. } => out.push(on),
            FeatureOp::Fillet { edges, .. }
            | FeatureOp::FilletVariable { edges, .. }
            | FeatureOp::Chamfer { edges, .. }
            | FeatureOp::ChamferVariable { edges, .. } => out.push(edges),
            FeatureOp::Thicken { face, .. }
            | FeatureOp::MoveFace { face, .. }
            | FeatureOp::DeleteFace { face, .. }
            | FeatureOp::Thread { face, .. } => out.push(face),
            FeatureOp::Shell { open_faces, .. } => out.extend(open_faces.iter()),
            FeatureOp::Mirror { source, plane, .. } => {
                out.push(source);
                out.push(plane);
            }
            FeatureOp::MoveBody { target, .. } => out.push(target),
            FeatureOp::ReplaceFace { face, replacement } => {
                out.push(face);
                out.push(replacement);
            }
            FeatureOp::Draft { faces, neutral, .. } => {
                out.extend(faces.iter());
                out.push(neutral);
            }
            FeatureOp::SplitBody { target, tool } => {
                out.push(target);
                out.push(tool);
            }
            FeatureOp::SplitFace { face, tool } => {
                out.push(face);
                out.push(tool);
            }
            FeatureOp::Boolean { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            _ => {}
        }
        out
    }

    /// Mutable view of every selector-typed field, for canonicalization.
    pub fn selectors_mut(&mut self) -> Vec<&mut Selector> {
        let mut out = Vec::new();
        match &mut self.op {
            FeatureOp::DatumPlane { on, .. } | FeatureOp::Sketch2d { on, .. } => {
                out.extend(on.as_mut());
            }
            FeatureOp::Hole { on, .. } => out.push(on),
            FeatureOp::Fillet { edges, .. }
            | FeatureOp::FilletVariable { edges, .. }
            | FeatureOp::Chamfer { edges, .. }
            | FeatureOp::ChamferVariable { edges, .. } => out.push(edges),
            FeatureOp::Thicken { face, .. }
            | FeatureOp::MoveFace { face, .. }
            | FeatureOp::DeleteFace { face, .. }
            | FeatureOp::Thread { face, .. } => out.push(face),
            FeatureOp::Shell { open_faces, .. } => out.extend(open_faces.iter_mut()),
            FeatureOp::Mirror { source, plane, .. } => {
                out.push(source);
                out.push(plane);
            }
            FeatureOp::MoveBody { target, .. } => out.push(target),
            FeatureOp::ReplaceFace { face, replacement } => {
                out.push(face);
                out.push(replacement);
            }
            FeatureOp::Draft { faces, neutral, .. } => {
                out.extend(faces.iter_mut());
                out.push(neutral);
            }
            FeatureOp::SplitBody { target, tool } => {
                out.push(target);
                out.push(tool);
            }
            FeatureOp::SplitFace { face, tool } => {
                out.push(face);
                out.push(tool);
            }
            FeatureOp::Boolean { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            _ => {}
        }
        out
    }

    /// Every profile reference this feature consumes.
    pub fn profile_refs(&self) -> Vec<&ProfileRef> {
        match &self.op {
            FeatureOp::Extrude { profile, .. }
            | FeatureOp::Revolve { profile, .. }
            | FeatureOp::Surface { profile, .. } => vec![profile],
            FeatureOp::Sweep { profile, path } => vec![profile, path],
            FeatureOp::Pipe { path, .. }
            | FeatureOp::PipeSweep { path, .. }
            | FeatureOp::HexTubeSweep { path, .. } => vec![path],
            FeatureOp::Loft { profiles, .. } => profiles.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Datum-feature ids referenced through axis specifications.
    pub fn datum_refs(&self) -> Vec<&str> {
        fn datum_of(axis: &AxisSpec) -> Option<&str> {
            match axis {
                AxisSpec::Datum { datum } => Some(datum.as_str()),
                _ => None,
            }
        }
        let mut out = Vec::new();
        match &self.op {
            FeatureOp::DatumPlane { normal, .. } | FeatureOp::Plane { normal, .. } => {
                out.extend(datum_of(normal));
            }
            FeatureOp::DatumAxis { axis, .. }
            | FeatureOp::Revolve { axis, .. }
            | FeatureOp::PatternCircular { axis, .. } => out.extend(datum_of(axis)),
            FeatureOp::Extrude { direction, .. } => {
                out.extend(direction.as_ref().and_then(datum_of));
            }
            FeatureOp::PatternLinear { direction, .. } => out.extend(datum_of(direction)),
            FeatureOp::Draft { pull, .. } => out.extend(datum_of(pull)),
            FeatureOp::MoveBody { rotate, .. } => {
                out.extend(rotate.as_ref().and_then(|r| datum_of(&r.axis)));
            }
            _ => {}
        }
        out
    }

    /// Free vectors carried by this feature, for finiteness validation.
    pub fn free_vectors(&self) -> Vec<[f64; 3]> {
        fn push_axis(axis: &AxisSpec, out: &mut Vec<[f64; 3]>) {
            if let AxisSpec::Vector { vector, origin } = axis {
                out.push(*vector);
                if let Some(o) = origin {
                    out.push(*o);
                }
            }
        }
        let mut out = Vec::new();
        match &self.op {
            FeatureOp::DatumPlane { normal, .. } | FeatureOp::Plane { normal, .. } => {
                push_axis(normal, &mut out);
            }
            FeatureOp::DatumAxis { axis, origin } => {
                push_axis(axis, &mut out);
                if let Some(o) = origin {
                    out.push(*o);
                }
            }
            FeatureOp::DatumFrame {
                origin,
                x_axis,
                z_axis,
            } => {
                out.push(*origin);
                out.push(*x_axis);
                out.push(*z_axis);
            }
            FeatureOp::Revolve { axis, .. } | FeatureOp::PatternCircular { axis, .. } => {
                push_axis(axis, &mut out);
            }
            FeatureOp::Extrude { direction, .. } => {
                if let Some(d) = direction {
                    push_axis(d, &mut out);
                }
            }
            FeatureOp::PatternLinear { direction, .. } => push_axis(direction, &mut out),
            FeatureOp::Draft { pull, .. } => push_axis(pull, &mut out),
            FeatureOp::MoveBody { rotate, .. } => {
                if let Some(r) = rotate {
                    push_axis(&r.axis, &mut out);
                }
            }
            _ => {}
        }
        out
    }

    /// Output keys this feature is known to publish at compile time: its
    /// `result` key, sketch profile names, and the implicit datum key.
    pub fn declared_outputs(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(r) = &self.result {
            out.push(r.clone());
        }
        match &self.op {
            FeatureOp::Sketch2d { profiles, .. } => {
                out.extend(profiles.iter().map(|p| p.name.clone()));
            }
            FeatureOp::DatumPlane { .. }
            | FeatureOp::DatumAxis { .. }
            | FeatureOp::DatumFrame { .. } => {
                if self.result.is_none() {
                    out.push(format!("datum:{}", self.id));
                }
            }
            _ => {}
        }
        out
    }

    /// Mutable view of every scalar expression on this feature, paired with
    /// the type that position expects. Used for parameter inlining; profile
    /// geometry expressions are included.
    pub fn exprs_mut(&mut self) -> Vec<(ParamType, &mut Expr)> {
        use ParamType::{Angle, Count, Length};

        fn profile_exprs<'a>(profile: &'a mut Profile, out: &mut Vec<(ParamType, &'a mut Expr)>) {
            match profile {
                Profile::Rect { width, height } => {
                    out.push((ParamType::Length, width));
                    out.push((ParamType::Length, height));
                }
                Profile::Circle { radius } => out.push((ParamType::Length, radius)),
                Profile::Polygon { points } => {
                    for p in points {
                        let [x, y] = p;
                        out.push((ParamType::Length, x));
                        out.push((ParamType::Length, y));
                    }
                }
                Profile::Path { segments } => {
                    for seg in segments {
                        match seg {
                            PathSegment::LineTo { to } => {
                                let [x, y] = to;
                                out.push((ParamType::Length, x));
                                out.push((ParamType::Length, y));
                            }
                            PathSegment::ArcTo { to, radius, .. } => {
                                let [x, y] = to;
                                out.push((ParamType::Length, x));
                                out.push((ParamType::Length, y));
                                out.push((ParamType::Length, radius));
                            }
                        }
                    }
                }
            }
        }

        let mut out: Vec<(ParamType, &mut Expr)> = Vec::new();
        match &mut self.op {
            FeatureOp::DatumPlane { offset, .. } | FeatureOp::Plane { offset, .. } => {
                out.push((Length, offset));
            }
            FeatureOp::DatumAxis { .. } | FeatureOp::DatumFrame { .. } => {}
            FeatureOp::Sketch2d { profiles, .. } => {
                for p in profiles {
                    profile_exprs(&mut p.profile, &mut out);
                }
            }
            FeatureOp::Extrude { distance, .. } => out.push((Length, distance)),
            FeatureOp::Revolve { angle, .. } => out.push((Angle, angle)),
            FeatureOp::Loft { .. } | FeatureOp::Surface { .. } => {}
            FeatureOp::Sweep { .. } => {}
            FeatureOp::Pipe { diameter, wall, .. } => {
                out.push((Length, diameter));
                if let Some(w) = wall {
                    out.push((Length, w));
                }
            }
            FeatureOp::PipeSweep { diameter, .. } => out.push((Length, diameter)),
            FeatureOp::HexTubeSweep {
                across_flats, wall, ..
            } => {
                out.push((Length, across_flats));
                out.push((Length, wall));
            }
            FeatureOp::Hole {
                diameter,
                depth,
                style,
                ..
            } => {
                out.push((Length, diameter));
                if let Some(d) = depth {
                    out.push((Length, d));
                }
                match style {
                    HoleStyle::Simple => {}
                    HoleStyle::Counterbore {
                        bore_diameter,
                        bore_depth,
                    } => {
                        out.push((Length, bore_diameter));
                        out.push((Length, bore_depth));
                    }
                    HoleStyle::Countersink {
                        sink_diameter,
                        sink_angle,
                    } => {
                        out.push((Length, sink_diameter));
                        out.push((Angle, sink_angle));
                    }
                }
            }
            FeatureOp::Fillet { radius, .. } => out.push((Length, radius)),
            FeatureOp::FilletVariable {
                start_radius,
                end_radius,
                ..
            } => {
                out.push((Length, start_radius));
                out.push((Length, end_radius));
            }
            FeatureOp::Chamfer { distance, .. } => out.push((Length, distance)),
            FeatureOp::ChamferVariable {
                start_distance,
                end_distance,
                ..
            } => {
                out.push((Length, start_distance));
                out.push((Length, end_distance));
            }
            FeatureOp::Thicken { thickness, .. } | FeatureOp::Shell { thickness, .. } => {
                out.push((Length, thickness));
            }
            FeatureOp::Mirror { .. } => {}
            FeatureOp::MoveBody {
                translate, rotate, ..
            } => {
                if let Some(t) = translate {
                    for e in t.iter_mut() {
                        out.push((Length, e));
                    }
                }
                if let Some(r) = rotate {
                    out.push((Angle, &mut r.angle));
                }
            }
            FeatureOp::MoveFace { offset, .. } => out.push((Length, offset)),
            FeatureOp::DeleteFace { .. } | FeatureOp::ReplaceFace { .. } => {}
            FeatureOp::Draft { angle, .. } => out.push((Angle, angle)),
            FeatureOp::Thread { pitch, depth, .. } => {
                out.push((Length, pitch));
                if let Some(d) = depth {
                    out.push((Length, d));
                }
            }
            FeatureOp::SplitBody { .. } | FeatureOp::SplitFace { .. } => {}
            FeatureOp::PatternLinear { count, spacing, .. } => {
                out.push((Count, count));
                out.push((Length, spacing));
            }
            FeatureOp::PatternCircular { count, angle, .. } => {
                out.push((Count, count));
                out.push((Angle, angle));
            }
            FeatureOp::Boolean { .. } => {}
        }
        out
    }
}
