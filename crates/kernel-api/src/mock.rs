//! MockBackend — deterministic test double implementing [`Backend`].
//!
//! Produces synthetic topology with predictable ids and metadata. Object
//! and selection ids are pure functions of the feature id, so re-executing
//! a feature yields byte-identical results (the backend is referentially
//! transparent, which the incremental-rebuild tests rely on).

use std::collections::BTreeMap;

use trueform_types::{AxisDir, Expr, Feature, FeatureOp, Profile};

use crate::options::{MeshOptions, StepOptions, StlOptions};
use crate::traits::{Backend, ExecuteRequest};
use crate::types::{
    meta_keys, BackendError, Capabilities, KernelObject, KernelResult, KernelSelection, MeshData,
    MetaValue, ObjectKind, SelectionKind,
};

/// Deterministic test double for the geometry kernel.
#[derive(Debug, Default)]
pub struct MockBackend {
    capabilities: Capabilities,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities {
                name: Some("mock".to_string()),
                feature_kinds: None,
            },
        }
    }

    /// Restrict the advertised feature kinds, for capability-gate tests.
    pub fn with_feature_kinds(kinds: Vec<&str>) -> Self {
        Self {
            capabilities: Capabilities {
                name: Some("mock".to_string()),
                feature_kinds: Some(kinds.into_iter().map(String::from).collect()),
            },
        }
    }
}

/// Value of an inlined expression. Normalization reduces every expression
/// to a unitless literal before the backend sees it.
fn scalar(expr: &Expr) -> f64 {
    match expr {
        Expr::Literal { value, .. } => *value,
        _ => 0.0,
    }
}

fn meta_text(key: &str, value: &str) -> (String, MetaValue) {
    (key.to_string(), MetaValue::Text(value.to_string()))
}

fn meta_num(key: &str, value: f64) -> (String, MetaValue) {
    (key.to_string(), MetaValue::Number(value))
}

/// Common selection metadata: provenance and ownership.
fn base_meta(feature_id: &str, owner_key: &str) -> BTreeMap<String, MetaValue> {
    BTreeMap::from([
        meta_text(meta_keys::CREATED_BY, feature_id),
        meta_text(meta_keys::OWNER_KEY, owner_key),
    ])
}

fn face_selection(
    id: String,
    feature_id: &str,
    owner_key: &str,
    role: &str,
    normal: AxisDir,
    area: f64,
    center: [f64; 3],
) -> KernelSelection {
    let mut meta = base_meta(feature_id, owner_key);
    meta.insert(meta_keys::ROLE.to_string(), MetaValue::Text(role.to_string()));
    meta.insert(meta_keys::PLANAR.to_string(), MetaValue::Bool(true));
    meta.insert(
        meta_keys::NORMAL.to_string(),
        MetaValue::Text(normal.token().to_string()),
    );
    meta.insert(
        meta_keys::NORMAL_VEC.to_string(),
        MetaValue::Vec3(normal.vector()),
    );
    meta.insert(meta_keys::AREA.to_string(), MetaValue::Number(area));
    meta.insert(meta_keys::CENTER.to_string(), MetaValue::Vec3(center));
    meta.insert(meta_keys::CENTER_Z.to_string(), MetaValue::Number(center[2]));
    KernelSelection {
        id,
        kind: SelectionKind::Face,
        meta,
    }
}

fn edge_selection(
    id: String,
    feature_id: &str,
    owner_key: &str,
    center: [f64; 3],
) -> KernelSelection {
    let mut meta = base_meta(feature_id, owner_key);
    meta.insert(
        meta_keys::ROLE.to_string(),
        MetaValue::Text("edge".to_string()),
    );
    meta.insert(meta_keys::CENTER.to_string(), MetaValue::Vec3(center));
    meta.insert(meta_keys::CENTER_Z.to_string(), MetaValue::Number(center[2]));
    KernelSelection {
        id,
        kind: SelectionKind::Edge,
        meta,
    }
}

fn solid_selection(feature_id: &str, owner_key: &str) -> KernelSelection {
    let mut meta = base_meta(feature_id, owner_key);
    meta.insert(
        meta_keys::ROLE.to_string(),
        MetaValue::Text("body".to_string()),
    );
    KernelSelection {
        id: format!("solid:{feature_id}"),
        kind: SelectionKind::Solid,
        meta,
    }
}

/// Footprint of a profile object published by a sketch: (width, height).
fn profile_extent(obj: &KernelObject) -> (f64, f64) {
    let get = |k: &str| obj.meta.get(k).and_then(MetaValue::as_number);
    if let Some(r) = get("radius") {
        (2.0 * r, 2.0 * r)
    } else {
        (get("width").unwrap_or(1.0), get("height").unwrap_or(1.0))
    }
}

impl MockBackend {
    fn profile_object(name: &str, profile: &Profile) -> KernelObject {
        let mut obj = KernelObject::new(name, ObjectKind::Profile);
        match profile {
            Profile::Rect { width, height } => {
                let (w, h) = (scalar(width), scalar(height));
                obj.meta.extend([
                    meta_num("width", w),
                    meta_num("height", h),
                    meta_num("area", w * h),
                ]);
            }
            Profile::Circle { radius } => {
                let r = scalar(radius);
                obj.meta.extend([
                    meta_num("radius", r),
                    meta_num("area", std::f64::consts::PI * r * r),
                ]);
            }
            Profile::Polygon { points } => {
                obj.meta
                    .extend([meta_num("vertices", points.len() as f64)]);
            }
            Profile::Path { segments } => {
                obj.meta
                    .extend([meta_num("segments", segments.len() as f64)]);
            }
        }
        obj
    }

    /// Box-like solid with two end caps, four walls, twelve edges, and a
    /// solid selection. The workhorse behind extrude-family features.
    fn box_result(
        feature_id: &str,
        key: &str,
        w: f64,
        h: f64,
        d: f64,
    ) -> (KernelObject, Vec<KernelSelection>) {
        let mut obj = KernelObject::new(format!("solid-{feature_id}"), ObjectKind::Solid);
        obj.meta.extend([
            meta_num("sizeX", w),
            meta_num("sizeY", h),
            meta_num("sizeZ", d),
        ]);

        let mut selections = vec![
            face_selection(
                format!("face:{feature_id}-top"),
                feature_id,
                key,
                "end_cap_positive",
                AxisDir::PosZ,
                w * h,
                [w / 2.0, h / 2.0, d],
            ),
            face_selection(
                format!("face:{feature_id}-bottom"),
                feature_id,
                key,
                "end_cap_negative",
                AxisDir::NegZ,
                w * h,
                [w / 2.0, h / 2.0, 0.0],
            ),
        ];
        let walls: [(AxisDir, f64, [f64; 3], &str); 4] = [
            (AxisDir::NegY, w * d, [w / 2.0, 0.0, d / 2.0], "front"),
            (AxisDir::PosX, h * d, [w, h / 2.0, d / 2.0], "right"),
            (AxisDir::PosY, w * d, [w / 2.0, h, d / 2.0], "back"),
            (AxisDir::NegX, h * d, [0.0, h / 2.0, d / 2.0], "left"),
        ];
        for (normal, area, center, tag) in walls {
            selections.push(face_selection(
                format!("face:{feature_id}-{tag}"),
                feature_id,
                key,
                "wall",
                normal,
                area,
                center,
            ));
        }
        // 4 top rim edges, 4 bottom rim edges, 4 verticals.
        let rim = [
            ([w / 2.0, 0.0], "front"),
            ([w, h / 2.0], "right"),
            ([w / 2.0, h], "back"),
            ([0.0, h / 2.0], "left"),
        ];
        for ([cx, cy], tag) in rim {
            selections.push(edge_selection(
                format!("edge:{feature_id}-top-{tag}"),
                feature_id,
                key,
                [cx, cy, d],
            ));
            selections.push(edge_selection(
                format!("edge:{feature_id}-bottom-{tag}"),
                feature_id,
                key,
                [cx, cy, 0.0],
            ));
        }
        let corners = [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]];
        for (i, [cx, cy]) in corners.into_iter().enumerate() {
            selections.push(edge_selection(
                format!("edge:{feature_id}-vert-{i}"),
                feature_id,
                key,
                [cx, cy, d / 2.0],
            ));
        }
        selections.push(solid_selection(feature_id, key));
        (obj, selections)
    }

    /// Output key for a body-producing feature.
    fn body_key(feature: &Feature) -> String {
        feature
            .result
            .clone()
            .unwrap_or_else(|| format!("body:{}", feature.id))
    }

    /// Replace the output that owns the given selection with a rewritten
    /// object, tagging the new selections with the same owner key.
    fn rework_owner(
        feature: &Feature,
        owner_key: &str,
        upstream: &KernelResult,
        face_roles: &[&str],
    ) -> Result<KernelResult, BackendError> {
        let prior = upstream
            .output(owner_key)
            .ok_or_else(|| BackendError::MissingInput {
                message: format!("owner output '{owner_key}' not present upstream"),
            })?;
        let mut obj = prior.clone();
        obj.id = format!("solid-{}", feature.id);
        obj.meta
            .insert("reworkedBy".to_string(), MetaValue::Text(feature.id.clone()));

        let mut result = KernelResult::default();
        let mut selections = Vec::new();
        for (i, role) in face_roles.iter().enumerate() {
            selections.push(face_selection(
                format!("face:{}-{role}-{i}", feature.id),
                &feature.id,
                owner_key,
                role,
                AxisDir::PosZ,
                1.0,
                [0.0, 0.0, 0.0],
            ));
        }
        selections.push(solid_selection(&feature.id, owner_key));
        result.outputs.insert(owner_key.to_string(), obj);
        result.selections = selections;
        Ok(result)
    }
}

impl Backend for MockBackend {
    fn execute(&mut self, req: ExecuteRequest<'_>) -> Result<KernelResult, BackendError> {
        let feature = req.feature;
        let fid = feature.id.as_str();
        tracing::debug!(feature = fid, kind = feature.kind_key(), "mock execute");
        let mut result = KernelResult::default();

        match &feature.op {
            FeatureOp::Sketch2d { profiles, .. } => {
                for p in profiles {
                    result
                        .outputs
                        .insert(p.name.clone(), Self::profile_object(&p.name, &p.profile));
                }
            }

            FeatureOp::DatumPlane { normal: _, offset, .. } => {
                let key = feature
                    .result
                    .clone()
                    .unwrap_or_else(|| format!("datum:{fid}"));
                let obj = KernelObject::new(format!("datum-{fid}"), ObjectKind::Datum)
                    .with_meta("offset", MetaValue::Number(scalar(offset)));
                result.outputs.insert(key, obj);
            }
            FeatureOp::DatumAxis { .. } | FeatureOp::DatumFrame { .. } => {
                let key = feature
                    .result
                    .clone()
                    .unwrap_or_else(|| format!("datum:{fid}"));
                result
                    .outputs
                    .insert(key, KernelObject::new(format!("datum-{fid}"), ObjectKind::Datum));
            }

            FeatureOp::Extrude {
                profile, distance, ..
            } => {
                let src = req.upstream.output(profile.name()).ok_or_else(|| {
                    BackendError::MissingInput {
                        message: format!("profile '{}' not present upstream", profile.name()),
                    }
                })?;
                let (w, h) = profile_extent(src);
                let key = Self::body_key(feature);
                let (obj, selections) = Self::box_result(fid, &key, w, h, scalar(distance));
                result.outputs.insert(key, obj);
                result.selections = selections;
            }

            FeatureOp::Revolve { profile, angle, .. } => {
                let src = req.upstream.output(profile.name()).ok_or_else(|| {
                    BackendError::MissingInput {
                        message: format!("profile '{}' not present upstream", profile.name()),
                    }
                })?;
                let (w, h) = profile_extent(src);
                let key = Self::body_key(feature);
                let (mut obj, mut selections) = Self::box_result(fid, &key, w, h, w.max(h));
                obj.meta
                    .insert("angle".to_string(), MetaValue::Number(scalar(angle)));
                // Revolved bodies keep only caps + one wall.
                selections.retain(|s| {
                    s.kind != SelectionKind::Face
                        || s.role().map(|r| r != "wall").unwrap_or(true)
                        || s.id.ends_with("-front")
                });
                result.outputs.insert(key, obj);
                result.selections = selections;
            }

            FeatureOp::Loft { profiles, .. } => {
                let first = profiles.first().ok_or_else(|| BackendError::MissingInput {
                    message: "loft requires at least one profile".to_string(),
                })?;
                let src =
                    req.upstream
                        .output(first.name())
                        .ok_or_else(|| BackendError::MissingInput {
                            message: format!("profile '{}' not present upstream", first.name()),
                        })?;
                let (w, h) = profile_extent(src);
                let key = Self::body_key(feature);
                let (obj, selections) = Self::box_result(fid, &key, w, h, 1.0);
                result.outputs.insert(key, obj);
                result.selections = selections;
            }

            FeatureOp::Sweep { profile, path } => {
                for name in [profile.name(), path.name()] {
                    if req.upstream.output(name).is_none() {
                        return Err(BackendError::MissingInput {
                            message: format!("profile '{name}' not present upstream"),
                        });
                    }
                }
                let key = Self::body_key(feature);
                let (obj, selections) = Self::box_result(fid, &key, 1.0, 1.0, 4.0);
                result.outputs.insert(key, obj);
                result.selections = selections;
            }

            FeatureOp::Pipe { .. } | FeatureOp::PipeSweep { .. } | FeatureOp::HexTubeSweep { .. } => {
                let key = Self::body_key(feature);
                let (obj, selections) = Self::box_result(fid, &key, 1.0, 1.0, 4.0);
                result.outputs.insert(key, obj);
                result.selections = selections;
            }

            FeatureOp::Surface { profile, .. } => {
                let key = feature
                    .result
                    .clone()
                    .unwrap_or_else(|| format!("surface:{fid}"));
                let obj = KernelObject::new(format!("surface-{fid}"), ObjectKind::Surface)
                    .with_meta("profile", MetaValue::Text(profile.name().to_string()));
                result.selections.push(face_selection(
                    format!("face:{fid}-surface"),
                    fid,
                    &key,
                    "surface",
                    AxisDir::PosZ,
                    1.0,
                    [0.0, 0.0, 0.0],
                ));
                result.outputs.insert(key, obj);
            }

            FeatureOp::Plane { offset, .. } => {
                let key = feature
                    .result
                    .clone()
                    .unwrap_or_else(|| format!("surface:{fid}"));
                let obj = KernelObject::new(format!("plane-{fid}"), ObjectKind::Surface)
                    .with_meta("offset", MetaValue::Number(scalar(offset)));
                result.outputs.insert(key, obj);
            }

            FeatureOp::Hole { on, .. } => {
                let face = req.resolve.resolve_one(on, req.upstream)?;
                let owner = face.owner_key().ok_or(BackendError::MissingInput {
                    message: "selected face has no owner".to_string(),
                })?;
                result = Self::rework_owner(feature, owner, req.upstream, &["bore", "bore_bottom"])?;
            }

            FeatureOp::Fillet { edges, .. }
            | FeatureOp::FilletVariable { edges, .. }
            | FeatureOp::Chamfer { edges, .. }
            | FeatureOp::ChamferVariable { edges, .. } => {
                let matches = req.resolve.resolve(edges, req.upstream)?;
                let first = matches.first().ok_or(BackendError::MissingInput {
                    message: "no edges selected".to_string(),
                })?;
                let owner = first.owner_key().ok_or(BackendError::MissingInput {
                    message: "selected edge has no owner".to_string(),
                })?;
                let role = if matches!(
                    &feature.op,
                    FeatureOp::Fillet { .. } | FeatureOp::FilletVariable { .. }
                ) {
                    "fillet"
                } else {
                    "chamfer"
                };
                let roles = vec![role; matches.len()];
                result = Self::rework_owner(feature, owner, req.upstream, &roles)?;
            }

            FeatureOp::Thicken { face, thickness } => {
                let _ = req.resolve.resolve_one(face, req.upstream)?;
                let key = Self::body_key(feature);
                let (mut obj, selections) =
                    Self::box_result(fid, &key, 1.0, 1.0, scalar(thickness));
                obj.meta
                    .insert("thickness".to_string(), MetaValue::Number(scalar(thickness)));
                result.outputs.insert(key, obj);
                result.selections = selections;
            }

            FeatureOp::Shell { open_faces, .. } => {
                let mut owner = None;
                for sel in open_faces {
                    let face = req.resolve.resolve_one(sel, req.upstream)?;
                    if owner.is_none() {
                        owner = face.owner_key().map(String::from);
                    }
                }
                let owner = owner.ok_or(BackendError::MissingInput {
                    message: "shell requires at least one owned open face".to_string(),
                })?;
                result =
                    Self::rework_owner(feature, &owner, req.upstream, &["shell_inner", "shell_rim"])?;
            }

            FeatureOp::Mirror { source, merge, .. } => {
                let body = req.resolve.resolve_one(source, req.upstream)?;
                let owner = body.owner_key().ok_or(BackendError::MissingInput {
                    message: "mirror source has no owner".to_string(),
                })?;
                if *merge {
                    result = Self::rework_owner(feature, owner, req.upstream, &["mirror_seam"])?;
                } else {
                    let key = Self::body_key(feature);
                    let prior = req.upstream.output(owner).ok_or_else(|| {
                        BackendError::MissingInput {
                            message: format!("owner output '{owner}' not present upstream"),
                        }
                    })?;
                    let mut obj = prior.clone();
                    obj.id = format!("solid-{fid}");
                    result.selections.push(solid_selection(fid, &key));
                    result.outputs.insert(key, obj);
                }
            }

            FeatureOp::MoveBody { target, .. } => {
                let body = req.resolve.resolve_one(target, req.upstream)?;
                let owner = body.owner_key().ok_or(BackendError::MissingInput {
                    message: "move target has no owner".to_string(),
                })?;
                result = Self::rework_owner(feature, owner, req.upstream, &[])?;
            }

            FeatureOp::MoveFace { face, .. }
            | FeatureOp::DeleteFace { face, .. }
            | FeatureOp::SplitFace { face, .. } => {
                let sel = req.resolve.resolve_one(face, req.upstream)?;
                let owner = sel.owner_key().ok_or(BackendError::MissingInput {
                    message: "selected face has no owner".to_string(),
                })?;
                result = Self::rework_owner(feature, owner, req.upstream, &["healed"])?;
            }

            FeatureOp::ReplaceFace { face, replacement } => {
                let sel = req.resolve.resolve_one(face, req.upstream)?;
                let _ = req.resolve.resolve_one(replacement, req.upstream)?;
                let owner = sel.owner_key().ok_or(BackendError::MissingInput {
                    message: "selected face has no owner".to_string(),
                })?;
                result = Self::rework_owner(feature, owner, req.upstream, &["replaced"])?;
            }

            FeatureOp::Draft { faces, neutral, .. } => {
                let _ = req.resolve.resolve_one(neutral, req.upstream)?;
                let mut owner = None;
                for sel in faces {
                    let face = req.resolve.resolve_one(sel, req.upstream)?;
                    if owner.is_none() {
                        owner = face.owner_key().map(String::from);
                    }
                }
                let owner = owner.ok_or(BackendError::MissingInput {
                    message: "draft requires at least one owned face".to_string(),
                })?;
                result = Self::rework_owner(feature, &owner, req.upstream, &["drafted"])?;
            }

            FeatureOp::Thread { face, .. } => {
                let sel = req.resolve.resolve_one(face, req.upstream)?;
                let owner = sel.owner_key().ok_or(BackendError::MissingInput {
                    message: "thread face has no owner".to_string(),
                })?;
                result = Self::rework_owner(feature, owner, req.upstream, &["thread"])?;
            }

            FeatureOp::SplitBody { target, tool } => {
                let body = req.resolve.resolve_one(target, req.upstream)?;
                let _ = req.resolve.resolve_one(tool, req.upstream)?;
                let owner = body.owner_key().ok_or(BackendError::MissingInput {
                    message: "split target has no owner".to_string(),
                })?;
                let prior = req.upstream.output(owner).ok_or_else(|| {
                    BackendError::MissingInput {
                        message: format!("owner output '{owner}' not present upstream"),
                    }
                })?;
                let key = Self::body_key(feature);
                let off_key = format!("{key}-split");
                let mut kept = prior.clone();
                kept.id = format!("solid-{fid}");
                let mut off = prior.clone();
                off.id = format!("solid-{fid}-split");
                result.selections.push(solid_selection(fid, &key));
                result.outputs.insert(key, kept);
                result.outputs.insert(off_key, off);
            }

            FeatureOp::PatternLinear { count, spacing, .. } => {
                let key = feature
                    .result
                    .clone()
                    .unwrap_or_else(|| format!("pattern:{fid}"));
                let obj = KernelObject::new(format!("pattern-{fid}"), ObjectKind::Pattern)
                    .with_meta("count", MetaValue::Number(scalar(count)))
                    .with_meta("spacing", MetaValue::Number(scalar(spacing)));
                result.outputs.insert(key, obj);
            }

            FeatureOp::PatternCircular { count, angle, .. } => {
                let key = feature
                    .result
                    .clone()
                    .unwrap_or_else(|| format!("pattern:{fid}"));
                let obj = KernelObject::new(format!("pattern-{fid}"), ObjectKind::Pattern)
                    .with_meta("count", MetaValue::Number(scalar(count)))
                    .with_meta("angle", MetaValue::Number(scalar(angle)));
                result.outputs.insert(key, obj);
            }

            FeatureOp::Boolean { left, right, .. } => {
                let a = req.resolve.resolve_one(left, req.upstream)?;
                let b = req.resolve.resolve_one(right, req.upstream)?;
                let key = Self::body_key(feature);
                let mut obj = KernelObject::new(format!("solid-{fid}"), ObjectKind::Solid);
                obj.meta.extend([
                    meta_text("leftOwner", a.owner_key().unwrap_or(&a.id)),
                    meta_text("rightOwner", b.owner_key().unwrap_or(&b.id)),
                ]);
                result.selections.push(face_selection(
                    format!("face:{fid}-seam"),
                    fid,
                    &key,
                    "seam",
                    AxisDir::PosZ,
                    1.0,
                    [0.0, 0.0, 0.0],
                ));
                result.selections.push(solid_selection(fid, &key));
                result.outputs.insert(key, obj);
            }

        }

        Ok(result)
    }

    fn mesh(&mut self, target: &KernelObject, opts: &MeshOptions) -> Result<MeshData, BackendError> {
        // One deterministic triangle; deflection only scales it so that
        // option plumbing is observable in tests.
        let s = 1.0 / opts.linear_deflection.max(1e-6);
        let mut data = MeshData {
            positions: vec![0.0, 0.0, 0.0, s, 0.0, 0.0, 0.0, s, 0.0],
            indices: Some(vec![0, 1, 2]),
            normals: Some(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]),
            face_ids: Some(vec![target.id.clone()]),
            edge_positions: None,
            edge_indices: None,
        };
        if opts.include_edges {
            data.edge_positions = Some(vec![0.0, 0.0, 0.0, s, 0.0, 0.0]);
            data.edge_indices = Some(vec![0, 1]);
        }
        Ok(data)
    }

    fn export_step(
        &mut self,
        target: &KernelObject,
        opts: &StepOptions,
    ) -> Result<Vec<u8>, BackendError> {
        let schema = match opts.schema {
            crate::options::StepSchema::AP203 => "AP203",
            crate::options::StepSchema::AP214 => "AP214",
            crate::options::StepSchema::AP242 => "AP242",
        };
        Ok(format!("ISO-10303-21;{schema};{};END-ISO-10303-21;", target.id).into_bytes())
    }

    fn export_stl(
        &mut self,
        target: &KernelObject,
        opts: &StlOptions,
    ) -> Result<Vec<u8>, BackendError> {
        match opts.format {
            crate::options::StlFormat::Ascii => {
                Ok(format!("solid {}\nendsolid {}\n", target.id, target.id).into_bytes())
            }
            crate::options::StlFormat::Binary => {
                let mut bytes = vec![0u8; 80];
                bytes.extend_from_slice(&0u32.to_le_bytes());
                bytes[..target.id.len().min(80)]
                    .copy_from_slice(&target.id.as_bytes()[..target.id.len().min(80)]);
                Ok(bytes)
            }
        }
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities.clone()
    }
}
