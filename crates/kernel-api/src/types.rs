use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use trueform_types::AxisDir;

/// Well-known metadata keys the selector resolver reads. Backends populate
/// these on the selections they publish.
pub mod meta_keys {
    pub const CREATED_BY: &str = "createdBy";
    pub const ROLE: &str = "role";
    pub const PLANAR: &str = "planar";
    pub const NORMAL: &str = "normal";
    pub const NORMAL_VEC: &str = "normalVec";
    pub const AREA: &str = "area";
    pub const CENTER_Z: &str = "centerZ";
    pub const CENTER: &str = "center";
    pub const OWNER_KEY: &str = "ownerKey";
}

/// An opaque metadata value. Backends may stash kernel handles as text;
/// the core only interprets the well-known keys above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Vec3([f64; 3]),
}

impl MetaValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetaValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<[f64; 3]> {
        match self {
            MetaValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

/// What kind of artifact a kernel object is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectKind {
    Solid,
    Face,
    Edge,
    Datum,
    Pattern,
    Profile,
    Surface,
    Unknown,
}

/// Opaque artifact returned by the backend. Owned by the build it appears
/// in; callers must not retain it across builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelObject {
    pub id: String,
    pub kind: ObjectKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, MetaValue>,
}

impl KernelObject {
    pub fn new(id: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            id: id.into(),
            kind,
            meta: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: MetaValue) -> Self {
        self.meta.insert(key.to_string(), value);
        self
    }
}

/// Kinds a taggable topological selection may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionKind {
    Face,
    Edge,
    Solid,
    Surface,
}

impl SelectionKind {
    pub fn token(self) -> &'static str {
        match self {
            SelectionKind::Face => "face",
            SelectionKind::Edge => "edge",
            SelectionKind::Solid => "solid",
            SelectionKind::Surface => "surface",
        }
    }
}

/// A taggable topological element exposed by the backend for selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSelection {
    pub id: String,
    pub kind: SelectionKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, MetaValue>,
}

impl KernelSelection {
    pub fn new(id: impl Into<String>, kind: SelectionKind) -> Self {
        Self {
            id: id.into(),
            kind,
            meta: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: MetaValue) -> Self {
        self.meta.insert(key.to_string(), value);
        self
    }

    pub fn planar(&self) -> Option<bool> {
        self.meta.get(meta_keys::PLANAR).and_then(MetaValue::as_bool)
    }

    pub fn normal(&self) -> Option<AxisDir> {
        self.meta
            .get(meta_keys::NORMAL)
            .and_then(MetaValue::as_text)
            .and_then(AxisDir::parse)
    }

    pub fn normal_vec(&self) -> Option<[f64; 3]> {
        self.meta
            .get(meta_keys::NORMAL_VEC)
            .and_then(MetaValue::as_vec3)
    }

    pub fn area(&self) -> Option<f64> {
        self.meta.get(meta_keys::AREA).and_then(MetaValue::as_number)
    }

    pub fn center_z(&self) -> Option<f64> {
        self.meta
            .get(meta_keys::CENTER_Z)
            .and_then(MetaValue::as_number)
    }

    pub fn center(&self) -> Option<[f64; 3]> {
        self.meta.get(meta_keys::CENTER).and_then(MetaValue::as_vec3)
    }

    pub fn created_by(&self) -> Option<&str> {
        self.meta
            .get(meta_keys::CREATED_BY)
            .and_then(MetaValue::as_text)
    }

    pub fn role(&self) -> Option<&str> {
        self.meta.get(meta_keys::ROLE).and_then(MetaValue::as_text)
    }

    pub fn owner_key(&self) -> Option<&str> {
        self.meta
            .get(meta_keys::OWNER_KEY)
            .and_then(MetaValue::as_text)
    }
}

/// Result of executing one feature: named outputs plus the selections the
/// backend exposes for later queries. Output order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelResult {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, KernelObject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<KernelSelection>,
}

impl KernelResult {
    pub fn output(&self, key: &str) -> Option<&KernelObject> {
        self.outputs.get(key)
    }
}

/// Triangle mesh (plus optional edge polylines) produced by `mesh`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshData {
    pub positions: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_positions: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_indices: Option<Vec<u32>>,
}

/// What a backend supports. An absent `feature_kinds` list means every
/// kind is assumed supported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "featureKinds",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub feature_kinds: Option<Vec<String>>,
}

impl Capabilities {
    pub fn supports(&self, stage_key: &str) -> bool {
        match &self.feature_kinds {
            Some(kinds) => kinds.iter().any(|k| k == stage_key),
            None => true,
        }
    }
}

/// Errors raised while resolving a selector against kernel output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("Selector ambiguity: {count} candidates remain")]
    Ambiguous { count: usize },

    #[error("Selector matched 0 candidates")]
    NoMatch,

    #[error("metadata {field}")]
    MissingMetadata { field: String },

    #[error("named selection '{name}' does not match any output")]
    NamedMissing { name: String },
}

/// Errors surfaced by a backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },

    #[error("execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("export failed: {message}")]
    ExportFailed { message: String },

    #[error("missing input: {message}")]
    MissingInput { message: String },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_values_deserialize_untagged() {
        let meta: std::collections::BTreeMap<String, MetaValue> = serde_json::from_str(
            r#"{"planar": true, "area": 50.0, "normal": "+Z", "center": [5.0, 2.5, 2.0]}"#,
        )
        .unwrap();
        assert_eq!(meta["planar"], MetaValue::Bool(true));
        assert_eq!(meta["area"], MetaValue::Number(50.0));
        assert_eq!(meta["normal"], MetaValue::Text("+Z".to_string()));
        assert_eq!(meta["center"], MetaValue::Vec3([5.0, 2.5, 2.0]));
    }

    #[test]
    fn selection_accessors_read_well_known_keys() {
        let selection = KernelSelection::new("face:1", SelectionKind::Face)
            .with_meta(meta_keys::PLANAR, MetaValue::Bool(true))
            .with_meta(meta_keys::NORMAL, MetaValue::Text("+Z".to_string()))
            .with_meta(meta_keys::AREA, MetaValue::Number(50.0))
            .with_meta(meta_keys::CENTER, MetaValue::Vec3([5.0, 2.5, 2.0]))
            .with_meta(meta_keys::OWNER_KEY, MetaValue::Text("body:main".to_string()));
        assert_eq!(selection.planar(), Some(true));
        assert_eq!(selection.normal(), Some(trueform_types::AxisDir::PosZ));
        assert_eq!(selection.area(), Some(50.0));
        assert_eq!(selection.center_z(), None);
        assert_eq!(selection.center(), Some([5.0, 2.5, 2.0]));
        assert_eq!(selection.owner_key(), Some("body:main"));
    }

    #[test]
    fn absent_feature_kinds_means_everything_is_supported() {
        let caps = Capabilities::default();
        assert!(caps.supports("extrude"));

        let restricted = Capabilities {
            name: None,
            feature_kinds: Some(vec!["sketch2d".to_string()]),
        };
        assert!(restricted.supports("sketch2d"));
        assert!(!restricted.supports("extrude"));
    }

    #[test]
    fn output_order_is_insertion_order() {
        let mut result = KernelResult::default();
        result
            .outputs
            .insert("body:b".to_string(), KernelObject::new("b", ObjectKind::Solid));
        result
            .outputs
            .insert("body:a".to_string(), KernelObject::new("a", ObjectKind::Solid));
        let keys: Vec<&str> = result.outputs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["body:b", "body:a"]);
    }
}
