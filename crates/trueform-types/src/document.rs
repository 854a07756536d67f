use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::expr::{ParamDef, ParamOverride, UnitSystem};
use crate::feature::Feature;

/// Current IR schema token and version. Process-wide constants; parsers
/// reject anything else.
pub const IR_SCHEMA: &str = "trueform.ir.v1";
pub const IR_VERSION: u32 = 1;
pub const SUPPORTED_IR_VERSIONS: [u32; 1] = [1];

/// A single part: an ordered set of features plus its parameter table.
///
/// Only `features` and `params` are compile-relevant. The remaining fields
/// belong to external collaborators (assembly solver, validation runner,
/// PMI emitter) and round-trip through the compiler untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentPart {
    pub id: String,
    pub features: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectors: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datums: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertions: Option<serde_json::Value>,
    #[serde(
        rename = "cosmeticThreads",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cosmetic_threads: Option<serde_json::Value>,
}

impl IntentPart {
    pub fn new(id: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            id: id.into(),
            features,
            params: Vec::new(),
            connectors: None,
            datums: None,
            constraints: None,
            assertions: None,
            cosmetic_threads: None,
        }
    }

    pub fn with_params(mut self, params: Vec<ParamDef>) -> Self {
        self.params = params;
        self
    }

    pub fn find_feature(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }
}

/// Kernel identity recorded in the build context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelInfo {
    pub name: String,
    pub version: String,
}

/// Modeling tolerances the backend is asked to honor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub linear: f64,
    pub angular: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            linear: 1e-6,
            angular: 1e-9,
        }
    }
}

/// Context a document is compiled under. Participates in the cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildContext {
    #[serde(default)]
    pub units: UnitSystem,
    pub kernel: KernelInfo,
    #[serde(default)]
    pub tolerance: Tolerance,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self {
            units: UnitSystem::Mm,
            kernel: KernelInfo {
                name: "mock".to_string(),
                version: "0".to_string(),
            },
            tolerance: Tolerance::default(),
        }
    }
}

/// Top-level IR document. Assemblies, capabilities, constraints, and
/// assertions belong to external collaborators and round-trip opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDocument {
    pub id: String,
    pub schema: String,
    #[serde(rename = "irVersion")]
    pub ir_version: u32,
    pub parts: Vec<IntentPart>,
    pub context: BuildContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assemblies: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertions: Option<serde_json::Value>,
}

impl IntentDocument {
    pub fn new(id: impl Into<String>, parts: Vec<IntentPart>, context: BuildContext) -> Self {
        Self {
            id: id.into(),
            schema: IR_SCHEMA.to_string(),
            ir_version: IR_VERSION,
            parts,
            context,
            assemblies: None,
            capabilities: None,
            constraints: None,
            assertions: None,
        }
    }
}

/// Parameter overrides supplied at build time, keyed by parameter id.
/// Ordered so that override sets hash stably.
pub type Overrides = BTreeMap<String, ParamOverride>;
