use serde::{Deserialize, Serialize};

use trueform_types::UnitSystem;

/// Tessellation options for `mesh`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeshOptions {
    pub linear_deflection: f64,
    pub angular_deflection: f64,
    pub relative: bool,
    pub parallel: bool,
    pub include_edges: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_segment_length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_max_segments: Option<u32>,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            linear_deflection: 0.1,
            angular_deflection: 0.5,
            relative: false,
            parallel: false,
            include_edges: false,
            edge_segment_length: None,
            edge_max_segments: None,
        }
    }
}

/// Named tessellation presets used by the build options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeshProfile {
    #[default]
    Interactive,
    Preview,
    Export,
}

impl MeshProfile {
    pub fn options(self) -> MeshOptions {
        match self {
            MeshProfile::Interactive => MeshOptions::default(),
            MeshProfile::Preview => MeshOptions {
                linear_deflection: 0.5,
                angular_deflection: 0.8,
                ..MeshOptions::default()
            },
            MeshProfile::Export => MeshOptions {
                linear_deflection: 0.01,
                angular_deflection: 0.1,
                include_edges: true,
                ..MeshOptions::default()
            },
        }
    }
}

/// STEP application protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StepSchema {
    AP203,
    #[default]
    AP214,
    AP242,
}

/// Options for `exportStep`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepOptions {
    pub schema: StepSchema,
    pub unit: UnitSystem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
}

/// STL encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StlFormat {
    #[default]
    Binary,
    Ascii,
}

/// Options for `exportStl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StlOptions {
    pub format: StlFormat,
    pub linear_deflection: f64,
    pub angular_deflection: f64,
    pub relative: bool,
}

impl Default for StlOptions {
    fn default() -> Self {
        Self {
            format: StlFormat::Binary,
            linear_deflection: 0.1,
            angular_deflection: 0.5,
            relative: false,
        }
    }
}
