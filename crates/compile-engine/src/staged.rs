//! Staged-feature registry.
//!
//! Some feature kinds (or kind+mode combinations) are still maturing. The
//! registry is a process-wide frozen table; build options decide whether a
//! staged feature is allowed silently, allowed with a warning record, or
//! rejected.

use serde::{Deserialize, Serialize};

/// Maturity stage of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Experimental,
    Preview,
}

/// One frozen registry entry.
#[derive(Debug, Clone, Copy)]
pub struct StagedEntry {
    pub key: &'static str,
    pub stage: Stage,
    pub note: &'static str,
}

/// The frozen registry. Keys match [`Feature::stage_key`](trueform_types::Feature::stage_key).
pub const STAGED_FEATURES: &[StagedEntry] = &[
    StagedEntry {
        key: "pipeSweep",
        stage: Stage::Experimental,
        note: "swept pipe bodies produce unstable wall topology on tight bends",
    },
    StagedEntry {
        key: "hexTubeSweep",
        stage: Stage::Experimental,
        note: "hex tube sweeps only support straight path segments",
    },
    StagedEntry {
        key: "splitFace",
        stage: Stage::Preview,
        note: "face splitting does not yet propagate selection roles",
    },
    StagedEntry {
        key: "thread",
        stage: Stage::Preview,
        note: "modeled threads are approximated; cosmetic threads are stable",
    },
    StagedEntry {
        key: "surface.patch",
        stage: Stage::Preview,
        note: "patch surfaces require a closed boundary profile",
    },
];

/// Look up a stage key in the registry.
pub fn staged_entry(key: &str) -> Option<&'static StagedEntry> {
    STAGED_FEATURES.iter().find(|e| e.key == key)
}

/// What to do when a part uses a staged feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StagedPolicy {
    Allow,
    #[default]
    Warn,
    Error,
}

/// Warning record emitted under the `warn` policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedWarning {
    pub feature: String,
    pub key: String,
    pub stage: Stage,
    pub note: String,
}
