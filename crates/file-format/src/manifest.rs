use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use trueform_types::{KernelInfo, Tolerance};

/// Current container schema token.
pub const CONTAINER_SCHEMA: &str = "trueform.container.v1";

/// Reserved entry names; artifacts may not use them.
pub const RESERVED_PATHS: [&str; 2] = ["manifest.json", "document.json"];

/// `sha256:<hex>` digest of a byte string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// The `manifest.json` at the root of every container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema: String,
    pub created_at: DateTime<Utc>,
    pub document: DocumentEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<ArtifactEntry>>,
}

/// Manifest entry describing `document.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub path: String,
    pub schema: String,
    pub hash: String,
    pub bytes: u64,
}

/// Manifest entry describing one stored artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub hash: String,
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<ArtifactBuild>,
}

/// Build provenance attached to an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBuild {
    pub kernel: KernelInfo,
    pub tolerance: Tolerance,
}

/// Validate an artifact path: relative, forward-slash, no `..` segments,
/// and not a reserved name.
pub fn validate_artifact_path(path: &str) -> Result<(), crate::errors::ContainerError> {
    use crate::errors::ContainerError;
    if RESERVED_PATHS.contains(&path) {
        return Err(ContainerError::ReservedPath {
            path: path.to_string(),
        });
    }
    let well_formed = !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && !path.contains(':')
        && path.split('/').all(|seg| !seg.is_empty() && seg != "..");
    if !well_formed {
        return Err(ContainerError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(())
}
