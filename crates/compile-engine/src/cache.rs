//! Content-addressed cache keys.
//!
//! Derived from the normalized part, the build context, and the override
//! set. Equal inputs yield byte-equal keys; any semantic change to a
//! feature, parameter, context, or override changes the key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use trueform_types::{BuildContext, Overrides};

use crate::compile::CompiledPart;
use crate::hash::{stable_hash, stable_string_of};

/// Cache key for one compiled part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKey {
    pub part_id: String,
    pub feature_order: Vec<String>,
    pub feature_hashes: BTreeMap<String, String>,
    pub params_hash: String,
    pub context_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides_hash: Option<String>,
}

impl CacheKey {
    /// Canonical wire form of the whole key.
    pub fn canonical(&self) -> String {
        stable_string_of(self)
    }

    /// Single digest over the whole key.
    pub fn digest(&self) -> String {
        stable_hash(self)
    }
}

/// Derive the cache key for a compiled part.
pub fn cache_key(
    compiled: &CompiledPart,
    context: &BuildContext,
    overrides: &Overrides,
) -> CacheKey {
    let part = &compiled.normalized.part;
    let feature_hashes = part
        .features
        .iter()
        .map(|f| (f.id.clone(), stable_hash(f)))
        .collect();
    CacheKey {
        part_id: part.id.clone(),
        feature_order: compiled.order.clone(),
        feature_hashes,
        params_hash: stable_hash(&part.params),
        context_hash: stable_hash(context),
        overrides_hash: if overrides.is_empty() {
            None
        } else {
            Some(stable_hash(overrides))
        },
    }
}
