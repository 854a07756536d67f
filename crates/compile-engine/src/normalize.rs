//! Validation and normalization.
//!
//! `normalize` produces a byte-stable normalized part: selectors are
//! canonicalized, every scalar expression is inlined as a pure number in
//! canonical units, and the part's invariants are enforced. Normalized
//! parts feed the dependency graph, the executor, and the cache key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use trueform_types::{
    parse_selection_id_list, Expr, FeatureOp, IntentDocument, IntentPart, Overrides, PatternKind,
    RankRule, Selector, UnitSystem, IR_SCHEMA, OUTPUT_PREFIXES, SUPPORTED_IR_VERSIONS,
};

use crate::error::CompileError;
use crate::params::{Evaluator, ParamTable};
use crate::staged::{staged_entry, StagedPolicy, StagedWarning};

/// How much validation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationMode {
    #[default]
    Default,
    Off,
    /// Like `default`, but staged-feature warnings become errors.
    Strict,
}

/// Options accepted by [`normalize`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizeOptions {
    pub validation: ValidationMode,
    pub staged_features: StagedPolicy,
}

/// A validated, canonicalized part with its evaluated parameter table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPart {
    pub part: IntentPart,
    pub params: ParamTable,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<StagedWarning>,
}

/// Verify a document's schema and version tokens.
pub fn check_document(doc: &IntentDocument) -> Result<(), CompileError> {
    if doc.schema != IR_SCHEMA {
        return Err(CompileError::UnsupportedSchema {
            schema: doc.schema.clone(),
        });
    }
    if !SUPPORTED_IR_VERSIONS.contains(&doc.ir_version) {
        return Err(CompileError::UnsupportedVersion {
            version: doc.ir_version,
        });
    }
    Ok(())
}

/// Rewrite a selector into its canonical shape: predicates sorted and
/// deduplicated, nested rank selectors canonicalized, and comma-separated
/// selection-id lists rewritten into list form. Rank order is semantic and
/// is preserved.
pub fn canonicalize_selector(selector: &mut Selector) {
    match selector {
        Selector::Face { predicates, rank }
        | Selector::Edge { predicates, rank }
        | Selector::Solid { predicates, rank } => {
            predicates.sort_by(|a, b| a.canonical_key().cmp(&b.canonical_key()));
            predicates.dedup();
            for rule in rank {
                if let RankRule::ClosestTo { selector } = rule {
                    canonicalize_selector(selector);
                }
            }
        }
        Selector::Named { name } => {
            let reserved = OUTPUT_PREFIXES.iter().any(|p| name.starts_with(p));
            if let Some(ids) = parse_selection_id_list(name) {
                // A single reserved-prefix token ("surface:top") stays a
                // named output reference; anything else is an id list.
                if !reserved || ids.len() > 1 {
                    *selector = Selector::Ids { ids };
                }
            }
        }
        Selector::Ids { .. } => {}
    }
}

/// Normalize a part against its overrides, options, and unit system.
pub fn normalize(
    part: &IntentPart,
    overrides: &Overrides,
    options: &NormalizeOptions,
    units: UnitSystem,
) -> Result<NormalizedPart, CompileError> {
    // Feature id hygiene comes first; everything downstream indexes by id.
    let mut seen = BTreeSet::new();
    for feature in &part.features {
        if feature.id.is_empty() {
            return Err(CompileError::FeatureIdEmpty);
        }
        if !seen.insert(feature.id.as_str()) {
            return Err(CompileError::FeatureDuplicate {
                id: feature.id.clone(),
            });
        }
    }

    let mut evaluator = Evaluator::new(&part.params, overrides, units)?;
    evaluator.evaluate_all(&part.params)?;

    let mut normalized = part.clone();

    // Store each parameter's resolved canonical scalar on its definition.
    for def in &mut normalized.params {
        let value = evaluator
            .eval(&Expr::Param {
                id: def.id.clone(),
            })?
            .value;
        def.value = Expr::lit(value);
    }

    for feature in &mut normalized.features {
        for selector in feature.selectors_mut() {
            canonicalize_selector(selector);
        }
        let id = feature.id.clone();
        for (expected, expr) in feature.exprs_mut() {
            let scalar = evaluator.eval(expr)?;
            let coerced = evaluator.coerce(scalar, expected, &id)?;
            *expr = Expr::lit(coerced.value);
        }
    }

    if options.validation != ValidationMode::Off {
        validate(&normalized)?;
    }

    let warnings = apply_staged_policy(&normalized, options)?;

    Ok(NormalizedPart {
        part: normalized,
        params: evaluator.into_table(),
        warnings,
    })
}

fn validate(part: &IntentPart) -> Result<(), CompileError> {
    let feature_ids: BTreeSet<&str> = part.features.iter().map(|f| f.id.as_str()).collect();

    // Profile name uniqueness across all sketches.
    let mut profiles = BTreeSet::new();
    for feature in &part.features {
        if let FeatureOp::Sketch2d { profiles: ps, .. } = &feature.op {
            for p in ps {
                if !profiles.insert(p.name.as_str()) {
                    return Err(CompileError::ProfileDuplicate {
                        name: p.name.clone(),
                    });
                }
            }
        }
    }

    // Output key uniqueness across the part (profiles included).
    let mut outputs = BTreeSet::new();
    for feature in &part.features {
        for key in feature.declared_outputs() {
            if !outputs.insert(key.clone()) {
                return Err(CompileError::OutputDuplicate { key });
            }
        }
    }

    for feature in &part.features {
        for dep in &feature.deps {
            if !feature_ids.contains(dep.as_str()) {
                return Err(CompileError::DepMissing {
                    feature: feature.id.clone(),
                    dep: dep.clone(),
                });
            }
        }

        for profile_ref in feature.profile_refs() {
            if !profiles.contains(profile_ref.name()) {
                return Err(CompileError::ProfileMissing {
                    name: profile_ref.name().to_string(),
                });
            }
        }

        if let Some(pattern) = &feature.pattern {
            let target = part.find_feature(&pattern.feature);
            let matches = match target {
                Some(f) => matches!(
                    (&f.op, pattern.kind),
                    (FeatureOp::PatternLinear { .. }, PatternKind::Linear)
                        | (FeatureOp::PatternCircular { .. }, PatternKind::Circular)
                ),
                None => false,
            };
            if !matches {
                return Err(CompileError::PatternMissing {
                    feature: pattern.feature.clone(),
                });
            }
        }

        for datum in feature.datum_refs() {
            let is_datum = part.find_feature(datum).map(|f| {
                matches!(
                    f.op,
                    FeatureOp::DatumPlane { .. }
                        | FeatureOp::DatumAxis { .. }
                        | FeatureOp::DatumFrame { .. }
                )
            });
            if is_datum != Some(true) {
                return Err(CompileError::DepMissing {
                    feature: feature.id.clone(),
                    dep: datum.to_string(),
                });
            }
        }

        for selector in feature.selectors() {
            for created_by in selector.created_by_refs() {
                if !feature_ids.contains(created_by) {
                    return Err(CompileError::PredCreatedByMissing {
                        feature: created_by.to_string(),
                    });
                }
            }
            for name in selector.named_refs() {
                let reserved = OUTPUT_PREFIXES.iter().any(|p| name.starts_with(p));
                let declared = outputs.contains(name);
                let id_list = parse_selection_id_list(name).is_some();
                if reserved && !declared {
                    return Err(CompileError::SelectorNamedMissing {
                        name: name.to_string(),
                    });
                }
                if !reserved && !declared && !id_list {
                    return Err(CompileError::SelectorNamedMissing {
                        name: name.to_string(),
                    });
                }
            }
        }

        for vector in feature.free_vectors() {
            if vector.iter().any(|c| !c.is_finite()) {
                return Err(CompileError::AxisInvalid {
                    message: format!(
                        "feature '{}' carries a non-finite vector component",
                        feature.id
                    ),
                });
            }
        }
    }

    Ok(())
}

fn apply_staged_policy(
    part: &IntentPart,
    options: &NormalizeOptions,
) -> Result<Vec<StagedWarning>, CompileError> {
    let mut warnings = Vec::new();
    for feature in &part.features {
        let key = feature.stage_key();
        let Some(entry) = staged_entry(&key) else {
            continue;
        };
        let escalate = options.staged_features == StagedPolicy::Error
            || (options.validation == ValidationMode::Strict
                && options.staged_features != StagedPolicy::Allow);
        if escalate {
            return Err(CompileError::StagedFeature {
                feature: feature.id.clone(),
                key,
                note: entry.note.to_string(),
            });
        }
        if options.staged_features == StagedPolicy::Warn {
            tracing::warn!(
                feature = %feature.id,
                key = %key,
                "staged feature in use: {}",
                entry.note
            );
            warnings.push(StagedWarning {
                feature: feature.id.clone(),
                key,
                stage: entry.stage,
                note: entry.note.to_string(),
            });
        }
    }
    Ok(warnings)
}
