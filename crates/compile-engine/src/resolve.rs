//! Selector resolution.
//!
//! Resolves a selector against the current kernel result: named outputs
//! synthesize selections, id lists look up published selections, and
//! predicate selectors filter then rank. A query selector must narrow to
//! exactly one candidate; anything else is a defined error, never a guess.

use kernel_api::{
    meta_keys, KernelObject, KernelResult, KernelSelection, MetaValue, ObjectKind, ResolveError,
    SelectionKind, SelectorResolver,
};
use trueform_types::{parse_selection_id_list, Predicate, RankRule, Selector};

/// The engine's selector resolver. Stateless; all inputs come from the
/// upstream aggregate passed per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver;

impl SelectorResolver for Resolver {
    fn resolve(
        &self,
        selector: &Selector,
        upstream: &KernelResult,
    ) -> Result<Vec<KernelSelection>, ResolveError> {
        match selector {
            Selector::Named { name } => {
                if let Some(selection) = synthesize_named(upstream, name) {
                    return Ok(vec![selection]);
                }
                match parse_selection_id_list(name) {
                    Some(ids) => lookup_ids(upstream, &ids),
                    None => Err(ResolveError::NamedMissing { name: name.clone() }),
                }
            }
            Selector::Ids { ids } => lookup_ids(upstream, ids),
            Selector::Face { predicates, rank } => {
                self.query(upstream, SelectionKind::Face, predicates, rank)
            }
            Selector::Edge { predicates, rank } => {
                self.query(upstream, SelectionKind::Edge, predicates, rank)
            }
            Selector::Solid { predicates, rank } => {
                self.query(upstream, SelectionKind::Solid, predicates, rank)
            }
        }
    }
}

impl Resolver {
    fn query(
        &self,
        upstream: &KernelResult,
        kind: SelectionKind,
        predicates: &[Predicate],
        rank: &[RankRule],
    ) -> Result<Vec<KernelSelection>, ResolveError> {
        let mut candidates: Vec<&KernelSelection> = upstream
            .selections
            .iter()
            .filter(|s| s.kind == kind)
            .collect();

        for predicate in predicates {
            candidates = self.filter(candidates, predicate)?;
        }

        for rule in rank {
            if candidates.len() <= 1 {
                break;
            }
            candidates = self.narrow(upstream, candidates, rule)?;
        }

        match candidates.len() {
            0 => Err(ResolveError::NoMatch),
            1 => Ok(vec![candidates[0].clone()]),
            n => Err(ResolveError::Ambiguous { count: n }),
        }
    }

    fn filter<'a>(
        &self,
        candidates: Vec<&'a KernelSelection>,
        predicate: &Predicate,
    ) -> Result<Vec<&'a KernelSelection>, ResolveError> {
        let mut kept = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let keep = match predicate {
                Predicate::Planar => candidate.planar().ok_or(ResolveError::MissingMetadata {
                    field: meta_keys::PLANAR.to_string(),
                })?,
                Predicate::Normal { axis } => {
                    let normal =
                        candidate.normal().ok_or(ResolveError::MissingMetadata {
                            field: meta_keys::NORMAL.to_string(),
                        })?;
                    normal == *axis
                }
                Predicate::CreatedBy { feature } => {
                    candidate.created_by() == Some(feature.as_str())
                }
                Predicate::Role { role } => candidate.role() == Some(role.as_str()),
            };
            if keep {
                kept.push(candidate);
            }
        }
        Ok(kept)
    }

    fn narrow<'a>(
        &self,
        upstream: &KernelResult,
        candidates: Vec<&'a KernelSelection>,
        rule: &RankRule,
    ) -> Result<Vec<&'a KernelSelection>, ResolveError> {
        match rule {
            RankRule::MaxArea => {
                retain_extreme(candidates, meta_keys::AREA, |s| s.area(), f64::gt)
            }
            RankRule::MaxZ => {
                retain_extreme(candidates, meta_keys::CENTER_Z, |s| s.center_z(), f64::gt)
            }
            RankRule::MinZ => {
                retain_extreme(candidates, meta_keys::CENTER_Z, |s| s.center_z(), f64::lt)
            }
            RankRule::ClosestTo { selector } => {
                let target = self.resolve_one(selector, upstream)?;
                let target_center =
                    target.center().ok_or(ResolveError::MissingMetadata {
                        field: meta_keys::CENTER.to_string(),
                    })?;
                let distance = |s: &KernelSelection| {
                    s.center().map(|c| {
                        let dx = c[0] - target_center[0];
                        let dy = c[1] - target_center[1];
                        let dz = c[2] - target_center[2];
                        dx * dx + dy * dy + dz * dz
                    })
                };
                retain_extreme(candidates, meta_keys::CENTER, distance, f64::lt)
            }
        }
    }
}

/// Keep the candidates whose key is the best under `better`. Ties are kept
/// and surface later as ambiguity.
fn retain_extreme<'a>(
    candidates: Vec<&'a KernelSelection>,
    field: &str,
    key: impl Fn(&KernelSelection) -> Option<f64>,
    better: impl Fn(&f64, &f64) -> bool,
) -> Result<Vec<&'a KernelSelection>, ResolveError> {
    let mut best: Option<f64> = None;
    for candidate in &candidates {
        let value = key(candidate).ok_or_else(|| ResolveError::MissingMetadata {
            field: field.to_string(),
        })?;
        best = Some(match best {
            Some(b) if better(&b, &value) => b,
            _ => value,
        });
    }
    let best = best.ok_or(ResolveError::NoMatch)?;
    Ok(candidates
        .into_iter()
        .filter(|c| key(c) == Some(best))
        .collect())
}

/// Synthesize a selection for a named output of selectable kind.
fn synthesize_named(upstream: &KernelResult, name: &str) -> Option<KernelSelection> {
    let object = upstream.outputs.get(name)?;
    let kind = selectable_kind(object)?;
    let mut selection = KernelSelection {
        id: object.id.clone(),
        kind,
        meta: object.meta.clone(),
    };
    selection.meta.insert(
        meta_keys::OWNER_KEY.to_string(),
        MetaValue::Text(name.to_string()),
    );
    Some(selection)
}

fn selectable_kind(object: &KernelObject) -> Option<SelectionKind> {
    match object.kind {
        ObjectKind::Solid => Some(SelectionKind::Solid),
        ObjectKind::Face => Some(SelectionKind::Face),
        ObjectKind::Edge => Some(SelectionKind::Edge),
        ObjectKind::Surface | ObjectKind::Datum => Some(SelectionKind::Surface),
        ObjectKind::Pattern | ObjectKind::Profile | ObjectKind::Unknown => None,
    }
}

fn lookup_ids(
    upstream: &KernelResult,
    ids: &[String],
) -> Result<Vec<KernelSelection>, ResolveError> {
    let matches: Vec<KernelSelection> = upstream
        .selections
        .iter()
        .filter(|s| ids.iter().any(|id| *id == s.id))
        .cloned()
        .collect();
    if matches.is_empty() {
        return Err(ResolveError::NoMatch);
    }
    Ok(matches)
}
