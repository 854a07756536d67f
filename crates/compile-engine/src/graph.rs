//! Dependency graph construction.
//!
//! Edges mean "A must execute before B". Explicit `deps` entries are
//! combined with edges inferred from named-output selectors, profile
//! references, pattern references, `createdBy` predicates, and datum-axis
//! references. A predicate-based selector that ends up with no anchor at
//! all is rejected rather than guessed at.

use std::collections::{BTreeMap, BTreeSet};

use trueform_types::{parse_selection_id_list, IntentPart};

use crate::error::CompileError;

/// The part's feature dependency graph.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Feature ids in declaration order.
    pub nodes: Vec<String>,
    /// Adjacency: from → features that must run after it.
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    fn add_edge(&mut self, from: &str, to: &str) {
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }

    /// Successors of a node (features that depend on it).
    pub fn edges_from(&self, id: &str) -> impl Iterator<Item = &str> + '_ {
        self.edges
            .get(id)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// In-degree per node.
    pub fn in_degrees(&self) -> BTreeMap<&str, usize> {
        let mut degrees: BTreeMap<&str, usize> =
            self.nodes.iter().map(|n| (n.as_str(), 0)).collect();
        for targets in self.edges.values() {
            for to in targets {
                if let Some(d) = degrees.get_mut(to.as_str()) {
                    *d += 1;
                }
            }
        }
        degrees
    }

    /// The changed set plus every feature downstream of it.
    pub fn downstream_closure(&self, changed: &BTreeSet<String>) -> BTreeSet<String> {
        let mut closure = changed.clone();
        let mut queue: Vec<&str> = changed.iter().map(String::as_str).collect();
        while let Some(id) = queue.pop() {
            for next in self.edges_from(id) {
                if closure.insert(next.to_string()) {
                    queue.push(next);
                }
            }
        }
        closure
    }
}

/// Build the dependency graph for a normalized part.
pub fn build(part: &IntentPart) -> Result<DependencyGraph, CompileError> {
    let mut graph = DependencyGraph {
        nodes: part.features.iter().map(|f| f.id.clone()).collect(),
        edges: BTreeMap::new(),
    };
    let feature_ids: BTreeSet<String> = graph.nodes.iter().cloned().collect();

    // Compile-time output table: output key → producing feature.
    let mut outputs: BTreeMap<String, String> = BTreeMap::new();
    let mut profiles: BTreeMap<String, String> = BTreeMap::new();
    for feature in &part.features {
        for key in feature.declared_outputs() {
            outputs.entry(key).or_insert_with(|| feature.id.clone());
        }
        if let trueform_types::FeatureOp::Sketch2d { profiles: ps, .. } = &feature.op {
            for p in ps {
                profiles
                    .entry(p.name.clone())
                    .or_insert_with(|| feature.id.clone());
            }
        }
    }

    for feature in &part.features {
        let fid = feature.id.as_str();

        for dep in &feature.deps {
            if !feature_ids.contains(dep.as_str()) {
                return Err(CompileError::DepMissing {
                    feature: fid.to_string(),
                    dep: dep.clone(),
                });
            }
            graph.add_edge(dep, fid);
        }

        for selector in feature.selectors() {
            for name in selector.named_refs() {
                if let Some(producer) = outputs.get(name) {
                    graph.add_edge(producer, fid);
                } else if parse_selection_id_list(name).is_none() {
                    return Err(CompileError::SelectorNamedMissing {
                        name: name.to_string(),
                    });
                }
            }
            for created_by in selector.created_by_refs() {
                if !feature_ids.contains(created_by) {
                    return Err(CompileError::PredCreatedByMissing {
                        feature: created_by.to_string(),
                    });
                }
                graph.add_edge(created_by, fid);
            }
        }

        for profile_ref in feature.profile_refs() {
            let sketch = profiles.get(profile_ref.name()).ok_or_else(|| {
                CompileError::ProfileMissing {
                    name: profile_ref.name().to_string(),
                }
            })?;
            graph.add_edge(sketch, fid);
        }

        if let Some(pattern) = &feature.pattern {
            if !feature_ids.contains(pattern.feature.as_str()) {
                return Err(CompileError::PatternMissing {
                    feature: pattern.feature.clone(),
                });
            }
            graph.add_edge(&pattern.feature, fid);
        }

        for datum in feature.datum_refs() {
            if !feature_ids.contains(datum) {
                return Err(CompileError::DepMissing {
                    feature: fid.to_string(),
                    dep: datum.to_string(),
                });
            }
            graph.add_edge(datum, fid);
        }
    }

    // Anchor check: a predicate selector needs createdBy or some inbound
    // dependency; the compile refuses to guess which body it queries.
    let degrees = graph.in_degrees();
    for feature in &part.features {
        let anchored = degrees
            .get(feature.id.as_str())
            .map(|d| *d > 0)
            .unwrap_or(false);
        for selector in feature.selectors() {
            if selector.is_query() && !selector.has_created_by() && !anchored {
                return Err(CompileError::SelectorAnchorMissing {
                    feature: feature.id.clone(),
                });
            }
        }
    }

    Ok(graph)
}
