//! Feature-step execution.
//!
//! Walks the scheduled order, invokes the backend per feature, and merges
//! each step into the running aggregate. Selections whose owner output is
//! replaced by a later step are invalidated during the merge. Incremental
//! rebuilds reuse prior step results for every feature outside the
//! downstream closure of the declared change set.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use kernel_api::{
    AsyncBackend, Backend, BackendError, Capabilities, ExecuteRequest, KernelResult, MeshProfile,
};
use trueform_types::{Feature, IntentPart, Overrides, UnitSystem};

use crate::compile::{compile_part, CompiledPart};
use crate::error::BuildError;
use crate::normalize::{NormalizeOptions, ValidationMode};
use crate::resolve::Resolver;
use crate::staged::StagedPolicy;

/// Cooperative cancellation handle. The executor honors it at backend-call
/// boundaries only.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Declares an incremental rebuild relative to a previous build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialBuild {
    pub changed_feature_ids: Vec<String>,
}

/// Options accepted by [`build_part`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildOptions {
    pub validation: ValidationMode,
    pub staged_features: StagedPolicy,
    pub mesh_profile: MeshProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialBuild>,
    #[serde(skip)]
    pub cancel: Option<CancelToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildMode {
    Full,
    Incremental,
}

/// How the build ran: which features were reused, invalidated, and
/// actually executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDiagnostics {
    pub mode: BuildMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reused_feature_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalidated_feature_ids: Vec<String>,
    pub executed_feature_ids: Vec<String>,
}

/// One executed (or reused) feature step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub feature_id: String,
    pub result: KernelResult,
}

/// The outcome of a build. Kernel objects inside are owned by this result
/// and must not be retained across later builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub build_id: Uuid,
    pub part_id: String,
    pub order: Vec<String>,
    #[serde(rename = "final")]
    pub final_result: KernelResult,
    pub steps: Vec<StepRecord>,
    /// Connector declarations carried through from the part, untouched,
    /// for the assembly collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectors: Option<serde_json::Value>,
    pub diagnostics: BuildDiagnostics,
}

impl BuildResult {
    pub fn step(&self, feature_id: &str) -> Option<&KernelResult> {
        self.steps
            .iter()
            .find(|s| s.feature_id == feature_id)
            .map(|s| &s.result)
    }
}

/// Merge one step into the running aggregate.
///
/// New outputs overwrite same-key entries in place and append otherwise.
/// Selections owned by any output key the step re-published are dropped
/// before the step's selections are appended.
pub fn merge(current: &mut KernelResult, step: &KernelResult) {
    let replaced_owners: BTreeSet<&str> = step
        .selections
        .iter()
        .filter_map(|s| s.owner_key())
        .collect();
    current.selections.retain(|s| {
        s.owner_key()
            .map(|key| !replaced_owners.contains(key))
            .unwrap_or(true)
    });
    current
        .selections
        .extend(step.selections.iter().cloned());
    for (key, object) in &step.outputs {
        current.outputs.insert(key.clone(), object.clone());
    }
}

/// Everything decided before the first backend call.
struct ExecutionPlan {
    compiled: CompiledPart,
    mode: BuildMode,
    invalidated: BTreeSet<String>,
}

fn plan_build(
    part: &IntentPart,
    overrides: &Overrides,
    options: &BuildOptions,
    units: UnitSystem,
    previous: Option<&BuildResult>,
) -> Result<ExecutionPlan, BuildError> {
    let normalize_options = NormalizeOptions {
        validation: options.validation,
        staged_features: options.staged_features,
    };
    let compiled = compile_part(part, overrides, &normalize_options, units)?;

    let (mode, invalidated) = match (&options.partial, previous) {
        (Some(partial), Some(_)) => {
            let mut changed = BTreeSet::new();
            for id in &partial.changed_feature_ids {
                if !compiled.graph.nodes.iter().any(|n| n == id) {
                    return Err(BuildError::UnknownChangedFeature { id: id.clone() });
                }
                changed.insert(id.clone());
            }
            (
                BuildMode::Incremental,
                compiled.graph.downstream_closure(&changed),
            )
        }
        _ => (
            BuildMode::Full,
            compiled.graph.nodes.iter().cloned().collect(),
        ),
    };

    Ok(ExecutionPlan {
        compiled,
        mode,
        invalidated,
    })
}

fn check_cancelled(options: &BuildOptions) -> Result<(), BuildError> {
    match &options.cancel {
        Some(token) if token.is_cancelled() => Err(BuildError::Cancelled),
        _ => Ok(()),
    }
}

fn gate_capability(feature: &Feature, capabilities: &Capabilities) -> Result<(), BuildError> {
    let key = feature.stage_key();
    if !capabilities.supports(&key) {
        return Err(BuildError::UnsupportedFeature {
            feature: feature.id.clone(),
            kind: key,
        });
    }
    Ok(())
}

fn step_error(feature_id: &str, error: BackendError) -> BuildError {
    match error {
        BackendError::Resolve(source) => BuildError::Resolve {
            feature: feature_id.to_string(),
            source,
        },
        source => BuildError::Backend {
            feature: feature_id.to_string(),
            source,
        },
    }
}

fn finish(
    plan: ExecutionPlan,
    part: &IntentPart,
    current: KernelResult,
    steps: Vec<StepRecord>,
    executed: Vec<String>,
    reused: Vec<String>,
) -> BuildResult {
    let invalidated_in_order: Vec<String> = match plan.mode {
        BuildMode::Full => Vec::new(),
        BuildMode::Incremental => plan
            .compiled
            .order
            .iter()
            .filter(|id| plan.invalidated.contains(*id))
            .cloned()
            .collect(),
    };
    BuildResult {
        build_id: Uuid::new_v4(),
        part_id: part.id.clone(),
        order: plan.compiled.order,
        final_result: current,
        steps,
        connectors: part.connectors.clone(),
        diagnostics: BuildDiagnostics {
            mode: plan.mode,
            reused_feature_ids: reused,
            invalidated_feature_ids: invalidated_in_order,
            executed_feature_ids: executed,
        },
    }
}

/// Compile and execute a part against a backend.
///
/// Pass the previous [`BuildResult`] together with `options.partial` for an
/// incremental rebuild; anything else runs a full build.
pub fn build_part(
    backend: &mut dyn Backend,
    part: &IntentPart,
    overrides: &Overrides,
    options: &BuildOptions,
    units: UnitSystem,
    previous: Option<&BuildResult>,
) -> Result<BuildResult, BuildError> {
    let span = tracing::debug_span!("build", part = %part.id);
    let _guard = span.enter();

    let plan = plan_build(part, overrides, options, units, previous)?;
    let capabilities = backend.capabilities();
    let prev_steps: BTreeMap<&str, &KernelResult> = previous
        .map(|p| {
            p.steps
                .iter()
                .map(|s| (s.feature_id.as_str(), &s.result))
                .collect()
        })
        .unwrap_or_default();

    let resolver = Resolver;
    let mut current = KernelResult::default();
    let mut steps = Vec::with_capacity(plan.compiled.order.len());
    let mut executed = Vec::new();
    let mut reused = Vec::new();

    for id in &plan.compiled.order {
        check_cancelled(options)?;
        let feature = plan
            .compiled
            .normalized
            .part
            .find_feature(id)
            .expect("scheduled feature is declared");

        let fresh = plan.mode == BuildMode::Full
            || plan.invalidated.contains(id)
            || !prev_steps.contains_key(id.as_str());
        let result = if fresh {
            gate_capability(feature, &capabilities)?;
            tracing::debug!(feature = %id, kind = feature.kind_key(), "executing");
            executed.push(id.clone());
            backend
                .execute(ExecuteRequest {
                    feature,
                    upstream: &current,
                    resolve: &resolver,
                })
                .map_err(|e| step_error(id, e))?
        } else {
            tracing::debug!(feature = %id, "reusing previous step");
            reused.push(id.clone());
            (*prev_steps[id.as_str()]).clone()
        };

        merge(&mut current, &result);
        steps.push(StepRecord {
            feature_id: id.clone(),
            result,
        });
    }

    Ok(finish(plan, part, current, steps, executed, reused))
}

/// Async variant of [`build_part`]. Identical control flow; suspension
/// happens only at backend calls.
pub async fn build_part_async(
    backend: &mut dyn AsyncBackend,
    part: &IntentPart,
    overrides: &Overrides,
    options: &BuildOptions,
    units: UnitSystem,
    previous: Option<&BuildResult>,
) -> Result<BuildResult, BuildError> {
    let plan = plan_build(part, overrides, options, units, previous)?;
    let capabilities = backend.capabilities();
    let prev_steps: BTreeMap<&str, &KernelResult> = previous
        .map(|p| {
            p.steps
                .iter()
                .map(|s| (s.feature_id.as_str(), &s.result))
                .collect()
        })
        .unwrap_or_default();

    let resolver = Resolver;
    let mut current = KernelResult::default();
    let mut steps = Vec::with_capacity(plan.compiled.order.len());
    let mut executed = Vec::new();
    let mut reused = Vec::new();

    for id in &plan.compiled.order {
        check_cancelled(options)?;
        let feature = plan
            .compiled
            .normalized
            .part
            .find_feature(id)
            .expect("scheduled feature is declared");

        let fresh = plan.mode == BuildMode::Full
            || plan.invalidated.contains(id)
            || !prev_steps.contains_key(id.as_str());
        let result = if fresh {
            gate_capability(feature, &capabilities)?;
            executed.push(id.clone());
            backend
                .execute(ExecuteRequest {
                    feature,
                    upstream: &current,
                    resolve: &resolver,
                })
                .await
                .map_err(|e| step_error(id, e))?
        } else {
            reused.push(id.clone());
            (*prev_steps[id.as_str()]).clone()
        };

        merge(&mut current, &result);
        steps.push(StepRecord {
            feature_id: id.clone(),
            result,
        });
    }

    Ok(finish(plan, part, current, steps, executed, reused))
}
