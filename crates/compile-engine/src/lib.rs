//! The part compile and build pipeline.
//!
//! Turns an [`IntentPart`](trueform_types::IntentPart) into a deterministic
//! execution plan and drives a pluggable geometry backend through it:
//! normalize → evaluate params → build dependency graph → schedule →
//! execute (resolving selectors against the evolving kernel result).

pub mod cache;
pub mod compile;
pub mod error;
pub mod executor;
pub mod graph;
pub mod hash;
pub mod normalize;
pub mod params;
pub mod resolve;
pub mod schedule;
pub mod staged;

pub use cache::{cache_key, CacheKey};
pub use compile::{compile_part, CompiledPart};
pub use error::{BuildError, CompileError};
pub use executor::{
    build_part, build_part_async, merge, BuildDiagnostics, BuildMode, BuildOptions, BuildResult,
    CancelToken, PartialBuild, StepRecord,
};
pub use graph::DependencyGraph;
pub use hash::{stable_hash, stable_string, stable_string_of};
pub use normalize::{check_document, normalize, NormalizeOptions, NormalizedPart, ValidationMode};
pub use params::{EvaluatedParam, ParamTable};
pub use resolve::Resolver;
pub use schedule::schedule;
pub use staged::{staged_entry, Stage, StagedEntry, StagedPolicy, StagedWarning, STAGED_FEATURES};
