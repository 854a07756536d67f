use kernel_api::{BackendError, ResolveError};

/// Errors raised before any backend call. Each variant carries a stable
/// `code` string surfaced at build boundaries.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("duplicate parameter id '{id}'")]
    ParamDuplicate { id: String },

    #[error("unknown parameter '{id}'")]
    ParamMissing { id: String },

    #[error("parameter cycle involving '{id}'")]
    ParamCycle { id: String },

    #[error("unit mismatch: {message}")]
    ParamUnitMismatch { message: String },

    #[error("type mismatch for parameter '{id}': {message}")]
    ParamTypeMismatch { id: String, message: String },

    #[error("division by zero in expression")]
    ParamDivZero,

    #[error("override targets undeclared parameter '{id}'")]
    ParamOverrideMissing { id: String },

    #[error("duplicate output key '{key}'")]
    OutputDuplicate { key: String },

    #[error("duplicate profile '{name}'")]
    ProfileDuplicate { name: String },

    #[error("profile '{name}' is not declared by any sketch")]
    ProfileMissing { name: String },

    #[error("feature '{feature}' depends on undeclared feature '{dep}'")]
    DepMissing { feature: String, dep: String },

    #[error("createdBy predicate references undeclared feature '{feature}'")]
    PredCreatedByMissing { feature: String },

    #[error("pattern reference '{feature}' does not resolve to a declared pattern of matching kind")]
    PatternMissing { feature: String },

    #[error("named selector '{name}' does not match any declared output")]
    SelectorNamedMissing { name: String },

    #[error("selector on feature '{feature}' has no anchor (add deps or a createdBy predicate)")]
    SelectorAnchorMissing { feature: String },

    #[error("invalid axis: {message}")]
    AxisInvalid { message: String },

    #[error("feature id must be non-empty")]
    FeatureIdEmpty,

    #[error("duplicate feature id '{id}'")]
    FeatureDuplicate { id: String },

    #[error("dependency cycle involving feature '{id}'")]
    GraphCycle { id: String },

    #[error("staged feature '{key}' on '{feature}' rejected by policy: {note}")]
    StagedFeature {
        feature: String,
        key: String,
        note: String,
    },

    #[error("Unsupported IR schema '{schema}'")]
    UnsupportedSchema { schema: String },

    #[error("Unsupported IR version {version}")]
    UnsupportedVersion { version: u32 },
}

impl CompileError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::ParamDuplicate { .. } => "param_duplicate",
            CompileError::ParamMissing { .. } => "param_missing",
            CompileError::ParamCycle { .. } => "param_cycle",
            CompileError::ParamUnitMismatch { .. } => "param_unit_mismatch",
            CompileError::ParamTypeMismatch { .. } => "param_type_mismatch",
            CompileError::ParamDivZero => "param_div_zero",
            CompileError::ParamOverrideMissing { .. } => "param_override_missing",
            CompileError::OutputDuplicate { .. } => "output_duplicate",
            CompileError::ProfileDuplicate { .. } => "profile_duplicate",
            CompileError::ProfileMissing { .. } => "profile_missing",
            CompileError::DepMissing { .. } => "dep_missing",
            CompileError::PredCreatedByMissing { .. } => "pred_created_by_missing",
            CompileError::PatternMissing { .. } => "pattern_missing",
            CompileError::SelectorNamedMissing { .. } => "selector_named_missing",
            CompileError::SelectorAnchorMissing { .. } => "selector_anchor_missing",
            CompileError::AxisInvalid { .. } => "axis_invalid",
            CompileError::FeatureIdEmpty => "feature_id_empty",
            CompileError::FeatureDuplicate { .. } => "feature_duplicate",
            CompileError::GraphCycle { .. } => "graph_cycle",
            CompileError::StagedFeature { .. } => "staged_feature",
            CompileError::UnsupportedSchema { .. } => "unsupported_schema",
            CompileError::UnsupportedVersion { .. } => "unsupported_version",
        }
    }
}

/// Errors surfaced at build boundaries. Compile errors abort before any
/// backend call; resolution and backend errors abort mid-build with the
/// completed steps visible in diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("feature '{feature}': {source}")]
    Resolve {
        feature: String,
        source: ResolveError,
    },

    #[error("backend does not support feature kind '{kind}' (feature '{feature}')")]
    UnsupportedFeature { feature: String, kind: String },

    #[error("feature '{feature}': {source}")]
    Backend {
        feature: String,
        source: BackendError,
    },

    #[error("changed feature '{id}' is not declared in the part")]
    UnknownChangedFeature { id: String },

    #[error("build cancelled")]
    Cancelled,
}

impl BuildError {
    pub fn code(&self) -> &'static str {
        match self {
            BuildError::Compile(e) => e.code(),
            BuildError::Resolve { .. } => "selector_resolution",
            BuildError::UnsupportedFeature { .. } => "backend_unsupported_feature",
            BuildError::Backend { .. } => "backend_error",
            BuildError::UnknownChangedFeature { .. } => "unknown_changed_feature",
            BuildError::Cancelled => "cancelled",
        }
    }
}
