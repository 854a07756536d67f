//! Fluent scenario runner over the mock backend.

use compile_engine::{
    build_part, BuildError, BuildOptions, BuildResult, PartialBuild, StagedPolicy, ValidationMode,
};
use kernel_api::MockBackend;
use trueform_types::{IntentPart, Overrides, ParamOverride, UnitSystem};

/// One buildable setup: a part plus everything the executor needs.
pub struct Scenario {
    part: IntentPart,
    overrides: Overrides,
    options: BuildOptions,
    units: UnitSystem,
    backend: MockBackend,
}

impl Scenario {
    pub fn new(part: IntentPart) -> Self {
        Self {
            part,
            overrides: Overrides::new(),
            options: BuildOptions::default(),
            units: UnitSystem::Mm,
            backend: MockBackend::new(),
        }
    }

    pub fn with_override(mut self, id: &str, value: f64) -> Self {
        self.overrides
            .insert(id.to_string(), ParamOverride::Number(value));
        self
    }

    pub fn with_units(mut self, units: UnitSystem) -> Self {
        self.units = units;
        self
    }

    pub fn with_staged_policy(mut self, policy: StagedPolicy) -> Self {
        self.options.staged_features = policy;
        self
    }

    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.options.validation = mode;
        self
    }

    pub fn with_backend(mut self, backend: MockBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Run a full build.
    pub fn build(&mut self) -> Result<BuildResult, BuildError> {
        self.options.partial = None;
        build_part(
            &mut self.backend,
            &self.part,
            &self.overrides,
            &self.options,
            self.units,
            None,
        )
    }

    /// Run an incremental rebuild against a previous result.
    pub fn rebuild(
        &mut self,
        previous: &BuildResult,
        changed: &[&str],
    ) -> Result<BuildResult, BuildError> {
        self.options.partial = Some(PartialBuild {
            changed_feature_ids: changed.iter().map(|s| s.to_string()).collect(),
        });
        build_part(
            &mut self.backend,
            &self.part,
            &self.overrides,
            &self.options,
            self.units,
            Some(previous),
        )
    }

    /// Mutate the part between builds, the way an editor session would.
    pub fn edit(&mut self, edit: impl FnOnce(&mut IntentPart)) {
        edit(&mut self.part);
    }
}
