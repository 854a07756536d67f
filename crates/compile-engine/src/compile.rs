//! The compile front half: normalize, build the graph, schedule.

use trueform_types::{IntentPart, Overrides, UnitSystem};

use crate::error::CompileError;
use crate::graph::{self, DependencyGraph};
use crate::normalize::{normalize, NormalizeOptions, NormalizedPart};
use crate::schedule::schedule;

/// A part ready for execution: normalized, wired, and ordered.
#[derive(Debug, Clone)]
pub struct CompiledPart {
    pub normalized: NormalizedPart,
    pub graph: DependencyGraph,
    pub order: Vec<String>,
}

/// Run the compile pipeline up to (but not including) execution.
pub fn compile_part(
    part: &IntentPart,
    overrides: &Overrides,
    options: &NormalizeOptions,
    units: UnitSystem,
) -> Result<CompiledPart, CompileError> {
    let normalized = normalize(part, overrides, options, units)?;
    let graph = graph::build(&normalized.part)?;
    let order = schedule(&graph)?;
    Ok(CompiledPart {
        normalized,
        graph,
        order,
    })
}
