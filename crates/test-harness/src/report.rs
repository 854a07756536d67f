//! Structured text reports for build results.

use compile_engine::{BuildMode, BuildResult};
use serde::Serialize;

/// A text-renderable summary of a build, for failure diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub part_id: String,
    pub mode: BuildMode,
    pub order: Vec<String>,
    pub executed: Vec<String>,
    pub reused: Vec<String>,
    pub outputs: Vec<String>,
    pub selections: Vec<String>,
}

impl BuildReport {
    pub fn new(result: &BuildResult) -> Self {
        Self {
            part_id: result.part_id.clone(),
            mode: result.diagnostics.mode,
            order: result.order.clone(),
            executed: result.diagnostics.executed_feature_ids.clone(),
            reused: result.diagnostics.reused_feature_ids.clone(),
            outputs: result
                .final_result
                .outputs
                .iter()
                .map(|(key, obj)| format!("{key} ({:?} {})", obj.kind, obj.id))
                .collect(),
            selections: result
                .final_result
                .selections
                .iter()
                .map(|s| {
                    format!(
                        "{} ({:?}, owner {})",
                        s.id,
                        s.kind,
                        s.owner_key().unwrap_or("-")
                    )
                })
                .collect(),
        }
    }

    /// Render as indented text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("part: {} ({:?} build)\n", self.part_id, self.mode));
        out.push_str(&format!("order: {}\n", self.order.join(" -> ")));
        out.push_str(&format!("executed: {}\n", self.executed.join(", ")));
        if !self.reused.is_empty() {
            out.push_str(&format!("reused: {}\n", self.reused.join(", ")));
        }
        out.push_str("outputs:\n");
        for line in &self.outputs {
            out.push_str(&format!("  {line}\n"));
        }
        out.push_str("selections:\n");
        for line in &self.selections {
            out.push_str(&format!("  {line}\n"));
        }
        out
    }
}
