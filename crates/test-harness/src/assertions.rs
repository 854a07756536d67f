//! Assertions with diagnostic detail.

use compile_engine::BuildResult;
use kernel_api::SelectionKind;

use crate::helpers::HarnessError;
use crate::report::BuildReport;

/// Assert the scheduled order matches exactly.
pub fn assert_order(result: &BuildResult, expected: &[&str]) -> Result<(), HarnessError> {
    let order: Vec<&str> = result.order.iter().map(String::as_str).collect();
    if order != expected {
        return Err(HarnessError::AssertionFailed {
            detail: format!("expected order {expected:?}, got {order:?}"),
        });
    }
    Ok(())
}

/// Assert an output key exists in the final aggregate.
pub fn assert_output(result: &BuildResult, key: &str) -> Result<(), HarnessError> {
    if result.final_result.outputs.contains_key(key) {
        Ok(())
    } else {
        Err(HarnessError::MissingOutput {
            key: key.to_string(),
        })
    }
}

/// Assert the number of final selections of a kind.
pub fn assert_selection_count(
    result: &BuildResult,
    kind: SelectionKind,
    expected: usize,
) -> Result<(), HarnessError> {
    let count = result
        .final_result
        .selections
        .iter()
        .filter(|s| s.kind == kind)
        .count();
    if count != expected {
        return Err(HarnessError::AssertionFailed {
            detail: format!(
                "expected {expected} {kind:?} selections, found {count}\n{}",
                BuildReport::new(result).to_text()
            ),
        });
    }
    Ok(())
}

/// Assert a step exists for the feature and produced at least one output
/// or selection.
pub fn assert_step_nonempty(result: &BuildResult, feature: &str) -> Result<(), HarnessError> {
    let step = result
        .step(feature)
        .ok_or_else(|| HarnessError::MissingStep {
            feature: feature.to_string(),
        })?;
    if step.outputs.is_empty() && step.selections.is_empty() {
        return Err(HarnessError::AssertionFailed {
            detail: format!("step '{feature}' produced nothing"),
        });
    }
    Ok(())
}

/// Assert that no final selection is owned by a stale output generation.
/// Every selection's owner key must exist in the final output map.
pub fn assert_owners_resolve(result: &BuildResult) -> Result<(), HarnessError> {
    for selection in &result.final_result.selections {
        if let Some(owner) = selection.owner_key() {
            if !result.final_result.outputs.contains_key(owner) {
                return Err(HarnessError::AssertionFailed {
                    detail: format!(
                        "selection '{}' is owned by '{owner}', which is not a final output",
                        selection.id
                    ),
                });
            }
        }
    }
    Ok(())
}
