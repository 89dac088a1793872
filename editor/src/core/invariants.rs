//! Well-formedness checks for pipeline snapshots.

use std::collections::HashSet;
use std::sync::Arc;

use crate::core::selector::Selector;
use crate::pipeline::{Pipeline, Step};

/// Check the structural invariants every snapshot must satisfy:
/// - No duplicate or empty ids
/// - No empty step type
/// - No step carries an empty `onFailure` branch
///
/// Sequences are dense and acyclic by construction (`Vec` of owned steps).
/// Returns stable, depth-first ordered messages keyed by selector.
pub fn validate_invariants(pipeline: &Pipeline) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    validate_steps(&pipeline.processors, &Selector::root(), &mut seen, &mut errors);
    validate_steps(
        &pipeline.on_failure,
        &Selector::root_on_failure(),
        &mut seen,
        &mut errors,
    );
    errors
}

fn validate_steps(
    steps: &[Arc<Step>],
    container: &Selector,
    seen: &mut HashSet<String>,
    errors: &mut Vec<String>,
) {
    for (idx, step) in steps.iter().enumerate() {
        let path = container.index(idx);
        validate_step(step, &path, seen, errors);
    }
}

fn validate_step(step: &Step, path: &Selector, seen: &mut HashSet<String>, errors: &mut Vec<String>) {
    if step.id.trim().is_empty() {
        errors.push(format!("{}: id must be non-empty", path));
    } else if !seen.insert(step.id.clone()) {
        errors.push(format!("duplicate id '{}' at {}", step.id, path));
    }

    if step.kind.trim().is_empty() {
        errors.push(format!("{}: type must be non-empty", path));
    }

    match &step.on_failure {
        Some(branch) if branch.is_empty() => {
            errors.push(format!("{}: onFailure must be omitted when empty", path));
        }
        Some(branch) => validate_steps(branch, &path.on_failure(), seen, errors),
        None => {}
    }
}
