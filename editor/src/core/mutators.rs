//! Structural mutators: relocating a step and deep-duplicating a step.
//!
//! Both are built on [`crate::core::selector`] and never touch the input
//! snapshot; on error the caller still holds an intact, well-formed tree.

use std::collections::HashSet;
use std::sync::Arc;

use crate::core::errors::{AddressingError, EditError, MoveError};
use crate::core::ids::{IdGenerator, fresh_id};
use crate::core::selector::{Replacement, Segment, Selector, read_step, read_steps, write};
use crate::pipeline::{Pipeline, Step};

/// Relocate the step at `source` to the position named by `destination`.
///
/// The destination index counts positions in the destination sequence as it
/// looks once the step has been taken out, so within one sequence moving
/// `a` of `[a, b, c, d]` to index 2 yields `[b, c, a, d]`. A destination equal
/// to or underneath `source` is a [`MoveError::Cycle`].
pub fn move_step(
    tree: &Pipeline,
    source: &Selector,
    destination: &Selector,
) -> Result<Pipeline, MoveError> {
    let moved = Arc::clone(read_step(source, tree)?);
    let (source_parent, source_idx) = position(source)?;
    let (dest_parent, dest_idx) = position(destination)?;

    if destination.starts_with(source) {
        return Err(MoveError::Cycle {
            from: source.to_string(),
            to: destination.to_string(),
        });
    }

    let mut remaining = read_steps(&source_parent, tree)?.to_vec();
    remaining.remove(source_idx);
    let detached = write(&source_parent, tree, Some(Replacement::Steps(remaining)))?;

    let dest_parent = shift_after_removal(&dest_parent, &source_parent, source_idx);
    let mut target = container_or_empty(&dest_parent, &detached)?;
    if dest_idx > target.len() {
        return Err(MoveError::Addressing(AddressingError::Missing {
            selector: destination.to_string(),
            depth: destination.len() - 1,
        }));
    }
    target.insert(dest_idx, moved);

    Ok(write(&dest_parent, &detached, Some(Replacement::Steps(target)))?)
}

/// Insert a deep copy of the step at `source` right after it.
///
/// The copy and every step in its failure branches get fresh ids, distinct
/// from each other and from every id already in `tree`.
pub fn duplicate_step(
    tree: &Pipeline,
    source: &Selector,
    ids: &mut dyn IdGenerator,
) -> Result<Pipeline, EditError> {
    let original = read_step(source, tree)?;
    let (parent, idx) = position(source)?;

    let mut taken = existing_ids(tree);
    let copy = deep_copy(original, ids, &mut taken)?;

    let mut siblings = read_steps(&parent, tree)?.to_vec();
    siblings.insert(idx + 1, Arc::new(copy));
    Ok(write(&parent, tree, Some(Replacement::Steps(siblings)))?)
}

pub(crate) fn existing_ids(tree: &Pipeline) -> HashSet<String> {
    tree.ids().into_iter().map(str::to_string).collect()
}

fn deep_copy(
    step: &Step,
    ids: &mut dyn IdGenerator,
    taken: &mut HashSet<String>,
) -> Result<Step, EditError> {
    let id = fresh_id(ids, taken)?;
    let on_failure = match &step.on_failure {
        Some(branch) => Some(
            branch
                .iter()
                .map(|child| deep_copy(child, ids, taken).map(Arc::new))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => None,
    };
    Ok(Step {
        id,
        kind: step.kind.clone(),
        options: step.options.clone(),
        on_failure,
    })
}

/// Copy `step` with every empty failure branch in its subtree removed.
pub(crate) fn without_empty_branches(step: &Step) -> Step {
    let on_failure = step
        .on_failure
        .as_ref()
        .filter(|branch| !branch.is_empty())
        .map(|branch| {
            branch
                .iter()
                .map(|child| Arc::new(without_empty_branches(child)))
                .collect()
        });
    Step {
        id: step.id.clone(),
        kind: step.kind.clone(),
        options: step.options.clone(),
        on_failure,
    }
}

fn position(selector: &Selector) -> Result<(Selector, usize), AddressingError> {
    selector
        .split_position()
        .ok_or_else(|| AddressingError::NotAPosition {
            selector: selector.to_string(),
        })
}

/// Re-target `path` after the element at `removed_idx` of `container` is gone.
fn shift_after_removal(path: &Selector, container: &Selector, removed_idx: usize) -> Selector {
    if path.len() <= container.len() || !path.starts_with(container) {
        return path.clone();
    }
    let mut segments = path.segments().to_vec();
    if let Segment::Index(idx) = &mut segments[container.len()] {
        if *idx > removed_idx {
            *idx -= 1;
        }
    }
    Selector::new(segments)
}

/// Resolve a destination sequence. A step without a failure branch counts as
/// owning an empty one.
fn container_or_empty(
    selector: &Selector,
    tree: &Pipeline,
) -> Result<Vec<Arc<Step>>, AddressingError> {
    match selector.segments().split_last() {
        Some((Segment::OnFailure, owner)) if !owner.is_empty() => {
            let owner = read_step(&Selector::new(owner.to_vec()), tree)?;
            Ok(owner.on_failure.clone().unwrap_or_default())
        }
        _ => Ok(read_steps(selector, tree)?.to_vec()),
    }
}
