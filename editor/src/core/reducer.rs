//! The edit engine: one command in, one snapshot out.
//!
//! Moves that cannot be carried out degrade to [`Transition::Rejected`] with the
//! previous snapshot; every other contract violation is returned as an
//! [`EditError`]. Successful transitions keep every invariant checked by
//! [`crate::core::invariants::validate_invariants`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::errors::{AddressingError, CommandFailed, EditError, MoveError};
use crate::core::ids::{IdGenerator, fresh_id};
use crate::core::mutators::{duplicate_step, existing_ids, move_step, without_empty_branches};
use crate::core::selector::{Replacement, Selector, read_step, read_steps, write};
use crate::pipeline::{NewStep, Pipeline, Step};

/// Edit commands produced by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    /// Append a new step to the sequence at `selector`.
    AddTopLevel { step: NewStep, selector: Selector },
    /// Append a new step to the failure branch of the step at `target_selector`.
    AddOnFailure {
        step: NewStep,
        target_selector: Selector,
    },
    /// Replace the step at `selector` wholesale.
    Update { step: Step, selector: Selector },
    Remove { selector: Selector },
    Move {
        source: Selector,
        destination: Selector,
    },
    Duplicate { source: Selector },
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::AddTopLevel { .. } => "addTopLevel",
            Command::AddOnFailure { .. } => "addOnFailure",
            Command::Update { .. } => "update",
            Command::Remove { .. } => "remove",
            Command::Move { .. } => "move",
            Command::Duplicate { .. } => "duplicate",
        }
    }
}

/// Outcome of applying one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Applied(Pipeline),
    /// The command addressed nothing and was skipped.
    Unchanged(Pipeline),
    /// A move was refused; `state` is the previous snapshot.
    Rejected { state: Pipeline, conflict: MoveError },
}

impl Transition {
    pub fn state(&self) -> &Pipeline {
        match self {
            Transition::Applied(state) | Transition::Unchanged(state) => state,
            Transition::Rejected { state, .. } => state,
        }
    }

    pub fn into_state(self) -> Pipeline {
        match self {
            Transition::Applied(state) | Transition::Unchanged(state) => state,
            Transition::Rejected { state, .. } => state,
        }
    }

    pub fn conflict(&self) -> Option<&MoveError> {
        match self {
            Transition::Rejected { conflict, .. } => Some(conflict),
            _ => None,
        }
    }
}

/// Apply `command` to `state`, drawing new step ids from `ids`.
pub fn apply(
    state: &Pipeline,
    command: &Command,
    ids: &mut dyn IdGenerator,
) -> Result<Transition, EditError> {
    debug!(command = command.kind(), "applying command");
    match command {
        Command::AddTopLevel { step, selector } => add_top_level(state, step, selector, ids),
        Command::AddOnFailure {
            step,
            target_selector,
        } => add_on_failure(state, step, target_selector, ids),
        Command::Update { step, selector } => update(state, step, selector),
        Command::Remove { selector } => remove(state, selector),
        Command::Move {
            source,
            destination,
        } => Ok(relocate(state, source, destination)),
        Command::Duplicate { source } => {
            Ok(Transition::Applied(duplicate_step(state, source, ids)?))
        }
    }
}

/// Summary of a command batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    pub state: Pipeline,
    pub applied: usize,
    pub unchanged: usize,
    /// Batch positions of refused moves, in order.
    pub rejected: Vec<(usize, MoveError)>,
}

/// Apply `commands` in order, stopping at the first propagated error.
pub fn apply_all(
    state: &Pipeline,
    commands: &[Command],
    ids: &mut dyn IdGenerator,
) -> Result<Replay, CommandFailed> {
    let mut replay = Replay {
        state: state.clone(),
        applied: 0,
        unchanged: 0,
        rejected: Vec::new(),
    };

    for (index, command) in commands.iter().enumerate() {
        let transition = apply(&replay.state, command, ids).map_err(|error| CommandFailed {
            index,
            kind: command.kind(),
            error,
        })?;
        match transition {
            Transition::Applied(next) => {
                replay.applied += 1;
                replay.state = next;
            }
            Transition::Unchanged(_) => replay.unchanged += 1,
            Transition::Rejected { conflict, .. } => replay.rejected.push((index, conflict)),
        }
    }

    Ok(replay)
}

fn add_top_level(
    state: &Pipeline,
    step: &NewStep,
    selector: &Selector,
    ids: &mut dyn IdGenerator,
) -> Result<Transition, EditError> {
    let container = match read_steps(selector, state) {
        Ok(container) => container,
        Err(err) => {
            debug!(%selector, error = %err, "no sequence to append to; skipping");
            return Ok(Transition::Unchanged(state.clone()));
        }
    };

    let id = fresh_id(ids, &mut existing_ids(state))?;
    let mut next = container.to_vec();
    next.push(Arc::new(step.clone().into_step(id)));
    Ok(Transition::Applied(write(
        selector,
        state,
        Some(Replacement::Steps(next)),
    )?))
}

fn add_on_failure(
    state: &Pipeline,
    step: &NewStep,
    target: &Selector,
    ids: &mut dyn IdGenerator,
) -> Result<Transition, EditError> {
    if target.is_empty() {
        return Err(EditError::EmptySelector);
    }
    let owner = read_step(target, state).map_err(|_| EditError::TargetNotFound(target.to_string()))?;

    let id = fresh_id(ids, &mut existing_ids(state))?;
    let mut branch = owner.on_failure.clone().unwrap_or_default();
    branch.push(Arc::new(step.clone().into_step(id)));
    Ok(Transition::Applied(write(
        &target.on_failure(),
        state,
        Some(Replacement::Steps(branch)),
    )?))
}

fn update(state: &Pipeline, step: &Step, selector: &Selector) -> Result<Transition, EditError> {
    let (parent, idx) = selector
        .split_position()
        .ok_or_else(|| EditError::NonNumericIndex(selector.to_string()))?;
    let container = read_steps(&parent, state)?;
    if idx >= container.len() {
        return Err(EditError::Addressing(AddressingError::Missing {
            selector: selector.to_string(),
            depth: selector.len() - 1,
        }));
    }

    let replacement = without_empty_branches(step);
    Ok(Transition::Applied(write(
        selector,
        state,
        Some(Replacement::Step(Arc::new(replacement))),
    )?))
}

fn remove(state: &Pipeline, selector: &Selector) -> Result<Transition, EditError> {
    let Some((parent, idx)) = selector.split_position() else {
        debug!(%selector, "remove does not name a step; skipping");
        return Ok(Transition::Unchanged(state.clone()));
    };
    let in_range = read_steps(&parent, state).is_ok_and(|container| idx < container.len());
    if !in_range {
        debug!(%selector, "nothing to remove; skipping");
        return Ok(Transition::Unchanged(state.clone()));
    }
    Ok(Transition::Applied(write(selector, state, None)?))
}

fn relocate(state: &Pipeline, source: &Selector, destination: &Selector) -> Transition {
    match move_step(state, source, destination) {
        Ok(next) => Transition::Applied(next),
        Err(conflict) => {
            warn!(%source, %destination, error = %conflict, "move rejected; keeping previous state");
            Transition::Rejected {
                state: state.clone(),
                conflict,
            }
        }
    }
}
