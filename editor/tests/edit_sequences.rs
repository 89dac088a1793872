//! Multi-command edit sequences over the public engine API.
//!
//! Each test drives `apply` through a realistic editing session and checks the
//! resulting snapshot shape, id freshness, and structural sharing.

use std::collections::HashSet;
use std::sync::Arc;

use pipeline_editor::core::errors::MoveError;
use pipeline_editor::core::ids::{SequentialIds, UlidIds};
use pipeline_editor::core::invariants::validate_invariants;
use pipeline_editor::core::reducer::{Command, Transition, apply};
use pipeline_editor::core::selector::{Selector, read_step};
use pipeline_editor::pipeline::{NewStep, Pipeline, Step};
use pipeline_editor::test_support::{
    ScriptedIds, flat_pipeline, ids_of, sel, step, step_with_on_failure,
};

fn collect_ids(step: &Step, out: &mut Vec<String>) {
    out.push(step.id.clone());
    for child in step.on_failure.iter().flatten() {
        collect_ids(child, out);
    }
}

/// Add a failure handler to a step, then remove it again.
///
/// The step ends up without an `onFailure` field rather than an empty list.
#[test]
fn failure_handler_added_then_removed_leaves_no_branch() {
    let tree = Pipeline::new(vec![step("1", "set")]);
    let mut ids = UlidIds;

    let added = apply(
        &tree,
        &Command::AddOnFailure {
            step: NewStep::new("remove"),
            target_selector: sel(&["0"]),
        },
        &mut ids,
    )
    .expect("add on failure")
    .into_state();
    let handler = &added.processors[0].on_failure.as_ref().expect("branch")[0];
    assert_eq!(handler.kind, "remove");
    assert_ne!(handler.id, "1");

    let removed = apply(
        &added,
        &Command::Remove {
            selector: sel(&["0", "onFailure", "0"]),
        },
        &mut ids,
    )
    .expect("remove")
    .into_state();
    assert!(removed.processors[0].on_failure.is_none());
    let json = serde_json::to_value(&removed).expect("json");
    assert!(json["processors"][0].get("onFailure").is_none());
}

/// Moving the last root step to the front keeps the other two in order.
#[test]
fn move_last_to_front() {
    let tree = flat_pipeline(&["1", "2", "3"]);
    let next = apply(
        &tree,
        &Command::Move {
            source: sel(&["2"]),
            destination: sel(&["0"]),
        },
        &mut SequentialIds::new("x"),
    )
    .expect("move")
    .into_state();
    assert_eq!(ids_of(&next.processors), vec!["3", "1", "2"]);
}

/// Order preservation in both directions within one sequence.
#[test]
fn move_reorders_relative_to_post_removal_positions() {
    let tree = flat_pipeline(&["a", "b", "c", "d"]);
    let mut ids = SequentialIds::new("x");

    let forward = apply(
        &tree,
        &Command::Move {
            source: sel(&["0"]),
            destination: sel(&["2"]),
        },
        &mut ids,
    )
    .expect("move")
    .into_state();
    assert_eq!(ids_of(&forward.processors), vec!["b", "c", "a", "d"]);

    let backward = apply(
        &tree,
        &Command::Move {
            source: sel(&["3"]),
            destination: sel(&["0"]),
        },
        &mut ids,
    )
    .expect("move")
    .into_state();
    assert_eq!(ids_of(&backward.processors), vec!["d", "a", "b", "c"]);
}

/// A move into the moved step's own subtree is refused and the snapshot is
/// returned untouched, both by value and by reference.
#[test]
fn move_into_own_subtree_is_a_recovered_no_op() {
    let tree = Pipeline::new(vec![
        step_with_on_failure(
            "a",
            "set",
            vec![step_with_on_failure("a1", "set", vec![step("a2", "fail")])],
        ),
        step("b", "set"),
    ]);

    for destination in [
        sel(&["0"]),
        sel(&["0", "onFailure", "0"]),
        sel(&["0", "onFailure", "0", "onFailure", "1"]),
    ] {
        let transition = apply(
            &tree,
            &Command::Move {
                source: sel(&["0"]),
                destination,
            },
            &mut SequentialIds::new("x"),
        )
        .expect("moves never propagate errors");
        assert!(matches!(transition.conflict(), Some(MoveError::Cycle { .. })));
        let state = transition.state();
        assert_eq!(state, &tree);
        assert!(Arc::ptr_eq(&state.processors[0], &tree.processors[0]));
        assert!(Arc::ptr_eq(&state.processors[1], &tree.processors[1]));
    }
}

/// Duplicating a step with a two-level failure subtree copies every step with
/// fresh ids and inserts the copy right after the original.
#[test]
fn duplicate_assigns_fresh_ids_to_whole_subtree() {
    let tree = Pipeline::new(vec![
        step("before", "set"),
        step_with_on_failure(
            "root",
            "set",
            vec![
                step_with_on_failure("l1a", "rename", vec![step("l2a", "fail"), step("l2b", "drop")]),
                step("l1b", "remove"),
            ],
        ),
        step("after", "set"),
    ]);

    let next = apply(
        &tree,
        &Command::Duplicate {
            source: sel(&["1"]),
        },
        &mut UlidIds,
    )
    .expect("duplicate")
    .into_state();

    let mut original_ids = Vec::new();
    collect_ids(&tree.processors[1], &mut original_ids);
    let mut copy_ids = Vec::new();
    collect_ids(&next.processors[2], &mut copy_ids);

    assert_eq!(original_ids.len(), 5);
    assert_eq!(copy_ids.len(), 5);
    let originals: HashSet<_> = original_ids.iter().collect();
    let copies: HashSet<_> = copy_ids.iter().collect();
    assert_eq!(copies.len(), 5);
    assert!(originals.is_disjoint(&copies));

    assert_eq!(next.processors.len(), 4);
    assert_eq!(next.processors[1].id, "root");
    assert_eq!(next.processors[2].kind, "set");
    assert!(Arc::ptr_eq(&next.processors[0], &tree.processors[0]));
    assert!(Arc::ptr_eq(&next.processors[1], &tree.processors[1]));
    assert!(Arc::ptr_eq(&next.processors[3], &tree.processors[2]));
    assert!(validate_invariants(&next).is_empty());
}

/// Add commands never reuse an id that is already in the tree, even when the
/// generator hands out colliding ids.
#[test]
fn adds_never_reuse_existing_ids() {
    let tree = Pipeline::new(vec![step_with_on_failure("a", "set", vec![step("b", "fail")])]);
    let mut ids = ScriptedIds::new(&["a", "b", "c", "a", "c", "d"]);

    let top = apply(
        &tree,
        &Command::AddTopLevel {
            step: NewStep::new("set"),
            selector: Selector::root(),
        },
        &mut ids,
    )
    .expect("add top level")
    .into_state();
    assert_eq!(top.processors[1].id, "c");

    let nested = apply(
        &top,
        &Command::AddOnFailure {
            step: NewStep::new("fail"),
            target_selector: sel(&["1"]),
        },
        &mut ids,
    )
    .expect("add on failure")
    .into_state();
    assert_eq!(nested.processors[1].on_failure.as_ref().unwrap()[0].id, "d");
    assert!(validate_invariants(&nested).is_empty());
}

/// Every successful edit shares all subtrees off the edited path with the
/// previous snapshot.
#[test]
fn edits_share_untouched_subtrees() {
    let tree = Pipeline::new(vec![
        step_with_on_failure("a", "set", vec![step("a1", "fail"), step("a2", "fail")]),
        step_with_on_failure("b", "set", vec![step("b1", "fail")]),
        step("c", "set"),
    ]);
    let mut ids = SequentialIds::new("n");

    let updated = apply(
        &tree,
        &Command::Update {
            step: step("a1", "drop"),
            selector: sel(&["0", "onFailure", "0"]),
        },
        &mut ids,
    )
    .expect("update")
    .into_state();
    assert!(!Arc::ptr_eq(&updated.processors[0], &tree.processors[0]));
    assert!(Arc::ptr_eq(&updated.processors[1], &tree.processors[1]));
    assert!(Arc::ptr_eq(&updated.processors[2], &tree.processors[2]));
    let old_branch = tree.processors[0].on_failure.as_ref().unwrap();
    let new_branch = updated.processors[0].on_failure.as_ref().unwrap();
    assert!(Arc::ptr_eq(&new_branch[1], &old_branch[1]));
    assert_eq!(old_branch[0].kind, "fail");

    let moved = apply(
        &tree,
        &Command::Move {
            source: sel(&["1", "onFailure", "0"]),
            destination: sel(&["0", "onFailure", "2"]),
        },
        &mut ids,
    )
    .expect("move")
    .into_state();
    assert!(moved.processors[1].on_failure.is_none());
    assert!(Arc::ptr_eq(&moved.processors[2], &tree.processors[2]));
    let moved_branch = moved.processors[0].on_failure.as_ref().unwrap();
    assert_eq!(ids_of(moved_branch), vec!["a1", "a2", "b1"]);
    assert!(Arc::ptr_eq(&moved_branch[0], &old_branch[0]));
}

/// A drag-and-drop style session across the root and the pipeline-wide
/// failure branch.
#[test]
fn editing_session_across_root_and_pipeline_failure_branch() {
    let mut state = Pipeline::default();
    let mut ids = SequentialIds::new("p");

    let commands = vec![
        Command::AddTopLevel {
            step: NewStep::new("set"),
            selector: Selector::root(),
        },
        Command::AddTopLevel {
            step: NewStep::new("rename"),
            selector: Selector::root(),
        },
        Command::AddTopLevel {
            step: NewStep::new("fail"),
            selector: Selector::root_on_failure(),
        },
        Command::AddOnFailure {
            step: NewStep::new("drop"),
            target_selector: sel(&["1"]),
        },
        Command::Move {
            source: sel(&["1", "onFailure", "0"]),
            destination: sel(&["onFailure", "0"]),
        },
        Command::Duplicate {
            source: sel(&["0"]),
        },
    ];
    for command in &commands {
        state = apply(&state, command, &mut ids).expect("apply").into_state();
        assert!(validate_invariants(&state).is_empty(), "{:?}", command);
    }

    assert_eq!(ids_of(&state.processors), vec!["p-1", "p-5", "p-2"]);
    assert!(state.processors[2].on_failure.is_none());
    assert_eq!(ids_of(&state.on_failure), vec!["p-4", "p-3"]);
    assert_eq!(read_step(&sel(&["onFailure", "0"]), &state).expect("step").kind, "drop");
}

/// Failed commands propagate errors and leave the caller's snapshot alone.
#[test]
fn failed_commands_do_not_touch_input() {
    let tree = flat_pipeline(&["a", "b"]);
    let before = tree.clone();
    let mut ids = SequentialIds::new("x");

    assert!(
        apply(
            &tree,
            &Command::Duplicate {
                source: sel(&["5"]),
            },
            &mut ids,
        )
        .is_err()
    );
    assert!(
        apply(
            &tree,
            &Command::Update {
                step: step("z", "set"),
                selector: sel(&["0", "onFailure"]),
            },
            &mut ids,
        )
        .is_err()
    );
    let transition = apply(
        &tree,
        &Command::Remove {
            selector: sel(&["9"]),
        },
        &mut ids,
    )
    .expect("remove");
    assert!(matches!(transition, Transition::Unchanged(_)));
    assert_eq!(tree, before);
}
