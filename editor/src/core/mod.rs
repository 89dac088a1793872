//! Deterministic, pure logic of the pipeline editor.
//!
//! Core modules must be free of I/O side effects. They operate on immutable
//! snapshots and return new snapshots suitable for tests.

pub mod errors;
pub mod ids;
pub mod invariants;
pub mod mutators;
pub mod reducer;
pub mod selector;
