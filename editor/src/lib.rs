//! Tree-edit engine for processor pipelines.
//!
//! A pipeline is an ordered list of processing steps, each optionally owning an
//! ordered list of failure-handling steps. Edits arrive as discrete commands
//! (add, update, remove, move, duplicate) and each produces a fresh snapshot.
//! The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (addressing, mutators, the edit
//!   engine). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, documents, snapshots,
//!   command files).
//!
//! The `pipeline-editor` binary wires both together behind a small CLI.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod outline;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
