//! Stable exit codes for editor CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid input (config, snapshot, document, commands) or a failed command.
pub const INVALID: i32 = 1;
/// `apply` finished, but at least one move was rejected and skipped.
pub const MOVES_REJECTED: i32 = 2;
