//! Error taxonomy for addressing, structural moves, and edit commands.

use thiserror::Error;

/// A textual selector segment that is neither an index nor the failure-branch key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("invalid selector segment '{0}' (expected an index or 'onFailure')")]
    InvalidSegment(String),
}

/// A selector that does not resolve against a snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressingError {
    #[error("nothing at '{selector}' (segment {depth} does not exist)")]
    Missing { selector: String, depth: usize },

    #[error("segment {depth} of '{selector}' does not fit the value it addresses")]
    Mismatch { selector: String, depth: usize },

    #[error("value written at '{selector}' does not fit that location")]
    ValueMismatch { selector: String },

    #[error("'{selector}' does not name a position in a step sequence")]
    NotAPosition { selector: String },
}

/// Why a move was refused. Always recovered by the edit engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("cannot move '{from}' into its own subtree at '{to}'")]
    Cycle { from: String, to: String },

    #[error(transparent)]
    Addressing(#[from] AddressingError),
}

/// Contract violations surfaced to the caller of the edit engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("expected target selector to contain a path, but received an empty one")]
    EmptySelector,

    #[error("could not find a step at '{0}'")]
    TargetNotFound(String),

    #[error("expected numeric index as the last segment of '{0}'")]
    NonNumericIndex(String),

    #[error("id generator produced no fresh id after {0} attempts")]
    IdExhausted(usize),

    #[error(transparent)]
    Addressing(#[from] AddressingError),
}

/// A command in a batch that failed with a propagated error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("command #{index} ({kind}) failed: {error}")]
pub struct CommandFailed {
    pub index: usize,
    pub kind: &'static str,
    #[source]
    pub error: EditError,
}
