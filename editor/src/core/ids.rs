//! Step id generation.
//!
//! The edit engine never invents ids itself; it draws them from an
//! [`IdGenerator`] handed in by the caller and re-draws on collision with ids
//! already present in the snapshot.

use std::collections::HashSet;

use ulid::Ulid;

use crate::core::errors::EditError;

/// Upper bound on consecutive colliding ids before giving up.
pub const MAX_ID_ATTEMPTS: usize = 64;

pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Random, lexicographically sortable ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UlidIds;

impl IdGenerator for UlidIds {
    fn next_id(&mut self) -> String {
        Ulid::new().to_string().to_lowercase()
    }
}

/// Deterministic `prefix-1`, `prefix-2`, ... ids.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    count: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            count: 0,
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.prefix, self.count)
    }
}

impl<G: IdGenerator + ?Sized> IdGenerator for Box<G> {
    fn next_id(&mut self) -> String {
        (**self).next_id()
    }
}

/// Draw an id not in `taken` and record it there.
pub(crate) fn fresh_id(
    ids: &mut dyn IdGenerator,
    taken: &mut HashSet<String>,
) -> Result<String, EditError> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = ids.next_id();
        if taken.insert(id.clone()) {
            return Ok(id);
        }
    }
    Err(EditError::IdExhausted(MAX_ID_ATTEMPTS))
}
