//! Command batch files: a JSON array of edit commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::reducer::Command;

/// Load a command batch from disk.
pub fn load_commands(path: &Path) -> Result<Vec<Command>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read commands {}", path.display()))?;
    parse_commands(&contents).with_context(|| format!("parse commands {}", path.display()))
}

pub fn parse_commands(contents: &str) -> Result<Vec<Command>> {
    Ok(serde_json::from_str(contents)?)
}
