//! I/O helpers for editor commands.

pub mod commands;
pub mod config;
pub mod document;
pub mod pipeline_store;
