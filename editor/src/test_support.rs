//! Test-only helpers for constructing pipelines, selectors, and id sources.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::core::ids::IdGenerator;
use crate::core::selector::Selector;
use crate::io::pipeline_store::write_pipeline;
use crate::pipeline::{Pipeline, Step};

/// Create a step with no options and no failure branch.
pub fn step(id: &str, kind: &str) -> Step {
    Step {
        id: id.to_string(),
        kind: kind.to_string(),
        options: serde_json::Value::Null,
        on_failure: None,
    }
}

/// Create a step owning the given failure branch.
pub fn step_with_on_failure(id: &str, kind: &str, on_failure: Vec<Step>) -> Step {
    Step {
        on_failure: Some(on_failure.into_iter().map(Arc::new).collect()),
        ..step(id, kind)
    }
}

/// Root-only pipeline of `set` steps with the given ids.
pub fn flat_pipeline(ids: &[&str]) -> Pipeline {
    Pipeline::new(ids.iter().map(|id| step(id, "set")).collect())
}

/// Parse a selector from string segments, panicking on bad input.
pub fn sel(raw: &[&str]) -> Selector {
    Selector::parse(raw).expect("valid selector")
}

pub fn ids_of(steps: &[Arc<Step>]) -> Vec<String> {
    steps.iter().map(|step| step.id.clone()).collect()
}

/// Hands out the scripted ids in order, then repeats the last one.
#[derive(Debug, Clone)]
pub struct ScriptedIds {
    queue: VecDeque<String>,
    last: String,
}

impl ScriptedIds {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            queue: ids.iter().map(|id| id.to_string()).collect(),
            last: ids.last().map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}

impl IdGenerator for ScriptedIds {
    fn next_id(&mut self) -> String {
        self.queue.pop_front().unwrap_or_else(|| self.last.clone())
    }
}

/// Temporary directory holding snapshot, document, and command files.
pub struct TestDir {
    temp: tempfile::TempDir,
}

impl TestDir {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    pub fn write_snapshot(&self, name: &str, pipeline: &Pipeline) -> Result<PathBuf> {
        let path = self.join(name);
        write_pipeline(&path, pipeline, true)?;
        Ok(path)
    }

    pub fn write_json(&self, name: &str, value: &serde_json::Value) -> Result<PathBuf> {
        let path = self.join(name);
        let mut buf = serde_json::to_string_pretty(value)?;
        buf.push('\n');
        std::fs::write(&path, buf)?;
        Ok(path)
    }
}
