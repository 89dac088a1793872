//! Snapshot and document load/save helpers with schema + invariant validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::core::invariants::validate_invariants;
use crate::io::document::PipelineDocument;
use crate::pipeline::Pipeline;

const SNAPSHOT_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/pipeline/v1.schema.json"
));

/// Load and validate a snapshot from disk (schema + invariants).
pub fn load_pipeline(path: &Path) -> Result<Pipeline> {
    debug!(path = %path.display(), "loading snapshot");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read snapshot {}", path.display()))?;
    parse_pipeline(&contents).with_context(|| format!("load snapshot {}", path.display()))
}

/// Parse and validate a snapshot from JSON text.
pub fn parse_pipeline(contents: &str) -> Result<Pipeline> {
    let value: Value = serde_json::from_str(contents).context("parse snapshot json")?;
    validate_schema(&value)?;
    let pipeline: Pipeline = serde_json::from_value(value).context("deserialize snapshot")?;
    validate_pipeline_invariants(&pipeline)?;
    Ok(pipeline)
}

/// Write a snapshot to disk with a trailing newline.
pub fn write_pipeline(path: &Path, pipeline: &Pipeline, pretty: bool) -> Result<()> {
    debug!(path = %path.display(), steps = pipeline.step_count(), "writing snapshot");
    write_json(path, pipeline, pretty).with_context(|| format!("write snapshot {}", path.display()))
}

/// Load an external pipeline document.
pub fn load_document(path: &Path) -> Result<PipelineDocument> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read document {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse document {}", path.display()))
}

/// Write an external pipeline document with a trailing newline.
pub fn write_document(path: &Path, document: &PipelineDocument, pretty: bool) -> Result<()> {
    write_json(path, document, pretty).with_context(|| format!("write document {}", path.display()))
}

/// Serialize `value` to JSON with trailing newline.
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let mut buf = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    buf.push('\n');
    Ok(buf)
}

fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let buf = to_json(value, pretty)?;
    fs::write(path, buf)?;
    Ok(())
}

fn validate_schema(snapshot: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(SNAPSHOT_SCHEMA).context("parse snapshot schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(snapshot) {
        let messages = compiled
            .iter_errors(snapshot)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "snapshot schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

fn validate_pipeline_invariants(pipeline: &Pipeline) -> Result<()> {
    let errors = validate_invariants(pipeline);
    if errors.is_empty() {
        return Ok(());
    }
    Err(anyhow!("snapshot invariants failed: {}", errors.join("; ")))
}
