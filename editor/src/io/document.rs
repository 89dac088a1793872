//! Conversion between the external pipeline document and editor snapshots.
//!
//! The document keys each processor by its type and nests failure handlers
//! inside the options object:
//!
//! ```json
//! {
//!   "processors": [{ "set": { "field": "a", "value": 1, "on_failure": [{ "fail": {} }] } }],
//!   "on_failure": [{ "drop": {} }]
//! }
//! ```
//!
//! Snapshots carry editor-assigned ids; documents never do.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::ids::{IdGenerator, fresh_id};
use crate::core::selector::Selector;
use crate::pipeline::{Pipeline, Step};

/// Options key holding a processor's failure handlers.
const ON_FAILURE_FIELD: &str = "on_failure";

pub type ProcessorDocument = Map<String, Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineDocument {
    #[serde(default)]
    pub processors: Vec<ProcessorDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_failure: Vec<ProcessorDocument>,
}

/// Build a snapshot from a document, assigning a fresh id to every step.
pub fn deserialize(document: &PipelineDocument, ids: &mut dyn IdGenerator) -> Result<Pipeline> {
    let mut taken = HashSet::new();
    let processors = convert_all(&document.processors, &Selector::root(), ids, &mut taken)?;
    let on_failure = convert_all(
        &document.on_failure,
        &Selector::root_on_failure(),
        ids,
        &mut taken,
    )?;
    Ok(Pipeline {
        processors,
        on_failure,
    })
}

/// Render a snapshot as a document, dropping ids.
pub fn serialize(pipeline: &Pipeline) -> Result<PipelineDocument> {
    Ok(PipelineDocument {
        processors: render_all(&pipeline.processors, &Selector::root())?,
        on_failure: render_all(&pipeline.on_failure, &Selector::root_on_failure())?,
    })
}

fn convert_all(
    raw: &[ProcessorDocument],
    container: &Selector,
    ids: &mut dyn IdGenerator,
    taken: &mut HashSet<String>,
) -> Result<Vec<Arc<Step>>> {
    raw.iter()
        .enumerate()
        .map(|(idx, processor)| {
            convert_processor(processor, &container.index(idx), ids, taken).map(Arc::new)
        })
        .collect()
}

fn convert_processor(
    raw: &ProcessorDocument,
    path: &Selector,
    ids: &mut dyn IdGenerator,
    taken: &mut HashSet<String>,
) -> Result<Step> {
    let mut entries = raw.iter();
    let (kind, body) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => bail!(
            "processor at {} must have exactly one type key, found {}",
            path,
            raw.len()
        ),
    };

    let mut options = match body {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => bail!(
            "processor '{}' at {} must have an object body, found {}",
            kind,
            path,
            json_kind(other)
        ),
    };

    let id = fresh_id(ids, taken).map_err(|err| anyhow!("assign id at {}: {}", path, err))?;
    let on_failure = match options.remove(ON_FAILURE_FIELD) {
        None => None,
        Some(Value::Array(handlers)) => {
            let handlers = handlers
                .iter()
                .enumerate()
                .map(|(idx, handler)| match handler {
                    Value::Object(handler) => {
                        convert_processor(handler, &path.on_failure().index(idx), ids, taken)
                            .map(Arc::new)
                    }
                    other => Err(anyhow!(
                        "failure handler at {} must be an object, found {}",
                        path.on_failure().index(idx),
                        json_kind(other)
                    )),
                })
                .collect::<Result<Vec<_>>>()?;
            (!handlers.is_empty()).then_some(handlers)
        }
        Some(other) => bail!(
            "{} of processor at {} must be an array, found {}",
            ON_FAILURE_FIELD,
            path,
            json_kind(&other)
        ),
    };

    Ok(Step {
        id,
        kind: kind.clone(),
        options: Value::Object(options),
        on_failure,
    })
}

fn render_all(steps: &[Arc<Step>], container: &Selector) -> Result<Vec<ProcessorDocument>> {
    steps
        .iter()
        .enumerate()
        .map(|(idx, step)| render_step(step, &container.index(idx)))
        .collect()
}

fn render_step(step: &Step, path: &Selector) -> Result<ProcessorDocument> {
    let mut body = match &step.options {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => bail!(
            "options of step '{}' at {} must be an object, found {}",
            step.id,
            path,
            json_kind(other)
        ),
    };
    if let Some(branch) = &step.on_failure {
        let handlers = render_all(branch, &path.on_failure())?;
        body.insert(
            ON_FAILURE_FIELD.to_string(),
            Value::Array(handlers.into_iter().map(Value::Object).collect()),
        );
    }

    let mut processor = Map::new();
    processor.insert(step.kind.clone(), Value::Object(body));
    Ok(processor)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
