use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One processing step. `on_failure`, when present, is never empty.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
    #[serde(
        rename = "onFailure",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub on_failure: Option<Vec<Arc<Step>>>,
}

/// Id-less step payload carried by the add commands.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewStep {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl NewStep {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: Value::Null,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    pub fn into_step(self, id: String) -> Step {
        Step {
            id,
            kind: self.kind,
            options: self.options,
            on_failure: None,
        }
    }
}

/// Root snapshot: the top-level processors plus the pipeline-wide failure branch.
///
/// Unlike a step's branch, the root `on_failure` may be empty.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Pipeline {
    #[serde(default)]
    pub processors: Vec<Arc<Step>>,
    #[serde(rename = "onFailure", default, skip_serializing_if = "Vec::is_empty")]
    pub on_failure: Vec<Arc<Step>>,
}

impl Pipeline {
    pub fn new(processors: Vec<Step>) -> Self {
        Self {
            processors: processors.into_iter().map(Arc::new).collect(),
            on_failure: Vec::new(),
        }
    }

    /// Visit every step depth-first, processors before the root failure branch.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Step)) {
        walk_steps(&self.processors, visit);
        walk_steps(&self.on_failure, visit);
    }

    /// All step ids in depth-first order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.walk(&mut |step| ids.push(step.id.as_str()));
        ids
    }

    pub fn step_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }
}

fn walk_steps<'a>(steps: &'a [Arc<Step>], visit: &mut dyn FnMut(&'a Step)) {
    for step in steps {
        visit(step);
        if let Some(branch) = &step.on_failure {
            walk_steps(branch, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{step, step_with_on_failure};

    #[test]
    fn serializes_with_external_field_names() {
        let pipeline = Pipeline::new(vec![step_with_on_failure(
            "1",
            "set",
            vec![step("2", "remove")],
        )]);
        let json = serde_json::to_value(&pipeline).expect("serialize");
        assert_eq!(json["processors"][0]["type"], "set");
        assert_eq!(json["processors"][0]["onFailure"][0]["id"], "2");
        assert!(json.get("onFailure").is_none());
        assert!(json["processors"][0]["onFailure"][0].get("onFailure").is_none());
    }

    #[test]
    fn walk_visits_nested_branches_in_order() {
        let mut pipeline = Pipeline::new(vec![
            step_with_on_failure("a", "set", vec![step("a1", "set")]),
            step("b", "set"),
        ]);
        pipeline.on_failure.push(Arc::new(step("f", "fail")));
        assert_eq!(pipeline.ids(), vec!["a", "a1", "b", "f"]);
        assert_eq!(pipeline.step_count(), 4);
    }
}
