//! Plain-text outline of a snapshot, one step per line.

use std::sync::Arc;

use crate::core::selector::Selector;
use crate::pipeline::{Pipeline, Step};

/// Render every step as `<indent><selector> <type> (<id>)`, depth-first.
pub fn render_outline(pipeline: &Pipeline) -> String {
    let mut out = String::new();
    if pipeline.processors.is_empty() {
        out.push_str("(no processors)\n");
    }
    render_steps(&mut out, &pipeline.processors, &Selector::root(), 0);
    render_steps(&mut out, &pipeline.on_failure, &Selector::root_on_failure(), 0);
    out
}

fn render_steps(out: &mut String, steps: &[Arc<Step>], container: &Selector, depth: usize) {
    for (idx, step) in steps.iter().enumerate() {
        let path = container.index(idx);
        out.push_str(&format!(
            "{}{} {} ({})\n",
            "  ".repeat(depth),
            path,
            step.kind,
            step.id
        ));
        if let Some(branch) = &step.on_failure {
            render_steps(out, branch, &path.on_failure(), depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{step, step_with_on_failure};

    #[test]
    fn outline_lists_selectors_depth_first() {
        let mut pipeline = Pipeline::new(vec![
            step_with_on_failure("a", "set", vec![step("a1", "remove")]),
            step("b", "drop"),
        ]);
        pipeline.on_failure.push(Arc::new(step("f", "fail")));

        assert_eq!(
            render_outline(&pipeline),
            "0 set (a)\n  0.onFailure.0 remove (a1)\n1 drop (b)\nonFailure.0 fail (f)\n"
        );
    }

    #[test]
    fn outline_marks_empty_pipeline() {
        assert_eq!(render_outline(&Pipeline::default()), "(no processors)\n");
    }
}
