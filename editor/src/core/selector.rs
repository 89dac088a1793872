//! Structural addressing of steps inside a pipeline snapshot.
//!
//! A [`Selector`] is a path of [`Segment`]s. An index selects a position in a
//! step sequence; the `onFailure` key descends from a step into its failure
//! branch. The empty selector is the root processor sequence and a leading
//! `onFailure` is the pipeline-wide failure branch.
//!
//! [`write`] is copy-on-write: every container on the path is rebuilt, every
//! step off the path is shared with the previous snapshot by `Arc`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::{AddressingError, SelectorError};
use crate::pipeline::{Pipeline, Step};

/// Reserved textual key for a failure branch.
pub const ON_FAILURE_KEY: &str = "onFailure";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Index(usize),
    OnFailure,
}

impl Segment {
    pub fn parse(raw: &str) -> Result<Self, SelectorError> {
        if raw == ON_FAILURE_KEY {
            return Ok(Segment::OnFailure);
        }
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SelectorError::InvalidSegment(raw.to_string()));
        }
        raw.parse()
            .map(Segment::Index)
            .map_err(|_| SelectorError::InvalidSegment(raw.to_string()))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Index(idx) => write!(f, "{}", idx),
            Segment::OnFailure => f.write_str(ON_FAILURE_KEY),
        }
    }
}

/// Ordered path into a pipeline. Serialized as a list of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Selector(Vec<Segment>);

impl Selector {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// The root processor sequence.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// The pipeline-wide failure branch.
    pub fn root_on_failure() -> Self {
        Self(vec![Segment::OnFailure])
    }

    pub fn parse<I, S>(raw: I) -> Result<Self, SelectorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw.into_iter()
            .map(|segment| Segment::parse(segment.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn index(&self, idx: usize) -> Self {
        self.child(Segment::Index(idx))
    }

    pub fn on_failure(&self) -> Self {
        self.child(Segment::OnFailure)
    }

    fn child(&self, segment: Segment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// Split into the containing sequence and the position within it.
    ///
    /// Returns `None` unless the last segment is an index.
    pub fn split_position(&self) -> Option<(Selector, usize)> {
        match self.0.split_last() {
            Some((Segment::Index(idx), parent)) => Some((Self(parent.to_vec()), *idx)),
            _ => None,
        }
    }

    /// True if `self` equals `ancestor` or lies underneath it.
    pub fn starts_with(&self, ancestor: &Selector) -> bool {
        self.0.starts_with(&ancestor.0)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        let mut first = true;
        for segment in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            first = false;
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl TryFrom<Vec<String>> for Selector {
    type Error = SelectorError;

    fn try_from(raw: Vec<String>) -> Result<Self, Self::Error> {
        Selector::parse(raw)
    }
}

impl From<Selector> for Vec<String> {
    fn from(selector: Selector) -> Self {
        selector.0.iter().map(ToString::to_string).collect()
    }
}

/// What a selector resolves to.
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    Steps(&'a [Arc<Step>]),
    Step(&'a Arc<Step>),
}

/// What [`write`] stores at a selector.
#[derive(Debug, Clone)]
pub enum Replacement {
    Steps(Vec<Arc<Step>>),
    Step(Arc<Step>),
}

/// Resolve `selector`, or `None` if any segment does not exist.
pub fn read<'a>(selector: &Selector, tree: &'a Pipeline) -> Option<Entry<'a>> {
    try_read(selector, tree).ok()
}

/// Resolve `selector`, reporting which segment failed.
pub fn try_read<'a>(selector: &Selector, tree: &'a Pipeline) -> Result<Entry<'a>, AddressingError> {
    let segments = selector.segments();
    let (mut current, start) = match segments.first() {
        Some(Segment::OnFailure) => (Entry::Steps(&tree.on_failure), 1),
        _ => (Entry::Steps(&tree.processors), 0),
    };

    for (depth, segment) in segments.iter().enumerate().skip(start) {
        current = match (current, segment) {
            (Entry::Steps(steps), Segment::Index(idx)) => {
                Entry::Step(steps.get(*idx).ok_or_else(|| missing(selector, depth))?)
            }
            (Entry::Step(step), Segment::OnFailure) => Entry::Steps(
                step.on_failure
                    .as_deref()
                    .ok_or_else(|| missing(selector, depth))?,
            ),
            _ => return Err(mismatch(selector, depth)),
        };
    }

    Ok(current)
}

/// Resolve `selector` to a step sequence.
pub fn read_steps<'a>(
    selector: &Selector,
    tree: &'a Pipeline,
) -> Result<&'a [Arc<Step>], AddressingError> {
    match try_read(selector, tree)? {
        Entry::Steps(steps) => Ok(steps),
        Entry::Step(_) => Err(mismatch(selector, selector.len())),
    }
}

/// Resolve `selector` to a single step.
pub fn read_step<'a>(selector: &Selector, tree: &'a Pipeline) -> Result<&'a Arc<Step>, AddressingError> {
    match try_read(selector, tree)? {
        Entry::Step(step) => Ok(step),
        Entry::Steps(_) => Err(AddressingError::NotAPosition {
            selector: selector.to_string(),
        }),
    }
}

/// Return a new snapshot holding `value` at `selector`.
///
/// `None` clears the location: at an index the slot is spliced out, at a
/// step's `onFailure` the field is removed. A step branch left empty by either
/// is removed as well, so no step ever carries an empty `onFailure`.
pub fn write(
    selector: &Selector,
    tree: &Pipeline,
    value: Option<Replacement>,
) -> Result<Pipeline, AddressingError> {
    let segments = selector.segments();
    let mut next = Pipeline {
        processors: tree.processors.clone(),
        on_failure: tree.on_failure.clone(),
    };

    match segments.split_first() {
        None => next.processors = into_steps(selector, value)?,
        Some((Segment::OnFailure, [])) => next.on_failure = into_steps(selector, value)?,
        Some((Segment::OnFailure, rest)) => {
            next.on_failure = write_in_steps(&tree.on_failure, rest, 1, selector, value)?;
        }
        Some((Segment::Index(_), _)) => {
            next.processors = write_in_steps(&tree.processors, segments, 0, selector, value)?;
        }
    }

    Ok(next)
}

fn write_in_steps(
    steps: &[Arc<Step>],
    path: &[Segment],
    depth: usize,
    selector: &Selector,
    value: Option<Replacement>,
) -> Result<Vec<Arc<Step>>, AddressingError> {
    let (idx, rest) = match path.split_first() {
        Some((Segment::Index(idx), rest)) => (*idx, rest),
        _ => return Err(mismatch(selector, depth)),
    };

    let mut next = steps.to_vec();
    if !rest.is_empty() {
        let step = steps.get(idx).ok_or_else(|| missing(selector, depth))?;
        next[idx] = Arc::new(write_in_step(step, rest, depth + 1, selector, value)?);
        return Ok(next);
    }

    match value {
        Some(Replacement::Step(step)) if idx < next.len() => next[idx] = step,
        Some(Replacement::Step(step)) if idx == next.len() => next.push(step),
        None if idx < next.len() => {
            next.remove(idx);
        }
        Some(Replacement::Steps(_)) => {
            return Err(AddressingError::ValueMismatch {
                selector: selector.to_string(),
            });
        }
        _ => return Err(missing(selector, depth)),
    }
    Ok(next)
}

fn write_in_step(
    step: &Step,
    path: &[Segment],
    depth: usize,
    selector: &Selector,
    value: Option<Replacement>,
) -> Result<Step, AddressingError> {
    let rest = match path.split_first() {
        Some((Segment::OnFailure, rest)) => rest,
        _ => return Err(mismatch(selector, depth)),
    };

    let branch = if rest.is_empty() {
        into_steps(selector, value)?
    } else {
        let current = step
            .on_failure
            .as_deref()
            .ok_or_else(|| missing(selector, depth))?;
        write_in_steps(current, rest, depth + 1, selector, value)?
    };

    Ok(Step {
        id: step.id.clone(),
        kind: step.kind.clone(),
        options: step.options.clone(),
        on_failure: (!branch.is_empty()).then_some(branch),
    })
}

fn into_steps(
    selector: &Selector,
    value: Option<Replacement>,
) -> Result<Vec<Arc<Step>>, AddressingError> {
    match value {
        None => Ok(Vec::new()),
        Some(Replacement::Steps(steps)) => Ok(steps),
        Some(Replacement::Step(_)) => Err(AddressingError::ValueMismatch {
            selector: selector.to_string(),
        }),
    }
}

fn missing(selector: &Selector, depth: usize) -> AddressingError {
    AddressingError::Missing {
        selector: selector.to_string(),
        depth,
    }
}

fn mismatch(selector: &Selector, depth: usize) -> AddressingError {
    AddressingError::Mismatch {
        selector: selector.to_string(),
        depth,
    }
}
