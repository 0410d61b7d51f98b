#![forbid(unsafe_code)]

//! Streaming JSON stringifier with path-based field exclusion.
//!
//! [`stringify`] walks a [`serde_json::Value`] depth-first and writes compact
//! JSON. Every object field is addressed by its slash-joined path from the
//! root (array elements contribute their index as a segment), for example
//! `root/child1/views/0/navigation/id`.
//!
//! Fields are dropped when their path matches an [`Exclusion`] glob and the
//! exclusion's optional predicate accepts the field:
//!
//! | glob token | matches |
//! |------------|---------|
//! | `*`        | exactly one segment |
//! | `**`       | zero or more segments |
//! | `abc*`     | one segment starting with `abc` |
//!
//! Predicates receive an [`ExclusionContext`] exposing the full ancestor
//! chain (segments and values), so exclusions can be refined by the kind of
//! object holding the field rather than by its path alone.
//!
//! With [`StringifyOptions::sorted`] object keys are emitted in alphabetical
//! order, which yields a canonical form suitable for equality comparison.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use workbench_core::stringify::{Exclusion, StringifyOptions, stringify};
//!
//! let value = json!({"b": {"visible": true, "id": "x"}, "a": 1});
//! let options = StringifyOptions::new()
//!     .exclude(Exclusion::new("**/visible").unwrap())
//!     .sorted();
//! assert_eq!(stringify(&value, &options), r#"{"a":1,"b":{"id":"x"}}"#);
//! ```

use std::collections::VecDeque;
use std::fmt;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Predicate refining an [`Exclusion`] beyond its path glob.
pub type ExclusionPredicate = Box<dyn Fn(&ExclusionContext<'_>) -> bool + Send + Sync>;

/// Errors raised while compiling an exclusion glob.
#[derive(Debug, Error)]
pub enum GlobError {
    #[error("exclusion glob must not be empty")]
    Empty,
    #[error("exclusion glob {glob:?} contains an empty segment")]
    EmptySegment { glob: String },
    #[error("exclusion glob {glob:?} did not compile: {source}")]
    Regex {
        glob: String,
        #[source]
        source: regex::Error,
    },
}

/// One field-exclusion rule: a compiled path glob plus an optional predicate.
pub struct Exclusion {
    glob: String,
    pattern: Regex,
    predicate: Option<ExclusionPredicate>,
}

impl Exclusion {
    /// Compile an exclusion glob.
    pub fn new(glob: &str) -> Result<Self, GlobError> {
        Ok(Self {
            glob: glob.to_owned(),
            pattern: compile_glob(glob)?,
            predicate: None,
        })
    }

    /// Only exclude matching fields for which `predicate` holds.
    #[must_use]
    pub fn when(
        mut self,
        predicate: impl Fn(&ExclusionContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Source glob this exclusion was compiled from.
    #[must_use]
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// Whether the field described by `context` is excluded.
    #[must_use]
    pub fn matches(&self, context: &ExclusionContext<'_>) -> bool {
        self.pattern.is_match(&context.path())
            && self
                .predicate
                .as_ref()
                .is_none_or(|predicate| predicate(context))
    }
}

impl fmt::Debug for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exclusion")
            .field("glob", &self.glob)
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}

/// The field being visited when exclusions are evaluated.
#[derive(Debug, Clone, Copy)]
pub struct ExclusionContext<'a> {
    segments: &'a [String],
    key: &'a str,
    ancestors: &'a [&'a Value],
    value: &'a Value,
}

impl<'a> ExclusionContext<'a> {
    /// Field name.
    #[must_use]
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// Field value.
    #[must_use]
    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// Slash-joined path of the field, including its own key.
    #[must_use]
    pub fn path(&self) -> String {
        let mut path = String::new();
        for segment in self.segments {
            path.push_str(segment);
            path.push('/');
        }
        path.push_str(self.key);
        path
    }

    /// Path segments of the enclosing containers, root first.
    #[must_use]
    pub fn segments(&self) -> &'a [String] {
        self.segments
    }

    /// Values of every open container, root first; the last entry is the
    /// object holding the field.
    #[must_use]
    pub fn ancestors(&self) -> &'a [&'a Value] {
        self.ancestors
    }

    /// The object holding the field.
    #[must_use]
    pub fn parent(&self) -> Option<&'a Value> {
        self.ancestors.last().copied()
    }
}

/// Options controlling [`stringify`].
#[derive(Debug, Default)]
pub struct StringifyOptions {
    pub exclusions: Vec<Exclusion>,
    pub sort: bool,
}

impl StringifyOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exclusion rule.
    #[must_use]
    pub fn exclude(mut self, exclusion: Exclusion) -> Self {
        self.exclusions.push(exclusion);
        self
    }

    /// Emit object keys in alphabetical order.
    #[must_use]
    pub fn sorted(mut self) -> Self {
        self.sort = true;
        self
    }

    fn is_excluded(&self, context: &ExclusionContext<'_>) -> bool {
        self.exclusions
            .iter()
            .any(|exclusion| exclusion.matches(context))
    }
}

/// Serialize `value` with serde and stringify the result.
pub fn stringify_serializable<T: Serialize + ?Sized>(
    value: &T,
    options: &StringifyOptions,
) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    Ok(stringify(&value, options))
}

enum Frame<'v> {
    Object {
        pending: VecDeque<(&'v String, &'v Value)>,
        wrote_any: bool,
    },
    Array {
        pending: std::slice::Iter<'v, Value>,
        index: usize,
        wrote_any: bool,
    },
}

enum Step<'v> {
    Close(char),
    Field(&'v String, &'v Value),
    Element(usize, &'v Value),
}

/// Stringify `value` to compact JSON, honoring exclusions and key sorting.
#[must_use]
pub fn stringify(value: &Value, options: &StringifyOptions) -> String {
    let mut out = String::new();
    // `stack`, `ancestors` and `segments` move in lockstep: one entry per
    // open container, except that the root container has no segment.
    let mut stack: Vec<Frame<'_>> = Vec::new();
    let mut ancestors: Vec<&Value> = Vec::new();
    let mut segments: Vec<String> = Vec::new();

    open(value, None, options, &mut out, &mut stack, &mut ancestors, &mut segments);

    loop {
        let step = match stack.last_mut() {
            None => break,
            Some(Frame::Object { pending, .. }) => match pending.pop_front() {
                Some((key, child)) => Step::Field(key, child),
                None => Step::Close('}'),
            },
            Some(Frame::Array { pending, index, .. }) => match pending.next() {
                Some(child) => {
                    let current = *index;
                    *index += 1;
                    Step::Element(current, child)
                }
                None => Step::Close(']'),
            },
        };

        match step {
            Step::Close(bracket) => {
                out.push(bracket);
                let _ = stack.pop();
                let _ = ancestors.pop();
                if !stack.is_empty() {
                    let _ = segments.pop();
                }
            }
            Step::Field(key, child) => {
                let context = ExclusionContext {
                    segments: &segments,
                    key,
                    ancestors: &ancestors,
                    value: child,
                };
                if options.is_excluded(&context) {
                    continue;
                }
                write_separator(&mut stack, &mut out);
                out.push_str(&Value::from(key.as_str()).to_string());
                out.push(':');
                open(
                    child,
                    Some(key.clone()),
                    options,
                    &mut out,
                    &mut stack,
                    &mut ancestors,
                    &mut segments,
                );
            }
            Step::Element(index, child) => {
                write_separator(&mut stack, &mut out);
                open(
                    child,
                    Some(index.to_string()),
                    options,
                    &mut out,
                    &mut stack,
                    &mut ancestors,
                    &mut segments,
                );
            }
        }
    }

    out
}

fn write_separator(stack: &mut [Frame<'_>], out: &mut String) {
    if let Some(Frame::Object { wrote_any, .. } | Frame::Array { wrote_any, .. }) =
        stack.last_mut()
    {
        if *wrote_any {
            out.push(',');
        }
        *wrote_any = true;
    }
}

fn open<'v>(
    value: &'v Value,
    segment: Option<String>,
    options: &StringifyOptions,
    out: &mut String,
    stack: &mut Vec<Frame<'v>>,
    ancestors: &mut Vec<&'v Value>,
    segments: &mut Vec<String>,
) {
    match value {
        Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            if options.sort {
                entries.sort_by(|(left, _), (right, _)| left.cmp(right));
            }
            out.push('{');
            if let Some(segment) = segment {
                segments.push(segment);
            }
            ancestors.push(value);
            stack.push(Frame::Object {
                pending: entries.into(),
                wrote_any: false,
            });
        }
        Value::Array(items) => {
            out.push('[');
            if let Some(segment) = segment {
                segments.push(segment);
            }
            ancestors.push(value);
            stack.push(Frame::Array {
                pending: items.iter(),
                index: 0,
                wrote_any: false,
            });
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Compile a slash-separated glob into an anchored regex.
pub fn compile_glob(glob: &str) -> Result<Regex, GlobError> {
    if glob.is_empty() {
        return Err(GlobError::Empty);
    }
    let parts = glob.split('/').collect::<Vec<_>>();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(GlobError::EmptySegment {
            glob: glob.to_owned(),
        });
    }

    let last = parts.len() - 1;
    let mut pattern = String::from("^");
    for (index, part) in parts.iter().enumerate() {
        let follows_globstar = index > 0 && parts[index - 1] == "**";
        if *part == "**" {
            match (index, index == last) {
                (0, true) => pattern.push_str(".*"),
                (_, true) => pattern.push_str("(?:/[^/]+)*"),
                (0, false) => pattern.push_str("(?:[^/]+/)*"),
                (_, false) => {
                    if !follows_globstar {
                        pattern.push('/');
                    }
                    pattern.push_str("(?:[^/]+/)*");
                }
            }
            continue;
        }
        if index > 0 && !follows_globstar {
            pattern.push('/');
        }
        pattern.push_str(&segment_pattern(part));
    }
    pattern.push('$');

    Regex::new(&pattern).map_err(|source| GlobError::Regex {
        glob: glob.to_owned(),
        source,
    })
}

fn segment_pattern(segment: &str) -> String {
    if segment == "*" {
        return "[^/]+".to_owned();
    }
    segment
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("[^/]*")
}
