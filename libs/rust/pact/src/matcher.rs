//! Matchers and matcher-annotated patterns.
//!
//! A [`Pattern`] describes what a consumer expects of a message body: a
//! tree of nested objects and arrays whose leaves are [`Matcher`]s. Objects
//! match by field subset, so fields the pattern does not mention are ignored
//! in the actual value. Arrays match positionally unless declared
//! [`Pattern::EachLike`].
//!
//! Every failed match reports the first point of divergence as a
//! [`Mismatch`] with a dotted path such as `body.currently.summary` or
//! `body.daily[2]`.

use crate::error::{PactError, PactResult};
use crate::kind::ValueKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// First point of divergence between a pattern and an actual value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Path to the diverging value, e.g. `body.currently.summary`
    pub path: String,
    /// Description of what the pattern expected
    pub expected: String,
    /// Description of what was found
    pub actual: String,
}

impl Mismatch {
    /// Create a mismatch.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    fn absent(path: &str, expected: impl Into<String>) -> Self {
        Self::new(path, expected, "absent")
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, got {}", self.path, self.expected, self.actual)
    }
}

/// Result of a single match.
pub type MatchResult = Result<(), Mismatch>;

/// Leaf matcher applied to a single value.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Structural equality with the given value
    Exact(Value),
    /// A string fully matching `pattern`; `example` is rendered when a
    /// concrete value is needed
    Regex {
        /// Regular expression, implicitly anchored at both ends
        pattern: String,
        /// Concrete value satisfying `pattern`
        example: String,
    },
    /// Any value of the given kind
    Type {
        /// Required kind
        kind: ValueKind,
        /// Concrete value of `kind`
        example: Value,
    },
}

impl Matcher {
    /// Match exactly this value.
    #[must_use]
    pub fn exact(value: impl Into<Value>) -> Self {
        Self::Exact(value.into())
    }

    /// Match strings against a regular expression.
    #[must_use]
    pub fn regex(pattern: impl Into<String>, example: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            example: example.into(),
        }
    }

    /// Match any value of the same kind as `example`.
    #[must_use]
    pub fn like(example: impl Into<Value>) -> Self {
        let example = example.into();
        Self::Type {
            kind: ValueKind::of(&example),
            example,
        }
    }

    /// Concrete value satisfying this matcher.
    #[must_use]
    pub fn example(&self) -> Value {
        match self {
            Self::Exact(value) => value.clone(),
            Self::Regex { example, .. } => Value::String(example.clone()),
            Self::Type { example, .. } => example.clone(),
        }
    }

    /// Match `actual`, reporting divergence under `path`.
    ///
    /// # Errors
    ///
    /// Returns the first [`Mismatch`] found.
    pub fn matches(&self, actual: &Value, path: &str) -> MatchResult {
        match self {
            Self::Exact(expected) => diff_exact(expected, actual, path),
            Self::Regex { pattern, .. } => {
                let Value::String(text) = actual else {
                    return Err(Mismatch::new(path, self.describe(), describe_value(actual)));
                };
                match full_match_regex(pattern) {
                    Ok(re) if re.is_match(text) => Ok(()),
                    Ok(_) => Err(Mismatch::new(path, self.describe(), describe_value(actual))),
                    Err(e) => Err(Mismatch::new(path, format!("valid regex ({e})"), describe_value(actual))),
                }
            }
            Self::Type { kind, .. } => {
                if kind.admits(actual) {
                    Ok(())
                } else {
                    Err(Mismatch::new(
                        path,
                        self.describe(),
                        format!("{} {}", ValueKind::of(actual), describe_value(actual)),
                    ))
                }
            }
        }
    }

    /// Check the matcher is usable: regexes compile and examples satisfy
    /// their own matcher.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::InvalidPattern`] naming `path`.
    pub fn validate(&self, path: &str) -> PactResult<()> {
        match self {
            Self::Exact(_) => Ok(()),
            Self::Regex { pattern, example } => {
                let re = full_match_regex(pattern)
                    .map_err(|e| PactError::invalid_pattern(path, format!("invalid regex: {e}")))?;
                if re.is_match(example) {
                    Ok(())
                } else {
                    Err(PactError::invalid_pattern(
                        path,
                        format!("example '{example}' does not match /{pattern}/"),
                    ))
                }
            }
            Self::Type { kind, example } => {
                if kind.admits(example) {
                    Ok(())
                } else {
                    Err(PactError::invalid_pattern(
                        path,
                        format!("example {example} is not of kind {kind}"),
                    ))
                }
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Exact(value) => value.to_string(),
            Self::Regex { pattern, .. } => format!("string matching /{pattern}/"),
            Self::Type { kind, .. } => format!("any {kind}"),
        }
    }
}

/// A matcher-annotated structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// A single matcher
    Value(Matcher),
    /// Object whose listed fields must match; other fields are ignored
    Object(BTreeMap<String, Pattern>),
    /// Array matched element by element; lengths must agree
    Array(Vec<Pattern>),
    /// Array whose every element matches `template`
    EachLike {
        /// Pattern applied to each element
        template: Box<Pattern>,
        /// Minimum number of elements
        min: usize,
    },
}

impl Pattern {
    /// Build a pattern that matches `value` literally, with objects matched
    /// by field subset.
    #[must_use]
    pub fn literal(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Self::literal(value)))
                    .collect(),
            ),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::literal).collect()),
            scalar => Self::Value(Matcher::Exact(scalar)),
        }
    }

    /// Build an object pattern from `(field, pattern)` pairs.
    #[must_use]
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Object(fields.into_iter().map(|(k, p)| (k.into(), p)).collect())
    }

    /// Build an each-like array pattern.
    #[must_use]
    pub fn each_like(template: Self, min: usize) -> Self {
        Self::EachLike {
            template: Box::new(template),
            min,
        }
    }

    /// Render a concrete value satisfying this pattern.
    #[must_use]
    pub fn example(&self) -> Value {
        match self {
            Self::Value(matcher) => matcher.example(),
            Self::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, pattern)| (key.clone(), pattern.example()))
                    .collect::<Map<_, _>>(),
            ),
            Self::Array(items) => Value::Array(items.iter().map(Self::example).collect()),
            Self::EachLike { template, min } => {
                let element = template.example();
                Value::Array(vec![element; (*min).max(1)])
            }
        }
    }

    /// Match `actual`, reporting divergence under `path`.
    ///
    /// # Errors
    ///
    /// Returns the first [`Mismatch`] found, walking object fields in key
    /// order and array elements by index.
    pub fn matches(&self, actual: &Value, path: &str) -> MatchResult {
        match self {
            Self::Value(matcher) => matcher.matches(actual, path),
            Self::Object(fields) => {
                let Value::Object(map) = actual else {
                    return Err(Mismatch::new(path, "object", describe_value(actual)));
                };
                for (key, pattern) in fields {
                    let field_path = join_key(path, key);
                    match map.get(key) {
                        Some(value) => pattern.matches(value, &field_path)?,
                        None => return Err(Mismatch::absent(&field_path, pattern.describe())),
                    }
                }
                Ok(())
            }
            Self::Array(items) => {
                let Value::Array(values) = actual else {
                    return Err(Mismatch::new(path, self.describe(), describe_value(actual)));
                };
                if values.len() != items.len() {
                    return Err(Mismatch::new(
                        path,
                        self.describe(),
                        format!("array of length {}", values.len()),
                    ));
                }
                items
                    .iter()
                    .zip(values)
                    .enumerate()
                    .try_for_each(|(i, (pattern, value))| pattern.matches(value, &join_index(path, i)))
            }
            Self::EachLike { template, min } => {
                let Value::Array(values) = actual else {
                    return Err(Mismatch::new(path, self.describe(), describe_value(actual)));
                };
                if values.len() < *min {
                    return Err(Mismatch::new(
                        path,
                        self.describe(),
                        format!("array of length {}", values.len()),
                    ));
                }
                values
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, value)| template.matches(value, &join_index(path, i)))
            }
        }
    }

    /// Validate every matcher in the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::InvalidPattern`] for the first invalid matcher.
    pub fn validate(&self, path: &str) -> PactResult<()> {
        match self {
            Self::Value(matcher) => matcher.validate(path),
            Self::Object(fields) => fields
                .iter()
                .try_for_each(|(key, pattern)| pattern.validate(&join_key(path, key))),
            Self::Array(items) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, pattern)| pattern.validate(&join_index(path, i))),
            Self::EachLike { template, .. } => template.validate(&join_index(path, 0)),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Value(matcher) => matcher.describe(),
            Self::Object(_) => "object".to_string(),
            Self::Array(items) => format!("array of length {}", items.len()),
            Self::EachLike { min, .. } => format!("array of at least {min} element(s)"),
        }
    }
}

impl From<Matcher> for Pattern {
    fn from(matcher: Matcher) -> Self {
        Self::Value(matcher)
    }
}

/// Match `actual` against `pattern`, reporting divergence under `path`.
///
/// # Errors
///
/// Returns the first [`Mismatch`] found.
pub fn match_pattern(pattern: &Pattern, actual: &Value, path: &str) -> MatchResult {
    pattern.matches(actual, path)
}

/// Append an object key to a path.
#[must_use]
pub fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Append an array index to a path.
#[must_use]
pub fn join_index(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

/// Compile a regex that must match the whole input.
///
/// # Errors
///
/// Returns the regex compilation error.
pub fn full_match_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

fn describe_value(value: &Value) -> String {
    const LIMIT: usize = 120;
    let text = value.to_string();
    if text.len() <= LIMIT {
        text
    } else {
        let cut = (0..=LIMIT).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &text[..cut])
    }
}

#[allow(clippy::float_cmp)]
fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    match (a.as_i64(), b.as_i64(), a.as_u64(), b.as_u64()) {
        (Some(x), Some(y), _, _) => x == y,
        (_, _, Some(x), Some(y)) => x == y,
        _ => a.as_f64() == b.as_f64(),
    }
}

/// Exact structural comparison that reports where the values diverge.
/// Object key order is irrelevant; numbers compare by value.
fn diff_exact(expected: &Value, actual: &Value, path: &str) -> MatchResult {
    match (expected, actual) {
        (Value::Object(want), Value::Object(got)) => {
            for (key, value) in want {
                let field_path = join_key(path, key);
                match got.get(key) {
                    Some(found) => diff_exact(value, found, &field_path)?,
                    None => return Err(Mismatch::absent(&field_path, describe_value(value))),
                }
            }
            match got.keys().find(|key| !want.contains_key(*key)) {
                Some(extra) => Err(Mismatch::new(
                    join_key(path, extra),
                    "absent",
                    describe_value(&got[extra.as_str()]),
                )),
                None => Ok(()),
            }
        }
        (Value::Array(want), Value::Array(got)) => {
            if want.len() != got.len() {
                return Err(Mismatch::new(
                    path,
                    format!("array of length {}", want.len()),
                    format!("array of length {}", got.len()),
                ));
            }
            want.iter()
                .zip(got)
                .enumerate()
                .try_for_each(|(i, (w, g))| diff_exact(w, g, &join_index(path, i)))
        }
        (Value::Number(a), Value::Number(b)) if numbers_equal(a, b) => Ok(()),
        (want, got) if want == got => Ok(()),
        (want, got) => Err(Mismatch::new(path, describe_value(want), describe_value(got))),
    }
}
