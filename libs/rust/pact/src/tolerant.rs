//! Tolerant reader for provider payloads.
//!
//! A consumer declares the handful of fields it actually uses as a
//! [`Whitelist`] of dotted paths with their expected kinds. Everything else
//! in the payload is ignored, so the provider may add, rename or reorder
//! other fields without breaking the consumer.
//!
//! ```
//! use forecast_pact::ValueKind;
//! use forecast_pact::tolerant::{Whitelist, parse};
//!
//! let whitelist = Whitelist::new().field("currently.summary", ValueKind::String);
//! let record = parse(r#"{"currently":{"summary":"Rain","extra":{"noise":1}}}"#, &whitelist).unwrap();
//! assert_eq!(record.str("currently.summary"), Some("Rain"));
//! ```

use crate::kind::ValueKind;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Tolerant reader errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The payload is not JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// A whitelisted field is absent
    #[error("Missing field '{path}'")]
    MissingField {
        /// Whitelisted path
        path: String,
    },

    /// A whitelisted field, or one of its parents, has the wrong kind
    #[error("Field '{path}' should be {expected}, found {actual}")]
    TypeMismatch {
        /// Path of the offending value
        path: String,
        /// Declared kind
        expected: ValueKind,
        /// Kind found in the payload
        actual: ValueKind,
    },
}

/// Fields a consumer reads, with their expected kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    fields: BTreeMap<String, ValueKind>,
}

impl Whitelist {
    /// Create an empty whitelist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `path` (dot-separated; numeric segments index arrays) and
    /// require it to be of `kind`.
    #[must_use]
    pub fn field(mut self, path: impl Into<String>, kind: ValueKind) -> Self {
        self.fields.insert(path.into(), kind);
        self
    }

    /// Whitelisted paths with their kinds, in path order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, ValueKind)> {
        self.fields.iter().map(|(path, kind)| (path.as_str(), *kind))
    }

    /// Number of whitelisted paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether nothing is whitelisted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Values extracted for each whitelisted path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TolerantRecord {
    values: BTreeMap<String, Value>,
}

impl TolerantRecord {
    /// Raw value at a whitelisted path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }

    /// String at a whitelisted path.
    #[must_use]
    pub fn str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Number at a whitelisted path.
    #[must_use]
    pub fn f64(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(Value::as_f64)
    }

    /// Integer at a whitelisted path.
    #[must_use]
    pub fn i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    /// Boolean at a whitelisted path.
    #[must_use]
    pub fn bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    /// Number of extracted values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse raw JSON, extracting only whitelisted fields.
///
/// # Errors
///
/// - [`ParseError::InvalidJson`] if `raw` is not JSON
/// - [`ParseError::MissingField`] for an absent whitelisted path
/// - [`ParseError::TypeMismatch`] for a value of the wrong kind
pub fn parse(raw: &str, whitelist: &Whitelist) -> Result<TolerantRecord, ParseError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    parse_value(&value, whitelist)
}

/// Extract whitelisted fields from an already decoded value.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_value(value: &Value, whitelist: &Whitelist) -> Result<TolerantRecord, ParseError> {
    let mut values = BTreeMap::new();
    for (path, kind) in whitelist.fields() {
        let found = lookup(value, path)?;
        if !kind.admits(found) {
            return Err(ParseError::TypeMismatch {
                path: path.to_string(),
                expected: kind,
                actual: ValueKind::of(found),
            });
        }
        values.insert(path.to_string(), found.clone());
    }
    Ok(TolerantRecord { values })
}

fn lookup<'a>(root: &'a Value, path: &str) -> Result<&'a Value, ParseError> {
    let mut current = root;
    let mut walked = String::new();
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => match segment.parse::<usize>() {
                Ok(index) => items.get(index),
                Err(_) => {
                    return Err(ParseError::TypeMismatch {
                        path: parent_path(&walked),
                        expected: ValueKind::Object,
                        actual: ValueKind::Array,
                    });
                }
            },
            scalar => {
                return Err(ParseError::TypeMismatch {
                    path: parent_path(&walked),
                    expected: ValueKind::Object,
                    actual: ValueKind::of(scalar),
                });
            }
        };
        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(segment);
        current = next.ok_or_else(|| ParseError::MissingField {
            path: path.to_string(),
        })?;
    }
    Ok(current)
}

fn parent_path(walked: &str) -> String {
    if walked.is_empty() {
        "(root)".to_string()
    } else {
        walked.to_string()
    }
}
