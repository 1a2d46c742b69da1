//! Structural kinds of JSON values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The runtime shape of a JSON value, ignoring its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// JSON string
    String,
    /// JSON number (integer or float)
    Number,
    /// JSON boolean
    Boolean,
    /// JSON array
    Array,
    /// JSON object
    Object,
    /// JSON null
    Null,
}

impl ValueKind {
    /// Classify a JSON value.
    #[must_use]
    pub const fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => Self::String,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Boolean,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
            Value::Null => Self::Null,
        }
    }

    /// Whether `value` has this kind.
    #[must_use]
    pub const fn admits(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::String, Value::String(_))
                | (Self::Number, Value::Number(_))
                | (Self::Boolean, Value::Bool(_))
                | (Self::Array, Value::Array(_))
                | (Self::Object, Value::Object(_))
                | (Self::Null, Value::Null)
        )
    }

    /// Lowercase name as used in artifacts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            "null" => Ok(Self::Null),
            other => Err(format!("unknown value kind '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify() {
        assert_eq!(ValueKind::of(&json!("Rain")), ValueKind::String);
        assert_eq!(ValueKind::of(&json!(12.5)), ValueKind::Number);
        assert_eq!(ValueKind::of(&json!(false)), ValueKind::Boolean);
        assert_eq!(ValueKind::of(&json!([1])), ValueKind::Array);
        assert_eq!(ValueKind::of(&json!({})), ValueKind::Object);
        assert_eq!(ValueKind::of(&Value::Null), ValueKind::Null);
    }

    #[test]
    fn test_parse_round_trip() {
        for kind in [
            ValueKind::String,
            ValueKind::Number,
            ValueKind::Boolean,
            ValueKind::Array,
            ValueKind::Object,
            ValueKind::Null,
        ] {
            assert_eq!(kind.as_str().parse::<ValueKind>(), Ok(kind));
        }
        assert!("float".parse::<ValueKind>().is_err());
    }
}
