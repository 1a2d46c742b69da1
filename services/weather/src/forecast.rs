//! Forecast model.
//!
//! The service reads one field of the upstream payload. Everything else the
//! API returns is ignored, so upstream additions never break decoding.

use forecast_pact::tolerant::{self, ParseError, TolerantRecord, Whitelist};
use forecast_pact::ValueKind;
use serde::{Deserialize, Serialize};

/// Path of the current-conditions summary in the upstream payload.
pub const SUMMARY_PATH: &str = "currently.summary";

/// The part of a forecast the service uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherResponse {
    /// Current conditions, e.g. "Rain"
    pub summary: String,
}

impl WeatherResponse {
    /// Fields read from the upstream payload.
    #[must_use]
    pub fn whitelist() -> Whitelist {
        Whitelist::new().field(SUMMARY_PATH, ValueKind::String)
    }

    /// Decode a raw upstream body.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the body is not JSON or
    /// `currently.summary` is missing or not a string.
    pub fn from_body(body: &str) -> Result<Self, ParseError> {
        let record = tolerant::parse(body, &Self::whitelist())?;
        Self::from_record(&record)
    }

    /// Build from an already extracted record.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingField`] when the record lacks the summary.
    pub fn from_record(record: &TolerantRecord) -> Result<Self, ParseError> {
        let summary = record
            .str(SUMMARY_PATH)
            .ok_or_else(|| ParseError::MissingField {
                path: SUMMARY_PATH.to_string(),
            })?;
        Ok(Self {
            summary: summary.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::forecast_payload;

    #[test]
    fn test_full_payload() {
        let body = forecast_payload("Rain").to_string();
        assert_eq!(
            WeatherResponse::from_body(&body).unwrap(),
            WeatherResponse {
                summary: "Rain".to_string()
            }
        );
    }

    #[test]
    fn test_renamed_field() {
        let err = WeatherResponse::from_body(r#"{"currently":{"headline":"Rain"}}"#).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingField {
                path: "currently.summary".to_string()
            }
        );
    }

    #[test]
    fn test_wrong_kind() {
        let err = WeatherResponse::from_body(r#"{"currently":{"summary":7}}"#).unwrap_err();
        assert!(matches!(
            err,
            ParseError::TypeMismatch { ref path, expected: ValueKind::String, actual: ValueKind::Number }
                if path == "currently.summary"
        ));
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(
            WeatherResponse::from_body("<html>"),
            Err(ParseError::InvalidJson(_))
        ));
    }
}
