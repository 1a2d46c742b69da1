//! Contract interaction types.
//!
//! An [`Interaction`] pairs a request pattern with the response the provider
//! is expected to return while in a given provider state.

use crate::error::PactResult;
use crate::matcher::{MatchResult, Matcher, Mismatch, Pattern, join_key};
use crate::message::{HttpRequest, HttpResponse};
use serde_json::Value;
use std::collections::BTreeMap;

/// One expected request/response exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    /// Human-readable description, e.g. "forecast for Hamburg"
    pub description: String,
    /// Provider state (precondition), e.g. "weather forecast data"
    pub provider_state: String,
    /// Expected request
    pub request: RequestPattern,
    /// Response the provider must return
    pub response: ResponsePattern,
}

impl Interaction {
    /// Create an interaction.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        provider_state: impl Into<String>,
        request: RequestPattern,
        response: ResponsePattern,
    ) -> Self {
        Self {
            description: description.into(),
            provider_state: provider_state.into(),
            request,
            response,
        }
    }

    /// Identity within a store: `(provider_state, description)`.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.provider_state, &self.description)
    }

    /// Validate every matcher in both patterns.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PactError::InvalidPattern`] for the first invalid matcher.
    pub fn validate(&self) -> PactResult<()> {
        self.request.validate()?;
        self.response.validate()
    }
}

/// Expected HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPattern {
    /// HTTP method, upper case
    pub method: String,
    /// Path matcher
    pub path: Matcher,
    /// Header matchers keyed by header name
    pub headers: BTreeMap<String, Matcher>,
    /// Body pattern; `None` means the body is not checked
    pub body: Option<Pattern>,
}

impl RequestPattern {
    /// Create a request pattern with a literal path.
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::matching(method, Matcher::Exact(Value::String(path.into())))
    }

    /// Create a request pattern with an arbitrary path matcher.
    #[must_use]
    pub fn matching(method: impl Into<String>, path: Matcher) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Expect a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, matcher: Matcher) -> Self {
        self.headers.insert(name.into(), matcher);
        self
    }

    /// Expect a body.
    #[must_use]
    pub fn body(mut self, body: Pattern) -> Self {
        self.body = Some(body);
        self
    }

    /// Match a concrete request.
    ///
    /// # Errors
    ///
    /// Returns the first [`Mismatch`], checking method, path, headers and
    /// body in that order.
    pub fn matches(&self, actual: &HttpRequest) -> MatchResult {
        if !self.method.eq_ignore_ascii_case(&actual.method) {
            return Err(Mismatch::new("method", &self.method, &actual.method));
        }
        self.path.matches(&Value::String(actual.path.clone()), "path")?;
        match_headers(&self.headers, |name| actual.header(name))?;
        match_body(self.body.as_ref(), actual.body.as_ref())
    }

    /// Render a concrete request: literal fields as-is, other matchers via
    /// their example.
    #[must_use]
    pub fn render(&self) -> HttpRequest {
        HttpRequest {
            method: self.method.clone(),
            path: value_as_text(&self.path.example()),
            headers: render_headers(&self.headers),
            body: self.body.as_ref().map(Pattern::example),
        }
    }

    fn validate(&self) -> PactResult<()> {
        self.path.validate("request.path")?;
        validate_headers(&self.headers, "request.headers")?;
        self.body
            .as_ref()
            .map_or(Ok(()), |body| body.validate("request.body"))
    }
}

/// Expected HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePattern {
    /// Status code
    pub status: u16,
    /// Header matchers keyed by header name
    pub headers: BTreeMap<String, Matcher>,
    /// Body pattern; `None` means the body is not checked
    pub body: Option<Pattern>,
}

impl ResponsePattern {
    /// Create a response pattern with a status.
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Expect a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, matcher: Matcher) -> Self {
        self.headers.insert(name.into(), matcher);
        self
    }

    /// Expect a body.
    #[must_use]
    pub fn body(mut self, body: Pattern) -> Self {
        self.body = Some(body);
        self
    }

    /// Match a concrete response.
    ///
    /// # Errors
    ///
    /// Returns the first [`Mismatch`], checking status, headers and body in
    /// that order.
    pub fn matches(&self, actual: &HttpResponse) -> MatchResult {
        if self.status != actual.status {
            return Err(Mismatch::new(
                "status",
                self.status.to_string(),
                actual.status.to_string(),
            ));
        }
        match_headers(&self.headers, |name| actual.header(name))?;
        match_body(self.body.as_ref(), actual.body.as_ref())
    }

    /// Render the concrete response a stub returns for this pattern.
    ///
    /// A JSON `content-type` is added when there is a body and no content
    /// type was declared.
    #[must_use]
    pub fn render(&self) -> HttpResponse {
        let mut headers = render_headers(&self.headers);
        let body = self.body.as_ref().map(Pattern::example);
        if body.is_some() && !headers.contains_key("content-type") {
            headers.insert("content-type".to_string(), "application/json".to_string());
        }
        HttpResponse {
            status: self.status,
            headers,
            body,
        }
    }

    fn validate(&self) -> PactResult<()> {
        validate_headers(&self.headers, "response.headers")?;
        self.body
            .as_ref()
            .map_or(Ok(()), |body| body.validate("response.body"))
    }
}

/// Match a concrete request against a request pattern.
///
/// # Errors
///
/// See [`RequestPattern::matches`].
pub fn match_request(pattern: &RequestPattern, actual: &HttpRequest) -> MatchResult {
    pattern.matches(actual)
}

/// Match a concrete response against a response pattern.
///
/// # Errors
///
/// See [`ResponsePattern::matches`].
pub fn match_response(pattern: &ResponsePattern, actual: &HttpResponse) -> MatchResult {
    pattern.matches(actual)
}

fn match_headers<'a>(
    expected: &BTreeMap<String, Matcher>,
    lookup: impl Fn(&str) -> Option<&'a str>,
) -> MatchResult {
    for (name, matcher) in expected {
        let path = join_key("headers", &name.to_ascii_lowercase());
        match lookup(name) {
            Some(value) => matcher.matches(&Value::String(value.to_string()), &path)?,
            None => return Err(Mismatch::new(path, "header present", "absent")),
        }
    }
    Ok(())
}

fn match_body(expected: Option<&Pattern>, actual: Option<&Value>) -> MatchResult {
    match (expected, actual) {
        (None, _) => Ok(()),
        (Some(pattern), Some(body)) => pattern.matches(body, "body"),
        (Some(_), None) => Err(Mismatch::new("body", "a body", "absent")),
    }
}

fn render_headers(headers: &BTreeMap<String, Matcher>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, matcher)| (name.to_ascii_lowercase(), value_as_text(&matcher.example())))
        .collect()
}

fn validate_headers(headers: &BTreeMap<String, Matcher>, path: &str) -> PactResult<()> {
    headers
        .iter()
        .try_for_each(|(name, matcher)| matcher.validate(&join_key(path, name)))
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn forecast_interaction() -> Interaction {
        Interaction::new(
            "forecast for Hamburg",
            "weather forecast data",
            RequestPattern::new("GET", "/53.5511,9.9937"),
            ResponsePattern::new(200).body(Pattern::literal(json!({"summary": "Rain"}))),
        )
    }

    #[test]
    fn test_request_matching() {
        let interaction = forecast_interaction();
        assert!(interaction
            .request
            .matches(&HttpRequest::new("get", "/53.5511,9.9937"))
            .is_ok());

        let err = interaction
            .request
            .matches(&HttpRequest::new("POST", "/53.5511,9.9937"))
            .unwrap_err();
        assert_eq!(err.path, "method");

        let err = interaction
            .request
            .matches(&HttpRequest::new("GET", "/0,0"))
            .unwrap_err();
        assert_eq!(err.path, "path");
    }

    #[test]
    fn test_response_field_subset() {
        let pattern = ResponsePattern::new(200).body(Pattern::literal(json!({"summary": "Rain"})));

        let extra = HttpResponse::new(200).with_body(json!({"summary": "Rain", "icon": "rain-icon"}));
        assert!(pattern.matches(&extra).is_ok());

        let wrong = HttpResponse::new(200).with_body(json!({"summary": "Cloudy"}));
        assert_eq!(pattern.matches(&wrong).unwrap_err().path, "body.summary");

        let status = HttpResponse::new(404).with_body(json!({"summary": "Rain"}));
        assert_eq!(pattern.matches(&status).unwrap_err().path, "status");

        let empty = HttpResponse::new(200);
        assert_eq!(pattern.matches(&empty).unwrap_err().path, "body");
    }

    #[test]
    fn test_header_matching_is_case_insensitive() {
        let pattern = RequestPattern::new("GET", "/forecast")
            .header("Accept", Matcher::regex("application/.*json", "application/json"));

        let ok = HttpRequest::new("GET", "/forecast").with_header("accept", "application/json");
        assert!(pattern.matches(&ok).is_ok());

        let missing = HttpRequest::new("GET", "/forecast");
        assert_eq!(pattern.matches(&missing).unwrap_err().path, "headers.accept");
    }

    #[test]
    fn test_render_uses_examples() {
        let request = RequestPattern::matching("GET", Matcher::regex(r"/[0-9.]+,[0-9.]+", "/53.5511,9.9937"))
            .header("Accept", Matcher::exact("application/json"));
        let rendered = request.render();
        assert_eq!(rendered.path, "/53.5511,9.9937");
        assert_eq!(rendered.header("accept"), Some("application/json"));
        assert!(request.matches(&rendered).is_ok());

        let response = ResponsePattern::new(200).body(Pattern::object([(
            "summary",
            Pattern::from(Matcher::like("Rain")),
        )]));
        let rendered = response.render();
        assert_eq!(rendered.body, Some(json!({"summary": "Rain"})));
        assert_eq!(rendered.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_validate_names_location() {
        let interaction = Interaction::new(
            "bad",
            "",
            RequestPattern::matching("GET", Matcher::regex("[0-9]+", "abc")),
            ResponsePattern::new(200),
        );
        let err = interaction.validate().unwrap_err();
        assert!(err.to_string().contains("request.path"));
    }
}
