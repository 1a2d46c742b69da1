//! Contract artifact writer and reader.
//!
//! The artifact is the only durable output of a consumer run and the only
//! input of a provider run, possibly on another machine. Its JSON layout is
//! a public wire format:
//!
//! ```json
//! {
//!   "consumer": { "name": "weather-service" },
//!   "interactions": [
//!     {
//!       "description": "forecast for Hamburg",
//!       "providerState": "weather forecast data",
//!       "request": { "method": "GET", "path": "/53.5511,9.9937" },
//!       "response": { "status": 200, "body": { "summary": "Rain" } }
//!     }
//!   ],
//!   "metadata": { "contractFormat": { "version": "1.0" } },
//!   "provider": { "name": "weather-api" }
//! }
//! ```
//!
//! Matchers other than a scalar literal are tagged objects
//! (`{"$match": "regex", "pattern": .., "example": ..}`). A body object
//! that itself has a `$match` field is wrapped as
//! `{"$match": "object", "fields": {..}}`. Keys are always
//! written sorted, so writing an unchanged contract twice gives identical
//! bytes. The reader ignores fields it does not know.

use crate::contract::{Interaction, RequestPattern, ResponsePattern};
use crate::error::{PactError, PactResult};
use crate::kind::ValueKind;
use crate::matcher::{Matcher, Pattern, join_index, join_key};
use crate::store::InteractionStore;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Contract format version written to new artifacts.
pub const CONTRACT_FORMAT_VERSION: &str = "1.0";

const MATCH_TAG: &str = "$match";

/// A contract between one consumer and one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractArtifact {
    /// Consumer name
    pub consumer: String,
    /// Provider name
    pub provider: String,
    /// Interactions in recording order
    pub interactions: Vec<Interaction>,
    /// Format metadata
    pub metadata: ArtifactMetadata,
}

/// Artifact format metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    /// Contract format version, `major.minor`
    pub format_version: String,
}

impl Default for ArtifactMetadata {
    fn default() -> Self {
        Self {
            format_version: CONTRACT_FORMAT_VERSION.to_string(),
        }
    }
}

impl ContractArtifact {
    /// Create an artifact.
    #[must_use]
    pub fn new(
        consumer: impl Into<String>,
        provider: impl Into<String>,
        interactions: Vec<Interaction>,
    ) -> Self {
        Self {
            consumer: consumer.into(),
            provider: provider.into(),
            interactions,
            metadata: ArtifactMetadata::default(),
        }
    }

    /// Snapshot a store.
    #[must_use]
    pub fn from_store(consumer: &str, provider: &str, store: &InteractionStore) -> Self {
        Self::new(consumer, provider, store.all_interactions())
    }

    /// Rebuild an interaction store holding the artifact's interactions.
    ///
    /// # Errors
    ///
    /// Fails as [`InteractionStore::record`] does, e.g. for an artifact that
    /// repeats an interaction identity.
    pub fn into_store(self) -> PactResult<InteractionStore> {
        InteractionStore::try_from_iter(self.interactions)
    }

    /// File name the artifact is written under: `{consumer}-{provider}.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}.json",
            sanitize_file_component(&self.consumer),
            sanitize_file_component(&self.provider)
        )
    }

    /// Encode as a JSON value.
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        json!({
            "consumer": { "name": self.consumer },
            "provider": { "name": self.provider },
            "interactions": self.interactions.iter().map(encode_interaction).collect::<Vec<_>>(),
            "metadata": { "contractFormat": { "version": self.metadata.format_version } },
        })
    }

    /// Encode as pretty-printed JSON with sorted keys and a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::Serialization`] if encoding fails.
    pub fn to_json_string(&self) -> PactResult<String> {
        let mut text = serde_json::to_string_pretty(&sort_keys(self.to_json_value()))?;
        text.push('\n');
        Ok(text)
    }

    /// Parse an artifact from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::ArtifactParse`] naming the offending path.
    pub fn from_json_str(text: &str) -> PactResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| PactError::artifact("document", format!("invalid JSON: {e}")))?;
        Self::from_json_value(&value)
    }

    /// Parse an artifact from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::ArtifactParse`] naming the offending path.
    pub fn from_json_value(value: &Value) -> PactResult<Self> {
        let root = Node::root(value);
        let consumer = root.required("consumer")?.required("name")?.string()?;
        let provider = root.required("provider")?.required("name")?.string()?;

        let format = match root.optional("metadata")? {
            Some(metadata) => metadata.optional("contractFormat")?,
            None => None,
        };
        let metadata = match format {
            Some(format) => decode_metadata(&format)?,
            None => ArtifactMetadata::default(),
        };

        let interactions = root
            .required("interactions")?
            .elements()?
            .iter()
            .map(decode_interaction)
            .collect::<PactResult<Vec<_>>>()?;

        Ok(Self {
            consumer: consumer.to_string(),
            provider: provider.to_string(),
            interactions,
            metadata,
        })
    }

    /// Write to `{dir}/{consumer}-{provider}.json`, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error.
    #[instrument(skip(self, dir), fields(consumer = %self.consumer, provider = %self.provider))]
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> PactResult<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.to_json_string()?)?;
        debug!(path = %path.display(), "Wrote contract artifact");
        Ok(path)
    }

    /// Read an artifact file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error or [`PactError::ArtifactParse`].
    #[instrument]
    pub fn read_from(path: impl AsRef<Path> + std::fmt::Debug) -> PactResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }
}

fn sanitize_file_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Rebuild every object with its keys in sorted order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(key, value)| (key, sort_keys(value)))
                .collect();
            Value::Object(sorted.into_iter().collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        scalar => scalar,
    }
}

// Encoding

fn encode_interaction(interaction: &Interaction) -> Value {
    json!({
        "description": interaction.description,
        "providerState": interaction.provider_state,
        "request": encode_request(&interaction.request),
        "response": encode_response(&interaction.response),
    })
}

fn encode_request(request: &RequestPattern) -> Value {
    let mut map = Map::new();
    map.insert("method".to_string(), Value::String(request.method.clone()));
    map.insert("path".to_string(), encode_matcher(&request.path));
    if !request.headers.is_empty() {
        map.insert("headers".to_string(), encode_headers(&request.headers));
    }
    if let Some(body) = &request.body {
        map.insert("body".to_string(), encode_pattern(body));
    }
    Value::Object(map)
}

fn encode_response(response: &ResponsePattern) -> Value {
    let mut map = Map::new();
    map.insert("status".to_string(), Value::from(response.status));
    if !response.headers.is_empty() {
        map.insert("headers".to_string(), encode_headers(&response.headers));
    }
    if let Some(body) = &response.body {
        map.insert("body".to_string(), encode_pattern(body));
    }
    Value::Object(map)
}

fn encode_headers(headers: &BTreeMap<String, Matcher>) -> Value {
    Value::Object(
        headers
            .iter()
            .map(|(name, matcher)| (name.clone(), encode_matcher(matcher)))
            .collect(),
    )
}

fn encode_matcher(matcher: &Matcher) -> Value {
    match matcher {
        Matcher::Exact(value @ (Value::Object(_) | Value::Array(_))) => {
            json!({ "$match": "exact", "value": value })
        }
        Matcher::Exact(scalar) => scalar.clone(),
        Matcher::Regex { pattern, example } => {
            json!({ "$match": "regex", "pattern": pattern, "example": example })
        }
        Matcher::Type { kind, example } => {
            json!({ "$match": "type", "kind": kind.as_str(), "example": example })
        }
    }
}

fn encode_pattern(pattern: &Pattern) -> Value {
    match pattern {
        Pattern::Value(matcher) => encode_matcher(matcher),
        Pattern::Object(fields) => {
            let encoded: Map<String, Value> = fields
                .iter()
                .map(|(key, pattern)| (key.clone(), encode_pattern(pattern)))
                .collect();
            // A body field named like the tag must not read back as a matcher.
            if fields.contains_key(MATCH_TAG) {
                json!({ "$match": "object", "fields": encoded })
            } else {
                Value::Object(encoded)
            }
        }
        Pattern::Array(items) => Value::Array(items.iter().map(encode_pattern).collect()),
        Pattern::EachLike { template, min } => {
            json!({ "$match": "eachLike", "template": encode_pattern(template), "min": min })
        }
    }
}

// Decoding

/// A JSON value together with its path inside the artifact.
struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    fn root(value: &'a Value) -> Self {
        Self {
            value,
            path: String::new(),
        }
    }

    fn display_path(&self) -> &str {
        if self.path.is_empty() { "document" } else { &self.path }
    }

    fn error(&self, reason: impl Into<String>) -> PactError {
        PactError::artifact(self.display_path(), reason)
    }

    fn object(&self) -> PactResult<&'a Map<String, Value>> {
        self.value
            .as_object()
            .ok_or_else(|| self.error(format!("expected an object, got {}", ValueKind::of(self.value))))
    }

    fn optional(&self, key: &str) -> PactResult<Option<Self>> {
        Ok(self.object()?.get(key).map(|value| Self {
            value,
            path: join_key(&self.path, key),
        }))
    }

    fn required(&self, key: &str) -> PactResult<Self> {
        self.optional(key)?
            .ok_or_else(|| PactError::artifact(join_key(&self.path, key), "missing required field"))
    }

    fn string(&self) -> PactResult<&'a str> {
        self.value
            .as_str()
            .ok_or_else(|| self.error(format!("expected a string, got {}", ValueKind::of(self.value))))
    }

    fn elements(&self) -> PactResult<Vec<Self>> {
        let items = self
            .value
            .as_array()
            .ok_or_else(|| self.error(format!("expected an array, got {}", ValueKind::of(self.value))))?;
        Ok(items
            .iter()
            .enumerate()
            .map(|(i, value)| Self {
                value,
                path: join_index(&self.path, i),
            })
            .collect())
    }

    fn child(&self, key: &str, value: &'a Value) -> Self {
        Self {
            value,
            path: join_key(&self.path, key),
        }
    }

    /// The `$match` tag, if this node is a tagged matcher.
    fn tag(&self) -> PactResult<Option<&'a str>> {
        match self.value.as_object().and_then(|map| map.get(MATCH_TAG)) {
            None => Ok(None),
            Some(Value::String(tag)) => Ok(Some(tag)),
            Some(other) => Err(PactError::artifact(
                join_key(&self.path, MATCH_TAG),
                format!("expected a string tag, got {}", ValueKind::of(other)),
            )),
        }
    }
}

fn decode_metadata(format: &Node<'_>) -> PactResult<ArtifactMetadata> {
    let version = format.required("version")?;
    let text = version.string()?;
    let major = text.split('.').next().unwrap_or_default();
    let supported = CONTRACT_FORMAT_VERSION.split('.').next().unwrap_or_default();
    if major != supported {
        return Err(version.error(format!(
            "unsupported contract format version '{text}' (supported: {CONTRACT_FORMAT_VERSION})"
        )));
    }
    Ok(ArtifactMetadata {
        format_version: text.to_string(),
    })
}

fn decode_interaction(node: &Node<'_>) -> PactResult<Interaction> {
    let description = node.required("description")?.string()?;
    let provider_state = match node.optional("providerState")? {
        Some(state) if !state.value.is_null() => state.string()?,
        _ => "",
    };
    let interaction = Interaction::new(
        description,
        provider_state,
        decode_request(&node.required("request")?)?,
        decode_response(&node.required("response")?)?,
    );

    interaction.validate().map_err(|e| match e {
        PactError::InvalidPattern { path, reason } => {
            PactError::artifact(join_key(&node.path, &path), reason)
        }
        other => other,
    })?;
    Ok(interaction)
}

fn decode_request(node: &Node<'_>) -> PactResult<RequestPattern> {
    let method = node.required("method")?.string()?;
    let path = decode_matcher(&node.required("path")?)?;
    let mut request = RequestPattern::matching(method, path);
    if let Some(headers) = node.optional("headers")? {
        request.headers = decode_headers(&headers)?;
    }
    if let Some(body) = node.optional("body")? {
        request.body = Some(decode_pattern(&body)?);
    }
    Ok(request)
}

fn decode_response(node: &Node<'_>) -> PactResult<ResponsePattern> {
    let status_node = node.required("status")?;
    let status = status_node
        .value
        .as_u64()
        .and_then(|status| u16::try_from(status).ok())
        .filter(|status| (100..=599).contains(status))
        .ok_or_else(|| status_node.error(format!("expected an HTTP status code, got {}", status_node.value)))?;

    let mut response = ResponsePattern::new(status);
    if let Some(headers) = node.optional("headers")? {
        response.headers = decode_headers(&headers)?;
    }
    if let Some(body) = node.optional("body")? {
        response.body = Some(decode_pattern(&body)?);
    }
    Ok(response)
}

fn decode_headers(node: &Node<'_>) -> PactResult<BTreeMap<String, Matcher>> {
    node.object()?
        .iter()
        .map(|(name, value)| -> PactResult<(String, Matcher)> {
            Ok((name.clone(), decode_matcher(&node.child(name, value))?))
        })
        .collect()
}

/// Decode a leaf matcher. Untagged values are exact literals.
fn decode_matcher(node: &Node<'_>) -> PactResult<Matcher> {
    match node.tag()? {
        Some(tag) => decode_tagged(node, tag),
        None => Ok(Matcher::Exact(node.value.clone())),
    }
}

fn decode_tagged(node: &Node<'_>, tag: &str) -> PactResult<Matcher> {
    match tag {
        "exact" => Ok(Matcher::Exact(node.required("value")?.value.clone())),
        "regex" => Ok(Matcher::Regex {
            pattern: node.required("pattern")?.string()?.to_string(),
            example: node.required("example")?.string()?.to_string(),
        }),
        "type" => {
            let kind_node = node.required("kind")?;
            let kind = kind_node
                .string()?
                .parse::<ValueKind>()
                .map_err(|e| kind_node.error(e))?;
            Ok(Matcher::Type {
                kind,
                example: node.required("example")?.value.clone(),
            })
        }
        "eachLike" | "object" => Err(node.error(format!("{tag} is only allowed inside a body"))),
        other => Err(node.error(format!("unknown matcher tag '{other}'"))),
    }
}

/// Decode a body pattern: tagged objects are matchers, plain objects and
/// arrays nest, scalars are exact literals.
fn decode_pattern(node: &Node<'_>) -> PactResult<Pattern> {
    if let Some(tag) = node.tag()? {
        if tag == "eachLike" {
            let template = decode_pattern(&node.required("template")?)?;
            let min = match node.optional("min")? {
                Some(min) => min
                    .value
                    .as_u64()
                    .and_then(|min| usize::try_from(min).ok())
                    .ok_or_else(|| min.error(format!("expected a non-negative integer, got {}", min.value)))?,
                None => 1,
            };
            return Ok(Pattern::each_like(template, min));
        }
        if tag == "object" {
            let fields = node.required("fields")?;
            return decode_fields(&fields, fields.object()?);
        }
        return decode_tagged(node, tag).map(Pattern::Value);
    }

    match node.value {
        Value::Object(map) => decode_fields(node, map),
        Value::Array(_) => node
            .elements()?
            .iter()
            .map(decode_pattern)
            .collect::<PactResult<Vec<_>>>()
            .map(Pattern::Array),
        scalar => Ok(Pattern::Value(Matcher::Exact(scalar.clone()))),
    }
}

fn decode_fields(node: &Node<'_>, map: &Map<String, Value>) -> PactResult<Pattern> {
    map.iter()
        .map(|(key, value)| -> PactResult<(String, Pattern)> {
            Ok((key.clone(), decode_pattern(&node.child(key, value))?))
        })
        .collect::<PactResult<BTreeMap<_, _>>>()
        .map(Pattern::Object)
}
