//! types
//!
//! Core domain types shared by every codec.
//!
//! # Types
//!
//! - [`MetadataScheme`] - Which textual convention a blob of metadata uses
//! - [`RawParameters`] - Raw extracted metadata before parsing
//! - [`ParameterEntry`] - A (display label, canonical key, value) triple
//! - [`ParsedMetadata`] - Normalized canonical-key mapping
//! - [`MetadataError`] - Error taxonomy for parse/serialize/resolution
//!
//! Canonical keys are scheme-independent identifiers (`sampler`, `seed`,
//! `lora_combined_3`, ...). Display labels are the scheme-specific human
//! text (`Sampler`, `Seed`, ...). Every codec's `parse` output and
//! `serialize` input agree on canonical keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::hash::HashError;

/// The textual convention used to encode generation parameters.
///
/// This is a closed set: codecs exist only for these two schemes, and
/// dispatch is an exhaustive match rather than open subclassing.
///
/// # Example
///
/// ```
/// use geninfo::types::MetadataScheme;
///
/// let scheme: MetadataScheme = "fooocus".parse().unwrap();
/// assert_eq!(scheme, MetadataScheme::Fooocus);
/// assert_eq!(scheme.as_str(), "fooocus");
///
/// assert!("exif".parse::<MetadataScheme>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MetadataScheme {
    /// Comma-separated `key: value` text convention.
    A1111,
    /// Structured JSON key-value convention.
    Fooocus,
}

impl MetadataScheme {
    /// The wire tag written to the `fooocus_scheme` image field.
    pub fn as_str(self) -> &'static str {
        match self {
            MetadataScheme::A1111 => "a1111",
            MetadataScheme::Fooocus => "fooocus",
        }
    }
}

impl std::str::FromStr for MetadataScheme {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a1111" => Ok(MetadataScheme::A1111),
            "fooocus" => Ok(MetadataScheme::Fooocus),
            other => Err(MetadataError::UnknownScheme(other.to_string())),
        }
    }
}

impl TryFrom<String> for MetadataScheme {
    type Error = MetadataError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MetadataScheme> for String {
    fn from(scheme: MetadataScheme) -> Self {
        scheme.as_str().to_string()
    }
}

impl std::fmt::Display for MetadataScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw metadata as extracted from an image, before codec parsing.
///
/// A1111 metadata arrives as one multi-line text blob; Fooocus metadata
/// arrives as an already-decoded JSON object.
#[derive(Debug, Clone, PartialEq)]
pub enum RawParameters {
    /// Free-form multi-line text (A1111 convention).
    Text(String),
    /// Decoded key-value document (Fooocus convention).
    Structured(serde_json::Map<String, Value>),
}

impl RawParameters {
    /// Short human name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RawParameters::Text(_) => "text",
            RawParameters::Structured(_) => "structured",
        }
    }
}

/// A single generation parameter as handed to `serialize`.
///
/// `label` is the scheme-specific display text, `key` the canonical
/// identifier, `value` the parameter value (string or structured).
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterEntry {
    /// Scheme-specific display label (e.g. `Sampler`).
    pub label: String,
    /// Canonical key (e.g. `sampler`).
    pub key: String,
    /// Parameter value.
    pub value: Value,
}

impl ParameterEntry {
    pub fn new(
        label: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Normalized parse output: canonical key to value, including the free-text
/// `prompt` / `negative_prompt` fields and the extracted `styles` list.
pub type ParsedMetadata = serde_json::Map<String, Value>;

/// Errors from codec operations.
///
/// Data-quality problems (a malformed individual field, an unresolvable
/// model reference) are absorbed during parsing with a logged warning and
/// never surface here. These variants are contract or input-shape defects
/// that must propagate to the caller.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// A scheme tag outside the closed `{a1111, fooocus}` set.
    #[error("unknown metadata scheme '{0}'")]
    UnknownScheme(String),

    /// A codec was handed the raw shape belonging to the other scheme.
    #[error("{scheme} codec cannot handle {got} input")]
    SchemeMismatch {
        scheme: MetadataScheme,
        got: &'static str,
    },

    /// Serialization requires a canonical key the input did not provide.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A resolution value that is not a two-element numeric pair.
    #[error("malformed resolution value: {0}")]
    MalformedResolution(String),

    /// Content hashing failed while resolving a model reference.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// Rendering the output document failed.
    #[error("failed to render document: {0}")]
    Render(#[from] serde_json::Error),
}

/// Build the canonical `resolution` value from a width/height pair.
pub fn resolution_value(width: u64, height: u64) -> Value {
    Value::Array(vec![
        Value::String(width.to_string()),
        Value::String(height.to_string()),
    ])
}

/// Strictly parse a canonical `resolution` value into `(width, height)`.
///
/// Accepts the canonical two-element array form (string or numeric
/// elements) and, for compatibility with documents written by older
/// pipelines, a `"(width, height)"` tuple string. Anything else is a
/// malformed-field error; resolution values are never evaluated as code.
///
/// # Example
///
/// ```
/// use geninfo::types::{parse_resolution, resolution_value};
///
/// let value = resolution_value(1024, 768);
/// assert_eq!(parse_resolution(&value).unwrap(), (1024, 768));
///
/// let legacy = serde_json::Value::String("(1024, 768)".into());
/// assert_eq!(parse_resolution(&legacy).unwrap(), (1024, 768));
/// ```
pub fn parse_resolution(value: &Value) -> Result<(u64, u64), MetadataError> {
    let malformed = || MetadataError::MalformedResolution(value.to_string());

    match value {
        Value::Array(items) => {
            if items.len() != 2 {
                return Err(malformed());
            }
            let dim = |item: &Value| -> Option<u64> {
                match item {
                    Value::String(s) => s.trim().parse().ok(),
                    Value::Number(n) => n.as_u64(),
                    _ => None,
                }
            };
            match (dim(&items[0]), dim(&items[1])) {
                (Some(w), Some(h)) => Ok((w, h)),
                _ => Err(malformed()),
            }
        }
        Value::String(s) => {
            let inner = s
                .trim()
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(malformed)?;
            let (w, h) = inner.split_once(',').ok_or_else(malformed)?;
            let strip_quotes = |part: &str| {
                part.trim()
                    .trim_matches(|c| c == '\'' || c == '"')
                    .to_string()
            };
            let w = strip_quotes(w).parse().map_err(|_| malformed())?;
            let h = strip_quotes(h).parse().map_err(|_| malformed())?;
            Ok((w, h))
        }
        _ => Err(malformed()),
    }
}
