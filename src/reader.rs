//! reader
//!
//! Extracting raw metadata fields from an image and detecting the scheme.
//!
//! Generators embed their settings as PNG text chunks: the `parameters`
//! keyword carries the metadata payload (plain text for A1111, a JSON
//! document for Fooocus) and `fooocus_scheme` optionally names the scheme
//! outright. Detection prefers the explicit tag and falls back on the
//! payload shape; when neither identifies a scheme the caller gets `None`
//! and decides whether to guess or skip.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::types::{MetadataScheme, RawParameters};

/// Errors from reading image metadata fields.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to open image '{path}': {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode image '{path}': {source}")]
    Decode {
        path: PathBuf,
        source: png::DecodingError,
    },
}

/// Raw metadata pulled from an image, with the scheme detected.
#[derive(Debug)]
pub struct ImageMetadata {
    /// The `parameters` payload, if any.
    pub parameters: Option<RawParameters>,
    /// The detected scheme, if any.
    pub scheme: Option<MetadataScheme>,
    /// All remaining text fields.
    pub fields: HashMap<String, String>,
}

/// Read every text chunk (tEXt and uncompressed iTXt) from a PNG file.
///
/// Returns a keyword-to-text map. Compressed iTXt chunks are decompressed
/// through the decoder; chunks whose text cannot be decoded are skipped.
pub fn read_raw_fields(path: &Path) -> Result<HashMap<String, String>, ReadError> {
    let file = File::open(path).map_err(|source| ReadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let decoder = png::Decoder::new(file);
    let reader = decoder.read_info().map_err(|source| ReadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let info = reader.info();
    let mut fields = HashMap::new();

    for chunk in &info.uncompressed_latin1_text {
        fields.insert(chunk.keyword.clone(), chunk.text.clone());
    }
    for chunk in &info.utf8_text {
        let mut chunk = chunk.clone();
        if chunk.compressed && chunk.decompress_text().is_err() {
            debug!(keyword = chunk.keyword.as_str(), "skipping undecodable iTXt chunk");
            continue;
        }
        match chunk.get_text() {
            Ok(text) => {
                fields.insert(chunk.keyword.clone(), text);
            }
            Err(_) => {
                debug!(keyword = chunk.keyword.as_str(), "skipping undecodable iTXt chunk");
            }
        }
    }

    Ok(fields)
}

/// Detect the metadata scheme from raw extracted fields.
///
/// Pops `parameters` and `fooocus_scheme` out of the field map. The
/// payload is structured-decoded first: a JSON object becomes
/// [`RawParameters::Structured`], anything else stays text. An explicit
/// valid scheme tag wins; otherwise a structured payload implies Fooocus
/// and a plain-text payload implies A1111. No payload means no scheme.
///
/// # Example
///
/// ```
/// use geninfo::reader::detect;
/// use geninfo::types::MetadataScheme;
/// use std::collections::HashMap;
///
/// let mut fields = HashMap::new();
/// fields.insert("parameters".to_string(), "cat\nSteps: 30".to_string());
/// let detected = detect(fields);
/// assert_eq!(detected.scheme, Some(MetadataScheme::A1111));
/// ```
pub fn detect(mut fields: HashMap<String, String>) -> ImageMetadata {
    // A payload that decodes to JSON but not to an object (a bare number,
    // say) identifies neither scheme.
    let mut json_scalar = false;
    let parameters = fields.remove("parameters").map(|text| {
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(document)) => RawParameters::Structured(document),
            Ok(_) => {
                json_scalar = true;
                RawParameters::Text(text)
            }
            Err(_) => RawParameters::Text(text),
        }
    });

    let tagged_scheme = fields
        .remove("fooocus_scheme")
        .and_then(|tag| tag.parse::<MetadataScheme>().ok());

    let scheme = tagged_scheme.or(match &parameters {
        Some(RawParameters::Structured(_)) => Some(MetadataScheme::Fooocus),
        Some(RawParameters::Text(_)) if !json_scalar => Some(MetadataScheme::A1111),
        _ => None,
    });

    ImageMetadata {
        parameters,
        scheme,
        fields,
    }
}

/// Convenience wrapper: read fields from a PNG and detect the scheme.
pub fn read_image_metadata(path: &Path) -> Result<ImageMetadata, ReadError> {
    Ok(detect(read_raw_fields(path)?))
}
