//! codec
//!
//! The codec contract and the two concrete codecs.
//!
//! # Architecture
//!
//! Each metadata scheme has one codec implementing [`MetadataCodec`]:
//!
//! - [`a1111`] - the comma-separated `key: value` text convention
//! - [`fooocus`] - the structured JSON key-value convention
//!
//! Codecs share [`ParserState`], the per-image record of resolved model
//! identities populated once through `set_data` and consumed by
//! `serialize`. Dispatch is [`codec_for_scheme`] over the closed
//! [`MetadataScheme`] set.
//!
//! # Lifecycle
//!
//! One codec instance serves one parse-then-serialize cycle for a single
//! image: construct, optionally `parse`, `set_data` with the resolved
//! generation settings, `serialize`. Instances are not reused across
//! unrelated images.
//!
//! # Error policy
//!
//! Parsing is best-effort: malformed individual fields and unresolvable
//! model references are logged at warn level and skipped, never fatal.
//! Contract violations (wrong raw shape for the scheme, missing required
//! serialize input) propagate as [`MetadataError`].

pub mod a1111;
pub mod fooocus;

use std::path::PathBuf;

use crate::catalog::{file_stem, ModelCatalog};
use crate::hash::HashCache;
use crate::styles::{NoStyles, StyleExtractor};
use crate::types::{
    MetadataError, MetadataScheme, ParameterEntry, ParsedMetadata, RawParameters,
};

pub use a1111::A1111Codec;
pub use fooocus::FooocusCodec;

/// Shared environment for codec operations.
///
/// Owns the installed-model catalog, the style extractor, the content-hash
/// cache, and the attribution written into serialized metadata. The caller
/// controls the lifetime; holding one context per batch run reuses hash
/// computations across images.
pub struct MetadataContext {
    pub catalog: ModelCatalog,
    pub style_extractor: Box<dyn StyleExtractor>,
    pub hash_cache: HashCache,
    /// Directory joined with base/refiner model filenames for hashing.
    pub checkpoints_dir: PathBuf,
    /// Directory joined with LoRA filenames for hashing.
    pub loras_dir: PathBuf,
    /// Attribution appended to serialized metadata when non-empty.
    pub created_by: String,
}

impl MetadataContext {
    pub fn new(
        catalog: ModelCatalog,
        checkpoints_dir: impl Into<PathBuf>,
        loras_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            style_extractor: Box::new(NoStyles),
            hash_cache: HashCache::sha256(),
            checkpoints_dir: checkpoints_dir.into(),
            loras_dir: loras_dir.into(),
            created_by: String::new(),
        }
    }

    pub fn with_style_extractor(mut self, extractor: Box<dyn StyleExtractor>) -> Self {
        self.style_extractor = extractor;
        self
    }

    pub fn with_hash_cache(mut self, cache: HashCache) -> Self {
        self.hash_cache = cache;
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = created_by.into();
        self
    }
}

impl std::fmt::Debug for MetadataContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataContext")
            .field("catalog", &self.catalog)
            .field("hash_cache", &self.hash_cache)
            .field("checkpoints_dir", &self.checkpoints_dir)
            .field("loras_dir", &self.loras_dir)
            .field("created_by", &self.created_by)
            .finish_non_exhaustive()
    }
}

/// Resolved generation settings for one rendered image.
///
/// Model and LoRA identities are given as installed filenames; `set_data`
/// reduces them to stems and content hashes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationData {
    pub full_prompt: String,
    pub full_negative_prompt: String,
    pub steps: u32,
    pub base_model: String,
    /// Empty string or `"None"` means no refiner.
    pub refiner_model: String,
    /// `(filename, weight)` pairs; entries named `"None"` are skipped.
    pub loras: Vec<(String, f64)>,
}

/// A resolved LoRA: stem, weight, and content hash.
#[derive(Debug, Clone, PartialEq)]
pub struct LoraReference {
    pub name: String,
    pub weight: f64,
    pub hash: String,
}

/// Per-image mutable state shared by all codecs.
///
/// Constructed with defaults, populated once via [`ParserState::populate`],
/// consumed by `serialize`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserState {
    pub full_prompt: String,
    pub full_negative_prompt: String,
    pub steps: u32,
    pub base_model_name: String,
    pub base_model_hash: String,
    pub refiner_model_name: String,
    pub refiner_model_hash: String,
    pub loras: Vec<LoraReference>,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            full_prompt: String::new(),
            full_negative_prompt: String::new(),
            steps: 30,
            base_model_name: String::new(),
            base_model_hash: String::new(),
            refiner_model_name: String::new(),
            refiner_model_hash: String::new(),
            loras: Vec::new(),
        }
    }
}

impl ParserState {
    /// Whether a refiner model was set.
    pub fn has_refiner(&self) -> bool {
        !matches!(self.refiner_model_name.as_str(), "" | "None")
    }

    /// Populate from resolved generation settings.
    ///
    /// Filenames are reduced to stems; content hashes come from the
    /// context's hash cache. A refiner filename of `""` or `"None"` leaves
    /// the refiner fields empty. LoRAs named `"None"` are dropped; the
    /// rest keep their input order.
    pub fn populate(
        &mut self,
        ctx: &mut MetadataContext,
        data: GenerationData,
    ) -> Result<(), MetadataError> {
        self.full_prompt = data.full_prompt;
        self.full_negative_prompt = data.full_negative_prompt;
        self.steps = data.steps;

        self.base_model_name = file_stem(&data.base_model).to_string();
        let base_path = ctx.checkpoints_dir.join(&data.base_model);
        self.base_model_hash = ctx.hash_cache.get_hash(&base_path)?;

        if !matches!(data.refiner_model.as_str(), "" | "None") {
            self.refiner_model_name = file_stem(&data.refiner_model).to_string();
            let refiner_path = ctx.checkpoints_dir.join(&data.refiner_model);
            self.refiner_model_hash = ctx.hash_cache.get_hash(&refiner_path)?;
        } else {
            self.refiner_model_name.clear();
            self.refiner_model_hash.clear();
        }

        self.loras.clear();
        for (lora_name, weight) in data.loras {
            if lora_name == "None" {
                continue;
            }
            let lora_path = ctx.loras_dir.join(&lora_name);
            let hash = ctx.hash_cache.get_hash(&lora_path)?;
            self.loras.push(LoraReference {
                name: file_stem(&lora_name).to_string(),
                weight,
                hash,
            });
        }

        Ok(())
    }
}

/// The per-scheme codec contract.
pub trait MetadataCodec {
    /// Identity tag.
    fn scheme(&self) -> MetadataScheme;

    /// Shared per-image state.
    fn state(&self) -> &ParserState;
    fn state_mut(&mut self) -> &mut ParserState;

    /// Turn raw extracted metadata into the normalized canonical mapping.
    ///
    /// Malformed individual fields are skipped with a logged warning.
    /// Handing a codec the raw shape of the other scheme is a contract
    /// violation and returns [`MetadataError::SchemeMismatch`].
    fn parse(
        &self,
        ctx: &MetadataContext,
        raw: &RawParameters,
    ) -> Result<ParsedMetadata, MetadataError>;

    /// Render the final embeddable text for this scheme.
    fn serialize(
        &self,
        ctx: &MetadataContext,
        entries: &[ParameterEntry],
    ) -> Result<String, MetadataError>;

    /// Resolve and store per-image generation settings.
    fn set_data(
        &mut self,
        ctx: &mut MetadataContext,
        data: GenerationData,
    ) -> Result<(), MetadataError> {
        self.state_mut().populate(ctx, data)
    }
}

/// Select the codec for a scheme.
///
/// The scheme set is closed; this match is exhaustive by construction, so
/// an unsupported scheme cannot be requested.
pub fn codec_for_scheme(scheme: MetadataScheme) -> Box<dyn MetadataCodec> {
    match scheme {
        MetadataScheme::A1111 => Box::new(A1111Codec::default()),
        MetadataScheme::Fooocus => Box::new(FooocusCodec::default()),
    }
}
