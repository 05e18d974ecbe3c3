//! codec::fooocus
//!
//! The structured JSON key-value convention.
//!
//! Parsing re-attaches local context: bare model and LoRA stems written by
//! another machine are resolved to installed filenames. Serializing strips
//! that context back off so documents never leak local paths, then merges
//! in the per-image resolved state (prompts, steps, model hashes, LoRA
//! triples) and renders one JSON object with sorted keys.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use super::{MetadataCodec, MetadataContext, ParserState};
use crate::catalog::file_stem;
use crate::types::{
    MetadataError, MetadataScheme, ParameterEntry, ParsedMetadata, RawParameters,
};

/// Codec for the Fooocus JSON convention.
#[derive(Debug, Default)]
pub struct FooocusCodec {
    state: ParserState,
}

impl MetadataCodec for FooocusCodec {
    fn scheme(&self) -> MetadataScheme {
        MetadataScheme::Fooocus
    }

    fn state(&self) -> &ParserState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ParserState {
        &mut self.state
    }

    fn parse(
        &self,
        ctx: &MetadataContext,
        raw: &RawParameters,
    ) -> Result<ParsedMetadata, MetadataError> {
        let RawParameters::Structured(document) = raw else {
            return Err(MetadataError::SchemeMismatch {
                scheme: self.scheme(),
                got: raw.kind(),
            });
        };

        let mut data = document.clone();
        for (key, value) in data.iter_mut() {
            let Value::String(text) = value else {
                continue;
            };
            if text.is_empty() || text == "None" {
                continue;
            }

            if key == "base_model" || key == "refiner_model" {
                if let Some(filename) = ctx.catalog.resolve_model_stem(text) {
                    *text = filename.to_string();
                }
            } else if key.starts_with("lora_combined_") {
                match text.split_once(" : ") {
                    Some((stem, weight)) => {
                        if let Some(filename) = ctx.catalog.resolve_lora_stem(stem) {
                            *text = format!("{filename} : {weight}");
                        }
                    }
                    None => {
                        warn!(key = key.as_str(), value = text.as_str(), "skipping malformed lora reference");
                    }
                }
            }
        }

        Ok(data)
    }

    fn serialize(
        &self,
        ctx: &MetadataContext,
        entries: &[ParameterEntry],
    ) -> Result<String, MetadataError> {
        let mut document: BTreeMap<String, Value> = BTreeMap::new();
        for entry in entries {
            let mut value = entry.value.clone();
            // Local model-folder context must not leak into the document.
            if entry.key.starts_with("lora_combined_") {
                if let Value::String(text) = &value {
                    match text.split_once(" : ") {
                        Some((name, weight)) => {
                            value = Value::String(format!("{} : {weight}", file_stem(name)));
                        }
                        None => {
                            warn!(
                                key = entry.key.as_str(),
                                value = text.as_str(),
                                "keeping malformed lora reference as-is"
                            );
                        }
                    }
                }
            }
            document.insert(entry.key.clone(), value);
        }

        document.insert(
            "full_prompt".into(),
            Value::String(self.state.full_prompt.clone()),
        );
        document.insert(
            "full_negative_prompt".into(),
            Value::String(self.state.full_negative_prompt.clone()),
        );
        document.insert("steps".into(), Value::Number(self.state.steps.into()));
        document.insert(
            "base_model".into(),
            Value::String(self.state.base_model_name.clone()),
        );
        document.insert(
            "base_model_hash".into(),
            Value::String(self.state.base_model_hash.clone()),
        );

        if self.state.has_refiner() {
            document.insert(
                "refiner_model".into(),
                Value::String(self.state.refiner_model_name.clone()),
            );
            document.insert(
                "refiner_model_hash".into(),
                Value::String(self.state.refiner_model_hash.clone()),
            );
        }

        let loras = self
            .state
            .loras
            .iter()
            .map(|lora| {
                serde_json::json!([lora.name, lora.weight, lora.hash])
            })
            .collect();
        document.insert("loras".into(), Value::Array(loras));

        if !ctx.created_by.is_empty() {
            document.insert(
                "created_by".into(),
                Value::String(ctx.created_by.clone()),
            );
        }

        Ok(serde_json::to_string(&document)?)
    }
}
