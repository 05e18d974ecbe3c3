//! codec::a1111
//!
//! The comma-separated `key: value` text convention.
//!
//! # Layout
//!
//! ```text
//! <prompt, possibly multi-line>
//! Negative prompt: <negative prompt, possibly multi-line>
//! Steps: 30, Sampler: dpmpp_2m_sde_gpu, CFG scale: 4.0, Seed: 12345, Size: 1024x1024, ...
//! ```
//!
//! The last line holds the parameter pairs. A key is a word possibly
//! containing spaces, hyphens or slashes; a value is either a
//! double-quoted string with backslash escapes or any text up to the next
//! top-level comma. A last line with fewer than three recognizable pairs
//! is not a parameter line and is rewound into prompt text. That ≥3-pair
//! heuristic is ambiguous for prompts that coincidentally look like
//! parameter lists, but it is what the installed base writes and reads, so
//! it is preserved exactly.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::{MetadataCodec, MetadataContext, ParserState};
use crate::catalog::file_stem;
use crate::performance::Performance;
use crate::types::{
    parse_resolution, MetadataError, MetadataScheme, ParameterEntry, ParsedMetadata,
    RawParameters,
};

/// One `key: value` pair on the parameter line.
static RE_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s*(\w[\w \-/]+):\s*("(?:\\.|[^\\"])+"|[^,]*)(?:,|$)"#)
        .expect("valid parameter grammar regex")
});

/// A `<width>x<height>` value.
static RE_IMAGE_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)x(\d+)$").expect("valid image size regex"));

/// Canonical key to display label, fixed by the established convention.
const KEY_LABELS: [(&str, &str); 22] = [
    ("negative_prompt", "Negative prompt"),
    ("styles", "Styles"),
    ("performance", "Performance"),
    ("steps", "Steps"),
    ("sampler", "Sampler"),
    ("guidance_scale", "CFG scale"),
    ("seed", "Seed"),
    ("resolution", "Size"),
    ("sharpness", "Sharpness"),
    ("adm_guidance", "ADM Guidance"),
    ("refiner_swap_method", "Refiner Swap Method"),
    ("adaptive_cfg", "Adaptive CFG"),
    ("overwrite_switch", "Overwrite Switch"),
    ("freeu", "FreeU"),
    ("base_model", "Model"),
    ("base_model_hash", "Model hash"),
    ("refiner_model", "Refiner"),
    ("refiner_model_hash", "Refiner hash"),
    ("lora_hashes", "Lora hashes"),
    ("lora_weights", "Lora weights"),
    ("created_by", "User"),
    ("version", "Version"),
];

static KEY_TO_LABEL: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| KEY_LABELS.into_iter().collect());

static LABEL_TO_KEY: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| KEY_LABELS.into_iter().map(|(k, l)| (l, k)).collect());

fn label_for(key: &str) -> &'static str {
    KEY_TO_LABEL
        .get(key)
        .copied()
        .expect("canonical key present in label table")
}

/// Quote a value for the parameter line.
///
/// Values containing a comma, colon or newline are JSON-string quoted so
/// the pair grammar can recover them; everything else passes through bare.
pub fn quote(text: &str) -> String {
    if !text.contains(',') && !text.contains(':') && !text.contains('\n') {
        return text.to_string();
    }
    serde_json::to_string(text).expect("string serialization is infallible")
}

/// Undo [`quote`] on a double-quoted value.
pub fn unquote(text: &str) -> Result<String, serde_json::Error> {
    serde_json::from_str(text)
}

/// Codec for the A1111 text convention.
#[derive(Debug, Default)]
pub struct A1111Codec {
    state: ParserState,
}

impl A1111Codec {
    fn negative_label() -> &'static str {
        label_for("negative_prompt")
    }
}

impl MetadataCodec for A1111Codec {
    fn scheme(&self) -> MetadataScheme {
        MetadataScheme::A1111
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
        let RawParameters::Text(text) = raw else {
            return Err(MetadataError::SchemeMismatch {
                scheme: self.scheme(),
                got: raw.kind(),
            });
        };

        let mut lines: Vec<&str> = text.trim().lines().collect();
        let mut lastline = lines.pop().unwrap_or("");
        if RE_PARAM.captures_iter(lastline).count() < 3 {
            // Not parameter-shaped: the line is prompt text after all.
            lines.push(lastline);
            lastline = "";
        }

        let negative_prefix = format!("{}:", Self::negative_label());
        let mut prompt = String::new();
        let mut negative_prompt = String::new();
        let mut in_negative = false;
        for line in lines {
            let mut line = line.trim();
            if let Some(rest) = line.strip_prefix(&negative_prefix) {
                in_negative = true;
                line = rest.trim();
            }
            let target = if in_negative {
                &mut negative_prompt
            } else {
                &mut prompt
            };
            if !target.is_empty() {
                target.push('\n');
            }
            target.push_str(line);
        }

        let extraction = ctx.style_extractor.extract(&prompt, &negative_prompt);
        let mut data = ParsedMetadata::new();
        data.insert("prompt".into(), Value::String(extraction.prompt));
        data.insert(
            "negative_prompt".into(),
            Value::String(extraction.negative_prompt),
        );
        data.insert(
            "styles".into(),
            Value::Array(extraction.styles.into_iter().map(Value::String).collect()),
        );

        for caps in RE_PARAM.captures_iter(lastline) {
            let label = caps.get(1).map_or("", |m| m.as_str());
            let raw_value = caps.get(2).map_or("", |m| m.as_str());

            let value = if raw_value.len() >= 2
                && raw_value.starts_with('"')
                && raw_value.ends_with('"')
            {
                match unquote(raw_value) {
                    Ok(unquoted) => unquoted,
                    Err(err) => {
                        warn!(label, value = raw_value, %err, "skipping unparseable quoted value");
                        continue;
                    }
                }
            } else {
                raw_value.to_string()
            };

            if let Some(size) = RE_IMAGE_SIZE.captures(&value) {
                data.insert(
                    "resolution".into(),
                    Value::Array(vec![
                        Value::String(size[1].to_string()),
                        Value::String(size[2].to_string()),
                    ]),
                );
            } else if let Some(key) = LABEL_TO_KEY.get(label) {
                data.insert((*key).to_string(), Value::String(value));
            } else {
                warn!(label, value, "skipping unrecognized parameter");
            }
        }

        // Direct imports carry steps but no performance tier.
        if !data.contains_key("performance") {
            if let Some(Value::String(steps)) = data.get("steps") {
                if let Some(tier) = steps.parse().ok().and_then(Performance::from_steps) {
                    data.insert(
                        "performance".into(),
                        Value::String(tier.as_str().to_string()),
                    );
                }
            }
        }

        if let Some(Value::String(stem)) = data.get("base_model") {
            if let Some(filename) = ctx.catalog.resolve_model_stem(stem) {
                let filename = filename.to_string();
                data.insert("base_model".into(), Value::String(filename));
            }
        }

        if let Some(Value::String(lora_hashes)) = data.get("lora_hashes").cloned().as_ref() {
            for (index, lora) in lora_hashes.split(", ").enumerate() {
                let mut parts = lora.split(": ");
                let (Some(name), Some(_hash), Some(weight), None) =
                    (parts.next(), parts.next(), parts.next(), parts.next())
                else {
                    warn!(entry = lora, "skipping malformed lora hash entry");
                    continue;
                };
                if let Some(filename) = ctx.catalog.resolve_lora_stem(name) {
                    data.insert(
                        format!("lora_combined_{}", index + 1),
                        Value::String(format!("{filename} : {weight}")),
                    );
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
        let data: HashMap<&str, &Value> = entries
            .iter()
            .map(|entry| (entry.key.as_str(), &entry.value))
            .collect();
        let require = |key: &'static str| -> Result<String, MetadataError> {
            data.get(key)
                .map(|value| value_text(value))
                .ok_or(MetadataError::MissingField(key))
        };

        let (width, height) = parse_resolution(
            data.get("resolution")
                .ok_or(MetadataError::MissingField("resolution"))?,
        )?;

        let mut params: std::collections::BTreeMap<&'static str, String> =
            std::collections::BTreeMap::new();
        params.insert(label_for("performance"), require("performance")?);
        params.insert(label_for("steps"), self.state.steps.to_string());
        params.insert(label_for("sampler"), require("sampler")?);
        params.insert(label_for("seed"), require("seed")?);
        params.insert(label_for("resolution"), format!("{width}x{height}"));
        params.insert(label_for("guidance_scale"), require("guidance_scale")?);
        params.insert(label_for("sharpness"), require("sharpness")?);
        params.insert(label_for("adm_guidance"), require("adm_guidance")?);
        params.insert(
            label_for("base_model"),
            file_stem(&require("base_model")?).to_string(),
        );
        params.insert(
            label_for("base_model_hash"),
            self.state.base_model_hash.clone(),
        );

        if self.state.has_refiner() {
            params.insert(
                label_for("refiner_model"),
                self.state.refiner_model_name.clone(),
            );
            params.insert(
                label_for("refiner_model_hash"),
                self.state.refiner_model_hash.clone(),
            );
        }

        for key in [
            "adaptive_cfg",
            "overwrite_switch",
            "refiner_swap_method",
            "freeu",
        ] {
            if let Some(value) = data.get(key) {
                params.insert(label_for(key), value_text(value));
            }
        }

        let lora_hashes = self
            .state
            .loras
            .iter()
            .map(|lora| format!("{}: {}: {}", lora.name, lora.hash, lora.weight))
            .collect::<Vec<_>>()
            .join(", ");
        params.insert(label_for("lora_hashes"), lora_hashes);
        params.insert(label_for("version"), require("version")?);

        if !ctx.created_by.is_empty() {
            params.insert(label_for("created_by"), ctx.created_by.clone());
        }

        // BTreeMap iteration renders the pairs sorted by display label.
        let params_text = params
            .iter()
            .map(|(label, value)| {
                if *label == value.as_str() {
                    (*label).to_string()
                } else {
                    format!("{label}: {}", quote(value))
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let negative_text = if self.state.full_negative_prompt.is_empty() {
            String::new()
        } else {
            format!(
                "\n{}: {}",
                Self::negative_label(),
                self.state.full_negative_prompt
            )
        };

        Ok(format!(
            "{}{}\n{}",
            self.state.full_prompt, negative_text, params_text
        )
        .trim()
        .to_string())
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelCatalog;
    use crate::codec::{GenerationData, LoraReference};

    fn context() -> MetadataContext {
        let catalog = ModelCatalog::new(
            vec!["juggernaut_v8.safetensors".into()],
            vec!["styleA.safetensors".into(), "styleB.safetensors".into()],
        );
        MetadataContext::new(catalog, "/models/checkpoints", "/models/loras")
    }

    fn parse(text: &str) -> ParsedMetadata {
        A1111Codec::default()
            .parse(&context(), &RawParameters::Text(text.into()))
            .unwrap()
    }

    fn text_of<'a>(data: &'a ParsedMetadata, key: &str) -> &'a str {
        data.get(key).and_then(Value::as_str).unwrap()
    }

    mod parsing {
        use super::*;

        #[test]
        fn negative_prompt_split() {
            let data = parse("cat\nNegative prompt: dog\nSteps: 20, Sampler: Euler, Seed: 1");
            assert_eq!(text_of(&data, "prompt"), "cat");
            assert_eq!(text_of(&data, "negative_prompt"), "dog");
            assert_eq!(text_of(&data, "steps"), "20");
            assert_eq!(text_of(&data, "sampler"), "Euler");
            assert_eq!(text_of(&data, "seed"), "1");
        }

        #[test]
        fn multiline_prompts_rejoined() {
            let data = parse(
                "first line\nsecond line\nNegative prompt: bad\nworse\nSteps: 4, Sampler: Euler, Seed: 7",
            );
            assert_eq!(text_of(&data, "prompt"), "first line\nsecond line");
            assert_eq!(text_of(&data, "negative_prompt"), "bad\nworse");
        }

        #[test]
        fn size_becomes_resolution_pair() {
            let data = parse("cat\nSteps: 20, Sampler: Euler, Size: 1024x768");
            assert_eq!(
                data.get("resolution").unwrap(),
                &serde_json::json!(["1024", "768"])
            );
        }

        #[test]
        fn short_last_line_is_prompt_text() {
            let data = parse("a photo of Steps: 20, Sampler: Euler");
            assert_eq!(text_of(&data, "prompt"), "a photo of Steps: 20, Sampler: Euler");
            assert!(!data.contains_key("steps"));
        }

        #[test]
        fn quoted_values_are_unescaped() {
            let data = parse(
                "cat\nSteps: 8, Sampler: Euler, ADM Guidance: \"(1.5, 0.8, 0.3)\", Seed: 42",
            );
            assert_eq!(text_of(&data, "adm_guidance"), "(1.5, 0.8, 0.3)");
        }

        #[test]
        fn unknown_labels_are_skipped() {
            let data = parse("cat\nSteps: 20, Sampler: Euler, Clip skip: 2, Seed: 3");
            assert_eq!(text_of(&data, "steps"), "20");
            assert!(!data.values().any(|v| v.as_str() == Some("2")));
        }

        #[test]
        fn performance_derived_from_known_steps() {
            let data = parse("cat\nSteps: 30, Sampler: Euler, Seed: 1");
            assert_eq!(text_of(&data, "performance"), "Speed");
        }

        #[test]
        fn performance_not_derived_from_unknown_steps() {
            let data = parse("cat\nSteps: 20, Sampler: Euler, Seed: 1");
            assert!(!data.contains_key("performance"));
        }

        #[test]
        fn explicit_performance_wins_over_steps() {
            let data = parse("cat\nPerformance: Quality, Steps: 30, Sampler: Euler");
            assert_eq!(text_of(&data, "performance"), "Quality");
        }

        #[test]
        fn base_model_stem_resolved() {
            let data = parse("cat\nSteps: 20, Sampler: Euler, Model: juggernaut_v8");
            assert_eq!(text_of(&data, "base_model"), "juggernaut_v8.safetensors");
        }

        #[test]
        fn unresolvable_base_model_kept() {
            let data = parse("cat\nSteps: 20, Sampler: Euler, Model: not_installed");
            assert_eq!(text_of(&data, "base_model"), "not_installed");
        }

        #[test]
        fn lora_hashes_resolved_to_combined_entries() {
            let data = parse(
                "cat\nSteps: 20, Sampler: Euler, Lora hashes: \"styleA: abcd1234: 0.8, styleB: ffff0000: 0.5\"",
            );
            assert_eq!(
                text_of(&data, "lora_combined_1"),
                "styleA.safetensors : 0.8"
            );
            assert_eq!(
                text_of(&data, "lora_combined_2"),
                "styleB.safetensors : 0.5"
            );
        }

        #[test]
        fn unknown_lora_stem_produces_no_entry() {
            let data =
                parse("cat\nSteps: 20, Sampler: Euler, Lora hashes: \"mystery: 00ff00ff: 0.8\"");
            assert!(!data.contains_key("lora_combined_1"));
        }

        #[test]
        fn structured_input_is_a_contract_violation() {
            let err = A1111Codec::default()
                .parse(
                    &context(),
                    &RawParameters::Structured(serde_json::Map::new()),
                )
                .unwrap_err();
            assert!(matches!(err, MetadataError::SchemeMismatch { .. }));
        }
    }

    mod serialization {
        use super::*;

        fn entries() -> Vec<ParameterEntry> {
            vec![
                ParameterEntry::new("Performance", "performance", "Speed"),
                ParameterEntry::new("Sampler", "sampler", "dpmpp_2m_sde_gpu"),
                ParameterEntry::new("Seed", "seed", "6789"),
                ParameterEntry::new("Size", "resolution", serde_json::json!(["1024", "768"])),
                ParameterEntry::new("CFG scale", "guidance_scale", "4.0"),
                ParameterEntry::new("Sharpness", "sharpness", "2.0"),
                ParameterEntry::new("ADM Guidance", "adm_guidance", "(1.5, 0.8, 0.3)"),
                ParameterEntry::new("Model", "base_model", "juggernaut_v8.safetensors"),
                ParameterEntry::new("Version", "version", "v2.1.0"),
            ]
        }

        fn codec_with_state() -> A1111Codec {
            let mut codec = A1111Codec::default();
            codec.state = ParserState {
                full_prompt: "a red fox".into(),
                full_negative_prompt: "blurry".into(),
                steps: 30,
                base_model_name: "juggernaut_v8".into(),
                base_model_hash: "aabbccdd".into(),
                refiner_model_name: String::new(),
                refiner_model_hash: String::new(),
                loras: vec![LoraReference {
                    name: "styleA".into(),
                    weight: 0.8,
                    hash: "abcd1234".into(),
                }],
            };
            codec
        }

        #[test]
        fn renders_prompt_negative_and_sorted_params() {
            let text = codec_with_state()
                .serialize(&context(), &entries())
                .unwrap();
            let mut lines = text.lines();
            assert_eq!(lines.next(), Some("a red fox"));
            assert_eq!(lines.next(), Some("Negative prompt: blurry"));
            let params = lines.next().unwrap();
            assert!(params.contains("Steps: 30"));
            assert!(params.contains("Size: 1024x768"));
            assert!(params.contains("Model: juggernaut_v8"));
            assert!(params.contains("Model hash: aabbccdd"));
            assert!(params.contains("Lora hashes: \"styleA: abcd1234: 0.8\""));
            // Quoted because the value contains commas and a colon.
            assert!(params.contains("ADM Guidance: \"(1.5, 0.8, 0.3)\""));
            assert!(!params.contains("Refiner"));

            // Labels appear in sorted order.
            let adm = params.find("ADM Guidance").unwrap();
            let steps = params.find("Steps").unwrap();
            let version = params.find("Version").unwrap();
            assert!(adm < steps && steps < version);
        }

        #[test]
        fn refiner_appended_when_set() {
            let mut codec = codec_with_state();
            codec.state.refiner_model_name = "refiner_xl".into();
            codec.state.refiner_model_hash = "eeff0011".into();
            let text = codec.serialize(&context(), &entries()).unwrap();
            assert!(text.contains("Refiner: refiner_xl"));
            assert!(text.contains("Refiner hash: eeff0011"));
        }

        #[test]
        fn optional_keys_pass_through() {
            let mut entries = entries();
            entries.push(ParameterEntry::new(
                "Refiner Swap Method",
                "refiner_swap_method",
                "joint",
            ));
            let text = codec_with_state().serialize(&context(), &entries).unwrap();
            assert!(text.contains("Refiner Swap Method: joint"));
        }

        #[test]
        fn created_by_appended_when_configured() {
            let ctx = context().with_created_by("render-farm-03");
            let text = codec_with_state().serialize(&ctx, &entries()).unwrap();
            assert!(text.contains("User: render-farm-03"));
        }

        #[test]
        fn missing_required_key_is_an_error() {
            let mut entries = entries();
            entries.retain(|entry| entry.key != "sampler");
            let err = codec_with_state()
                .serialize(&context(), &entries)
                .unwrap_err();
            assert!(matches!(err, MetadataError::MissingField("sampler")));
        }

        #[test]
        fn empty_negative_prompt_omits_the_line() {
            let mut codec = codec_with_state();
            codec.state.full_negative_prompt.clear();
            let text = codec.serialize(&context(), &entries()).unwrap();
            assert!(!text.contains("Negative prompt:"));
        }
    }

    mod quoting {
        use super::*;

        #[test]
        fn plain_values_pass_through() {
            assert_eq!(quote("Euler a"), "Euler a");
            assert_eq!(quote("4.0"), "4.0");
        }

        #[test]
        fn special_characters_trigger_json_quoting() {
            assert_eq!(quote("a, b"), "\"a, b\"");
            assert_eq!(quote("k: v"), "\"k: v\"");
            assert_eq!(quote("two\nlines"), "\"two\\nlines\"");
        }

        #[test]
        fn unquote_inverts_quote() {
            for original in ["a, b", "k: v", "two\nlines", "back\\slash, \"quoted\""] {
                assert_eq!(unquote(&quote(original)).unwrap(), original);
            }
        }
    }
}
