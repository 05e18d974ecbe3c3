//! styles
//!
//! Recovering named styles from rendered prompts.
//!
//! Styles are prompt templates: the positive template contains a
//! `{prompt}` placeholder and the negative template is a plain fragment
//! prepended to the user's negative prompt. Extraction un-applies
//! templates, peeling matched styles off the prompt pair and returning the
//! residual user text plus the matched style names.

/// Result of style extraction: matched names and residual prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleExtraction {
    pub styles: Vec<String>,
    pub prompt: String,
    pub negative_prompt: String,
}

/// Extracts recognized style fragments from a prompt pair.
pub trait StyleExtractor {
    fn extract(&self, prompt: &str, negative_prompt: &str) -> StyleExtraction;
}

/// Extractor that recognizes nothing and returns the prompts unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStyles;

impl StyleExtractor for NoStyles {
    fn extract(&self, prompt: &str, negative_prompt: &str) -> StyleExtraction {
        StyleExtraction {
            styles: Vec::new(),
            prompt: prompt.to_string(),
            negative_prompt: negative_prompt.to_string(),
        }
    }
}

/// A named style template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTemplate {
    pub name: String,
    /// Positive template; `{prompt}` marks where the user prompt goes.
    /// A template without the placeholder matches only an exact prompt.
    pub prompt: String,
    /// Negative fragment prepended to the user's negative prompt.
    pub negative_prompt: String,
}

impl StyleTemplate {
    pub fn new(
        name: impl Into<String>,
        prompt: impl Into<String>,
        negative_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            negative_prompt: negative_prompt.into(),
        }
    }

    /// Un-apply this template from a prompt pair.
    ///
    /// Returns the residual pair when both halves match, `None` otherwise.
    fn unapply(&self, prompt: &str, negative_prompt: &str) -> Option<(String, String)> {
        let residual_prompt = match self.prompt.split_once("{prompt}") {
            Some((prefix, suffix)) => prompt
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))?
                .to_string(),
            // No placeholder: the template replaces the prompt wholesale.
            None => {
                if prompt == self.prompt {
                    String::new()
                } else {
                    return None;
                }
            }
        };

        let residual_negative = if self.negative_prompt.is_empty() {
            negative_prompt.to_string()
        } else if negative_prompt == self.negative_prompt {
            String::new()
        } else {
            negative_prompt
                .strip_prefix(&format!("{}, ", self.negative_prompt))?
                .to_string()
        };

        Some((residual_prompt, residual_negative))
    }
}

/// A collection of style templates matched greedily against prompts.
///
/// # Example
///
/// ```
/// use geninfo::styles::{StyleBook, StyleExtractor, StyleTemplate};
///
/// let book = StyleBook::new(vec![StyleTemplate::new(
///     "Cinematic",
///     "cinematic still {prompt} . emotional, dramatic lighting",
///     "anime, cartoon, graphic",
/// )]);
///
/// let out = book.extract(
///     "cinematic still a red fox . emotional, dramatic lighting",
///     "anime, cartoon, graphic, lowres",
/// );
/// assert_eq!(out.styles, ["Cinematic"]);
/// assert_eq!(out.prompt, "a red fox");
/// assert_eq!(out.negative_prompt, "lowres");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StyleBook {
    styles: Vec<StyleTemplate>,
}

impl StyleBook {
    pub fn new(styles: Vec<StyleTemplate>) -> Self {
        Self { styles }
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

impl StyleExtractor for StyleBook {
    fn extract(&self, prompt: &str, negative_prompt: &str) -> StyleExtraction {
        let mut matched = Vec::new();
        let mut prompt = prompt.to_string();
        let mut negative_prompt = negative_prompt.to_string();

        // Styles can be layered, so keep peeling until a full pass over the
        // book matches nothing. Each style matches at most once.
        let mut changed = true;
        while changed {
            changed = false;
            for style in &self.styles {
                if matched.contains(&style.name) {
                    continue;
                }
                if let Some((rest_prompt, rest_negative)) =
                    style.unapply(&prompt, &negative_prompt)
                {
                    prompt = rest_prompt;
                    negative_prompt = rest_negative;
                    matched.push(style.name.clone());
                    changed = true;
                }
            }
        }

        StyleExtraction {
            styles: matched,
            prompt,
            negative_prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> StyleBook {
        StyleBook::new(vec![
            StyleTemplate::new(
                "Sharp Focus",
                "{prompt}, sharp focus, highly detailed",
                "",
            ),
            StyleTemplate::new(
                "Cinematic",
                "cinematic still {prompt} . dramatic lighting",
                "anime, cartoon",
            ),
        ])
    }

    #[test]
    fn no_match_returns_input_unchanged() {
        let out = book().extract("a quiet harbor", "blurry");
        assert!(out.styles.is_empty());
        assert_eq!(out.prompt, "a quiet harbor");
        assert_eq!(out.negative_prompt, "blurry");
    }

    #[test]
    fn single_style_peeled() {
        let out = book().extract("a quiet harbor, sharp focus, highly detailed", "blurry");
        assert_eq!(out.styles, ["Sharp Focus"]);
        assert_eq!(out.prompt, "a quiet harbor");
        assert_eq!(out.negative_prompt, "blurry");
    }

    #[test]
    fn layered_styles_all_recovered() {
        let prompt = "cinematic still a quiet harbor, sharp focus, highly detailed . dramatic lighting";
        let out = book().extract(prompt, "anime, cartoon, blurry");
        assert_eq!(out.styles, ["Cinematic", "Sharp Focus"]);
        assert_eq!(out.prompt, "a quiet harbor");
        assert_eq!(out.negative_prompt, "blurry");
    }

    #[test]
    fn negative_fragment_must_match() {
        // Positive half matches but the negative fragment is absent.
        let out = book().extract("cinematic still a harbor . dramatic lighting", "blurry");
        assert!(out.styles.is_empty());
        assert_eq!(out.prompt, "cinematic still a harbor . dramatic lighting");
    }

    #[test]
    fn noop_extractor() {
        let out = NoStyles.extract("prompt", "negative");
        assert!(out.styles.is_empty());
        assert_eq!(out.prompt, "prompt");
        assert_eq!(out.negative_prompt, "negative");
    }
}
