//! catalog
//!
//! Known model and LoRA filename lists.
//!
//! Metadata written by other machines references models by filename stem
//! (no directory, no extension). Resolution scans the locally installed
//! filenames for a stem match, first match wins, and leaves the value
//! untouched when nothing matches. One reserved always-available LoRA is
//! excluded from general matching.

use std::io;
use std::path::Path;

/// Filename extensions considered model files when scanning a directory.
const MODEL_EXTENSIONS: [&str; 4] = ["safetensors", "ckpt", "pt", "pth"];

/// The filename stem: no directory, no extension.
///
/// # Example
///
/// ```
/// use geninfo::catalog::file_stem;
///
/// assert_eq!(file_stem("juggernaut_v8.safetensors"), "juggernaut_v8");
/// assert_eq!(file_stem("loras/detail_tweaker.safetensors"), "detail_tweaker");
/// assert_eq!(file_stem("plain"), "plain");
/// ```
pub fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
}

/// Ordered lists of installed model and LoRA filenames.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    model_filenames: Vec<String>,
    lora_filenames: Vec<String>,
    reserved_lora: Option<String>,
}

impl ModelCatalog {
    /// Create a catalog from explicit filename lists.
    pub fn new(model_filenames: Vec<String>, lora_filenames: Vec<String>) -> Self {
        Self {
            model_filenames,
            lora_filenames,
            reserved_lora: None,
        }
    }

    /// Mark one LoRA filename as reserved.
    ///
    /// The reserved LoRA is always available to the pipeline itself and is
    /// excluded from stem matching so that foreign metadata never resolves
    /// to it by accident.
    pub fn with_reserved_lora(mut self, filename: impl Into<String>) -> Self {
        self.reserved_lora = Some(filename.into());
        self
    }

    /// Build a catalog by listing model files in the given directories.
    ///
    /// A missing directory contributes an empty list; filenames are sorted
    /// for deterministic first-match resolution.
    pub fn from_directories(checkpoints_dir: &Path, loras_dir: &Path) -> io::Result<Self> {
        Ok(Self::new(
            list_model_files(checkpoints_dir)?,
            list_model_files(loras_dir)?,
        ))
    }

    /// Installed model filenames.
    pub fn model_filenames(&self) -> &[String] {
        &self.model_filenames
    }

    /// Installed LoRA filenames, including the reserved one.
    pub fn lora_filenames(&self) -> &[String] {
        &self.lora_filenames
    }

    /// Resolve a bare model stem to the first installed filename with a
    /// matching stem.
    pub fn resolve_model_stem(&self, stem: &str) -> Option<&str> {
        self.model_filenames
            .iter()
            .map(String::as_str)
            .find(|filename| file_stem(filename) == stem)
    }

    /// Resolve a bare LoRA stem against the matchable LoRA list.
    pub fn resolve_lora_stem(&self, stem: &str) -> Option<&str> {
        self.matchable_loras()
            .find(|filename| file_stem(filename) == stem)
    }

    /// LoRA filenames eligible for stem matching (reserved LoRA excluded).
    pub fn matchable_loras(&self) -> impl Iterator<Item = &str> {
        self.lora_filenames
            .iter()
            .map(String::as_str)
            .filter(move |filename| Some(*filename) != self.reserved_lora.as_deref())
    }
}

fn list_model_files(dir: &Path) -> io::Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        let is_model = Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| MODEL_EXTENSIONS.contains(&ext));
        if is_model {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
