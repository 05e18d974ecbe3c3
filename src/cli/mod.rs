//! cli
//!
//! Command-line interface layer.
//!
//! The CLI is thin: it parses arguments, loads config, builds a
//! [`MetadataContext`] from the configured model directories, and
//! delegates to the library. All parsing and serialization logic lives in
//! [`crate::codec`] and [`crate::reader`].

pub mod args;

pub use args::{Cli, Command};

use std::path::Path;

use anyhow::{Context as _, Result};
use serde_json::Value;

use crate::catalog::ModelCatalog;
use crate::codec::{codec_for_scheme, MetadataContext};
use crate::config::Config;
use crate::hash::{ContentHasher, Sha256FileHasher};
use crate::reader;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Inspect { image, scheme } => inspect(&config, &image, scheme),
        Command::Hash { file } => {
            let digest = Sha256FileHasher.hash(&file)?;
            println!("{digest}");
            Ok(())
        }
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn inspect(
    config: &Config,
    image: &Path,
    forced_scheme: Option<crate::types::MetadataScheme>,
) -> Result<()> {
    let ctx = build_context(config)?;

    let detected = reader::read_image_metadata(image)
        .with_context(|| format!("reading metadata from '{}'", image.display()))?;

    let scheme = forced_scheme.or(detected.scheme);
    let (Some(scheme), Some(parameters)) = (scheme, detected.parameters) else {
        anyhow::bail!(
            "no recognizable generation metadata in '{}'",
            image.display()
        );
    };

    let codec = codec_for_scheme(scheme);
    let parsed = codec.parse(&ctx, &parameters)?;

    let mut output = serde_json::Map::new();
    output.insert("scheme".into(), Value::String(scheme.to_string()));
    output.insert("data".into(), Value::Object(parsed));
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn build_context(config: &Config) -> Result<MetadataContext> {
    let checkpoints_dir = config
        .checkpoints_dir
        .clone()
        .unwrap_or_else(|| Path::new(".").to_path_buf());
    let loras_dir = config
        .loras_dir
        .clone()
        .unwrap_or_else(|| Path::new(".").to_path_buf());

    let mut catalog = ModelCatalog::from_directories(&checkpoints_dir, &loras_dir)
        .context("listing model directories")?;
    if let Some(reserved) = &config.reserved_lora {
        catalog = catalog.with_reserved_lora(reserved.clone());
    }

    Ok(MetadataContext::new(catalog, checkpoints_dir, loras_dir)
        .with_created_by(config.created_by()))
}
