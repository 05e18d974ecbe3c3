//! cli::args
//!
//! Command-line argument definitions using clap derive.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::MetadataScheme;

/// Inspect and convert AI image generation metadata
#[derive(Parser, Debug)]
#[command(name = "geninfo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read generation metadata from a PNG and print it as JSON
    #[command(name = "inspect")]
    Inspect {
        /// The image to inspect
        image: PathBuf,

        /// Force a scheme instead of auto-detecting (a1111 or fooocus)
        #[arg(long)]
        scheme: Option<MetadataScheme>,
    },

    /// Print the content hash of a model file
    #[command(name = "hash")]
    Hash {
        /// The file to hash
        file: PathBuf,
    },
}
