//! Geninfo - a codec for AI image generation metadata
//!
//! Geninfo converts the generation settings embedded in AI-generated
//! images between two conventions: the free-form comma-separated "A1111"
//! text format and the structured "Fooocus" JSON format. Model and LoRA
//! identities are resolved by filename stem and content hash so metadata
//! survives file renames across machines.
//!
//! # Architecture
//!
//! - [`types`] - Schemes, parameter entries, the normalized mapping, errors
//! - [`codec`] - The codec contract, shared parser state, and both codecs
//! - [`reader`] - PNG text-chunk extraction and scheme detection
//! - [`catalog`] - Installed model/LoRA filename lists and stem matching
//! - [`hash`] - Content hashing with a memoizing cache
//! - [`styles`] - Style-template extraction from rendered prompts
//! - [`performance`] - The fixed steps-to-performance-tier table
//! - [`config`] - TOML configuration for the CLI
//! - [`cli`] - Command-line interface layer
//!
//! # Error policy
//!
//! Parsing is best-effort: a malformed individual field or an
//! unresolvable model reference is logged and skipped, never fatal.
//! Contract violations (an unknown scheme tag, the wrong raw shape for a
//! codec, missing required serialize input) propagate as
//! [`types::MetadataError`].

pub mod catalog;
pub mod cli;
pub mod codec;
pub mod config;
pub mod hash;
pub mod performance;
pub mod reader;
pub mod styles;
pub mod types;
