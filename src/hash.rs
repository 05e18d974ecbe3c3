//! hash
//!
//! Content hashing for model identity.
//!
//! Models and LoRAs are identified by a digest of their file bytes so that
//! metadata survives renames. Hashing a multi-gigabyte checkpoint is slow,
//! so lookups go through [`HashCache`], which memoizes per path for the
//! lifetime of the cache. Files are assumed immutable while a cache is
//! alive; there is no eviction or invalidation.
//!
//! The cache is an explicit object with caller-controlled lifetime (for
//! example one per batch run). It is not synchronized: pipelines running in
//! parallel must either wrap a shared cache in a lock or hold one cache per
//! worker.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from content hashing.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("failed to hash '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A deterministic digest over a file's bytes.
///
/// Implementations must be collision-resistant and stable across runs;
/// the digest string is embedded in image metadata and compared against
/// digests produced by other tools.
pub trait ContentHasher {
    fn hash(&self, path: &Path) -> Result<String, HashError>;
}

/// SHA-256 over the full file contents, rendered as lowercase hex.
///
/// # Example
///
/// ```no_run
/// use geninfo::hash::{ContentHasher, Sha256FileHasher};
/// use std::path::Path;
///
/// let digest = Sha256FileHasher.hash(Path::new("model.safetensors")).unwrap();
/// assert_eq!(digest.len(), 64);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256FileHasher;

impl ContentHasher for Sha256FileHasher {
    fn hash(&self, path: &Path) -> Result<String, HashError> {
        let io_err = |source| HashError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(io_err)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf).map_err(io_err)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Memoizing path-to-digest lookup.
///
/// # Example
///
/// ```no_run
/// use geninfo::hash::HashCache;
/// use std::path::Path;
///
/// let mut cache = HashCache::sha256();
/// let first = cache.get_hash(Path::new("model.safetensors")).unwrap();
/// // Second lookup is served from the cache without re-reading the file.
/// let second = cache.get_hash(Path::new("model.safetensors")).unwrap();
/// assert_eq!(first, second);
/// ```
pub struct HashCache {
    hasher: Box<dyn ContentHasher>,
    entries: HashMap<PathBuf, String>,
}

impl HashCache {
    /// Create a cache over the given hasher.
    pub fn new(hasher: Box<dyn ContentHasher>) -> Self {
        Self {
            hasher,
            entries: HashMap::new(),
        }
    }

    /// Create a cache over [`Sha256FileHasher`].
    pub fn sha256() -> Self {
        Self::new(Box::new(Sha256FileHasher))
    }

    /// Look up the digest for `path`, computing and storing it on first use.
    pub fn get_hash(&mut self, path: &Path) -> Result<String, HashError> {
        if let Some(digest) = self.entries.get(path) {
            return Ok(digest.clone());
        }
        let digest = self.hasher.hash(path)?;
        self.entries.insert(path.to_path_buf(), digest.clone());
        Ok(digest)
    }

    /// Number of memoized entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for HashCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Default for HashCache {
    fn default() -> Self {
        Self::sha256()
    }
}
