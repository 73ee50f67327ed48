//! Per-chunk content version tracking.
//!
//! A [`VersionTracker`] owns the hash table for one build session: it is
//! created when the watch session starts and discarded with it, never
//! global. The first `diff` after creation reports every chunk as changed,
//! which is what guarantees agents get an initial reload signal on the
//! first rebuild of a session.

use rustc_hash::{FxHashMap, FxHashSet};

/// An opaque content hash for one build chunk.
///
/// Hosts that already compute per-chunk digests wrap them with
/// [`ContentHash::new`]; the tracker only ever compares for equality.
/// Hosts holding raw output bytes can use [`ContentHash::of`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(Box<str>);

impl ContentHash {
    /// Wrap a host-supplied digest string.
    pub fn new(hash: impl Into<Box<str>>) -> Self {
        Self(hash.into())
    }

    /// Compute a blake3 digest over raw content bytes.
    pub fn of(content: &[u8]) -> Self {
        Self(hex::encode(blake3::hash(content).as_bytes()).into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 16 chars are plenty for logs
        write!(f, "{}", self.0.get(..16).unwrap_or(&self.0))
    }
}

/// One named build output unit, as reported by the host per rebuild.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Entry-point name (stable across rebuilds)
    pub name: String,
    /// Content hash of this rebuild's output
    pub hash: ContentHash,
    /// Files this chunk produced (relative output paths)
    pub files: Vec<String>,
}

impl ChunkRecord {
    pub fn new(
        name: impl Into<String>,
        hash: impl Into<Box<str>>,
        files: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            hash: ContentHash::new(hash),
            files,
        }
    }
}

/// Session-scoped table of last-seen chunk hashes.
#[derive(Debug, Default)]
pub struct VersionTracker {
    versions: FxHashMap<String, ContentHash>,
}

impl VersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff a rebuild's chunk list against the last-seen hashes.
    ///
    /// Returns the names whose hash differs from the stored one. A chunk
    /// with no stored hash counts as changed (session bootstrap). The
    /// stored hash is unconditionally replaced with the observed one;
    /// names are never removed mid-session.
    pub fn diff(&mut self, chunks: &[ChunkRecord]) -> FxHashSet<String> {
        let mut changed = FxHashSet::default();
        for chunk in chunks {
            let previous = self.versions.insert(chunk.name.clone(), chunk.hash.clone());
            if previous.as_ref() != Some(&chunk.hash) {
                crate::debug!("reload"; "chunk changed: {} ({})", chunk.name, chunk.hash);
                changed.insert(chunk.name.clone());
            }
        }
        changed
    }

    /// Number of chunks observed so far this session.
    pub fn tracked(&self) -> usize {
        self.versions.len()
    }
}
