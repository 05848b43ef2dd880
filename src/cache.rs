//! Artifact cache (spec §3, §4.3): four shards keyed by encoding, each a
//! `parking_lot::RwLock<FxHashMap<..>>` for lock-free-ish reads and cheap
//! serialized inserts, grounded on the teacher's `rustc-hash`/`parking_lot`
//! pairing and on the lazily-populated compressed-variant map in
//! `other_examples/9ce65fa5_Xevion-xevion.dev__src-cache.rs.rs`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::negotiation::Encoding;

#[derive(Clone, Debug)]
pub struct Artifact {
    pub path: PathBuf,
    pub mtime: SystemTime,
    pub bytes: Bytes,
    pub encoding: Encoding,
    pub media_type: Option<&'static str>,
}

/// One shard per encoding; append-only within a process lifetime, no TTL
/// or LRU (spec §4.3 explicitly does not require eviction).
pub struct ArtifactCache {
    identity: RwLock<FxHashMap<PathBuf, Artifact>>,
    gzip: RwLock<FxHashMap<PathBuf, Artifact>>,
    deflate: RwLock<FxHashMap<PathBuf, Artifact>>,
    br: RwLock<FxHashMap<PathBuf, Artifact>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self {
            identity: RwLock::new(FxHashMap::default()),
            gzip: RwLock::new(FxHashMap::default()),
            deflate: RwLock::new(FxHashMap::default()),
            br: RwLock::new(FxHashMap::default()),
        }
    }

    fn shard(&self, encoding: Encoding) -> &RwLock<FxHashMap<PathBuf, Artifact>> {
        match encoding {
            Encoding::Identity => &self.identity,
            Encoding::Gzip => &self.gzip,
            Encoding::Deflate => &self.deflate,
            Encoding::Br => &self.br,
        }
    }

    /// A cache hit requires both the path and the recorded `mtime` to match
    /// the file's current mtime (spec invariant 3: cache key consistency
    /// across mtime changes without requiring invalidation).
    pub fn get(&self, path: &Path, encoding: Encoding, mtime: SystemTime) -> Option<Artifact> {
        let guard = self.shard(encoding).read();
        guard
            .get(path)
            .filter(|artifact| artifact.mtime == mtime)
            .cloned()
    }

    /// New entries replace old ones atomically (spec invariant: never
    /// overwritten in place); duplicate inserts from racing requests are
    /// benign, last writer wins.
    pub fn insert(&self, artifact: Artifact) {
        let encoding = artifact.encoding;
        let mut guard = self.shard(encoding).write();
        guard.insert(artifact.path.clone(), artifact);
    }

    pub fn len(&self, encoding: Encoding) -> usize {
        self.shard(encoding).read().len()
    }
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps decoded URL (no trailing slash) to an index-resolved rewrite
/// target, populated lazily when index resolution hits disk (spec §3, §4.1).
pub struct IndexMemo {
    entries: RwLock<FxHashMap<String, String>>,
}

impl IndexMemo {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn get(&self, url: &str) -> Option<String> {
        self.entries.read().get(url).cloned()
    }

    pub fn insert(&self, url: String, rewrite: String) {
        self.entries.write().insert(url, rewrite);
    }
}

impl Default for IndexMemo {
    fn default() -> Self {
        Self::new()
    }
}
