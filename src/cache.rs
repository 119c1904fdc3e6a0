//! Content-addressed compiled artifact cache.
//!
//! Artifacts are keyed by a deterministic hash of the source file's
//! absolute path and its modification time, truncated to 10 hex
//! characters. There is no explicit invalidation: an artifact persists
//! indefinitely under its key and a fresh compile happens only when the
//! key itself changes. This is deliberately leaky — two paths could
//! theoretically collide in the truncated key, and a file edited then
//! reverted within mtime granularity silently reuses the stale artifact.
//!
//! Two tiers: an in-memory map of shared programs and on-disk JSON
//! artifacts in the cache directory for reuse across engine instances.
//! Writes go through a temp-file-then-rename so a crashed writer never
//! leaves a half-written artifact. Concurrent first-compiles of the same
//! key may each write; compilation is a pure function of the source
//! bytes, so the last writer wins with equivalent content.

use crate::error::{Result, StencilError};
use crate::program::Program;
use std::collections::HashMap;
use std::fs::{self, File};
use std::hash::Hasher;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

/// Length of the truncated hex key.
const KEY_LEN: usize = 10;

/// Deterministic FNV-1a 64-bit hasher. The algorithm is fixed by spec,
/// unlike `DefaultHasher`, so keys stay stable across processes and Rust
/// versions.
struct Fnv1aHasher(u64);

impl Fnv1aHasher {
    fn new() -> Self {
        Self(0xcbf29ce484222325)
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        const PRIME: u64 = 0x100000001b3;
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(PRIME);
        }
    }
}

/// Derive the cache key for a source file from its path and mtime.
///
/// Same inputs always yield the same key; the mtime is truncated to whole
/// seconds, matching the granularity the original design relied on.
pub fn key_for(path: &Path) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| StencilError::io(path, e))?;
    let mtime = metadata
        .modified()
        .map_err(|e| StencilError::io(path, e))?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut hasher = Fnv1aHasher::new();
    hasher.write(path.display().to_string().as_bytes());
    hasher.write(&mtime.to_le_bytes());

    let hex = format!("{:016x}", hasher.finish());
    Ok(hex[..KEY_LEN].to_string())
}

/// Two-tier store for compiled programs.
#[derive(Debug)]
pub struct ArtifactCache {
    dir: PathBuf,
    memory: HashMap<String, Arc<Program>>,
}

impl ArtifactCache {
    /// Create a cache rooted at `dir`. The directory is created lazily on
    /// first store.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), memory: HashMap::new() }
    }

    fn artifact_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("artifact_{key}.json"))
    }

    /// Retrieve the program stored under `key`, consulting memory first
    /// and then the cache directory. A disk hit is promoted into memory.
    pub fn get(&mut self, key: &str) -> Result<Option<Arc<Program>>> {
        if let Some(program) = self.memory.get(key) {
            return Ok(Some(Arc::clone(program)));
        }

        let path = self.artifact_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let encoded = fs::read_to_string(&path).map_err(|e| StencilError::io(&path, e))?;
        let program: Program =
            serde_json::from_str(&encoded).map_err(|e| StencilError::CorruptArtifact {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let shared = Arc::new(program);
        self.memory.insert(key.to_string(), Arc::clone(&shared));
        Ok(Some(shared))
    }

    /// Persist a freshly compiled program under `key` and keep it in
    /// memory. Called only after compilation fully succeeded.
    pub fn store(&mut self, key: &str, program: Program) -> Result<Arc<Program>> {
        let path = self.artifact_path(key);
        let encoded = serde_json::to_string(&program).map_err(|e| StencilError::CorruptArtifact {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        write_atomic(&path, encoded.as_bytes())?;

        let shared = Arc::new(program);
        self.memory.insert(key.to_string(), Arc::clone(&shared));
        Ok(shared)
    }

    /// Whether an artifact already exists under `key` in either tier.
    pub fn contains(&self, key: &str) -> bool {
        self.memory.contains_key(key) || self.artifact_path(key).exists()
    }
}

/// Write bytes via a temp file in the target directory, then rename into
/// place. Rename is atomic on the same filesystem, so readers only ever
/// observe complete artifacts.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    if !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| StencilError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StencilError::io(path, std::io::Error::other("invalid artifact path")))?;
    let temp_path = parent.join(format!(".{file_name}.tmp"));

    let mut file = File::create(&temp_path).map_err(|e| StencilError::io(&temp_path, e))?;
    file.write_all(content).and_then(|_| file.sync_all()).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StencilError::io(&temp_path, e)
    })?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StencilError::io(path, e)
    })
}
