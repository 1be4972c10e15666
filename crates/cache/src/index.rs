use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Free-form per-entry metadata, restricted to primitives so the persisted
/// index stays well-defined across tooling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

pub type Metadata = BTreeMap<String, MetaValue>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub file_name: String,
    pub original_source: String,
    pub prompt_name: String,
    /// Unix seconds at save time.
    pub timestamp: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Cache key for a (digest, template) pair. The digest is fixed-width hex, so
/// distinct pairs can never produce the same key.
pub fn cache_key(digest: &str, prompt_name: &str) -> String {
    format!("{digest}_{prompt_name}")
}

pub fn unix_now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

/// The persisted history index: cache key → entry, mirrored to a single JSON
/// file. Full-rewrite persistence; no append log.
#[derive(Debug, Default, Clone)]
pub struct HistoryIndex {
    pub entries: HashMap<String, CacheEntry>,
}

impl HistoryIndex {
    /// Reads the index file. An absent file yields an empty index; an
    /// unparsable one is logged and also yields an empty index. Losing the
    /// whole cache is an acceptable degradation, propagating corruption to
    /// callers is not.
    pub fn load(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Self::default();
            }
            Err(err) => {
                log::warn!("reading history index {} failed: {err}; starting empty", path.display());
                return Self::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(entries) => Self { entries },
            Err(err) => {
                log::warn!("history index {} is corrupt: {err}; starting empty", path.display());
                Self::default()
            }
        }
    }

    /// Serializes the full index back to disk, human-readable. Writes a
    /// `.tmp` sibling and renames it over the target so a crash mid-write
    /// never leaves a truncated index behind.
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&self.entries)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &bytes)?;
        if let Err(err) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }
}
