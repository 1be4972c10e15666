use crate::blob::BlobStore;
use crate::error::{CacheError, Result};
use crate::fingerprint::Fingerprint;
use crate::index::{cache_key, unix_now_secs, CacheEntry, HistoryIndex, Metadata};
use crate::lock::acquire_index_lock;
use std::path::{Path, PathBuf};

const INDEX_FILE_NAME: &str = "history.json";

/// A cache hit: the stored analysis plus the entry bookkeeping around it.
#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub content: String,
    pub metadata: Metadata,
    pub timestamp: f64,
    pub file_path: PathBuf,
    pub fingerprint: Fingerprint,
}

/// An index entry together with its cache key, for history browsing.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub cache_key: String,
    pub entry: CacheEntry,
}

/// Filesystem-backed analysis cache: a JSON index plus one markdown blob per
/// entry, both under `storage_dir`. The handle holds no in-memory index:
/// every operation re-reads the persisted file, so long-lived sessions
/// observe writes from concurrent processes. All index mutation runs under an
/// exclusive file lock.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    storage_dir: PathBuf,
    index_path: PathBuf,
    blobs: BlobStore,
}

impl HistoryStore {
    pub fn open(storage_dir: impl Into<PathBuf>) -> Result<Self> {
        let storage_dir = storage_dir.into();
        std::fs::create_dir_all(&storage_dir)?;
        Ok(Self {
            index_path: storage_dir.join(INDEX_FILE_NAME),
            blobs: BlobStore::new(&storage_dir),
            storage_dir,
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Looks up a cached analysis for (source, template). An index entry
    /// whose blob has gone missing is pruned from the persisted index before
    /// the miss is reported (lazy self-heal).
    pub fn get(
        &self,
        source: &str,
        is_file: bool,
        prompt_name: &str,
    ) -> Result<Option<CachedAnalysis>> {
        let fingerprint = Fingerprint::compute(source, is_file);
        let key = cache_key(fingerprint.hex(), prompt_name);

        // The lock covers the eviction path's load-modify-persist; taking it
        // up front also keeps the entry/blob pair we observe consistent
        // against concurrent savers.
        let _lock = acquire_index_lock(&self.storage_dir)?;
        let mut index = HistoryIndex::load(&self.index_path);

        let Some(entry) = index.entries.get(&key) else {
            return Ok(None);
        };

        match self.blobs.read(&entry.file_name)? {
            Some(content) => {
                log::info!(
                    "cache hit: {} (prompt: {prompt_name})",
                    entry.original_source
                );
                Ok(Some(CachedAnalysis {
                    content,
                    metadata: entry.metadata.clone(),
                    timestamp: entry.timestamp,
                    file_path: self.blobs.path_of(&entry.file_name),
                    fingerprint,
                }))
            }
            None => {
                let file_name = entry.file_name.clone();
                index.entries.remove(&key);
                index.persist(&self.index_path)?;
                log::info!("pruned stale cache entry {key} (blob {file_name} is gone)");
                Ok(None)
            }
        }
    }

    /// Stores an analysis result and upserts its index entry. A second save
    /// with the same (source, template) overwrites the first. Write failures
    /// propagate: silently losing a freshly computed result is worse than a
    /// visible error.
    pub fn save(
        &self,
        source: &str,
        fingerprint: &Fingerprint,
        prompt_name: &str,
        content: &str,
        metadata: Metadata,
    ) -> Result<PathBuf> {
        let file_name = BlobStore::file_name_for(source, prompt_name, fingerprint);

        // The blob write stays under the lock so concurrent saves of the same
        // key cannot pair one saver's blob with the other's index entry.
        let _lock = acquire_index_lock(&self.storage_dir)?;
        let path = self.blobs.write(&file_name, content)?;

        let mut index = HistoryIndex::load(&self.index_path);
        index.entries.insert(
            cache_key(fingerprint.hex(), prompt_name),
            CacheEntry {
                file_name,
                original_source: source.to_string(),
                prompt_name: prompt_name.to_string(),
                timestamp: unix_now_secs(),
                metadata,
            },
        );
        index.persist(&self.index_path)?;
        log::info!("saved analysis and updated index: {}", path.display());
        Ok(path)
    }

    /// All history records, most recent first.
    pub fn list(&self) -> Result<Vec<HistoryRecord>> {
        let index = HistoryIndex::load(&self.index_path);
        let mut records: Vec<HistoryRecord> = index
            .entries
            .into_iter()
            .map(|(cache_key, entry)| HistoryRecord { cache_key, entry })
            .collect();
        records.sort_by(|a, b| b.entry.timestamp.total_cmp(&a.entry.timestamp));
        Ok(records)
    }

    /// Removes an index entry, and optionally its blob. An unknown key is an
    /// expected caller error, reported as [`CacheError::EntryNotFound`].
    pub fn delete(&self, cache_key: &str, delete_blob: bool) -> Result<()> {
        let _lock = acquire_index_lock(&self.storage_dir)?;
        let mut index = HistoryIndex::load(&self.index_path);

        let Some(entry) = index.entries.remove(cache_key) else {
            return Err(CacheError::EntryNotFound(cache_key.to_string()));
        };
        // Blob first: if its removal fails, the on-disk index still points at
        // an existing blob.
        if delete_blob {
            self.blobs.remove(&entry.file_name)?;
        }
        index.persist(&self.index_path)?;
        Ok(())
    }
}
