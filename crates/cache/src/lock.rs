use crate::error::{CacheError, Result};
use fs2::FileExt;
use std::path::Path;

const LOCK_FILE_NAME: &str = "history.json.lock";

/// Exclusive advisory lock serializing index load-modify-persist sequences
/// across processes. Unlocked on drop.
pub(crate) struct IndexLock {
    file: std::fs::File,
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

pub(crate) fn acquire_index_lock(storage_dir: &Path) -> Result<IndexLock> {
    let path = storage_dir.join(LOCK_FILE_NAME);
    std::fs::create_dir_all(storage_dir)?;

    let file = std::fs::OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .map_err(|err| CacheError::LockError(format!("open {}: {err}", path.display())))?;

    file.lock_exclusive()
        .map_err(|err| CacheError::LockError(format!("acquire {}: {err}", path.display())))?;

    Ok(IndexLock { file })
}
