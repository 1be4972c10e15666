//! # Paperdex Cache
//!
//! Filesystem-backed cache and history index for paper-analysis results.
//! Deduplicates expensive analyses by fingerprinting an input source plus an
//! analysis template, persists results to disk, and exposes lookup, listing
//! and deletion for later retrieval.
//!
//! ## Layout
//!
//! ```text
//! storage_dir/
//!     history.json          cache_key → entry index (full-rewrite, atomic)
//!     history.json.lock     advisory lock serializing index mutation
//!     <stem>_<prompt>_<digest8>.md   one blob per entry
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use paperdex_cache::{Fingerprint, HistoryStore, Metadata};
//!
//! fn main() -> paperdex_cache::Result<()> {
//!     let store = HistoryStore::open("saved_analyses")?;
//!
//!     let source = "https://arxiv.org/pdf/1234.5678";
//!     if let Some(hit) = store.get(source, false, "phd_analysis")? {
//!         println!("{}", hit.content);
//!         return Ok(());
//!     }
//!
//!     // Cache miss: run the (external) analysis, then store it.
//!     let fingerprint = Fingerprint::compute(source, false);
//!     let content = "# Summary\n...";
//!     store.save(source, &fingerprint, "phd_analysis", content, Metadata::new())?;
//!     Ok(())
//! }
//! ```

mod blob;
mod error;
mod fingerprint;
mod index;
mod lock;
mod store;

pub use blob::BlobStore;
pub use error::{CacheError, Result};
pub use fingerprint::{Fingerprint, FingerprintKind};
pub use index::{cache_key, CacheEntry, HistoryIndex, MetaValue, Metadata};
pub use store::{CachedAnalysis, HistoryRecord, HistoryStore};
