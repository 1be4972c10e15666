use crate::error::Result;
use crate::fingerprint::Fingerprint;
use std::path::{Path, PathBuf};

const MAX_STEM_LEN: usize = 50;

/// One result file per cache entry, stored alongside the index. Plain UTF-8
/// markdown with no required internal structure.
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Derives the blob file name for a source/template pair:
    /// `<sanitized-stem>_<prompt>_<digest-8-hex>.md`. The digest prefix keeps
    /// differently-named sources apart when they sanitize to the same stem.
    pub fn file_name_for(source: &str, prompt_name: &str, fingerprint: &Fingerprint) -> String {
        let stem = sanitize_stem(trailing_segment(source));
        format!("{stem}_{prompt_name}_{}.md", fingerprint.short_prefix())
    }

    /// Overwrites any existing blob of the same name. Errors propagate: a
    /// silently dropped analysis result is worse than a visible failure.
    pub fn write(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_of(file_name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Returns the blob content, or `None` when the file does not exist.
    /// The `None` is the self-heal trigger for stale index entries.
    pub fn read(&self, file_name: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_of(file_name)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes a blob; a file that is already gone is not an error.
    pub fn remove(&self, file_name: &str) -> Result<()> {
        match std::fs::remove_file(self.path_of(file_name)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn trailing_segment(source: &str) -> &str {
    source
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source)
}

fn sanitize_stem(raw: &str) -> String {
    let mut stem: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_'))
        .collect();
    stem.truncate(MAX_STEM_LEN);
    if stem.is_empty() {
        stem.push_str("analysis");
    }
    stem
}
