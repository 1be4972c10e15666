use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

const READ_BLOCK_SIZE: usize = 4096;

/// How a fingerprint was derived. Remote sources are identity-addressed: the
/// cache cannot see that content behind a stable URL has changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintKind {
    /// Digest over the full byte content of a local file.
    FileContent,
    /// Digest over the UTF-8 bytes of the source string itself.
    SourceIdentity,
    /// File read failed mid-stream; degraded to hashing the source string.
    ReadFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    hex: String,
    kind: FingerprintKind,
}

impl Fingerprint {
    /// Computes a stable identifier for an input source.
    ///
    /// A file that exists is streamed in fixed-size blocks so identical bytes
    /// under different paths collide (intentional dedup) and a modified file
    /// at the same path produces a new digest. Anything else (URLs, missing
    /// paths) hashes the source string. File I/O failures never propagate:
    /// the result degrades to a string hash and says so via
    /// [`FingerprintKind::ReadFallback`].
    pub fn compute(source: &str, is_file: bool) -> Self {
        if is_file && Path::new(source).exists() {
            match hash_file_content(Path::new(source)) {
                Ok(hex) => {
                    return Self {
                        hex,
                        kind: FingerprintKind::FileContent,
                    }
                }
                Err(err) => {
                    log::warn!("hashing file content of {source} failed: {err}; falling back to source-string hash");
                    return Self {
                        hex: hash_str(source),
                        kind: FingerprintKind::ReadFallback,
                    };
                }
            }
        }
        Self {
            hex: hash_str(source),
            kind: FingerprintKind::SourceIdentity,
        }
    }

    /// Lowercase hex digest, 64 chars.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    pub fn kind(&self) -> FingerprintKind {
        self.kind
    }

    /// Short prefix mixed into blob file names to keep differently-named
    /// sources apart after sanitization.
    pub fn short_prefix(&self) -> &str {
        &self.hex[..8]
    }
}

fn hash_file_content(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut block = [0u8; READ_BLOCK_SIZE];
    loop {
        let n = file.read(&mut block)?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn hash_str(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identical_file_content_collides_across_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("nested").join("b.pdf");
        std::fs::create_dir_all(b.parent().unwrap()).unwrap();
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();

        let fa = Fingerprint::compute(a.to_str().unwrap(), true);
        let fb = Fingerprint::compute(b.to_str().unwrap(), true);

        assert_eq!(fa.hex(), fb.hex());
        assert_eq!(fa.kind(), FingerprintKind::FileContent);
    }

    #[test]
    fn modified_file_changes_fingerprint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, b"v1").unwrap();
        let before = Fingerprint::compute(path.to_str().unwrap(), true);
        std::fs::write(&path, b"v2").unwrap();
        let after = Fingerprint::compute(path.to_str().unwrap(), true);
        assert_ne!(before.hex(), after.hex());
    }

    #[test]
    fn url_is_identity_addressed() {
        let fp = Fingerprint::compute("https://arxiv.org/pdf/1234.5678", false);
        assert_eq!(fp.kind(), FingerprintKind::SourceIdentity);
        assert_eq!(fp.hex().len(), 64);
        assert_eq!(fp.short_prefix().len(), 8);
    }

    #[test]
    fn unreadable_existing_path_degrades_to_an_observable_fallback() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory passes the exists() check but fails once its content is
        // streamed, which is exactly the degraded path.
        let path = dir.path().to_str().unwrap();

        let fp = Fingerprint::compute(path, true);

        assert_eq!(fp.kind(), FingerprintKind::ReadFallback);
        assert_eq!(fp.hex(), Fingerprint::compute(path, false).hex());
    }

    #[test]
    fn missing_file_hashes_the_path_string() {
        let fp = Fingerprint::compute("/no/such/file.pdf", true);
        assert_eq!(fp.kind(), FingerprintKind::SourceIdentity);
        assert_eq!(fp.hex(), Fingerprint::compute("/no/such/file.pdf", false).hex());
    }
}
