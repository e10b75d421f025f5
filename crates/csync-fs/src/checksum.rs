//! Content digests used to skip rewriting unchanged files

use sha2::{Digest, Sha256};
use std::path::Path;

/// `sha256:<hex>` digest of `content`.
pub fn digest(content: &[u8]) -> String {
    format!("sha256:{:x}", Sha256::digest(content))
}

/// Digest of the file at `path`, or `None` if it does not exist.
///
/// # Errors
///
/// Any read failure other than the file being absent.
pub fn file_digest(path: &Path) -> std::io::Result<Option<String>> {
    match std::fs::read(path) {
        Ok(content) => Ok(Some(digest(&content))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_prefixed_hex() {
        let d = digest(b"<folder/>");
        assert!(d.starts_with("sha256:"));
        assert_eq!(d.len(), "sha256:".len() + 64);
    }

    #[test]
    fn missing_file_has_no_digest() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(file_digest(&dir.path().join("absent.xml")).unwrap(), None);
    }
}
