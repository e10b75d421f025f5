//! Normalized path handling and content-key mapping

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Characters that are escaped when a key segment becomes a file name.
const ESCAPED: &[char] = &['<', '>', ':', '"', '|', '?', '*', '%', '\\'];

/// A filesystem path spelled with forward slashes.
///
/// Keys and file-tree paths are compared and stripped as strings; the native
/// form is produced only at I/O boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            inner: path.as_ref().to_string_lossy().replace('\\', "/"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Append a relative path; leading slashes on `segment` are ignored.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.replace('\\', "/");
        let segment = segment.trim_start_matches('/');
        let base = self.inner.trim_end_matches('/');
        Self {
            inner: format!("{base}/{segment}"),
        }
    }

    /// The part of this path below `base`, without a leading slash.
    pub fn strip_prefix(&self, base: &NormalizedPath) -> Option<&str> {
        let rest = self.inner.strip_prefix(base.inner.trim_end_matches('/'))?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }

    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.inner.trim_end_matches('/').rsplit('/').next()
    }

    /// Extension of the file name; dot files have none.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner)
    }
}

/// Check that a single key segment can become a directory or file name.
pub fn validate_key_segment(key: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::invalid_key(key, "empty path segment"));
    }
    if segment == "." || segment == ".." {
        return Err(Error::invalid_key(key, "relative path segment"));
    }
    if segment.chars().any(|c| c.is_control()) {
        return Err(Error::invalid_key(key, "control character in segment"));
    }
    Ok(())
}

/// Map a hierarchical content key (`/a/b/c`) to a relative file path
/// (`a/b/c.<extension>`).
///
/// Characters that are unsafe in file names are percent-escaped, so the
/// mapping is deterministic and reversible through [`relative_path_to_key`].
pub fn key_to_relative_path(key: &str, extension: &str) -> Result<String> {
    let trimmed = key.strip_prefix('/').unwrap_or(key);
    if trimmed.is_empty() {
        return Err(Error::invalid_key(key, "key has no segments"));
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/') {
        validate_key_segment(key, segment)?;
        segments.push(escape_segment(segment));
    }

    Ok(format!("{}.{}", segments.join("/"), extension))
}

/// Inverse of [`key_to_relative_path`].
pub fn relative_path_to_key(relative: &str, extension: &str) -> Result<String> {
    let normalized = relative.replace('\\', "/");
    let suffix = format!(".{}", extension);
    let stem = normalized
        .strip_suffix(&suffix)
        .ok_or_else(|| Error::invalid_key(relative, format!("missing .{} extension", extension)))?;

    let mut key = String::new();
    for segment in stem.split('/') {
        key.push('/');
        key.push_str(&unescape_segment(relative, segment)?);
    }
    Ok(key)
}

fn escape_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut buf = [0u8; 4];
    for c in segment.chars() {
        if ESCAPED.contains(&c) {
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        } else {
            out.push(c);
        }
    }
    out
}

fn unescape_segment(relative: &str, segment: &str) -> Result<String> {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| Error::invalid_key(relative, "escaped bytes are not UTF-8"))
}
