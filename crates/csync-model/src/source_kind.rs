//! The three representations content can live in

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Remote server reached through request/response calls
    Live,
    /// Offline deployable package document
    Package,
    /// One file per object in a directory tree
    FileTree,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Package => "package",
            Self::FileTree => "file-tree",
        }
    }

    /// Whether objects written to this source are identified by id rather
    /// than by key.
    pub fn uses_ids(&self) -> bool {
        matches!(self, Self::Live | Self::Package)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
