//! Content filters gating which objects a write may touch

use csync_model::ContentType;
use serde::{Deserialize, Serialize};

/// Allow/deny policy consulted before every write.
pub trait ContentFilter: Send + Sync {
    /// Whether objects of `content_type` at folder `key` may be written.
    fn check_access(&self, content_type: ContentType, key: &str) -> bool;
}

/// Filter that lets everything through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ContentFilter for AllowAll {
    fn check_access(&self, _content_type: ContentType, _key: &str) -> bool {
        true
    }
}

/// One exact-key rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterEntry {
    pub key: String,
    #[serde(default)]
    pub exclude: bool,
}

/// Allow/deny list with exact-key matching and a default verdict.
///
/// The first entry whose key equals the folder key decides; keys without
/// an entry get `include_by_default`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleContentFilter {
    #[serde(default)]
    pub entries: Vec<FilterEntry>,
    #[serde(default = "default_include")]
    pub include_by_default: bool,
}

fn default_include() -> bool {
    true
}

impl Default for SimpleContentFilter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SimpleContentFilter {
    pub fn new(include_by_default: bool) -> Self {
        Self {
            entries: Vec::new(),
            include_by_default,
        }
    }

    /// Builder: deny an exact folder key.
    pub fn exclude(mut self, key: impl Into<String>) -> Self {
        self.entries.push(FilterEntry {
            key: key.into(),
            exclude: true,
        });
        self
    }

    /// Builder: allow an exact folder key.
    pub fn include(mut self, key: impl Into<String>) -> Self {
        self.entries.push(FilterEntry {
            key: key.into(),
            exclude: false,
        });
        self
    }

    pub fn check_folder_access(&self, key: &str) -> bool {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map_or(self.include_by_default, |entry| !entry.exclude)
    }
}

impl ContentFilter for SimpleContentFilter {
    fn check_access(&self, _content_type: ContentType, key: &str) -> bool {
        self.check_folder_access(key)
    }
}
