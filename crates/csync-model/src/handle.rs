//! Content handles: representation-independent identity

use crate::ContentType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Key of the root folder.
pub const ROOT_KEY: &str = "/";

/// Identity of one content object, scoped to its type.
///
/// A handle carries up to two identity projections: a hierarchical `key`
/// (source-independent) and an `id` (assigned by the live source). Either may
/// be absent; absence is a valid state while an object waits for its first
/// sync to the live source.
///
/// Two handles are equal when they have the same type and either projection
/// matches. `Hash` covers only the type, which keeps it consistent with that
/// equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentHandle {
    content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

impl ContentHandle {
    /// Create a handle. Empty strings count as absent projections.
    pub fn new(content_type: ContentType, key: Option<String>, id: Option<String>) -> Self {
        Self {
            content_type,
            key: key.filter(|k| !k.is_empty()),
            id: id.filter(|i| !i.is_empty()),
        }
    }

    pub fn with_key(content_type: ContentType, key: impl Into<String>) -> Self {
        Self::new(content_type, Some(key.into()), None)
    }

    pub fn with_id(content_type: ContentType, id: impl Into<String>) -> Self {
        Self::new(content_type, None, Some(id.into()))
    }

    /// The root folder: a statically known singleton that is never stored
    /// and always resolves.
    pub fn root() -> Self {
        Self::with_key(ContentType::Folder, ROOT_KEY)
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// True iff at least one identity projection is present.
    pub fn is_set(&self) -> bool {
        self.key.is_some() || self.id.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.content_type == ContentType::Folder && self.key.as_deref() == Some(ROOT_KEY)
    }

    /// Copy of this handle with the id projection replaced.
    pub fn assign_id(&self, id: impl Into<String>) -> Self {
        Self::new(self.content_type, self.key.clone(), Some(id.into()))
    }

    /// Copy of this handle with the key projection replaced.
    pub fn assign_key(&self, key: impl Into<String>) -> Self {
        Self::new(self.content_type, Some(key.into()), self.id.clone())
    }

    /// Copy of this handle keeping only the key projection.
    pub fn key_only(&self) -> Self {
        Self::new(self.content_type, self.key.clone(), None)
    }

    /// Copy of this handle keeping only the id projection.
    pub fn id_only(&self) -> Self {
        Self::new(self.content_type, None, self.id.clone())
    }

    /// Combine the projections of two handles for the same object.
    ///
    /// Projections present on `self` win.
    pub fn merged(&self, other: &ContentHandle) -> Self {
        Self::new(
            self.content_type,
            self.key.clone().or_else(|| other.key.clone()),
            self.id.clone().or_else(|| other.id.clone()),
        )
    }

    /// Last segment of the key, if any.
    pub fn leaf_name(&self) -> Option<&str> {
        let key = self.key.as_deref()?.trim_end_matches('/');
        key.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// Key of the containing folder derived from the hierarchical key.
    pub fn parent_key(&self) -> Option<String> {
        let key = self.key.as_deref()?.trim_end_matches('/');
        let idx = key.rfind('/')?;
        if idx == 0 {
            if key.len() > 1 {
                Some(ROOT_KEY.to_string())
            } else {
                None
            }
        } else {
            Some(key[..idx].to_string())
        }
    }

    /// Human-readable name for logs and errors: the key if present, else
    /// the id.
    pub fn log_name(&self) -> String {
        match (&self.key, &self.id) {
            (Some(key), _) => key.clone(),
            (None, Some(id)) => format!("#{}", id),
            (None, None) => "<unset>".to_string(),
        }
    }
}

impl PartialEq for ContentHandle {
    fn eq(&self, other: &Self) -> bool {
        if self.content_type != other.content_type {
            return false;
        }
        let keys_match = matches!((&self.key, &other.key), (Some(a), Some(b)) if a == b);
        let ids_match = matches!((&self.id, &other.id), (Some(a), Some(b)) if a == b);
        keys_match || ids_match
    }
}

impl Hash for ContentHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content_type.hash(state);
    }
}

impl fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.content_type, self.log_name())
    }
}
