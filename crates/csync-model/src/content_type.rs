//! Content types and their capability table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// The semantic kind of a content object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Folder,
    Template,
    RuleGroup,
    Rule,
    Schedule,
    MessageModel,
    DirectoryEntryKind,
    ProcessDefinition,
}

impl ContentType {
    /// Every content type, in declaration order.
    pub const ALL: [ContentType; 8] = [
        Self::Folder,
        Self::Template,
        Self::RuleGroup,
        Self::Rule,
        Self::Schedule,
        Self::MessageModel,
        Self::DirectoryEntryKind,
        Self::ProcessDefinition,
    ];

    /// Capability table entry for this type.
    pub fn info(self) -> &'static TypeInfo {
        crate::builtins::type_info(self)
    }

    pub fn display_name(self) -> &'static str {
        self.info().singular
    }

    pub fn config_key(self) -> &'static str {
        self.info().config_key
    }

    pub fn category(self) -> Category {
        self.info().category
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    /// Parse a configuration key (`"templates"`, `"rule-groups"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.config_key() == s)
            .ok_or_else(|| Error::UnknownType(s.to_string()))
    }
}

/// Grouping of related content types.
///
/// Categories map onto the loader sections of a deployment package and onto
/// the partitions of the id map. Declaration order is package section order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    FolderContent,
    NotificationContent,
    DirectorySchemaContent,
    RuntimeProcessContent,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Self::FolderContent,
        Self::NotificationContent,
        Self::DirectorySchemaContent,
        Self::RuntimeProcessContent,
    ];

    pub fn config_key(&self) -> &'static str {
        match self {
            Self::FolderContent => "folder-content",
            Self::NotificationContent => "notification-content",
            Self::DirectorySchemaContent => "directory-schema-content",
            Self::RuntimeProcessContent => "runtime-process-content",
        }
    }

    /// Element name of the package loader section for this category.
    pub fn loader_element(&self) -> &'static str {
        match self {
            Self::FolderContent => "folderContent",
            Self::NotificationContent => "notificationContent",
            Self::DirectorySchemaContent => "directorySchemaContent",
            Self::RuntimeProcessContent => "runtimeProcessContent",
        }
    }

    /// Content types in this category, ordered by priority.
    pub fn types(&self) -> Vec<ContentType> {
        let mut types: Vec<_> = ContentType::ALL
            .into_iter()
            .filter(|t| t.category() == *self)
            .collect();
        types.sort_by_key(|t| t.info().priority);
        types
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// What a content type can take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Objects live under a parent folder
    pub hierarchical: bool,
    /// Objects contain child objects
    pub container: bool,
    /// Objects point at other objects
    pub references: bool,
}

/// Capability table entry for one content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub content_type: ContentType,
    /// Display name (e.g., "Rule Group")
    pub singular: &'static str,
    /// Plural display name (e.g., "Rule Groups")
    pub plural: &'static str,
    /// Key used to enable or disable the type; also the file-tree directory
    pub config_key: &'static str,
    pub category: Category,
    /// Root element of the type's XML form
    pub element: &'static str,
    /// Minimum major platform version, if gated
    pub min_version: Option<u64>,
    /// Processing order (lower first); parents precede their dependents
    pub priority: u8,
    pub capabilities: Capabilities,
}

impl TypeInfo {
    /// Check the version gate against a configured platform major version.
    pub fn available_in(&self, version: u64) -> bool {
        self.min_version.is_none_or(|min| version >= min)
    }
}
