//! Built-in capability table

use crate::content_type::{Capabilities, Category, ContentType, TypeInfo};

const HIERARCHICAL: Capabilities = Capabilities {
    hierarchical: true,
    container: false,
    references: false,
};

const HIERARCHICAL_WITH_REFERENCES: Capabilities = Capabilities {
    hierarchical: true,
    container: false,
    references: true,
};

const FLAT: Capabilities = Capabilities {
    hierarchical: false,
    container: false,
    references: false,
};

static FOLDER: TypeInfo = TypeInfo {
    content_type: ContentType::Folder,
    singular: "Folder",
    plural: "Folders",
    config_key: "folders",
    category: Category::FolderContent,
    element: "folder",
    min_version: None,
    priority: 10,
    capabilities: Capabilities {
        hierarchical: true,
        container: true,
        references: false,
    },
};

static RULE_GROUP: TypeInfo = TypeInfo {
    content_type: ContentType::RuleGroup,
    singular: "Rule Group",
    plural: "Rule Groups",
    config_key: "rule-groups",
    category: Category::FolderContent,
    element: "ruleGroup",
    min_version: None,
    priority: 20,
    capabilities: HIERARCHICAL,
};

static TEMPLATE: TypeInfo = TypeInfo {
    content_type: ContentType::Template,
    singular: "Template",
    plural: "Templates",
    config_key: "templates",
    category: Category::FolderContent,
    element: "template",
    min_version: None,
    priority: 30,
    capabilities: HIERARCHICAL_WITH_REFERENCES,
};

static RULE: TypeInfo = TypeInfo {
    content_type: ContentType::Rule,
    singular: "Rule",
    plural: "Rules",
    config_key: "rules",
    category: Category::FolderContent,
    element: "rule",
    min_version: None,
    priority: 40,
    capabilities: HIERARCHICAL_WITH_REFERENCES,
};

static SCHEDULE: TypeInfo = TypeInfo {
    content_type: ContentType::Schedule,
    singular: "Schedule",
    plural: "Schedules",
    config_key: "schedules",
    category: Category::FolderContent,
    element: "schedule",
    min_version: None,
    priority: 50,
    capabilities: HIERARCHICAL_WITH_REFERENCES,
};

static MESSAGE_MODEL: TypeInfo = TypeInfo {
    content_type: ContentType::MessageModel,
    singular: "Message Model",
    plural: "Message Models",
    config_key: "message-models",
    category: Category::NotificationContent,
    element: "messageModel",
    min_version: None,
    priority: 60,
    capabilities: FLAT,
};

static DIRECTORY_ENTRY_KIND: TypeInfo = TypeInfo {
    content_type: ContentType::DirectoryEntryKind,
    singular: "Directory Entry Kind",
    plural: "Directory Entry Kinds",
    config_key: "directory-entry-kinds",
    category: Category::DirectorySchemaContent,
    element: "entryKind",
    min_version: None,
    priority: 70,
    capabilities: FLAT,
};

static PROCESS_DEFINITION: TypeInfo = TypeInfo {
    content_type: ContentType::ProcessDefinition,
    singular: "Process Definition",
    plural: "Process Definitions",
    config_key: "process-definitions",
    category: Category::RuntimeProcessContent,
    element: "processDefinition",
    min_version: Some(8),
    priority: 80,
    capabilities: Capabilities {
        hierarchical: false,
        container: false,
        references: true,
    },
};

/// Look up the capability table entry for a type.
pub fn type_info(content_type: ContentType) -> &'static TypeInfo {
    match content_type {
        ContentType::Folder => &FOLDER,
        ContentType::Template => &TEMPLATE,
        ContentType::RuleGroup => &RULE_GROUP,
        ContentType::Rule => &RULE,
        ContentType::Schedule => &SCHEDULE,
        ContentType::MessageModel => &MESSAGE_MODEL,
        ContentType::DirectoryEntryKind => &DIRECTORY_ENTRY_KIND,
        ContentType::ProcessDefinition => &PROCESS_DEFINITION,
    }
}

/// Number of built-in content types
pub const BUILTIN_COUNT: usize = ContentType::ALL.len();
