//! Built-in binding templates
//!
//! One template per (type, source kind). Version differences live inside
//! each template as `VersionAtLeast` branches; types gated by a minimum
//! version have no template below it.

use csync_binding::{
    BindingTemplate, Guard, Identity, ItemKind, Presence, Target, TemplateBuilder, ValueKind,
};
use csync_model::{ContentType, SourceKind};
use std::collections::HashMap;
use std::sync::Arc;

/// First major version with the extended field set.
pub const EXTENDED_VERSION: u64 = 9;

/// Compiled templates for one source kind.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    kind: SourceKind,
    templates: HashMap<ContentType, Arc<BindingTemplate>>,
}

impl TemplateLibrary {
    /// Empty library.
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            templates: HashMap::new(),
        }
    }

    /// Library holding the built-in template of every type.
    pub fn builtin(kind: SourceKind) -> Self {
        let mut library = Self::new(kind);
        for ty in ContentType::ALL {
            library.register(builtin_template(ty, kind));
        }
        library
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Add or replace the template for its content type.
    pub fn register(&mut self, template: BindingTemplate) {
        self.templates
            .insert(template.content_type(), Arc::new(template));
    }

    /// Template for `ty` at platform major `version`, if the type exists
    /// there.
    pub fn get(&self, ty: ContentType, version: u64) -> Option<Arc<BindingTemplate>> {
        if !ty.info().available_in(version) {
            return None;
        }
        self.templates.get(&ty).cloned()
    }
}

/// Build the built-in template for one type and source kind.
pub fn builtin_template(ty: ContentType, kind: SourceKind) -> BindingTemplate {
    let info = ty.info();
    let id = format!("{}.{}", info.config_key, kind.as_str());
    let hierarchical = info.capabilities.hierarchical;
    let refs = reference_identity(kind);

    BindingTemplate::new(id, ty, info.element, |b| {
        let b = identity(b, kind);
        let b = if hierarchical { parent(b, kind) } else { b };
        match ty {
            ContentType::Folder => b
                .element("name", Target::Name, ValueKind::Text, Presence::Required)
                .field("description", ValueKind::Text, Presence::Optional),
            ContentType::RuleGroup => b
                .element("name", Target::Name, ValueKind::Text, Presence::Required)
                .field("description", ValueKind::Text, Presence::Optional)
                .field("enabled", ValueKind::Bool, Presence::default_value(true)),
            ContentType::Template => b
                .element("name", Target::Name, ValueKind::Text, Presence::Required)
                .field("subject", ValueKind::Text, Presence::Optional)
                .field("format", ValueKind::Text, Presence::default_value("text"))
                .field("body", ValueKind::Markup, Presence::Optional)
                .element(
                    "model",
                    Target::Reference(ContentType::MessageModel, refs),
                    ValueKind::Text,
                    Presence::Optional,
                )
                .branch(Guard::version_at_least(EXTENDED_VERSION), |b| {
                    b.field("locale", ValueKind::Text, Presence::Optional)
                }),
            ContentType::Rule => b
                .branch(Guard::version_at_least(EXTENDED_VERSION), |b| {
                    b.attribute(
                        "priority",
                        Target::field("priority"),
                        ValueKind::Int,
                        Presence::Optional,
                    )
                })
                .element("name", Target::Name, ValueKind::Text, Presence::Required)
                .field("enabled", ValueKind::Bool, Presence::default_value(true))
                .field("weight", ValueKind::Int, Presence::Optional)
                .field("condition", ValueKind::Markup, Presence::Optional)
                .element(
                    "group",
                    Target::Reference(ContentType::RuleGroup, refs),
                    ValueKind::Text,
                    Presence::Optional,
                )
                .repeated(
                    Some("templates"),
                    "template",
                    Target::Reference(ContentType::Template, refs),
                    ItemKind::Value(ValueKind::Text),
                ),
            ContentType::Schedule => b
                .element("name", Target::Name, ValueKind::Text, Presence::Required)
                .field("expression", ValueKind::Text, Presence::Required)
                .field("timezone", ValueKind::Text, Presence::Optional)
                .field("enabled", ValueKind::Bool, Presence::default_value(true))
                .repeated(
                    Some("rules"),
                    "rule",
                    Target::Reference(ContentType::Rule, refs),
                    ItemKind::Value(ValueKind::Text),
                ),
            ContentType::MessageModel => b
                .element("name", Target::Name, ValueKind::Text, Presence::Required)
                .field("description", ValueKind::Text, Presence::Optional)
                .records(Some("parameters"), "parameter", "parameters", |b| {
                    b.attribute("name", Target::field("name"), ValueKind::Text, Presence::Required)
                        .attribute(
                            "type",
                            Target::field("type"),
                            ValueKind::Text,
                            Presence::default_value("string"),
                        )
                        .attribute(
                            "required",
                            Target::field("required"),
                            ValueKind::Bool,
                            Presence::default_value(false),
                        )
                }),
            ContentType::DirectoryEntryKind => b
                .element("name", Target::Name, ValueKind::Text, Presence::Required)
                .field("objectClass", ValueKind::Text, Presence::Required)
                .records(Some("attributes"), "attribute", "attributes", |b| {
                    b.attribute("name", Target::field("name"), ValueKind::Text, Presence::Required)
                        .attribute(
                            "syntax",
                            Target::field("syntax"),
                            ValueKind::Text,
                            Presence::default_value("string"),
                        )
                        .attribute(
                            "required",
                            Target::field("required"),
                            ValueKind::Bool,
                            Presence::default_value(false),
                        )
                        .attribute(
                            "multiValued",
                            Target::field("multiValued"),
                            ValueKind::Bool,
                            Presence::default_value(false),
                        )
                }),
            ContentType::ProcessDefinition => b
                .element("name", Target::Name, ValueKind::Text, Presence::Required)
                .field("revision", ValueKind::Int, Presence::Optional)
                .field("definition", ValueKind::Markup, Presence::Optional)
                .repeated(
                    Some("templates"),
                    "template",
                    Target::Reference(ContentType::Template, refs),
                    ItemKind::Value(ValueKind::Text),
                )
                .branch(Guard::version_at_least(EXTENDED_VERSION), |b| {
                    b.field("timeoutSeconds", ValueKind::Int, Presence::Optional)
                }),
        }
    })
}

/// File trees point at other objects by key; the live server and packages
/// by id.
pub fn reference_identity(kind: SourceKind) -> Identity {
    match kind {
        SourceKind::FileTree => Identity::Key,
        SourceKind::Live | SourceKind::Package => Identity::Id,
    }
}

fn identity(b: TemplateBuilder, kind: SourceKind) -> TemplateBuilder {
    match kind {
        // The key may be omitted in a file; it is derived from the path.
        SourceKind::FileTree => b.attribute("key", Target::Key, ValueKind::Text, Presence::Optional),
        SourceKind::Package => b
            .attribute("id", Target::Id, ValueKind::Text, Presence::Required)
            .attribute("key", Target::Key, ValueKind::Text, Presence::Required),
        // Objects not yet created have no id.
        SourceKind::Live => b
            .attribute("id", Target::Id, ValueKind::Text, Presence::Optional)
            .attribute("key", Target::Key, ValueKind::Text, Presence::Optional),
    }
}

fn parent(b: TemplateBuilder, kind: SourceKind) -> TemplateBuilder {
    match kind {
        SourceKind::FileTree => b.attribute(
            "folder",
            Target::Parent(Identity::Key),
            ValueKind::Text,
            Presence::Optional,
        ),
        SourceKind::Live | SourceKind::Package => b.attribute(
            "parent",
            Target::Parent(Identity::Id),
            ValueKind::Text,
            Presence::Optional,
        ),
    }
}
