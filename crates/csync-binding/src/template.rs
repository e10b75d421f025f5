//! Declarative binding templates
//!
//! A template is built once per (type, source, version) and never mutated
//! afterwards. Bindings are kept in declaration order; marshalling writes
//! them in exactly that order.

use crate::params::{Guard, Params};
use csync_model::{ContentType, FieldValue};

/// Which projection of a handle a binding reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Key,
    Id,
}

/// Where a bound value lives on the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Owning handle's key
    Key,
    /// Owning handle's id
    Id,
    Name,
    /// Parent folder handle
    Parent(Identity),
    /// Referenced handles of one type
    Reference(ContentType, Identity),
    /// Named field, or a record entry inside nested bindings
    Field(String),
}

impl Target {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// Short label used in error paths.
    pub fn label(&self) -> String {
        match self {
            Self::Key => "key".into(),
            Self::Id => "id".into(),
            Self::Name => "name".into(),
            Self::Parent(_) => "parent".into(),
            Self::Reference(ty, _) => format!("reference:{}", ty.config_key()),
            Self::Field(name) => name.clone(),
        }
    }
}

/// Coercion applied to a scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Bool,
    Int,
    /// Text that may carry embedded markup
    Markup,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Markup => "markup",
        }
    }
}

/// Shape of each item in a repeated group.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Value(ValueKind),
    Record(Vec<Binding>),
}

/// Value used when a defaulted binding is absent.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Value(FieldValue),
    /// Read from the invocation's parameter bag
    Param(String),
}

impl DefaultValue {
    pub fn resolve(&self, params: &Params) -> Option<FieldValue> {
        match self {
            Self::Value(value) => Some(value.clone()),
            Self::Param(name) => params.get(name).cloned().map(FieldValue::from),
        }
    }
}

/// What happens when a bound value is absent.
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    Default(DefaultValue),
}

impl Presence {
    pub fn default_value(value: impl Into<FieldValue>) -> Self {
        Self::Default(DefaultValue::Value(value.into()))
    }

    pub fn default_param(name: impl Into<String>) -> Self {
        Self::Default(DefaultValue::Param(name.into()))
    }
}

/// One node of a template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Attribute {
        name: String,
        target: Target,
        kind: ValueKind,
        presence: Presence,
    },
    Element {
        name: String,
        target: Target,
        kind: ValueKind,
        presence: Presence,
    },
    /// Wrapper element around bindings of the same scope
    Group {
        element: String,
        bindings: Vec<Binding>,
    },
    /// Record-valued field written as its own element
    Nested {
        element: String,
        field: String,
        required: bool,
        bindings: Vec<Binding>,
    },
    /// Repeated item elements, optionally inside a container element
    Repeated {
        container: Option<String>,
        item: String,
        target: Target,
        kind: ItemKind,
    },
    /// Bindings that apply only while the guard holds
    Branch {
        guard: Guard,
        bindings: Vec<Binding>,
    },
}

/// Builder for an ordered list of bindings.
#[derive(Debug, Default)]
pub struct TemplateBuilder {
    bindings: Vec<Binding>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(
        mut self,
        name: impl Into<String>,
        target: Target,
        kind: ValueKind,
        presence: Presence,
    ) -> Self {
        self.bindings.push(Binding::Attribute {
            name: name.into(),
            target,
            kind,
            presence,
        });
        self
    }

    pub fn element(
        mut self,
        name: impl Into<String>,
        target: Target,
        kind: ValueKind,
        presence: Presence,
    ) -> Self {
        self.bindings.push(Binding::Element {
            name: name.into(),
            target,
            kind,
            presence,
        });
        self
    }

    /// Child element bound to the field of the same name.
    pub fn field(self, name: &str, kind: ValueKind, presence: Presence) -> Self {
        self.element(name, Target::field(name), kind, presence)
    }

    pub fn group<F>(mut self, element: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(TemplateBuilder) -> TemplateBuilder,
    {
        self.bindings.push(Binding::Group {
            element: element.into(),
            bindings: body(TemplateBuilder::new()).bindings,
        });
        self
    }

    pub fn nested<F>(
        mut self,
        element: impl Into<String>,
        field: impl Into<String>,
        required: bool,
        body: F,
    ) -> Self
    where
        F: FnOnce(TemplateBuilder) -> TemplateBuilder,
    {
        self.bindings.push(Binding::Nested {
            element: element.into(),
            field: field.into(),
            required,
            bindings: body(TemplateBuilder::new()).bindings,
        });
        self
    }

    pub fn repeated(
        mut self,
        container: Option<&str>,
        item: impl Into<String>,
        target: Target,
        kind: ItemKind,
    ) -> Self {
        self.bindings.push(Binding::Repeated {
            container: container.map(str::to_string),
            item: item.into(),
            target,
            kind,
        });
        self
    }

    /// Repeated records, each item element carrying the body's bindings.
    pub fn records<F>(
        self,
        container: Option<&str>,
        item: impl Into<String>,
        field: impl Into<String>,
        body: F,
    ) -> Self
    where
        F: FnOnce(TemplateBuilder) -> TemplateBuilder,
    {
        let record = body(TemplateBuilder::new()).bindings;
        self.repeated(container, item, Target::Field(field.into()), ItemKind::Record(record))
    }

    pub fn branch<F>(mut self, guard: Guard, body: F) -> Self
    where
        F: FnOnce(TemplateBuilder) -> TemplateBuilder,
    {
        self.bindings.push(Binding::Branch {
            guard,
            bindings: body(TemplateBuilder::new()).bindings,
        });
        self
    }

    pub fn into_bindings(self) -> Vec<Binding> {
        self.bindings
    }
}

/// A compiled binding template.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingTemplate {
    id: String,
    content_type: ContentType,
    element: String,
    namespace: Option<String>,
    bindings: Vec<Binding>,
}

impl BindingTemplate {
    /// Build a template whose root element is `element`.
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier reported in binding errors
    /// * `content_type` - Type of the objects this template binds
    /// * `element` - Root element name
    /// * `body` - Populates the root's bindings in write order
    pub fn new<F>(
        id: impl Into<String>,
        content_type: ContentType,
        element: impl Into<String>,
        body: F,
    ) -> Self
    where
        F: FnOnce(TemplateBuilder) -> TemplateBuilder,
    {
        Self {
            id: id.into(),
            content_type,
            element: element.into(),
            namespace: None,
            bindings: body(TemplateBuilder::new()).into_bindings(),
        }
    }

    /// Builder: default namespace written on the root element.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_declaration_order() {
        let template = BindingTemplate::new("folder", ContentType::Folder, "folder", |b| {
            b.attribute("key", Target::Key, ValueKind::Text, Presence::Required)
                .field("description", ValueKind::Text, Presence::Optional)
                .branch(Guard::version_at_least(9), |b| {
                    b.field("color", ValueKind::Text, Presence::Optional)
                })
        });

        let kinds: Vec<&str> = template
            .bindings()
            .iter()
            .map(|b| match b {
                Binding::Attribute { .. } => "attribute",
                Binding::Element { .. } => "element",
                Binding::Branch { .. } => "branch",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["attribute", "element", "branch"]);
    }

    #[test]
    fn param_default_resolves_from_bag() {
        let default = DefaultValue::Param("owner".into());
        let params = Params::new().with("owner", "ops");
        assert_eq!(default.resolve(&params), Some(FieldValue::Text("ops".into())));
        assert_eq!(default.resolve(&Params::new()), None);
    }
}
