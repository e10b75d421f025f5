//! Object to XML

use crate::coerce::{parse_bool, parse_int};
use crate::params::{NAMESPACE, Params};
use crate::element::Element;
use crate::parse::{looks_like_markup, parse_document, parse_fragment};
use crate::template::{Binding, BindingTemplate, Identity, ItemKind, Presence, Target, ValueKind};
use crate::writer::XmlSink;
use crate::{Error, Result};
use csync_model::{ContentHandle, ContentObject, FieldValue, Fields};
use std::io::Write;
use tracing::debug;

/// Write `object` through `template` into `sink`.
///
/// Attributes of an element, including those inside active branches, are
/// written on its start tag; child elements follow in declaration order.
///
/// # Errors
///
/// Returns a binding error naming the template and field path when a
/// required value is absent or a value cannot be rendered as its declared
/// kind.
pub fn marshal<W: Write>(
    template: &BindingTemplate,
    object: &ContentObject,
    params: &Params,
    sink: &mut XmlSink<W>,
) -> Result<()> {
    if object.content_type() != template.content_type() {
        return Err(csync_model::Error::TypeMismatch {
            expected: template.content_type().to_string(),
            found: object.content_type().to_string(),
        }
        .into());
    }

    let mut ctx = Marshaller {
        template,
        params,
        path: Vec::new(),
    };
    let scope = Scope::Object(object);

    let mut attributes = Vec::new();
    let namespace = params
        .text(NAMESPACE)
        .or_else(|| template.namespace().map(str::to_string));
    if let Some(namespace) = namespace {
        attributes.push(("xmlns".to_string(), namespace));
    }
    ctx.collect_attributes(template.bindings(), &scope, &mut attributes)?;

    sink.element(template.element(), &attributes, |sink| {
        ctx.write_children(sink, template.bindings(), &scope)
    })
}

/// Marshal into a standalone string.
pub fn marshal_to_string(
    template: &BindingTemplate,
    object: &ContentObject,
    params: &Params,
    pretty: bool,
) -> Result<String> {
    let mut sink = XmlSink::with_pretty(Vec::new(), pretty);
    marshal(template, object, params, &mut sink)?;
    String::from_utf8(sink.into_inner()).map_err(Error::write)
}

/// Marshal into an element tree, e.g. to embed in a request body.
pub fn marshal_to_element(
    template: &BindingTemplate,
    object: &ContentObject,
    params: &Params,
) -> Result<Element> {
    let text = marshal_to_string(template, object, params, false)?;
    parse_document(&text)
}

enum Scope<'a> {
    Object(&'a ContentObject),
    Record(&'a Fields),
}

struct Marshaller<'t> {
    template: &'t BindingTemplate,
    params: &'t Params,
    path: Vec<String>,
}

impl Marshaller<'_> {
    fn collect_attributes(
        &mut self,
        bindings: &[Binding],
        scope: &Scope<'_>,
        out: &mut Vec<(String, String)>,
    ) -> Result<()> {
        for binding in bindings {
            match binding {
                Binding::Attribute {
                    name,
                    target,
                    kind,
                    presence,
                } => {
                    let leaf = format!("@{name}");
                    let value = self.value(scope, target, &leaf)?;
                    if let Some(value) = self.present(value, presence, &leaf)? {
                        out.push((name.clone(), self.render(&value, *kind, &leaf)?));
                    }
                }
                Binding::Branch { guard, bindings } if guard.eval(self.params) => {
                    self.collect_attributes(bindings, scope, out)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn write_children<W: Write>(
        &mut self,
        sink: &mut XmlSink<W>,
        bindings: &[Binding],
        scope: &Scope<'_>,
    ) -> Result<()> {
        for binding in bindings {
            match binding {
                Binding::Attribute { .. } => {}
                Binding::Element {
                    name,
                    target,
                    kind,
                    presence,
                } => {
                    let value = self.value(scope, target, name)?;
                    if let Some(value) = self.present(value, presence, name)? {
                        let text = self.render(&value, *kind, name)?;
                        write_scalar(sink, name, *kind, &text)?;
                    }
                }
                Binding::Group { element, bindings } => {
                    self.path.push(element.clone());
                    let result = self.write_element(sink, element, bindings, scope);
                    self.path.pop();
                    result?;
                }
                Binding::Nested {
                    element,
                    field,
                    required,
                    bindings,
                } => {
                    let value = self.value(scope, &Target::Field(field.clone()), element)?;
                    let fields = match value {
                        Some(FieldValue::Record(fields)) => fields,
                        Some(other) => return Err(self.invalid(element, "record", &other)),
                        None if *required => return Err(self.missing(element)),
                        None => continue,
                    };
                    self.path.push(element.clone());
                    let result = self.write_element(sink, element, bindings, &Scope::Record(&fields));
                    self.path.pop();
                    result?;
                }
                Binding::Repeated {
                    container,
                    item,
                    target,
                    kind,
                } => {
                    let Some(items) = self.items(scope, target, item)? else {
                        continue;
                    };
                    match container {
                        Some(container) if items.is_empty() => sink.empty(container, &[])?,
                        Some(container) => {
                            self.path.push(container.clone());
                            let result = sink.element(container, &[], |sink| {
                                self.write_items(sink, item, kind, &items)
                            });
                            self.path.pop();
                            result?;
                        }
                        None => self.write_items(sink, item, kind, &items)?,
                    }
                }
                Binding::Branch { guard, bindings } => {
                    if guard.eval(self.params) {
                        self.write_children(sink, bindings, scope)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn write_element<W: Write>(
        &mut self,
        sink: &mut XmlSink<W>,
        element: &str,
        bindings: &[Binding],
        scope: &Scope<'_>,
    ) -> Result<()> {
        let mut attributes = Vec::new();
        self.collect_attributes(bindings, scope, &mut attributes)?;
        sink.element(element, &attributes, |sink| {
            self.write_children(sink, bindings, scope)
        })
    }

    fn write_items<W: Write>(
        &mut self,
        sink: &mut XmlSink<W>,
        item: &str,
        kind: &ItemKind,
        items: &[FieldValue],
    ) -> Result<()> {
        for (index, value) in items.iter().enumerate() {
            let leaf = format!("{item}[{index}]");
            match kind {
                ItemKind::Value(kind) => {
                    let text = self.render(value, *kind, &leaf)?;
                    write_scalar(sink, item, *kind, &text)?;
                }
                ItemKind::Record(bindings) => {
                    let FieldValue::Record(fields) = value else {
                        return Err(self.invalid(&leaf, "record", value));
                    };
                    self.path.push(leaf);
                    let result = self.write_element(sink, item, bindings, &Scope::Record(fields));
                    self.path.pop();
                    result?;
                }
            }
        }
        Ok(())
    }

    fn value(&self, scope: &Scope<'_>, target: &Target, leaf: &str) -> Result<Option<FieldValue>> {
        match (scope, target) {
            (Scope::Record(fields), Target::Field(name)) => Ok(fields.get(name).cloned()),
            (Scope::Record(_), other) => Err(self.structure(
                leaf,
                format!("'{}' is not available inside a nested record", other.label()),
            )),
            (Scope::Object(object), target) => Ok(match target {
                Target::Key => text(object.handle().key()),
                Target::Id => text(object.handle().id()),
                Target::Name => text(object.name()),
                Target::Parent(identity) => {
                    text(object.parent().and_then(|p| projection(p, *identity)))
                }
                Target::Reference(ty, identity) => text(
                    object
                        .references_of(*ty)
                        .next()
                        .and_then(|h| projection(h, *identity)),
                ),
                Target::Field(name) => object.field(name).cloned(),
            }),
        }
    }

    fn items(
        &self,
        scope: &Scope<'_>,
        target: &Target,
        leaf: &str,
    ) -> Result<Option<Vec<FieldValue>>> {
        match (scope, target) {
            (Scope::Object(object), Target::Reference(ty, identity)) => {
                let items: Vec<FieldValue> = object
                    .references_of(*ty)
                    .filter_map(|h| projection(h, *identity))
                    .map(|s| FieldValue::Text(s.to_string()))
                    .collect();
                Ok((!items.is_empty()).then_some(items))
            }
            (_, Target::Field(_)) => match self.value(scope, target, leaf)? {
                Some(FieldValue::List(items)) => Ok(Some(items)),
                Some(other) => Err(self.invalid(leaf, "list", &other)),
                None => Ok(None),
            },
            (_, other) => Err(self.structure(
                leaf,
                format!("'{}' cannot be repeated", other.label()),
            )),
        }
    }

    fn present(
        &self,
        value: Option<FieldValue>,
        presence: &Presence,
        leaf: &str,
    ) -> Result<Option<FieldValue>> {
        match (value, presence) {
            (Some(value), _) => Ok(Some(value)),
            (None, Presence::Required) => Err(self.missing(leaf)),
            (None, Presence::Optional) => Ok(None),
            (None, Presence::Default(default)) => Ok(default.resolve(self.params)),
        }
    }

    fn render(&self, value: &FieldValue, kind: ValueKind, leaf: &str) -> Result<String> {
        let rendered = match (kind, value) {
            (ValueKind::Bool, FieldValue::Bool(b)) => Some(b.to_string()),
            (ValueKind::Bool, FieldValue::Text(t)) => parse_bool(t).map(|b| b.to_string()),
            (ValueKind::Bool, _) => None,
            (ValueKind::Int, FieldValue::Int(i)) => Some(i.to_string()),
            (ValueKind::Int, FieldValue::Text(t)) => parse_int(t).map(|i| i.to_string()),
            (ValueKind::Int, _) => None,
            (ValueKind::Text | ValueKind::Markup, value) => value.to_text(),
        };
        rendered.ok_or_else(|| self.invalid(leaf, kind.name(), value))
    }

    fn path(&self, leaf: &str) -> String {
        self.path
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(leaf))
            .collect::<Vec<_>>()
            .join("/")
    }

    fn missing(&self, leaf: &str) -> Error {
        Error::MissingValue {
            template: self.template.id().to_string(),
            path: self.path(leaf),
        }
    }

    fn invalid(&self, leaf: &str, expected: &'static str, value: &FieldValue) -> Error {
        Error::InvalidValue {
            template: self.template.id().to_string(),
            path: self.path(leaf),
            expected,
            value: value.to_text().unwrap_or_else(|| format!("{value:?}")),
        }
    }

    fn structure(&self, leaf: &str, message: String) -> Error {
        Error::Structure {
            template: self.template.id().to_string(),
            path: self.path(leaf),
            message,
        }
    }
}

fn text(value: Option<&str>) -> Option<FieldValue> {
    value.map(|s| FieldValue::Text(s.to_string()))
}

fn projection(handle: &ContentHandle, identity: Identity) -> Option<&str> {
    match identity {
        Identity::Key => handle.key(),
        Identity::Id => handle.id(),
    }
}

/// Write one scalar element. Markup text that parses is embedded as nodes;
/// anything else is written as escaped text.
fn write_scalar<W: Write>(
    sink: &mut XmlSink<W>,
    name: &str,
    kind: ValueKind,
    text: &str,
) -> Result<()> {
    if kind == ValueKind::Markup && looks_like_markup(text) {
        match parse_fragment(text) {
            Ok(nodes) => return sink.element(name, &[], |sink| sink.write_nodes(&nodes)),
            Err(e) => debug!("Writing <{}> as text: {}", name, e),
        }
    }
    sink.text_element(name, text)
}
