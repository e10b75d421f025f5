//! XML to object

use crate::coerce::{parse_bool, parse_int};
use crate::element::{Element, local_name};
use crate::params::Params;
use crate::parse::parse_document;
use crate::template::{Binding, BindingTemplate, Identity, ItemKind, Presence, Target, ValueKind};
use crate::writer::nodes_to_string;
use crate::{Error, Result};
use csync_model::{ContentHandle, ContentObject, ContentType, FieldValue, Fields};

/// Build a fresh object from `element` through `template`.
///
/// # Errors
///
/// Returns a binding error naming the template and field path when the
/// root element does not match, a required node is absent, or a value does
/// not coerce to its declared kind.
pub fn unmarshal(
    template: &BindingTemplate,
    element: &Element,
    params: &Params,
) -> Result<ContentObject> {
    if element.local_name() != local_name(template.element()) {
        return Err(Error::RootMismatch {
            template: template.id().to_string(),
            expected: template.element().to_string(),
            found: element.name.clone(),
        });
    }

    let mut object = ContentObject::empty(template.content_type());
    let mut ctx = Unmarshaller {
        template,
        params,
        path: Vec::new(),
    };
    ctx.read(element, template.bindings(), &mut Slot::Object(&mut object))?;
    Ok(object)
}

/// Parse `input` and unmarshal its root element.
pub fn unmarshal_str(
    template: &BindingTemplate,
    input: &str,
    params: &Params,
) -> Result<ContentObject> {
    let root = parse_document(input).map_err(|e| Error::Malformed {
        template: template.id().to_string(),
        message: e.to_string(),
    })?;
    unmarshal(template, &root, params)
}

enum Slot<'a> {
    Object(&'a mut ContentObject),
    Record(&'a mut Fields),
}

struct Unmarshaller<'t> {
    template: &'t BindingTemplate,
    params: &'t Params,
    path: Vec<String>,
}

impl Unmarshaller<'_> {
    fn read(&mut self, element: &Element, bindings: &[Binding], slot: &mut Slot<'_>) -> Result<()> {
        for binding in bindings {
            match binding {
                Binding::Attribute {
                    name,
                    target,
                    kind,
                    presence,
                } => {
                    let leaf = format!("@{name}");
                    let value = element
                        .attribute(name)
                        .map(|raw| self.coerce(raw, *kind, &leaf))
                        .transpose()?;
                    if let Some(value) = self.present(value, presence, &leaf)? {
                        self.assign(slot, target, value, &leaf)?;
                    }
                }
                Binding::Element {
                    name,
                    target,
                    kind,
                    presence,
                } => {
                    let value = element
                        .child(name)
                        .map(|child| self.scalar(child, *kind, name))
                        .transpose()?;
                    if let Some(value) = self.present(value, presence, name)? {
                        self.assign(slot, target, value, name)?;
                    }
                }
                Binding::Group {
                    element: group,
                    bindings,
                } => {
                    let placeholder;
                    let inner = match element.child(group) {
                        Some(inner) => inner,
                        None => {
                            placeholder = Element::new(group.clone());
                            &placeholder
                        }
                    };
                    self.path.push(group.clone());
                    let result = self.read(inner, bindings, slot);
                    self.path.pop();
                    result?;
                }
                Binding::Nested {
                    element: nested,
                    field,
                    required,
                    bindings,
                } => {
                    let Some(inner) = element.child(nested) else {
                        if *required {
                            return Err(self.missing(nested));
                        }
                        continue;
                    };
                    self.path.push(nested.clone());
                    let record = self.record(inner, bindings);
                    self.path.pop();
                    let value = FieldValue::Record(record?);
                    self.assign(slot, &Target::Field(field.clone()), value, nested)?;
                }
                Binding::Repeated {
                    container,
                    item,
                    target,
                    kind,
                } => {
                    let parent = match container {
                        Some(container) => match element.child(container) {
                            Some(parent) => parent,
                            None => continue,
                        },
                        None => element,
                    };
                    let items: Vec<&Element> = parent.children_named(item).collect();
                    if container.is_none() && items.is_empty() {
                        continue;
                    }
                    if let Some(container) = container {
                        self.path.push(container.clone());
                    }
                    let values = self.items(&items, item, kind);
                    if container.is_some() {
                        self.path.pop();
                    }
                    self.assign_items(slot, target, values?, item)?;
                }
                Binding::Branch { guard, bindings } => {
                    if guard.eval(self.params) {
                        self.read(element, bindings, slot)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn record(&mut self, element: &Element, bindings: &[Binding]) -> Result<Fields> {
        let mut fields = Fields::new();
        self.read(element, bindings, &mut Slot::Record(&mut fields))?;
        Ok(fields)
    }

    fn items(&mut self, items: &[&Element], item: &str, kind: &ItemKind) -> Result<Vec<FieldValue>> {
        let mut values = Vec::with_capacity(items.len());
        for (index, element) in items.iter().enumerate() {
            let leaf = format!("{item}[{index}]");
            let value = match kind {
                ItemKind::Value(kind) => self.scalar(element, *kind, &leaf)?,
                ItemKind::Record(bindings) => {
                    self.path.push(leaf);
                    let record = self.record(element, bindings);
                    self.path.pop();
                    FieldValue::Record(record?)
                }
            };
            values.push(value);
        }
        Ok(values)
    }

    /// Value of a scalar element. Markup elements with element children
    /// are serialized back to compact text.
    fn scalar(&self, element: &Element, kind: ValueKind, leaf: &str) -> Result<FieldValue> {
        if kind == ValueKind::Markup && element.has_element_children() {
            return Ok(FieldValue::Text(nodes_to_string(&element.children)?));
        }
        self.coerce(&element.text(), kind, leaf)
    }

    fn coerce(&self, raw: &str, kind: ValueKind, leaf: &str) -> Result<FieldValue> {
        let value = match kind {
            ValueKind::Text | ValueKind::Markup => Some(FieldValue::Text(raw.to_string())),
            ValueKind::Bool => parse_bool(raw).map(FieldValue::Bool),
            ValueKind::Int => parse_int(raw).map(FieldValue::Int),
        };
        value.ok_or_else(|| Error::InvalidValue {
            template: self.template.id().to_string(),
            path: self.path(leaf),
            expected: kind.name(),
            value: raw.to_string(),
        })
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

    fn assign(&self, slot: &mut Slot<'_>, target: &Target, value: FieldValue, leaf: &str) -> Result<()> {
        let object = match (slot, target) {
            (Slot::Record(fields), Target::Field(name)) => {
                fields.insert(name.clone(), value);
                return Ok(());
            }
            (Slot::Record(_), other) => {
                return Err(self.structure(
                    leaf,
                    format!("'{}' is not available inside a nested record", other.label()),
                ));
            }
            (Slot::Object(object), _) => object,
        };

        if let Target::Field(name) = target {
            object.set_field(name.clone(), value);
            return Ok(());
        }
        let text = value
            .to_text()
            .ok_or_else(|| self.structure(leaf, "expected a scalar value".to_string()))?;
        match target {
            Target::Key => {
                let handle = object.handle().assign_key(text);
                object.set_handle(handle)?;
            }
            Target::Id => {
                let handle = object.handle().assign_id(text);
                object.set_handle(handle)?;
            }
            Target::Name => object.set_name(text),
            Target::Parent(identity) => {
                let parent = object
                    .parent()
                    .cloned()
                    .unwrap_or_else(|| ContentHandle::new(ContentType::Folder, None, None));
                object.set_parent(Some(with_projection(&parent, *identity, text)))?;
            }
            Target::Reference(ty, identity) => {
                let empty = ContentHandle::new(*ty, None, None);
                object.add_reference(with_projection(&empty, *identity, text))?;
            }
            Target::Field(_) => {}
        }
        Ok(())
    }

    fn assign_items(
        &self,
        slot: &mut Slot<'_>,
        target: &Target,
        values: Vec<FieldValue>,
        leaf: &str,
    ) -> Result<()> {
        match target {
            Target::Field(_) => self.assign(slot, target, FieldValue::List(values), leaf),
            Target::Reference(..) => {
                for value in values {
                    self.assign(slot, target, value, leaf)?;
                }
                Ok(())
            }
            other => Err(self.structure(leaf, format!("'{}' cannot be repeated", other.label()))),
        }
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

    fn structure(&self, leaf: &str, message: String) -> Error {
        Error::Structure {
            template: self.template.id().to_string(),
            path: self.path(leaf),
            message,
        }
    }
}

fn with_projection(handle: &ContentHandle, identity: Identity, value: String) -> ContentHandle {
    match identity {
        Identity::Key => handle.assign_key(value),
        Identity::Id => handle.assign_id(value),
    }
}
