//! Generic content object

use crate::{ContentHandle, ContentType, Error, FieldValue, Fields, Result};

/// The payload for one handle.
///
/// The content type is fixed at construction. The owning handle changes only
/// through [`ContentObject::set_handle`]. Parent, references, and children are
/// gated by the type's capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentObject {
    content_type: ContentType,
    handle: ContentHandle,
    name: Option<String>,
    parent: Option<ContentHandle>,
    references: Vec<ContentHandle>,
    children: Vec<ContentHandle>,
    fields: Fields,
}

impl ContentObject {
    /// Create an empty object owned by `handle`.
    pub fn new(handle: ContentHandle) -> Self {
        Self {
            content_type: handle.content_type(),
            handle,
            name: None,
            parent: None,
            references: Vec::new(),
            children: Vec::new(),
            fields: Fields::new(),
        }
    }

    /// Create an empty object with an unset handle, ready for unmarshalling.
    pub fn empty(content_type: ContentType) -> Self {
        Self::new(ContentHandle::new(content_type, None, None))
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn handle(&self) -> &ContentHandle {
        &self.handle
    }

    /// Replace the owning handle, e.g. after the live source assigned an id.
    pub fn set_handle(&mut self, handle: ContentHandle) -> Result<()> {
        if handle.content_type() != self.content_type {
            return Err(Error::TypeMismatch {
                expected: self.content_type.to_string(),
                found: handle.content_type().to_string(),
            });
        }
        self.handle = handle;
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn parent(&self) -> Option<&ContentHandle> {
        self.parent.as_ref()
    }

    pub fn set_parent(&mut self, parent: Option<ContentHandle>) -> Result<()> {
        if parent.is_some() && !self.content_type.info().capabilities.hierarchical {
            return Err(self.unsupported("a parent folder"));
        }
        self.parent = parent;
        Ok(())
    }

    pub fn references(&self) -> &[ContentHandle] {
        &self.references
    }

    /// References of one target type, in declaration order.
    pub fn references_of(&self, ty: ContentType) -> impl Iterator<Item = &ContentHandle> {
        self.references
            .iter()
            .filter(move |h| h.content_type() == ty)
    }

    pub fn add_reference(&mut self, handle: ContentHandle) -> Result<()> {
        if !self.content_type.info().capabilities.references {
            return Err(self.unsupported("content references"));
        }
        self.references.push(handle);
        Ok(())
    }

    /// Replace every reference, keeping order.
    pub fn set_references(&mut self, references: Vec<ContentHandle>) -> Result<()> {
        if !references.is_empty() && !self.content_type.info().capabilities.references {
            return Err(self.unsupported("content references"));
        }
        self.references = references;
        Ok(())
    }

    /// Rewrite references equal to `from` into `to`. Returns how many changed.
    pub fn rename_reference(&mut self, from: &ContentHandle, to: &ContentHandle) -> usize {
        let mut renamed = 0;
        for reference in self.references.iter_mut().filter(|r| *r == from) {
            *reference = to.clone();
            renamed += 1;
        }
        renamed
    }

    pub fn children(&self) -> &[ContentHandle] {
        &self.children
    }

    pub fn add_child(&mut self, handle: ContentHandle) -> Result<()> {
        if !self.content_type.info().capabilities.container {
            return Err(self.unsupported("child objects"));
        }
        if !self.children.contains(&handle) {
            self.children.push(handle);
        }
        Ok(())
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::as_text)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.field(name).and_then(FieldValue::as_bool)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(FieldValue::as_int)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Name for logs and errors: the object name if known, else the handle's
    /// log name.
    pub fn log_name(&self) -> String {
        match &self.name {
            Some(name) if !self.handle.is_set() => name.clone(),
            _ => self.handle.log_name(),
        }
    }

    fn unsupported(&self, capability: &'static str) -> Error {
        Error::Unsupported {
            type_name: self.content_type.display_name().to_string(),
            capability,
        }
    }
}
