//! Old/new pairings expressing insert, update, and delete

use crate::{ContentObject, ContentType, Error, Result};

/// What a tuple asks the destination to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TupleKind {
    Insert,
    Update,
    Delete,
}

/// Pairing of the object currently at the destination (`old`) with the
/// desired state (`new`).
#[derive(Debug, Clone, PartialEq)]
pub struct ContentTuple {
    pub old: Option<ContentObject>,
    pub new: Option<ContentObject>,
}

impl ContentTuple {
    pub fn new(old: Option<ContentObject>, new: Option<ContentObject>) -> Self {
        Self { old, new }
    }

    pub fn insert(new: ContentObject) -> Self {
        Self::new(None, Some(new))
    }

    pub fn update(old: ContentObject, new: ContentObject) -> Self {
        Self::new(Some(old), Some(new))
    }

    pub fn delete(old: ContentObject) -> Self {
        Self::new(Some(old), None)
    }

    /// Classify the tuple.
    ///
    /// Both sides present with different types, or both absent, is a
    /// configuration error.
    pub fn kind(&self) -> Result<TupleKind> {
        match (&self.old, &self.new) {
            (None, Some(_)) => Ok(TupleKind::Insert),
            (Some(old), Some(new)) => {
                if old.content_type() != new.content_type() {
                    return Err(Error::TupleTypeMismatch {
                        old: old.content_type().to_string(),
                        new: new.content_type().to_string(),
                    });
                }
                Ok(TupleKind::Update)
            }
            (Some(_), None) => Ok(TupleKind::Delete),
            (None, None) => Err(Error::EmptyTuple),
        }
    }

    pub fn content_type(&self) -> Result<ContentType> {
        self.kind()?;
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map(ContentObject::content_type)
            .ok_or(Error::EmptyTuple)
    }

    /// The side that carries the identity to act on: `new` if present.
    pub fn subject(&self) -> Option<&ContentObject> {
        self.new.as_ref().or(self.old.as_ref())
    }

    pub fn log_name(&self) -> String {
        self.subject()
            .map(ContentObject::log_name)
            .unwrap_or_else(|| "<empty>".to_string())
    }
}
