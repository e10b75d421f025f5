//! Per-type read and write strategies

use crate::{Error, Result};
use csync_model::{ContentHandle, ContentObject, ContentTuple, ContentType, SourceKind, TupleKind};
use tracing::{debug, warn};

/// Fetches objects of one type through a source.
///
/// Objects read are also registered in the source's store.
pub trait ReadMethod {
    fn content_type(&self) -> ContentType;

    fn source_kind(&self) -> SourceKind;

    /// Top-level objects of the type.
    ///
    /// With `read_fully` unset an implementation may return objects carrying
    /// only identity and name. An object that fails to bind is reported in
    /// the batch and does not stop the others.
    fn read_objects(&mut self, read_fully: bool) -> Result<ReadBatch>;

    /// Objects under a container, optionally the whole subtree.
    fn read_children(
        &mut self,
        parent: &ContentHandle,
        read_fully: bool,
        recursive: bool,
    ) -> Result<ReadBatch>;

    fn read_object(&mut self, handle: &ContentHandle) -> Result<Option<ContentObject>>;

    /// Unmarshal one object from its text form.
    fn read_from_text(&mut self, _text: &str) -> Result<ContentObject> {
        Err(Error::Unsupported {
            source_kind: self.source_kind().to_string(),
            operation: "reading from text",
        })
    }

    /// Every object of the type: the whole tree under the root for
    /// hierarchical types, the full list otherwise.
    fn read_all(&mut self) -> Result<ReadBatch> {
        if self.content_type().info().capabilities.hierarchical {
            self.read_children(&ContentHandle::root(), true, true)
        } else {
            self.read_objects(true)
        }
    }

    /// Drop anything cached across calls.
    fn clear_cache(&mut self) {}
}

/// An object that could not be read.
#[derive(Debug)]
pub struct ReadFailure {
    /// Key, id or file the object was read from
    pub object: String,
    pub error: Error,
}

/// Outcome of a multi-object read.
#[derive(Debug, Default)]
pub struct ReadBatch {
    pub objects: Vec<ContentObject>,
    pub failures: Vec<ReadFailure>,
}

impl ReadBatch {
    /// Record a per-object outcome.
    pub fn push(&mut self, object: impl Into<String>, result: Result<ContentObject>) -> Result<()> {
        match result {
            Ok(read) => self.objects.push(read),
            // Faults of the whole type still end the read.
            Err(e) if e.is_recoverable_for_type() || e.is_configuration() => return Err(e),
            Err(error) => {
                let object = object.into();
                warn!(object = %object, error = %error, "Read failed");
                self.failures.push(ReadFailure { object, error });
            }
        }
        Ok(())
    }

    /// Objects only; failures are dropped.
    pub fn into_objects(self) -> Vec<ContentObject> {
        self.objects
    }
}

/// A successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct Written {
    pub kind: TupleKind,
    /// The object as stored at the destination, e.g. with an assigned id
    pub object: ContentObject,
}

/// A tuple that failed without stopping the batch.
#[derive(Debug)]
pub struct WriteFailure {
    pub object: String,
    pub error: Error,
}

/// Outcome of [`WriteMethod::update_objects`].
#[derive(Debug, Default)]
pub struct WriteBatch {
    pub written: Vec<Written>,
    /// Objects the content filter rejected
    pub filtered: Vec<ContentHandle>,
    pub failures: Vec<WriteFailure>,
}

impl WriteBatch {
    pub fn count(&self, kind: TupleKind) -> usize {
        self.written.iter().filter(|w| w.kind == kind).count()
    }
}

/// Persists objects of one type through a source.
pub trait WriteMethod {
    fn content_type(&self) -> ContentType;

    /// Content filter verdict for an object key.
    fn check_access(&self, key: &str) -> bool;

    fn insert_object(&mut self, new: &ContentObject) -> Result<ContentObject>;

    fn update_object(&mut self, old: &ContentObject, new: &ContentObject) -> Result<ContentObject>;

    fn delete_object(&mut self, old: &ContentObject) -> Result<()>;

    /// Apply a batch of tuples.
    ///
    /// Every tuple is classified before any write happens, so a malformed
    /// tuple aborts the batch without touching storage. Filtered objects are
    /// skipped silently. An object-level failure is recorded and the batch
    /// continues.
    ///
    /// # Errors
    ///
    /// Configuration errors (type mismatch, empty tuple) and type-level
    /// faults such as an unavailable service.
    fn update_objects(&mut self, tuples: Vec<ContentTuple>) -> Result<WriteBatch> {
        let expected = self.content_type();
        let mut kinds = Vec::with_capacity(tuples.len());
        for tuple in &tuples {
            kinds.push(tuple.kind()?);
            let found = tuple.content_type()?;
            if found != expected {
                return Err(Error::WrongType {
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }

        let mut batch = WriteBatch::default();
        for (tuple, kind) in tuples.into_iter().zip(kinds) {
            let Some(subject) = tuple.subject() else {
                continue;
            };
            if subject.handle().key().is_some_and(|key| !self.check_access(key)) {
                debug!(object = %subject.handle(), "Filtered out");
                batch.filtered.push(subject.handle().clone());
                continue;
            }

            let result = match (kind, &tuple.old, &tuple.new) {
                (TupleKind::Insert, _, Some(new)) => self.insert_object(new),
                (TupleKind::Update, Some(old), Some(new)) => self.update_object(old, new),
                (TupleKind::Delete, Some(old), _) => self.delete_object(old).map(|()| old.clone()),
                _ => continue,
            };
            match result {
                Ok(object) => batch.written.push(Written { kind, object }),
                Err(e) if e.is_recoverable_for_type() || e.is_configuration() => return Err(e),
                Err(e) => {
                    warn!(object = %tuple.log_name(), error = %e, "Write failed");
                    batch.failures.push(WriteFailure {
                        object: tuple.log_name(),
                        error: e,
                    });
                }
            }
        }
        Ok(batch)
    }
}
