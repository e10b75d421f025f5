//! Per-source object store indexed by key and id

use crate::{ContentHandle, ContentObject, ContentType, Error, Result};
use std::collections::{BTreeMap, HashMap};

type IndexKey = (ContentType, String);

/// In-memory collection of content objects for one source.
///
/// Objects are indexed by both identity projections at once. Inserting an
/// object displaces any stored object that shares its key or its id, so one
/// identity never maps to two objects. Iteration follows insertion order.
///
/// The store is not internally synchronized; a run owns it exclusively.
#[derive(Debug, Default, Clone)]
pub struct ContentStore {
    objects: BTreeMap<u64, ContentObject>,
    by_key: HashMap<IndexKey, u64>,
    by_id: HashMap<IndexKey, u64>,
    next_slot: u64,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object, returning any objects it displaced.
    pub fn insert(&mut self, object: ContentObject) -> Result<Vec<ContentObject>> {
        let handle = object.handle().clone();
        if !handle.is_set() {
            return Err(Error::UnsetHandle {
                type_name: object.content_type().to_string(),
            });
        }

        let mut displaced = Vec::new();
        for slot in self.slots_for(&handle) {
            if let Some(old) = self.remove_slot(slot) {
                displaced.push(old);
            }
        }

        let slot = self.next_slot;
        self.next_slot += 1;
        self.index(slot, &handle);
        self.objects.insert(slot, object);
        Ok(displaced)
    }

    /// Remove the object matching `handle` by key or id.
    pub fn remove(&mut self, handle: &ContentHandle) -> Option<ContentObject> {
        let slot = self.slot_of(handle)?;
        self.remove_slot(slot)
    }

    /// Find the object matching `handle` by key or id.
    pub fn find(&self, handle: &ContentHandle) -> Option<&ContentObject> {
        self.slot_of(handle).and_then(|slot| self.objects.get(&slot))
    }

    pub fn contains(&self, handle: &ContentHandle) -> bool {
        self.slot_of(handle).is_some()
    }

    /// All objects in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &ContentObject> {
        self.objects.values()
    }

    /// Objects of one type in insertion order.
    pub fn of_type(&self, ty: ContentType) -> impl Iterator<Item = &ContentObject> {
        self.objects
            .values()
            .filter(move |o| o.content_type() == ty)
    }

    /// Objects whose parent is `parent`, in insertion order.
    pub fn children_of<'a>(
        &'a self,
        parent: &'a ContentHandle,
    ) -> impl Iterator<Item = &'a ContentObject> + 'a {
        self.objects
            .values()
            .filter(move |o| o.parent().is_some_and(|p| p == parent))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.by_key.clear();
        self.by_id.clear();
    }

    /// Rewrite every stored reference equal to `from` into `to`.
    ///
    /// Used when an object's identity form changes, e.g. once the live
    /// source assigns an id to an object previously referenced by key.
    /// Returns the number of rewritten references.
    pub fn rename_references(&mut self, from: &ContentHandle, to: &ContentHandle) -> usize {
        let mut renamed = 0;
        for object in self.objects.values_mut() {
            renamed += object.rename_reference(from, to);
        }
        if renamed > 0 {
            tracing::debug!(from = %from, to = %to, renamed, "Renamed content references");
        }
        renamed
    }

    fn slot_of(&self, handle: &ContentHandle) -> Option<u64> {
        let ty = handle.content_type();
        handle
            .key()
            .and_then(|k| self.by_key.get(&(ty, k.to_string())))
            .or_else(|| handle.id().and_then(|i| self.by_id.get(&(ty, i.to_string()))))
            .copied()
    }

    fn slots_for(&self, handle: &ContentHandle) -> Vec<u64> {
        let ty = handle.content_type();
        let mut slots = Vec::new();
        if let Some(slot) = handle.key().and_then(|k| self.by_key.get(&(ty, k.to_string()))) {
            slots.push(*slot);
        }
        if let Some(slot) = handle.id().and_then(|i| self.by_id.get(&(ty, i.to_string()))) {
            if !slots.contains(slot) {
                slots.push(*slot);
            }
        }
        slots
    }

    fn index(&mut self, slot: u64, handle: &ContentHandle) {
        let ty = handle.content_type();
        if let Some(key) = handle.key() {
            self.by_key.insert((ty, key.to_string()), slot);
        }
        if let Some(id) = handle.id() {
            self.by_id.insert((ty, id.to_string()), slot);
        }
    }

    fn remove_slot(&mut self, slot: u64) -> Option<ContentObject> {
        let object = self.objects.remove(&slot)?;
        let handle = object.handle();
        let ty = handle.content_type();
        if let Some(key) = handle.key() {
            self.by_key.remove(&(ty, key.to_string()));
        }
        if let Some(id) = handle.id() {
            self.by_id.remove(&(ty, id.to_string()));
        }
        Some(object)
    }
}
