//! Cross-source reference resolution
//!
//! Keys are the source-independent identity of an object; ids are local to
//! the source that assigned them. Resolution therefore carries every handle
//! over by key and attaches the destination's own id when the destination
//! already knows one.

use crate::{Error, Result};
use csync_model::{ContentHandle, ContentObject, ContentStore, ContentType, SourceKind};
use csync_source::ContentSource;
use std::collections::HashSet;
use tracing::{debug, info};

/// Rewrites parent and reference handles between sources.
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    version: u64,
    create_parents: bool,
    /// Folder keys about to be written by the current batch
    pending: HashSet<String>,
}

impl ReferenceResolver {
    /// Resolver reading and writing with templates for `version`.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            create_parents: true,
            pending: HashSet::new(),
        }
    }

    /// Folders the caller is about to write itself; parent creation stops
    /// at them. Replaces the previous set.
    pub fn set_pending<'a>(&mut self, handles: impl IntoIterator<Item = &'a ContentHandle>) {
        self.pending = handles
            .into_iter()
            .filter(|h| h.content_type() == ContentType::Folder)
            .filter_map(|h| h.key().map(str::to_string))
            .collect();
    }

    /// Builder: whether missing file-tree parents are written. A dry run
    /// turns this off.
    pub fn with_parent_creation(mut self, enabled: bool) -> Self {
        self.create_parents = enabled;
        self
    }

    /// Fill missing projections of the parent and references from the store
    /// the object was loaded into.
    ///
    /// Handles the store does not know are left as they are; strict checks
    /// happen in [`Self::update_references`].
    pub fn on_load(&self, object: &mut ContentObject, store: &ContentStore) {
        if let Some(parent) = object.parent().filter(|p| !p.is_root()) {
            if let Some(found) = store.find(parent) {
                let merged = parent.merged(found.handle());
                if let Err(e) = object.set_parent(Some(merged)) {
                    debug!(object = %object.handle(), error = %e, "Parent left unresolved");
                }
            }
        }
        let references: Vec<_> = object
            .references()
            .iter()
            .map(|r| match store.find(r) {
                Some(found) => r.merged(found.handle()),
                None => r.clone(),
            })
            .collect();
        if let Err(e) = object.set_references(references) {
            debug!(object = %object.handle(), error = %e, "References left unresolved");
        }
    }

    /// Copy of `object` with its own handle, parent and references in the
    /// destination's identity form.
    ///
    /// Handles are looked up in the source store, then the destination store,
    /// then fetched through the source. A file-tree destination gets any
    /// missing parent folders created first.
    ///
    /// # Errors
    ///
    /// [`Error::Reference`] when a handle cannot be found anywhere, and
    /// [`Error::ReferenceCycle`] for a parent chain that loops.
    pub fn update_references(
        &self,
        object: &ContentObject,
        source: &mut dyn ContentSource,
        dest: &mut dyn ContentSource,
    ) -> Result<ContentObject> {
        let mut resolved = object.clone();

        let own = match object.handle().key() {
            Some(_) => object.handle().clone(),
            None => self
                .locate(object.handle(), source, dest)?
                .ok_or_else(|| Error::reference(object.handle()))?,
        };
        resolved.set_handle(self.dest_form(&own, dest)?)?;

        if let Some(parent) = object.parent().filter(|p| !p.is_root()) {
            let parent = self.resolve_parent(parent, source, dest)?;
            resolved.set_parent(Some(parent))?;
        }

        let mut references = Vec::with_capacity(object.references().len());
        for reference in object.references() {
            let located = self
                .locate(reference, source, dest)?
                .ok_or_else(|| Error::reference(reference))?;
            references.push(self.dest_form(&located, dest)?);
        }
        resolved.set_references(references)?;
        Ok(resolved)
    }

    fn resolve_parent(
        &self,
        parent: &ContentHandle,
        source: &mut dyn ContentSource,
        dest: &mut dyn ContentSource,
    ) -> Result<ContentHandle> {
        let file_tree = dest.kind() == SourceKind::FileTree;
        let located = match self.locate(parent, source, dest)? {
            Some(located) => located,
            // A folder known only by key can still be laid out on disk.
            None if file_tree && parent.key().is_some() => parent.clone(),
            None => return Err(Error::reference(parent)),
        };
        let handle = self.dest_form(&located, dest)?;
        if file_tree && !dest.store().contains(&handle) {
            self.ensure_parent_chain(&handle, source, dest)?;
        }
        Ok(handle)
    }

    /// Find `handle` and return it with every projection the sources know.
    fn locate(
        &self,
        handle: &ContentHandle,
        source: &mut dyn ContentSource,
        dest: &dyn ContentSource,
    ) -> Result<Option<ContentHandle>> {
        if let Some(found) = source.store().find(handle) {
            return Ok(Some(handle.merged(found.handle())));
        }
        // Destination ids mean nothing to the source, so match by key only.
        if handle.key().is_some() {
            let by_key = handle.key_only();
            if let Some(found) = dest.store().find(&by_key) {
                return Ok(Some(by_key.merged(&found.handle().key_only())));
            }
        }
        if let Some(mut method) = source.read_method(handle.content_type(), self.version) {
            if let Some(found) = method.read_object(handle)? {
                debug!(handle = %handle, "Fetched referenced object from source");
                return Ok(Some(handle.merged(found.handle())));
            }
        }
        Ok(None)
    }

    /// The key projection plus the destination's id, when it has one.
    fn dest_form(&self, handle: &ContentHandle, dest: &dyn ContentSource) -> Result<ContentHandle> {
        if handle.is_root() {
            return Ok(ContentHandle::root());
        }
        let key = handle.key().ok_or_else(|| Error::reference(handle))?;
        let by_key = handle.key_only();
        if dest.kind() == SourceKind::FileTree {
            return Ok(by_key);
        }
        let id = dest
            .store()
            .find(&by_key)
            .and_then(|o| o.handle().id().map(str::to_string))
            .or_else(|| {
                dest.id_map()?
                    .get(handle.content_type().category(), key)
                    .map(str::to_string)
            });
        Ok(match id {
            Some(id) => by_key.assign_id(id),
            None => by_key,
        })
    }

    /// Write every folder between `handle` and the nearest ancestor the
    /// destination already has, outermost first.
    fn ensure_parent_chain(
        &self,
        handle: &ContentHandle,
        source: &mut dyn ContentSource,
        dest: &mut dyn ContentSource,
    ) -> Result<()> {
        let mut visited = HashSet::new();
        let mut missing = Vec::new();
        let mut current = Some(handle.clone());

        while let Some(folder) = current.take() {
            if folder.is_root() {
                break;
            }
            let key = folder
                .key()
                .ok_or_else(|| Error::reference(&folder))?
                .to_string();
            if !visited.insert(key.clone()) {
                return Err(Error::ReferenceCycle { handle: key });
            }
            if self.pending.contains(&key) || dest.store().contains(&folder) {
                break;
            }
            if let Some(mut method) = dest.read_method(ContentType::Folder, self.version) {
                if method.read_object(&folder)?.is_some() {
                    break;
                }
            }

            let object = source
                .store()
                .find(&folder)
                .cloned()
                .unwrap_or_else(|| placeholder(&folder));
            let parent = self.parent_key_of(&object, source.store());
            current = parent.clone();
            missing.push((object, parent));
        }

        if missing.is_empty() {
            return Ok(());
        }
        if !self.create_parents {
            for (object, _) in &missing {
                debug!(folder = %object.handle(), "Would create missing parent folder");
            }
            return Ok(());
        }

        let mut method = dest
            .write_method(ContentType::Folder, self.version)
            .ok_or_else(|| Error::configuration("destination cannot write folders"))?;
        for (object, parent) in missing.into_iter().rev() {
            let mut folder = object;
            folder.set_handle(folder.handle().key_only())?;
            folder.set_parent(Some(parent.unwrap_or_else(ContentHandle::root)))?;
            method.insert_object(&folder)?;
            info!(folder = %folder.handle(), "Created missing parent folder");
        }
        Ok(())
    }

    /// Key handle of a folder's parent, from the folder's own parent handle
    /// when the store can name it, else from its key.
    fn parent_key_of(&self, folder: &ContentObject, store: &ContentStore) -> Option<ContentHandle> {
        let from_parent = folder.parent().and_then(|p| {
            p.key()
                .map(str::to_string)
                .or_else(|| store.find(p)?.handle().key().map(str::to_string))
        });
        from_parent
            .or_else(|| folder.handle().parent_key())
            .map(|key| ContentHandle::with_key(ContentType::Folder, key))
    }
}

/// Folder carrying only what its key implies.
fn placeholder(handle: &ContentHandle) -> ContentObject {
    let mut folder = ContentObject::new(handle.key_only());
    if let Some(name) = handle.leaf_name() {
        folder.set_name(name);
    }
    folder
}
