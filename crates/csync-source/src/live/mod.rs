//! Live source: the remote server behind a request/response transport

mod cache;
mod read;
mod write;

pub use cache::ModelCache;

use crate::filter::{AllowAll, ContentFilter};
use crate::id_map::IdMap;
use crate::method::{ReadMethod, WriteMethod};
use crate::source::ContentSource;
use crate::templates::TemplateLibrary;
use crate::transport::Transport;
use crate::{Error, Result};
use csync_binding::{Element, Params};
use csync_model::{ContentHandle, ContentObject, ContentStore, ContentType, SourceKind};
use read::LiveReadMethod;
use tracing::{debug, info};
use write::LiveWriteMethod;

/// Talks to the live server through a [`Transport`].
pub struct LiveSource {
    transport: Box<dyn Transport>,
    store: ContentStore,
    filter: Box<dyn ContentFilter>,
    templates: TemplateLibrary,
    model_cache: ModelCache,
    deferred_deletes: Vec<ContentObject>,
    id_map: Option<IdMap>,
}

impl LiveSource {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            store: ContentStore::new(),
            filter: Box::new(AllowAll),
            templates: TemplateLibrary::builtin(SourceKind::Live),
            model_cache: ModelCache::new(),
            deferred_deletes: Vec::new(),
            id_map: None,
        }
    }

    /// Builder: install a content filter.
    pub fn with_filter(mut self, filter: impl ContentFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// Builder: record assigned ids in `id_map`.
    pub fn with_id_map(mut self, id_map: IdMap) -> Self {
        self.id_map = Some(id_map);
        self
    }

    pub fn model_cache(&self) -> &ModelCache {
        &self.model_cache
    }

    /// Old objects of renames, waiting for [`Self::flush_deferred_deletes`].
    pub fn deferred_deletes(&self) -> &[ContentObject] {
        &self.deferred_deletes
    }

    /// Delete the old side of every rename performed so far.
    ///
    /// Returns the number deleted. On failure the remaining entries stay
    /// queued.
    pub fn flush_deferred_deletes(&mut self) -> Result<usize> {
        let pending = std::mem::take(&mut self.deferred_deletes);
        let mut deleted = 0;
        let mut remaining = pending.into_iter();
        while let Some(old) = remaining.next() {
            if let Err(e) = self.delete_remote(&old) {
                self.deferred_deletes.push(old);
                self.deferred_deletes.extend(remaining);
                return Err(e);
            }
            deleted += 1;
        }
        if deleted > 0 {
            info!(deleted, "Flushed deferred deletes");
        }
        Ok(deleted)
    }

    fn call(&self, request: &Element) -> Result<Element> {
        debug!(method = %request.name, content_type = request.attribute("type").unwrap_or_default(), "Live call");
        self.transport.call(request)
    }

    /// Id of `handle`, looked up in the store when the handle has none.
    fn id_of(&self, handle: &ContentHandle) -> Option<String> {
        handle
            .id()
            .map(str::to_string)
            .or_else(|| self.store.find(handle)?.handle().id().map(str::to_string))
    }

    fn delete_remote(&mut self, old: &ContentObject) -> Result<()> {
        let id = self
            .id_of(old.handle())
            .ok_or_else(|| Error::reference(old.handle()))?;
        let request = request("delete", old.content_type()).with_attribute("id", id);
        self.call(&request)?;
        self.store.remove(old.handle());
        if let (Some(map), Some(key)) = (self.id_map.as_mut(), old.handle().key()) {
            map.remove(old.content_type().category(), key);
        }
        Ok(())
    }

    /// Register objects read or written in the store and the id map.
    fn register(&mut self, object: &ContentObject) -> Result<()> {
        if let (Some(map), Some(key), Some(id)) =
            (self.id_map.as_mut(), object.handle().key(), object.handle().id())
        {
            map.insert(object.content_type().category(), key, id);
        }
        self.store.insert(object.clone())?;
        Ok(())
    }
}

impl ContentSource for LiveSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    fn store(&self) -> &ContentStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut ContentStore {
        &mut self.store
    }

    fn filter(&self) -> &dyn ContentFilter {
        self.filter.as_ref()
    }

    fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    fn read_method(&mut self, ty: ContentType, version: u64) -> Option<Box<dyn ReadMethod + '_>> {
        let template = self.templates.get(ty, version)?;
        Some(Box::new(LiveReadMethod::new(
            self,
            ty,
            template,
            Params::for_version(version),
        )))
    }

    fn write_method(
        &mut self,
        ty: ContentType,
        version: u64,
    ) -> Option<Box<dyn WriteMethod + '_>> {
        let template = self.templates.get(ty, version)?;
        Some(Box::new(LiveWriteMethod::new(
            self,
            ty,
            template,
            Params::for_version(version),
        )))
    }

    fn id_map(&self) -> Option<&IdMap> {
        self.id_map.as_ref()
    }

    fn id_map_mut(&mut self) -> Option<&mut IdMap> {
        self.id_map.as_mut()
    }

    fn finish(&mut self) -> Result<()> {
        self.flush_deferred_deletes()?;
        Ok(())
    }
}

/// Method element addressed at one content type.
fn request(method: &str, ty: ContentType) -> Element {
    Element::new(method).with_attribute("type", ty.config_key())
}

/// Message models have no per-object fetch on the server.
fn uses_collection_cache(ty: ContentType) -> bool {
    ty == ContentType::MessageModel
}
