//! Live read methods

use super::{LiveSource, request, uses_collection_cache};
use crate::method::{ReadBatch, ReadFailure, ReadMethod};
use crate::{Error, Result};
use csync_binding::{BindingTemplate, Element, Params, unmarshal};
use csync_model::{ContentHandle, ContentObject, ContentType, SourceKind};
use std::sync::Arc;
use tracing::debug;

pub(super) struct LiveReadMethod<'a> {
    source: &'a mut LiveSource,
    ty: ContentType,
    template: Arc<BindingTemplate>,
    params: Params,
}

impl<'a> LiveReadMethod<'a> {
    pub(super) fn new(
        source: &'a mut LiveSource,
        ty: ContentType,
        template: Arc<BindingTemplate>,
        params: Params,
    ) -> Self {
        Self {
            source,
            ty,
            template,
            params,
        }
    }

    /// Issue a read call and register every object that binds.
    fn fetch(&mut self, request: Element) -> Result<ReadBatch> {
        let response = self.source.call(&request)?;
        let batch = self.parse_tuples(&response)?;
        for object in &batch.objects {
            self.source.register(object)?;
        }
        debug!(
            content_type = %self.ty,
            count = batch.objects.len(),
            failed = batch.failures.len(),
            "Read from live source"
        );
        Ok(batch)
    }

    /// Each tuple in a response is unmarshalled on its own.
    fn parse_tuples(&self, response: &Element) -> Result<ReadBatch> {
        let mut batch = ReadBatch::default();
        for (index, tuple) in response.children_named("tuple").enumerate() {
            let Some(element) = tuple.elements().next() else {
                continue;
            };
            let name = element
                .attribute("key")
                .or_else(|| element.attribute("id"))
                .map_or_else(|| format!("tuple #{index}"), str::to_string);
            batch.push(name, self.parse_one(element))?;
        }
        Ok(batch)
    }

    fn parse_one(&self, element: &Element) -> Result<ContentObject> {
        let mut object = unmarshal(&self.template, element, &self.params)?;
        if self.ty.info().capabilities.hierarchical && object.parent().is_none() {
            object.set_parent(Some(ContentHandle::root()))?;
        }
        Ok(object)
    }

    /// Fill the model cache on first use. Objects that failed to bind while
    /// filling are returned once.
    fn load_cache(&mut self) -> Result<Vec<ReadFailure>> {
        if self.source.model_cache.is_loaded() {
            return Ok(Vec::new());
        }
        let batch = self.fetch(request("list", self.ty))?;
        debug!(content_type = %self.ty, count = batch.objects.len(), "Filled model cache");
        self.source.model_cache.fill(batch.objects);
        Ok(batch.failures)
    }

    fn cached(&mut self) -> Result<ReadBatch> {
        let failures = self.load_cache()?;
        Ok(ReadBatch {
            objects: self.source.model_cache.objects().to_vec(),
            failures,
        })
    }

    fn parent_id(&self, parent: &ContentHandle) -> Result<Option<String>> {
        if parent.is_root() {
            return Ok(None);
        }
        self.source
            .id_of(parent)
            .map(Some)
            .ok_or_else(|| Error::reference(parent))
    }
}

impl ReadMethod for LiveReadMethod<'_> {
    fn content_type(&self) -> ContentType {
        self.ty
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Live
    }

    fn read_objects(&mut self, read_fully: bool) -> Result<ReadBatch> {
        if uses_collection_cache(self.ty) {
            return self.cached();
        }
        let method = if self.ty.info().capabilities.hierarchical {
            "children"
        } else {
            "list"
        };
        let request = request(method, self.ty).with_attribute("full", read_fully.to_string());
        self.fetch(request)
    }

    fn read_children(
        &mut self,
        parent: &ContentHandle,
        read_fully: bool,
        recursive: bool,
    ) -> Result<ReadBatch> {
        if !self.ty.info().capabilities.hierarchical {
            return if parent.is_root() {
                self.read_objects(read_fully)
            } else {
                Ok(ReadBatch::default())
            };
        }
        let mut request = request("children", self.ty)
            .with_attribute("full", read_fully.to_string())
            .with_attribute("recursive", recursive.to_string());
        if let Some(id) = self.parent_id(parent)? {
            request = request.with_attribute("parent", id);
        }
        self.fetch(request)
    }

    fn read_object(&mut self, handle: &ContentHandle) -> Result<Option<ContentObject>> {
        if uses_collection_cache(self.ty) {
            self.load_cache()?;
            return Ok(self.source.model_cache.find(handle).cloned());
        }
        let Some(id) = self.source.id_of(handle) else {
            return Ok(None);
        };
        let request = request("get", self.ty).with_attribute("id", id);
        let mut batch = self.fetch(request)?;
        if let Some(failure) = batch.failures.pop() {
            return Err(failure.error);
        }
        Ok(batch.objects.into_iter().next())
    }

    fn clear_cache(&mut self) {
        self.source.model_cache.clear();
    }
}
