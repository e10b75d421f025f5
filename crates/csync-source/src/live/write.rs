//! Live write methods

use super::{LiveSource, request};
use crate::method::WriteMethod;
use crate::source::{ContentSource, is_subobject};
use crate::{Error, Result};
use csync_binding::{BindingTemplate, Params, marshal_to_element, unmarshal};
use csync_model::{ContentHandle, ContentObject, ContentType};
use std::sync::Arc;
use tracing::{debug, info};

pub(super) struct LiveWriteMethod<'a> {
    source: &'a mut LiveSource,
    ty: ContentType,
    template: Arc<BindingTemplate>,
    params: Params,
}

impl<'a> LiveWriteMethod<'a> {
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

    /// Give the parent and every reference an id from the store.
    ///
    /// The server links objects by id only, so a handle with no known id
    /// cannot be written.
    fn with_ids(&self, object: &ContentObject) -> Result<ContentObject> {
        let mut object = object.clone();
        if let Some(parent) = object.parent().filter(|p| !p.is_root()) {
            let parent = self.resolve(parent)?;
            object.set_parent(Some(parent))?;
        }
        let references = object
            .references()
            .iter()
            .map(|r| self.resolve(r))
            .collect::<Result<Vec<_>>>()?;
        object.set_references(references)?;
        Ok(object)
    }

    fn resolve(&self, handle: &ContentHandle) -> Result<ContentHandle> {
        if handle.id().is_some() {
            return Ok(handle.clone());
        }
        self.source
            .id_of(handle)
            .map(|id| handle.assign_id(id))
            .ok_or_else(|| Error::reference(handle))
    }

    /// Create `object` remotely, or adopt the server's copy when it already
    /// has one under the same key.
    fn create(&mut self, object: &ContentObject) -> Result<Creation> {
        let object = self.with_ids(object)?;
        let body = marshal_to_element(&self.template, &object, &self.params)?;
        let response = match self.source.call(&request("create", self.ty).with_child(body)) {
            Ok(response) => response,
            Err(e) if e.is_already_exists() => {
                info!(object = %object.handle(), "Already exists on the live source");
                return self.adopt_existing(object).map(Creation::Existing);
            }
            Err(e) => return Err(e),
        };

        let created = response
            .descend("tuple")
            .and_then(|tuple| tuple.elements().next())
            .map(|element| unmarshal(&self.template, element, &self.params))
            .transpose()?;
        let mut stored = object;
        if let Some(id) = created.as_ref().and_then(|c| c.handle().id()) {
            let handle = stored.handle().assign_id(id);
            stored.set_handle(handle)?;
        }
        info!(object = %stored.handle(), "Created on live source");
        self.source.register(&stored)?;
        Ok(Creation::Created(stored))
    }

    /// Look the existing object up among its siblings and register its id,
    /// so later objects in the batch can link to it.
    fn adopt_existing(&mut self, mut object: ContentObject) -> Result<ContentObject> {
        let Some(key) = object.handle().key().map(str::to_string) else {
            return Ok(object);
        };
        let mut lookup = if self.ty.info().capabilities.hierarchical {
            request("children", self.ty).with_attribute("recursive", "false")
        } else {
            request("list", self.ty)
        };
        lookup = lookup.with_attribute("full", "true");
        if let Some(parent_id) = object.parent().and_then(ContentHandle::id) {
            lookup = lookup.with_attribute("parent", parent_id);
        }

        let response = self.source.call(&lookup)?;
        let id = response
            .children_named("tuple")
            .filter_map(|tuple| tuple.elements().next())
            .filter(|element| element.attribute("key") == Some(key.as_str()))
            .find_map(|element| unmarshal(&self.template, element, &self.params).ok())
            .and_then(|existing| existing.handle().id().map(str::to_string));

        match id {
            Some(id) => {
                let handle = object.handle().assign_id(id);
                object.set_handle(handle)?;
                debug!(object = %object.handle(), "Adopted existing id");
                self.source.register(&object)?;
            }
            None => {
                if let Some(known) = self.source.store.find(object.handle()) {
                    let handle = object.handle().merged(known.handle());
                    object.set_handle(handle)?;
                }
            }
        }
        Ok(object)
    }
}

enum Creation {
    Created(ContentObject),
    Existing(ContentObject),
}

impl WriteMethod for LiveWriteMethod<'_> {
    fn content_type(&self) -> ContentType {
        self.ty
    }

    fn check_access(&self, key: &str) -> bool {
        self.source.check_access(self.ty, key, is_subobject(self.ty))
    }

    fn insert_object(&mut self, new: &ContentObject) -> Result<ContentObject> {
        match self.create(new)? {
            Creation::Created(object) | Creation::Existing(object) => Ok(object),
        }
    }

    fn update_object(&mut self, old: &ContentObject, new: &ContentObject) -> Result<ContentObject> {
        let renamed = match (old.handle().key(), new.handle().key()) {
            (Some(old_key), Some(new_key)) => old_key != new_key,
            _ => false,
        };
        if renamed {
            // Create under the new key first; the old object goes once the
            // run has finished writing.
            let created = match self.create(new)? {
                Creation::Created(created) => created,
                Creation::Existing(existing) => return Ok(existing),
            };
            info!(from = %old.handle(), to = %created.handle(), "Deferred delete after rename");
            self.source.deferred_deletes.push(old.clone());
            return Ok(created);
        }

        let id = self
            .source
            .id_of(new.handle())
            .or_else(|| self.source.id_of(old.handle()))
            .ok_or_else(|| Error::reference(new.handle()))?;
        let mut object = self.with_ids(new)?;
        object.set_handle(object.handle().assign_id(id.clone()))?;

        let body = marshal_to_element(&self.template, &object, &self.params)?;
        let request = request("update", self.ty)
            .with_attribute("id", id)
            .with_child(body);
        self.source.call(&request)?;
        info!(object = %object.handle(), "Updated on live source");
        self.source.register(&object)?;
        Ok(object)
    }

    fn delete_object(&mut self, old: &ContentObject) -> Result<()> {
        self.source.delete_remote(old)?;
        info!(object = %old.handle(), "Deleted from live source");
        Ok(())
    }
}
