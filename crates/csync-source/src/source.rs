//! The content source interface

use crate::filter::ContentFilter;
use crate::id_map::IdMap;
use crate::method::{ReadMethod, WriteMethod};
use crate::templates::TemplateLibrary;
use crate::Result;
use csync_binding::BindingTemplate;
use csync_model::{ContentHandle, ContentStore, ContentType, SourceKind};
use std::sync::Arc;

/// One of the three representations content moves between.
///
/// A source owns a store, a content filter, and the binding templates that
/// apply to it, and hands out per-type read and write methods. Methods
/// borrow the source for as long as they are used.
pub trait ContentSource {
    fn kind(&self) -> SourceKind;

    fn store(&self) -> &ContentStore;

    fn store_mut(&mut self) -> &mut ContentStore;

    fn filter(&self) -> &dyn ContentFilter;

    fn templates(&self) -> &TemplateLibrary;

    /// Read method for `ty`, or `None` when the source cannot read it.
    fn read_method(&mut self, ty: ContentType, version: u64) -> Option<Box<dyn ReadMethod + '_>>;

    /// Write method for `ty`, or `None` when the source cannot write it.
    fn write_method(&mut self, ty: ContentType, version: u64)
    -> Option<Box<dyn WriteMethod + '_>>;

    /// Filter verdict for an object.
    ///
    /// Subobjects are checked against their containing folder's key.
    fn check_access(&self, ty: ContentType, key: &str, is_subobject: bool) -> bool {
        if is_subobject {
            let parent = ContentHandle::with_key(ty, key)
                .parent_key()
                .unwrap_or_else(|| csync_model::handle::ROOT_KEY.to_string());
            self.filter().check_access(ty, &parent)
        } else {
            self.filter().check_access(ty, key)
        }
    }

    fn marshaller(&self, ty: ContentType, version: u64) -> Option<Arc<BindingTemplate>> {
        self.templates().get(ty, version)
    }

    fn unmarshaller(&self, ty: ContentType, version: u64) -> Option<Arc<BindingTemplate>> {
        self.templates().get(ty, version)
    }

    fn id_map(&self) -> Option<&IdMap> {
        None
    }

    fn id_map_mut(&mut self) -> Option<&mut IdMap> {
        None
    }

    /// Flush pending work at the end of a run.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Objects of hierarchical, non-container types are filtered by the folder
/// they live in.
pub fn is_subobject(ty: ContentType) -> bool {
    let capabilities = ty.info().capabilities;
    capabilities.hierarchical && !capabilities.container
}
