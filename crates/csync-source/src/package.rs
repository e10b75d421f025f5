//! Package source: a write-only deployment document
//!
//! Objects are buffered per type and serialized once by [`PackageSource::render`]
//! (or written to the output path by `finish`). The document wraps one
//! loader section per category:
//!
//! ```text
//! <package xmlns="urn:csync:package" platformVersion="9" created="...">
//!   <folderContent>
//!     <folders><folder .../>...</folders>
//!     <templates><template .../>...</templates>
//!   </folderContent>
//!   ...
//! </package>
//! ```
//!
//! Empty categories and types are omitted.

use crate::filter::{AllowAll, ContentFilter};
use crate::id_map::IdMap;
use crate::method::{ReadMethod, WriteMethod};
use crate::source::{ContentSource, is_subobject};
use crate::templates::TemplateLibrary;
use crate::{Error, Result};
use csync_binding::{BindingTemplate, Params, XmlSink, marshal};
use csync_fs::{NormalizedPath, io};
use csync_model::{Category, ContentHandle, ContentObject, ContentStore, ContentType, SourceKind};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub const PACKAGE_NAMESPACE: &str = "urn:csync:package";

/// Accumulates objects and serializes them as one package document.
pub struct PackageSource {
    output: Option<NormalizedPath>,
    version: u64,
    store: ContentStore,
    filter: Box<dyn ContentFilter>,
    templates: TemplateLibrary,
    id_map: IdMap,
    sections: HashMap<ContentType, Vec<ContentObject>>,
    pretty: bool,
}

impl PackageSource {
    /// Package for the given major platform version.
    pub fn new(version: u64) -> Self {
        Self {
            output: None,
            version,
            store: ContentStore::new(),
            filter: Box::new(AllowAll),
            templates: TemplateLibrary::builtin(SourceKind::Package),
            id_map: IdMap::new(),
            sections: HashMap::new(),
            pretty: false,
        }
    }

    /// Builder: write the document to `path` on finish.
    pub fn with_output(mut self, path: impl AsRef<Path>) -> Self {
        self.output = Some(NormalizedPath::new(path));
        self
    }

    /// Builder: allocate ids from an existing map.
    pub fn with_id_map(mut self, id_map: IdMap) -> Self {
        self.id_map = id_map;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Builder: install a content filter.
    pub fn with_filter(mut self, filter: impl ContentFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Objects buffered for one type, in write order.
    pub fn objects(&self, ty: ContentType) -> &[ContentObject] {
        self.sections.get(&ty).map(Vec::as_slice).unwrap_or_default()
    }

    /// Serialize every buffered object.
    ///
    /// # Errors
    ///
    /// A missing template for a buffered type, or any binding error.
    pub fn render(&self) -> Result<Vec<u8>> {
        let params = Params::for_version(self.version);
        let mut sections = Vec::new();
        for category in Category::ALL {
            let mut types = Vec::new();
            for ty in category.types() {
                let objects = self.objects(ty);
                if objects.is_empty() {
                    continue;
                }
                let template = self.templates.get(ty, self.version).ok_or_else(|| {
                    Error::MissingTemplate {
                        type_name: ty.to_string(),
                        source_kind: SourceKind::Package.to_string(),
                        version: self.version,
                    }
                })?;
                types.push((ty, template, objects));
            }
            if !types.is_empty() {
                sections.push((category, types));
            }
        }

        let attributes = [
            ("xmlns".to_string(), PACKAGE_NAMESPACE.to_string()),
            ("platformVersion".to_string(), self.version.to_string()),
            ("created".to_string(), chrono::Utc::now().to_rfc3339()),
        ];
        let mut sink = XmlSink::with_pretty(Vec::new(), self.pretty);
        sink.declaration()?;
        sink.element("package", &attributes, |sink| {
            for (category, types) in &sections {
                sink.element(category.loader_element(), &[], |sink| {
                    for (ty, template, objects) in types {
                        let plural = format!("{}s", ty.info().element);
                        sink.element(&plural, &[], |sink| {
                            for object in objects.iter() {
                                marshal(template, object, &params, sink)?;
                            }
                            Ok(())
                        })?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })?;
        let mut bytes = sink.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Give `object`, its parent and its references ids from the id map.
    fn prepare(&mut self, object: &ContentObject) -> Result<ContentObject> {
        let key = object
            .handle()
            .key()
            .ok_or_else(|| Error::missing_key(object.handle()))?;
        let mut prepared = object.clone();
        let id = self.id_map.id_for(object.content_type().category(), key);
        prepared.set_handle(object.handle().assign_id(id))?;

        if let Some(parent) = object.parent().filter(|p| !p.is_root()) {
            let parent = self.with_id(parent)?;
            prepared.set_parent(Some(parent))?;
        }
        let references = object
            .references()
            .iter()
            .map(|r| self.with_id(r))
            .collect::<Result<Vec<_>>>()?;
        prepared.set_references(references)?;
        Ok(prepared)
    }

    fn with_id(&mut self, handle: &ContentHandle) -> Result<ContentHandle> {
        if handle.id().is_some() {
            return Ok(handle.clone());
        }
        let key = handle.key().ok_or_else(|| Error::reference(handle))?;
        let id = self.id_map.id_for(handle.content_type().category(), key);
        Ok(handle.assign_id(id))
    }

    /// Add or replace `object` in its type's section.
    fn put(&mut self, object: ContentObject) -> Result<()> {
        self.store.insert(object.clone())?;
        let section = self.sections.entry(object.content_type()).or_default();
        match section.iter_mut().find(|o| o.handle() == object.handle()) {
            Some(slot) => *slot = object,
            None => section.push(object),
        }
        Ok(())
    }

    fn take(&mut self, handle: &ContentHandle) -> bool {
        self.store.remove(handle);
        let Some(section) = self.sections.get_mut(&handle.content_type()) else {
            return false;
        };
        let before = section.len();
        section.retain(|o| o.handle() != handle);
        section.len() != before
    }
}

impl ContentSource for PackageSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Package
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

    fn read_method(&mut self, _ty: ContentType, _version: u64) -> Option<Box<dyn ReadMethod + '_>> {
        None
    }

    fn write_method(
        &mut self,
        ty: ContentType,
        version: u64,
    ) -> Option<Box<dyn WriteMethod + '_>> {
        // Objects are marshalled at render time; the template must exist now.
        self.templates.get(ty, version)?;
        Some(Box::new(PackageWriteMethod { source: self, ty }))
    }

    fn unmarshaller(&self, _ty: ContentType, _version: u64) -> Option<Arc<BindingTemplate>> {
        None
    }

    fn id_map(&self) -> Option<&IdMap> {
        Some(&self.id_map)
    }

    fn id_map_mut(&mut self) -> Option<&mut IdMap> {
        Some(&mut self.id_map)
    }

    fn finish(&mut self) -> Result<()> {
        let Some(path) = self.output.clone() else {
            return Ok(());
        };
        let bytes = self.render()?;
        io::write_atomic(&path, &bytes)?;
        let objects: usize = self.sections.values().map(Vec::len).sum();
        info!(path = %path, objects, "Wrote package");
        Ok(())
    }
}

struct PackageWriteMethod<'a> {
    source: &'a mut PackageSource,
    ty: ContentType,
}

impl WriteMethod for PackageWriteMethod<'_> {
    fn content_type(&self) -> ContentType {
        self.ty
    }

    fn check_access(&self, key: &str) -> bool {
        self.source.check_access(self.ty, key, is_subobject(self.ty))
    }

    fn insert_object(&mut self, new: &ContentObject) -> Result<ContentObject> {
        let prepared = self.source.prepare(new)?;
        debug!(object = %prepared.handle(), "Buffered for package");
        self.source.put(prepared.clone())?;
        Ok(prepared)
    }

    fn update_object(&mut self, old: &ContentObject, new: &ContentObject) -> Result<ContentObject> {
        if old.handle().key() != new.handle().key() {
            self.source.take(old.handle());
        }
        self.insert_object(new)
    }

    fn delete_object(&mut self, old: &ContentObject) -> Result<()> {
        if self.source.take(old.handle()) {
            debug!(object = %old.handle(), "Dropped from package");
        }
        Ok(())
    }
}
