//! File-tree source: one XML file per object
//!
//! Layout is `<root>/<type config key>/<key path>.xml`, so a folder
//! `/reports/daily` lives at `folders/reports/daily.xml` and its templates
//! under `templates/reports/daily/`.

use crate::filter::{AllowAll, ContentFilter};
use crate::method::{ReadBatch, ReadMethod, WriteMethod};
use crate::source::{ContentSource, is_subobject};
use crate::templates::TemplateLibrary;
use crate::{Error, Result};
use csync_binding::{BindingTemplate, Params, XmlSink, marshal, unmarshal_str};
use csync_fs::{NormalizedPath, io, key_to_relative_path, relative_path_to_key};
use csync_model::{ContentHandle, ContentObject, ContentStore, ContentType, SourceKind};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

const EXTENSION: &str = "xml";

/// Reads and writes objects as files under a root directory.
pub struct FileTreeSource {
    root: NormalizedPath,
    store: ContentStore,
    filter: Box<dyn ContentFilter>,
    templates: TemplateLibrary,
    pretty: HashSet<ContentType>,
}

impl FileTreeSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: NormalizedPath::new(root),
            store: ContentStore::new(),
            filter: Box::new(AllowAll),
            templates: TemplateLibrary::builtin(SourceKind::FileTree),
            pretty: HashSet::new(),
        }
    }

    /// Builder: install a content filter.
    pub fn with_filter(mut self, filter: impl ContentFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// Builder: pretty-print files of one type.
    pub fn with_pretty(mut self, ty: ContentType, pretty: bool) -> Self {
        self.set_pretty(ty, pretty);
        self
    }

    pub fn set_pretty(&mut self, ty: ContentType, pretty: bool) {
        if pretty {
            self.pretty.insert(ty);
        } else {
            self.pretty.remove(&ty);
        }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// Directory holding every file of one type.
    pub fn type_dir(&self, ty: ContentType) -> NormalizedPath {
        self.root.join(ty.config_key())
    }

    /// File of the object with `key`.
    pub fn object_path(&self, ty: ContentType, key: &str) -> Result<NormalizedPath> {
        Ok(self.type_dir(ty).join(&key_to_relative_path(key, EXTENSION)?))
    }

    /// Directory holding the objects contained in the folder `key`.
    fn container_dir(&self, ty: ContentType, key: &str) -> Result<NormalizedPath> {
        if key == csync_model::handle::ROOT_KEY {
            return Ok(self.type_dir(ty));
        }
        let relative = key_to_relative_path(key, EXTENSION)?;
        let stem = relative
            .strip_suffix(&format!(".{EXTENSION}"))
            .unwrap_or(&relative);
        Ok(self.type_dir(ty).join(stem))
    }

    /// Resolve a handle to its key through the store when it carries only
    /// an id.
    fn key_of(&self, handle: &ContentHandle) -> Option<String> {
        handle
            .key()
            .map(str::to_string)
            .or_else(|| self.store.find(handle)?.handle().key().map(str::to_string))
    }
}

impl ContentSource for FileTreeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::FileTree
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
        Some(Box::new(FileTreeReadMethod {
            source: self,
            ty,
            template,
            params: Params::for_version(version),
        }))
    }

    fn write_method(
        &mut self,
        ty: ContentType,
        version: u64,
    ) -> Option<Box<dyn WriteMethod + '_>> {
        let template = self.templates.get(ty, version)?;
        let pretty = self.pretty.contains(&ty);
        Some(Box::new(FileTreeWriteMethod {
            source: self,
            ty,
            template,
            params: Params::for_version(version),
            pretty,
        }))
    }
}

struct FileTreeReadMethod<'a> {
    source: &'a mut FileTreeSource,
    ty: ContentType,
    template: Arc<BindingTemplate>,
    params: Params,
}

impl FileTreeReadMethod<'_> {
    fn scan(&self, dir: &NormalizedPath, recursive: bool) -> Result<Vec<NormalizedPath>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();
        for entry in WalkDir::new(dir.to_native())
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by(parent_first)
        {
            let entry = entry
                .map_err(|e| csync_fs::Error::io(dir.to_native(), std::io::Error::other(e)))?;
            let path = NormalizedPath::new(entry.path());
            if entry.file_type().is_file() && path.extension() == Some(EXTENSION) {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn load(&mut self, path: &NormalizedPath) -> Result<ContentObject> {
        let text = io::read_text(path)?;
        let mut object = self.parse(&text)?;
        if !object.handle().is_set() {
            let key = self.key_at(path)?;
            let handle = object.handle().assign_key(key);
            object.set_handle(handle)?;
            fill_parent(&mut object)?;
        }
        debug!(path = %path, object = %object.handle(), "Read file");
        self.source.store.insert(object.clone())?;
        Ok(object)
    }

    /// Key named by a file's place under the type directory.
    fn key_at(&self, path: &NormalizedPath) -> Result<String> {
        let type_dir = self.source.type_dir(self.ty);
        let relative = path
            .strip_prefix(&type_dir)
            .ok_or_else(|| csync_fs::Error::invalid_key(path.as_str(), "outside the type directory"))?;
        Ok(relative_path_to_key(relative, EXTENSION)?)
    }

    fn parse(&self, text: &str) -> Result<ContentObject> {
        let mut object = unmarshal_str(&self.template, text, &self.params)?;
        fill_parent(&mut object)?;
        Ok(object)
    }

    fn load_all(&mut self, files: Vec<NormalizedPath>) -> Result<ReadBatch> {
        let mut batch = ReadBatch::default();
        for path in &files {
            let name = self
                .key_at(path)
                .unwrap_or_else(|_| path.as_str().to_string());
            let result = self.load(path);
            batch.push(name, result)?;
        }
        Ok(batch)
    }
}

impl ReadMethod for FileTreeReadMethod<'_> {
    fn content_type(&self) -> ContentType {
        self.ty
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::FileTree
    }

    fn read_objects(&mut self, _read_fully: bool) -> Result<ReadBatch> {
        let hierarchical = self.ty.info().capabilities.hierarchical;
        let files = self.scan(&self.source.type_dir(self.ty), !hierarchical)?;
        self.load_all(files)
    }

    fn read_children(
        &mut self,
        parent: &ContentHandle,
        _read_fully: bool,
        recursive: bool,
    ) -> Result<ReadBatch> {
        let key = self
            .source
            .key_of(parent)
            .ok_or_else(|| Error::reference(parent))?;
        let dir = self.source.container_dir(self.ty, &key)?;
        let files = self.scan(&dir, recursive)?;
        self.load_all(files)
    }

    fn read_object(&mut self, handle: &ContentHandle) -> Result<Option<ContentObject>> {
        let Some(key) = self.source.key_of(handle) else {
            return Ok(None);
        };
        let path = self.source.object_path(self.ty, &key)?;
        if !path.is_file() {
            return Ok(None);
        }
        self.load(&path).map(Some)
    }

    fn read_from_text(&mut self, text: &str) -> Result<ContentObject> {
        let object = self.parse(text)?;
        if object.handle().is_set() {
            self.source.store.insert(object.clone())?;
        }
        Ok(object)
    }
}

struct FileTreeWriteMethod<'a> {
    source: &'a mut FileTreeSource,
    ty: ContentType,
    template: Arc<BindingTemplate>,
    params: Params,
    pretty: bool,
}

impl FileTreeWriteMethod<'_> {
    fn render(&self, object: &ContentObject) -> Result<Vec<u8>> {
        let mut sink = XmlSink::with_pretty(Vec::new(), self.pretty);
        sink.declaration()?;
        marshal(&self.template, object, &self.params, &mut sink)?;
        let mut bytes = sink.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn write_file(&mut self, object: &ContentObject) -> Result<()> {
        let key = object
            .handle()
            .key()
            .ok_or_else(|| Error::missing_key(object.handle()))?;
        let path = self.source.object_path(self.ty, key)?;
        let bytes = self.render(object)?;
        if io::write_if_changed(&path, &bytes)? {
            info!(path = %path, object = %object.handle(), "Wrote file");
        }
        self.source.store.insert(object.clone())?;
        Ok(())
    }

    fn remove_file(&mut self, object: &ContentObject) -> Result<()> {
        if let Some(key) = self.source.key_of(object.handle()) {
            let path = self.source.object_path(self.ty, &key)?;
            if io::remove_file(&path)? {
                info!(path = %path, object = %object.handle(), "Removed file");
            }
        }
        self.source.store.remove(object.handle());
        Ok(())
    }
}

impl WriteMethod for FileTreeWriteMethod<'_> {
    fn content_type(&self) -> ContentType {
        self.ty
    }

    fn check_access(&self, key: &str) -> bool {
        self.source.check_access(self.ty, key, is_subobject(self.ty))
    }

    fn insert_object(&mut self, new: &ContentObject) -> Result<ContentObject> {
        self.write_file(new)?;
        Ok(new.clone())
    }

    fn update_object(&mut self, old: &ContentObject, new: &ContentObject) -> Result<ContentObject> {
        let renamed = old.handle().key() != new.handle().key() && old.handle().key().is_some();
        if renamed {
            self.remove_file(old)?;
        }
        self.write_file(new)?;
        Ok(new.clone())
    }

    fn delete_object(&mut self, old: &ContentObject) -> Result<()> {
        self.remove_file(old)
    }
}

/// Hierarchical objects without an explicit folder live in the folder
/// named by their key.
fn fill_parent(object: &mut ContentObject) -> Result<()> {
    if object.parent().is_some() || !object.content_type().info().capabilities.hierarchical {
        return Ok(());
    }
    if let Some(parent_key) = object.handle().parent_key() {
        object.set_parent(Some(ContentHandle::with_key(ContentType::Folder, parent_key)))?;
    }
    Ok(())
}

/// Order siblings so `name.xml` comes before the directory `name/`; a
/// folder is then discovered before its contents.
fn parent_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

fn sort_key(entry: &DirEntry) -> (OsString, bool) {
    let is_dir = entry.file_type().is_dir();
    let stem = if is_dir {
        entry.file_name().to_os_string()
    } else {
        entry
            .path()
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| entry.file_name().to_os_string())
    };
    (stem, is_dir)
}
