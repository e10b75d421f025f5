//! Package source: id allocation and document layout

use csync_binding::parse_document;
use csync_model::{ContentHandle, ContentObject, ContentTuple, ContentType, TupleKind};
use csync_source::{
    ContentSource, EXTENDED_VERSION, Error, IdMap, PACKAGE_NAMESPACE, PackageSource,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn folder(key: &str) -> ContentObject {
    let handle = ContentHandle::with_key(ContentType::Folder, key);
    let parent = handle.parent_key().map(|k| ContentHandle::with_key(ContentType::Folder, k));
    let mut object = ContentObject::new(handle);
    object.set_name(key);
    object.set_parent(parent).unwrap();
    object
}

fn template(key: &str) -> ContentObject {
    let handle = ContentHandle::with_key(ContentType::Template, key);
    let parent = handle.parent_key().map(|k| ContentHandle::with_key(ContentType::Folder, k));
    let mut object = ContentObject::new(handle);
    object.set_name(key);
    object.set_parent(parent).unwrap();
    object
}

fn insert(source: &mut PackageSource, objects: Vec<ContentObject>) {
    let ty = objects[0].content_type();
    let mut method = source.write_method(ty, EXTENDED_VERSION).unwrap();
    let batch = method
        .update_objects(objects.into_iter().map(ContentTuple::insert).collect())
        .unwrap();
    assert!(batch.failures.is_empty(), "{:?}", batch.failures);
}

#[test]
fn test_package_has_no_read_path() {
    let mut source = PackageSource::new(EXTENDED_VERSION);
    assert!(source.read_method(ContentType::Folder, EXTENDED_VERSION).is_none());
    assert!(source.unmarshaller(ContentType::Folder, EXTENDED_VERSION).is_none());
    assert!(source.marshaller(ContentType::Folder, EXTENDED_VERSION).is_some());
}

#[test]
fn test_ids_come_from_the_id_map() {
    let mut ids = IdMap::new();
    ids.insert(ContentType::Folder.category(), "/a", "f-1");
    let mut source = PackageSource::new(EXTENDED_VERSION).with_id_map(ids);

    insert(&mut source, vec![folder("/a")]);
    insert(&mut source, vec![template("/a/t")]);

    let stored = &source.objects(ContentType::Template)[0];
    assert_eq!(stored.parent().unwrap().id(), Some("f-1"));
    assert!(stored.handle().id().is_some());
    let map = source.id_map().unwrap();
    assert_eq!(
        map.get(ContentType::Template.category(), "/a/t"),
        stored.handle().id()
    );
}

#[test]
fn test_document_groups_types_by_category() {
    let mut source = PackageSource::new(EXTENDED_VERSION);
    insert(&mut source, vec![template("/a/t")]);
    insert(&mut source, vec![folder("/a"), folder("/b")]);

    let text = String::from_utf8(source.render().unwrap()).unwrap();
    let document = parse_document(&text).unwrap();

    assert_eq!(document.local_name(), "package");
    assert!(text.contains(&format!(r#"xmlns="{PACKAGE_NAMESPACE}""#)));
    assert_eq!(document.attribute("platformVersion"), Some("9"));
    let sections: Vec<_> = document.elements().map(|e| e.local_name().to_string()).collect();
    assert_eq!(sections, vec!["folderContent"]);

    let content = document.child("folderContent").unwrap();
    let lists: Vec<_> = content.elements().map(|e| e.local_name().to_string()).collect();
    assert_eq!(lists, vec!["folders", "templates"]);

    let keys: Vec<_> = content
        .descend("folders")
        .unwrap()
        .elements()
        .filter_map(|e| e.attribute("key"))
        .collect();
    assert_eq!(keys, vec!["/a", "/b"]);
}

#[test]
fn test_reinsert_replaces_in_place() {
    let mut source = PackageSource::new(EXTENDED_VERSION);
    insert(&mut source, vec![folder("/a"), folder("/b")]);

    let mut renamed = folder("/a");
    renamed.set_field("description", "changed");
    insert(&mut source, vec![renamed]);

    let folders = source.objects(ContentType::Folder);
    assert_eq!(folders.len(), 2);
    assert_eq!(folders[0].text("description"), Some("changed"));
}

#[test]
fn test_delete_drops_object() {
    let mut source = PackageSource::new(EXTENDED_VERSION);
    insert(&mut source, vec![folder("/a"), folder("/b")]);

    let mut method = source.write_method(ContentType::Folder, EXTENDED_VERSION).unwrap();
    let batch = method
        .update_objects(vec![ContentTuple::delete(folder("/a"))])
        .unwrap();
    drop(method);

    assert_eq!(batch.count(TupleKind::Delete), 1);
    assert_eq!(source.objects(ContentType::Folder).len(), 1);
}

#[test]
fn test_object_without_key_fails() {
    let mut source = PackageSource::new(EXTENDED_VERSION);
    let mut method = source.write_method(ContentType::Folder, EXTENDED_VERSION).unwrap();

    let keyless = ContentObject::new(ContentHandle::with_id(ContentType::Folder, "7"));
    let err = method.insert_object(&keyless).unwrap_err();
    assert!(matches!(err, Error::MissingKey { .. }));
}

#[test]
fn test_finish_writes_output_file() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out").join("package.xml");
    let mut source = PackageSource::new(EXTENDED_VERSION).with_output(&output);
    insert(&mut source, vec![folder("/a")]);

    source.finish().unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("<?xml"));
    assert!(text.contains("<folders>"));
}

#[test]
fn test_version_gated_type_has_no_write_method_below_minimum() {
    let mut source = PackageSource::new(7);
    assert!(source.write_method(ContentType::ProcessDefinition, 7).is_none());
}
