//! End-to-end runs between sources

use csync_binding::{Element, parse_document};
use csync_core::{CancelFlag, SyncDriver, SyncOptions, SyncSettings};
use csync_model::ContentType;
use csync_source::{EXTENDED_VERSION, FileTreeSource, LiveSource, MemoryTransport, PackageSource};
use csync_test_utils::ContentTree;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use tempfile::TempDir;

const FOLDERS_AND_TEMPLATES: &[ContentType] = &[ContentType::Folder, ContentType::Template];

fn content_tree() -> ContentTree {
    ContentTree::new()
        .folder("/content/a", "A")
        .folder("/content/a/b", "B")
        .folder("/content/c", "C")
        .folder("/content", "Content")
        .template("/content/a/welcome", "Welcome", "Hello")
        .template("/content/a/b/deep", "Deep", "<p>Nested</p>")
        .template("/content/c/bye", "Bye", "Goodbye")
}

fn driver() -> SyncDriver {
    SyncDriver::new(SyncSettings::default()).unwrap()
}

fn children_keys(list: &Element) -> Vec<String> {
    list.elements()
        .filter_map(|e| e.attribute("key").map(str::to_string))
        .collect()
}

#[test]
fn test_file_tree_to_package() {
    let tree = content_tree();
    let out = TempDir::new().unwrap();
    let output = out.path().join("package.xml");
    let mut source = FileTreeSource::new(tree.root());
    let mut dest = PackageSource::new(EXTENDED_VERSION).with_output(&output);

    let report = driver()
        .run(FOLDERS_AND_TEMPLATES, &mut source, &mut dest)
        .unwrap();

    assert!(report.success, "{:?}", report.failures);
    assert_eq!(report.counts(ContentType::Folder).inserted, 4);
    assert_eq!(report.counts(ContentType::Template).inserted, 3);

    let text = std::fs::read_to_string(&output).unwrap();
    let document = parse_document(&text).unwrap();
    let sections: Vec<_> = document.children_named("folderContent").collect();
    assert_eq!(sections.len(), 1);
    let section = sections[0];
    assert_eq!(section.children_named("folders").count(), 1);
    assert_eq!(section.children_named("templates").count(), 1);

    let folders = section.child("folders").unwrap();
    assert_eq!(
        children_keys(folders),
        vec!["/content", "/content/a", "/content/a/b", "/content/c"]
    );

    let folder_ids: HashSet<_> = folders
        .elements()
        .filter_map(|f| f.attribute("id"))
        .collect();
    let templates = section.child("templates").unwrap();
    assert_eq!(templates.elements().count(), 3);
    for template in templates.elements() {
        let parent = template.attribute("parent").unwrap();
        assert!(folder_ids.contains(parent), "dangling parent {parent}");
    }
}

#[test]
fn test_nested_folder_points_at_its_parent_id() {
    let tree = content_tree();
    let mut source = FileTreeSource::new(tree.root());
    let mut dest = PackageSource::new(EXTENDED_VERSION);

    driver()
        .run(&[ContentType::Folder], &mut source, &mut dest)
        .unwrap();

    let folders = dest.objects(ContentType::Folder);
    let content = folders[0].handle().id().unwrap();
    let a = &folders[1];
    assert_eq!(a.handle().key(), Some("/content/a"));
    assert_eq!(a.parent().unwrap().id(), Some(content));
}

#[test]
fn test_missing_parent_folders_are_created() {
    let tree = ContentTree::new().template("/x/y/t", "T", "body");
    let out = ContentTree::new();
    let mut source = FileTreeSource::new(tree.root());
    let mut dest = FileTreeSource::new(out.root());

    let report = driver()
        .run(&[ContentType::Template], &mut source, &mut dest)
        .unwrap();

    assert!(report.success, "{:?}", report.failures);
    assert_eq!(
        out.files(""),
        vec!["folders/x.xml", "folders/x/y.xml", "templates/x/y/t.xml"]
    );
    out.assert_file_contains("folders/x/y.xml", "<name>y</name>");
}

#[test]
fn test_second_run_is_unchanged() {
    let tree = content_tree();
    let out = ContentTree::new();

    for _ in 0..2 {
        let mut source = FileTreeSource::new(tree.root());
        let mut dest = FileTreeSource::new(out.root());
        driver()
            .run(FOLDERS_AND_TEMPLATES, &mut source, &mut dest)
            .unwrap();
    }

    let mut source = FileTreeSource::new(tree.root());
    let mut dest = FileTreeSource::new(out.root());
    let report = driver()
        .run(FOLDERS_AND_TEMPLATES, &mut source, &mut dest)
        .unwrap();
    assert_eq!(report.total_written(), 0);
    assert_eq!(report.counts(ContentType::Template).unchanged, 3);
}

#[test]
fn test_prune_deletes_objects_gone_from_source() {
    let tree = ContentTree::new().template("/t1", "One", "1");
    let out = ContentTree::new()
        .template("/t1", "One", "1")
        .template("/stale", "Stale", "x");
    let mut source = FileTreeSource::new(tree.root());
    let mut dest = FileTreeSource::new(out.root());

    let report = driver()
        .with_options(SyncOptions {
            prune: true,
            ..SyncOptions::default()
        })
        .run(&[ContentType::Template], &mut source, &mut dest)
        .unwrap();

    assert_eq!(report.counts(ContentType::Template).deleted, 1);
    out.assert_file_not_exists("templates/stale.xml");
    out.assert_file_exists("templates/t1.xml");
}

#[test]
fn test_prune_keeps_objects_unreadable_at_source() {
    let tree = ContentTree::new()
        .template("/t1", "One", "1")
        .object("templates", "/broken", r#"<template key="/broken"><body>x</body></template>"#);
    let out = ContentTree::new()
        .template("/t1", "One", "1")
        .template("/broken", "Broken", "x");
    let mut source = FileTreeSource::new(tree.root());
    let mut dest = FileTreeSource::new(out.root());

    let report = driver()
        .with_options(SyncOptions {
            prune: true,
            ..SyncOptions::default()
        })
        .run(&[ContentType::Template], &mut source, &mut dest)
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.counts(ContentType::Template).deleted, 0);
    out.assert_file_exists("templates/broken.xml");
}

#[test]
fn test_file_tree_to_live_skips_unavailable_type() {
    let tree = content_tree();
    let server = MemoryTransport::new();
    server.set_unavailable(ContentType::Template, true);
    let mut source = FileTreeSource::new(tree.root());
    let mut dest = LiveSource::new(server.clone());

    let report = driver()
        .run(FOLDERS_AND_TEMPLATES, &mut source, &mut dest)
        .unwrap();

    assert_eq!(report.counts(ContentType::Folder).inserted, 4);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].content_type, "Template");
    assert!(report.success);

    let stored = server.objects(ContentType::Folder);
    let content_id = stored[0].attribute("id").unwrap();
    assert_eq!(stored[1].attribute("key"), Some("/content/a"));
    assert_eq!(stored[1].attribute("parent"), Some(content_id));
}

#[test]
fn test_live_to_file_tree() {
    let server = MemoryTransport::new();
    let folder_id = server.seed(
        ContentType::Folder,
        Element::new("folder")
            .with_attribute("key", "/a")
            .with_child(Element::new("name").with_text("A")),
    );
    server.seed(
        ContentType::Template,
        Element::new("template")
            .with_attribute("key", "/a/t")
            .with_attribute("parent", folder_id.as_str())
            .with_child(Element::new("name").with_text("T")),
    );
    let out = ContentTree::new();
    let mut source = LiveSource::new(server.clone());
    let mut dest = FileTreeSource::new(out.root());

    let report = driver()
        .run(FOLDERS_AND_TEMPLATES, &mut source, &mut dest)
        .unwrap();

    assert!(report.success, "{:?}", report.failures);
    out.assert_file_contains("templates/a/t.xml", r#"folder="/a""#);
    out.assert_file_exists("folders/a.xml");
}

#[test]
fn test_live_parent_fetched_when_folders_not_synced() {
    let server = MemoryTransport::new();
    let folder_id = server.seed(
        ContentType::Folder,
        Element::new("folder")
            .with_attribute("key", "/only")
            .with_child(Element::new("name").with_text("Only")),
    );
    server.seed(
        ContentType::Template,
        Element::new("template")
            .with_attribute("key", "/only/t")
            .with_attribute("parent", folder_id.as_str())
            .with_child(Element::new("name").with_text("T")),
    );
    let out = ContentTree::new();
    let mut source = LiveSource::new(server.clone());
    let mut dest = FileTreeSource::new(out.root());

    let report = driver()
        .run(&[ContentType::Template], &mut source, &mut dest)
        .unwrap();

    assert!(report.success, "{:?}", report.failures);
    assert!(server.calls().contains(&"get:folders".to_string()));
    out.assert_file_contains("templates/only/t.xml", r#"folder="/only""#);
    out.assert_file_contains("folders/only.xml", "<name>Only</name>");
}

#[test]
fn test_unresolved_reference_fails_only_that_object() {
    let tree = ContentTree::new()
        .object(
            "rules",
            "/r1",
            r#"<rule key="/r1"><name>Broken</name><group>/missing</group></rule>"#,
        )
        .object("rules", "/r2", r#"<rule key="/r2"><name>Fine</name></rule>"#);
    let out = ContentTree::new();
    let mut source = FileTreeSource::new(tree.root());
    let mut dest = FileTreeSource::new(out.root());

    let report = driver()
        .run(&[ContentType::Rule], &mut source, &mut dest)
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].content_type, "Rule");
    assert_eq!(report.failures[0].object, "/r1");
    assert!(report.failures[0].message.contains("/missing"));
    out.assert_file_exists("rules/r2.xml");
    out.assert_file_not_exists("rules/r1.xml");
}

#[test]
fn test_unbindable_file_fails_alone_and_run_continues() {
    let tree = ContentTree::new()
        .folder("/f", "F")
        .template("/f/good", "Good", "Hello")
        .object("templates", "/f/bad", r#"<template key="/f/bad"><body>x</body></template>"#);
    let out = TempDir::new().unwrap();
    let output = out.path().join("package.xml");
    let mut source = FileTreeSource::new(tree.root());
    let mut dest = PackageSource::new(EXTENDED_VERSION).with_output(&output);

    let report = driver()
        .run(FOLDERS_AND_TEMPLATES, &mut source, &mut dest)
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].content_type, "Template");
    assert_eq!(report.failures[0].object, "/f/bad");
    assert!(
        report.failures[0].message.contains("Template '/f/bad'"),
        "{}",
        report.failures[0].message
    );
    assert_eq!(report.counts(ContentType::Folder).inserted, 1);
    assert_eq!(report.counts(ContentType::Template).inserted, 1);

    let text = std::fs::read_to_string(&output).unwrap();
    let document = parse_document(&text).unwrap();
    let templates = document
        .child("folderContent")
        .and_then(|section| section.child("templates"))
        .unwrap();
    assert_eq!(children_keys(templates), vec!["/f/good"]);
}

#[test]
fn test_dry_run_writes_nothing() {
    let tree = content_tree();
    let out = ContentTree::new();
    let mut source = FileTreeSource::new(tree.root());
    let mut dest = FileTreeSource::new(out.root());

    let report = driver()
        .with_options(SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        })
        .run(FOLDERS_AND_TEMPLATES, &mut source, &mut dest)
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.actions.len(), 7);
    assert!(report.actions[0].starts_with("[dry-run] Would insert Folder"));
    assert!(out.files("").is_empty());
}

#[test]
fn test_cancelled_run_stops_at_type_boundary() {
    let tree = content_tree();
    let out = ContentTree::new();
    let mut source = FileTreeSource::new(tree.root());
    let mut dest = FileTreeSource::new(out.root());
    let cancel = CancelFlag::new();
    cancel.cancel();

    let report = driver()
        .with_cancel_flag(cancel)
        .run(FOLDERS_AND_TEMPLATES, &mut source, &mut dest)
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.total_written(), 0);
    assert!(out.files("").is_empty());
}

#[test]
fn test_configuration_errors_come_before_io() {
    let tree = content_tree();
    let out = ContentTree::new();
    let mut settings = SyncSettings::default();
    settings
        .enabled
        .insert("folder-content".to_string(), vec!["folders".to_string()]);
    let driver = SyncDriver::new(settings).unwrap();

    let mut source = FileTreeSource::new(tree.root());
    let mut dest = FileTreeSource::new(out.root());
    let err = driver
        .run(FOLDERS_AND_TEMPLATES, &mut source, &mut dest)
        .unwrap_err();
    assert!(err.is_configuration(), "{err}");

    let mut package = PackageSource::new(EXTENDED_VERSION);
    let err = driver
        .run(&[ContentType::Folder], &mut package, &mut dest)
        .unwrap_err();
    assert!(err.is_configuration(), "{err}");
    assert!(out.files("").is_empty());
}

#[test]
fn test_package_ids_are_stable_across_runs() {
    let tree = content_tree();
    let state = TempDir::new().unwrap();
    let settings = SyncSettings {
        id_map: Some(state.path().join("ids.toml")),
        ..SyncSettings::default()
    };
    let driver = SyncDriver::new(settings.clone()).unwrap();

    let mut ids = Vec::new();
    for _ in 0..2 {
        let mut source = FileTreeSource::new(tree.root());
        let mut dest =
            PackageSource::new(EXTENDED_VERSION).with_id_map(settings.load_id_map().unwrap());
        driver
            .run(&[ContentType::Folder], &mut source, &mut dest)
            .unwrap();
        let run: Vec<String> = dest
            .objects(ContentType::Folder)
            .iter()
            .filter_map(|f| f.handle().id().map(str::to_string))
            .collect();
        ids.push(run);
    }

    assert_eq!(ids[0].len(), 4);
    assert_eq!(ids[0], ids[1]);
}
