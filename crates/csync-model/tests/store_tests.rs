//! Tests for ContentStore identity and reference handling

use csync_model::{ContentHandle, ContentObject, ContentStore, ContentType};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn object(ty: ContentType, key: &str, id: Option<&str>) -> ContentObject {
    ContentObject::new(ContentHandle::new(ty, Some(key.into()), id.map(String::from)))
}

#[test]
fn test_find_by_key_id_or_both() {
    let mut store = ContentStore::new();
    let mut obj = object(ContentType::Rule, "/rules/a", Some("17"));
    obj.set_field("enabled", true);
    store.insert(obj.clone()).unwrap();

    let by_key = ContentHandle::with_key(ContentType::Rule, "/rules/a");
    let by_id = ContentHandle::with_id(ContentType::Rule, "17");
    let by_both = obj.handle().clone();

    assert_eq!(store.find(&by_key), Some(&obj));
    assert_eq!(store.find(&by_id), Some(&obj));
    assert_eq!(store.find(&by_both), Some(&obj));
}

#[test]
fn test_same_key_different_type_is_distinct() {
    let mut store = ContentStore::new();
    store.insert(object(ContentType::Folder, "/a", None)).unwrap();
    store.insert(object(ContentType::Template, "/a", None)).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.of_type(ContentType::Folder).count(), 1);
}

#[test]
fn test_remove_then_find_is_absent() {
    let mut store = ContentStore::new();
    store.insert(object(ContentType::Schedule, "/s", Some("3"))).unwrap();

    let removed = store
        .remove(&ContentHandle::with_id(ContentType::Schedule, "3"))
        .unwrap();
    assert_eq!(removed.handle().key(), Some("/s"));
    assert!(store.find(&ContentHandle::with_key(ContentType::Schedule, "/s")).is_none());
    assert!(store.is_empty());
}

#[test]
fn test_rename_references_key_to_id() {
    let mut store = ContentStore::new();
    let group_key = ContentHandle::with_key(ContentType::RuleGroup, "/groups/g");
    let group_id = ContentHandle::with_id(ContentType::RuleGroup, "g-100");

    store.insert(object(ContentType::RuleGroup, "/groups/g", None)).unwrap();
    let mut rule = object(ContentType::Rule, "/rules/r", None);
    rule.add_reference(group_key.clone()).unwrap();
    store.insert(rule).unwrap();

    let renamed = store.rename_references(&group_key, &group_id);
    assert_eq!(renamed, 1);

    let rule = store
        .find(&ContentHandle::with_key(ContentType::Rule, "/rules/r"))
        .unwrap();
    let refs = rule.references();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].id(), Some("g-100"));
    assert_eq!(refs[0].key(), None);
    assert!(!refs.iter().any(|r| r.key() == Some("/groups/g")));
}

#[test]
fn test_children_of() {
    let mut store = ContentStore::new();
    let folder = ContentHandle::with_key(ContentType::Folder, "/f");
    store.insert(ContentObject::new(folder.clone())).unwrap();

    for key in ["/f/t1", "/f/t2"] {
        let mut t = object(ContentType::Template, key, None);
        t.set_parent(Some(folder.clone())).unwrap();
        store.insert(t).unwrap();
    }
    store.insert(object(ContentType::Template, "/other", None)).unwrap();

    let children: Vec<_> = store
        .children_of(&folder)
        .map(|o| o.handle().key().unwrap().to_string())
        .collect();
    assert_eq!(children, vec!["/f/t1", "/f/t2"]);
}

#[test]
fn test_clear_empties_indexes() {
    let mut store = ContentStore::new();
    store.insert(object(ContentType::Folder, "/a", Some("1"))).unwrap();
    store.clear();
    assert!(store.find(&ContentHandle::with_id(ContentType::Folder, "1")).is_none());
    assert!(store.is_empty());
}

proptest! {
    #[test]
    fn identity_is_stable(
        entries in prop::collection::btree_map("[a-z]{1,8}", "[0-9]{1,6}", 1..20)
    ) {
        let mut store = ContentStore::new();
        let ids: std::collections::BTreeSet<_> = entries.values().cloned().collect();
        prop_assume!(ids.len() == entries.len());

        for (key, id) in &entries {
            store.insert(object(ContentType::Template, &format!("/{}", key), Some(id))).unwrap();
        }
        prop_assert_eq!(store.len(), entries.len());

        for (key, id) in &entries {
            let key = format!("/{}", key);
            let by_key = store.find(&ContentHandle::with_key(ContentType::Template, key.clone())).unwrap();
            let by_id = store.find(&ContentHandle::with_id(ContentType::Template, id.clone())).unwrap();
            prop_assert_eq!(by_key, by_id);
            prop_assert_eq!(by_key.handle().key(), Some(key.as_str()));
        }
    }
}
