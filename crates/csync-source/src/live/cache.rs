//! Whole-collection cache for types the live server cannot fetch singly

use csync_model::{ContentHandle, ContentObject};

/// Eagerly populated cache owned by one live source.
///
/// The first lookup loads the entire collection; later lookups are served
/// from memory until [`ModelCache::clear`] is called. Entries never expire
/// on their own.
#[derive(Debug, Default)]
pub struct ModelCache {
    entries: Option<Vec<ContentObject>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.entries.is_some()
    }

    pub fn fill(&mut self, objects: Vec<ContentObject>) {
        self.entries = Some(objects);
    }

    pub fn objects(&self) -> &[ContentObject] {
        self.entries.as_deref().unwrap_or_default()
    }

    pub fn find(&self, handle: &ContentHandle) -> Option<&ContentObject> {
        self.objects().iter().find(|o| o.handle() == handle)
    }

    pub fn clear(&mut self) {
        self.entries = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csync_model::ContentType;

    #[test]
    fn find_after_fill_and_clear() {
        let mut cache = ModelCache::new();
        assert!(!cache.is_loaded());

        let handle = ContentHandle::with_id(ContentType::MessageModel, "5");
        cache.fill(vec![ContentObject::new(handle.clone())]);
        assert!(cache.find(&handle).is_some());

        cache.clear();
        assert!(!cache.is_loaded());
        assert!(cache.find(&handle).is_none());
    }
}
