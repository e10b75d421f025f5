//! Registry of content types available to a run

use crate::{Category, ContentType, Error, Result, TypeInfo};
use std::collections::BTreeMap;

/// Registry of content types and their capabilities.
///
/// Provides lookup by type and config key, filtering by category, and
/// priority-based ordering. A registry built for a platform version omits
/// types whose version gate is not met.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: BTreeMap<ContentType, &'static TypeInfo>,
}

impl TypeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }

    /// Create a registry pre-populated with all built-in types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for ty in ContentType::ALL {
            registry.register(ty.info());
        }
        registry
    }

    /// Create a registry of the built-in types available on a platform
    /// major version.
    pub fn for_version(version: u64) -> Self {
        let mut registry = Self::new();
        for ty in ContentType::ALL {
            let info = ty.info();
            if info.available_in(version) {
                registry.register(info);
            }
        }
        registry
    }

    pub fn register(&mut self, info: &'static TypeInfo) {
        self.types.insert(info.content_type, info);
    }

    pub fn get(&self, ty: ContentType) -> Option<&'static TypeInfo> {
        self.types.get(&ty).copied()
    }

    pub fn contains(&self, ty: ContentType) -> bool {
        self.types.contains_key(&ty)
    }

    /// Resolve a config key, failing for unknown or unregistered types.
    pub fn by_config_key(&self, key: &str) -> Result<&'static TypeInfo> {
        let ty: ContentType = key.parse()?;
        self.get(ty)
            .ok_or_else(|| Error::UnknownType(key.to_string()))
    }

    /// Check that a type is usable with the given platform version.
    pub fn check(&self, ty: ContentType, version: u64) -> Result<&'static TypeInfo> {
        let info = self
            .get(ty)
            .ok_or_else(|| Error::UnknownType(ty.config_key().to_string()))?;
        match info.min_version {
            Some(required) if version < required => Err(Error::VersionGate {
                type_name: info.singular.to_string(),
                required,
                configured: version,
            }),
            _ => Ok(info),
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered types in a category, ordered by priority.
    pub fn by_category(&self, category: Category) -> Vec<ContentType> {
        let mut types: Vec<_> = self
            .types
            .values()
            .filter(|info| info.category == category)
            .collect();
        types.sort_by_key(|info| info.priority);
        types.into_iter().map(|info| info.content_type).collect()
    }

    /// All registrations sorted by priority (lower = earlier).
    pub fn by_priority(&self) -> Vec<&'static TypeInfo> {
        let mut types: Vec<_> = self.types.values().copied().collect();
        types.sort_by_key(|info| info.priority);
        types
    }

    /// Order a requested set of types for processing.
    pub fn order(&self, requested: &[ContentType]) -> Vec<ContentType> {
        let mut types: Vec<_> = requested.to_vec();
        types.sort_by_key(|ty| ty.info().priority);
        types.dedup();
        types
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static TypeInfo> + '_ {
        self.types.values().copied()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::BUILTIN_COUNT;

    #[test]
    fn test_with_builtins() {
        let registry = TypeRegistry::with_builtins();
        assert_eq!(registry.len(), BUILTIN_COUNT);
        assert!(registry.contains(ContentType::Folder));
        assert!(registry.contains(ContentType::MessageModel));
    }

    #[test]
    fn test_for_version_drops_gated_types() {
        let registry = TypeRegistry::for_version(7);
        assert!(!registry.contains(ContentType::ProcessDefinition));
        assert!(registry.contains(ContentType::Template));
    }

    #[test]
    fn test_check_reports_version_gate() {
        let registry = TypeRegistry::with_builtins();
        let err = registry.check(ContentType::ProcessDefinition, 7).unwrap_err();
        assert!(matches!(err, Error::VersionGate { required: 8, .. }));
        assert!(registry.check(ContentType::ProcessDefinition, 9).is_ok());
    }

    #[test]
    fn test_by_config_key() {
        let registry = TypeRegistry::with_builtins();
        let info = registry.by_config_key("rule-groups").unwrap();
        assert_eq!(info.content_type, ContentType::RuleGroup);
        assert!(registry.by_config_key("gadgets").is_err());
    }

    #[test]
    fn test_order_puts_folders_before_templates() {
        let registry = TypeRegistry::with_builtins();
        let ordered = registry.order(&[
            ContentType::Rule,
            ContentType::Template,
            ContentType::Folder,
            ContentType::RuleGroup,
        ]);
        assert_eq!(
            ordered,
            vec![
                ContentType::Folder,
                ContentType::RuleGroup,
                ContentType::Template,
                ContentType::Rule
            ]
        );
    }
}
