//! Run configuration
//!
//! Settings are read through [`ConfigStore`], so the same structure can live
//! in `sync.toml`, `sync.json` or `sync.yaml`:
//!
//! ```toml
//! platform_version = "9.2.0"
//! pretty = ["templates"]
//! timeout_secs = 30
//! id_map = "ids.toml"
//!
//! [enabled]
//! folder-content = ["folders", "templates"]
//! notification-content = ["message-models"]
//! ```

use crate::{Error, Result};
use csync_fs::{ConfigStore, NormalizedPath};
use csync_model::{Category, ContentType, TypeRegistry};
use csync_source::{FileTreeSource, HttpTransportConfig, IdMap};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::debug;

fn default_version() -> Version {
    Version::new(9, 0, 0)
}

fn default_timeout() -> u64 {
    60
}

fn default_enabled() -> BTreeMap<String, Vec<String>> {
    Category::ALL
        .into_iter()
        .map(|category| {
            let keys = category
                .types()
                .into_iter()
                .map(|ty| ty.config_key().to_string())
                .collect();
            (category.config_key().to_string(), keys)
        })
        .collect()
}

fn category(key: &str) -> Result<Category> {
    Category::ALL
        .into_iter()
        .find(|c| c.config_key() == key)
        .ok_or_else(|| Error::configuration(format!("Unknown content category '{key}'")))
}

/// Settings consumed by the sync driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Platform version; the major component selects templates
    #[serde(default = "default_version")]
    pub platform_version: Version,

    /// Enabled type config keys per category config key
    #[serde(default = "default_enabled")]
    pub enabled: BTreeMap<String, Vec<String>>,

    /// Type config keys written pretty-printed to file trees
    #[serde(default)]
    pub pretty: BTreeSet<String>,

    /// Live transport timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Where the key→id table is persisted between runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_map: Option<PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            platform_version: default_version(),
            enabled: default_enabled(),
            pretty: BTreeSet::new(),
            timeout_secs: default_timeout(),
            id_map: None,
        }
    }
}

impl SyncSettings {
    /// Parse TOML settings and validate them.
    pub fn parse(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file, format chosen by extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// settings fail validation.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let settings: Self = ConfigStore::new().load(path)?;
        settings.validate()?;
        debug!(path = %path, version = %settings.platform_version, "Loaded sync settings");
        Ok(settings)
    }

    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        ConfigStore::new().save(path, self)?;
        Ok(())
    }

    /// Major platform version, the template discriminator.
    pub fn major(&self) -> u64 {
        self.platform_version.major
    }

    /// Check every configured key.
    ///
    /// Unknown keys, keys listed under the wrong category and types the
    /// platform version does not offer are rejected.
    pub fn validate(&self) -> Result<()> {
        self.enabled_types()?;
        for key in &self.pretty {
            key.parse::<ContentType>()?;
        }
        Ok(())
    }

    /// Enabled types in processing order.
    pub fn enabled_types(&self) -> Result<Vec<ContentType>> {
        let registry = TypeRegistry::with_builtins();
        let mut types = Vec::new();
        for (category_key, keys) in &self.enabled {
            let expected = category(category_key)?;
            for key in keys {
                let info = registry.by_config_key(key)?;
                if info.category != expected {
                    return Err(Error::configuration(format!(
                        "'{key}' belongs to {}, not {expected}",
                        info.category
                    )));
                }
                registry.check(info.content_type, self.major())?;
                types.push(info.content_type);
            }
        }
        Ok(registry.order(&types))
    }

    pub fn is_enabled(&self, ty: ContentType) -> bool {
        self.enabled
            .get(ty.category().config_key())
            .is_some_and(|keys| keys.iter().any(|k| k == ty.config_key()))
    }

    /// Types to sync for a request; an empty request means every enabled
    /// type.
    ///
    /// # Errors
    ///
    /// A configuration error when a requested type is disabled.
    pub fn resolve_request(&self, requested: &[ContentType]) -> Result<Vec<ContentType>> {
        if requested.is_empty() {
            return self.enabled_types();
        }
        if let Some(disabled) = requested.iter().find(|ty| !self.is_enabled(**ty)) {
            return Err(Error::configuration(format!(
                "{} is disabled in the settings",
                disabled.display_name()
            )));
        }
        let registry = TypeRegistry::with_builtins();
        for ty in requested {
            registry.check(*ty, self.major())?;
        }
        Ok(registry.order(requested))
    }

    pub fn is_pretty(&self, ty: ContentType) -> bool {
        self.pretty.contains(ty.config_key())
    }

    /// Apply the per-type pretty-print flags to a file tree.
    pub fn configure_file_tree(&self, source: &mut FileTreeSource) {
        for ty in ContentType::ALL {
            source.set_pretty(ty, self.is_pretty(ty));
        }
    }

    /// Transport settings for a live server at `url`.
    pub fn http_transport(&self, url: impl Into<String>) -> HttpTransportConfig {
        HttpTransportConfig {
            url: url.into(),
            timeout_secs: self.timeout_secs,
            ..HttpTransportConfig::default()
        }
    }

    /// Load the configured id map, or an empty one when none is configured.
    pub fn load_id_map(&self) -> Result<IdMap> {
        match &self.id_map {
            Some(path) => Ok(IdMap::load(&NormalizedPath::new(path))?),
            None => Ok(IdMap::new()),
        }
    }

    /// Persist `map` to the configured location, if any.
    pub fn save_id_map(&self, map: &IdMap) -> Result<()> {
        if let Some(path) = &self.id_map {
            map.save(&NormalizedPath::new(path))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn defaults_enable_every_type_in_priority_order() {
        let settings = SyncSettings::default();
        let types = settings.enabled_types().unwrap();
        assert_eq!(types.len(), ContentType::ALL.len());
        assert_eq!(types[0], ContentType::Folder);
        assert_eq!(types[1], ContentType::RuleGroup);
    }

    #[test]
    fn parse_minimal_toml() {
        let settings = SyncSettings::parse(
            r#"
platform_version = "8.1.0"
pretty = ["templates"]

[enabled]
folder-content = ["templates", "folders"]
"#,
        )
        .unwrap();

        assert_eq!(settings.major(), 8);
        assert!(settings.is_pretty(ContentType::Template));
        assert_eq!(
            settings.enabled_types().unwrap(),
            vec![ContentType::Folder, ContentType::Template]
        );
        assert_eq!(settings.timeout_secs, 60);
    }

    #[test]
    fn unknown_key_is_configuration_error() {
        let err = SyncSettings::parse(
            r#"
[enabled]
folder-content = ["widgets"]
"#,
        )
        .unwrap_err();
        assert!(err.is_configuration(), "{err}");
    }

    #[test]
    fn misplaced_key_is_configuration_error() {
        let err = SyncSettings::parse(
            r#"
[enabled]
folder-content = ["message-models"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn version_gate_is_enforced() {
        let err = SyncSettings::parse(
            r#"
platform_version = "7.0.0"

[enabled]
runtime-process-content = ["process-definitions"]
"#,
        )
        .unwrap_err();
        assert!(err.is_configuration(), "{err}");
    }

    #[test]
    fn requesting_disabled_type_fails() {
        let mut settings = SyncSettings::default();
        settings
            .enabled
            .insert("folder-content".to_string(), vec!["folders".to_string()]);

        let err = settings.resolve_request(&[ContentType::Template]).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(
            settings.resolve_request(&[ContentType::Folder]).unwrap(),
            vec![ContentType::Folder]
        );
    }

    #[test]
    fn http_transport_takes_timeout() {
        let settings = SyncSettings {
            timeout_secs: 5,
            ..SyncSettings::default()
        };
        let config = settings.http_transport("http://live:8080/api");
        assert_eq!(config.url, "http://live:8080/api");
        assert_eq!(config.timeout_secs, 5);
    }

    proptest! {
        #[test]
        fn requests_come_back_in_priority_order(
            requested in prop::sample::subsequence(ContentType::ALL.to_vec(), 1..=ContentType::ALL.len())
        ) {
            let resolved = SyncSettings::default().resolve_request(&requested).unwrap();
            prop_assert_eq!(resolved.len(), requested.len());
            prop_assert!(resolved
                .windows(2)
                .all(|w| w[0].info().priority <= w[1].info().priority));
        }
    }
}
