//! [`ContentTree`] builder for file-tree test scenarios.

use csync_fs::key_to_relative_path;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary file-tree root with helpers to lay out content files and
/// assert on what a sync wrote.
///
/// # Example
///
/// ```rust,no_run
/// use csync_test_utils::ContentTree;
///
/// let tree = ContentTree::new()
///     .folder("/reports", "Reports")
///     .template("/reports/welcome", "Welcome", "Hello");
/// tree.assert_file_exists("templates/reports/welcome.xml");
/// ```
pub struct ContentTree {
    temp_dir: TempDir,
}

impl Default for ContentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentTree {
    /// Create an empty temporary root.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Root directory of the tree.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `relative` under the root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write(self, relative: &str, content: &str) -> Self {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        self
    }

    /// Write an object file for `key` under the type directory `type_dir`
    /// (the type's config key, e.g. `"folders"`).
    pub fn object(self, type_dir: &str, key: &str, xml: &str) -> Self {
        let relative = key_to_relative_path(key, "xml").unwrap();
        self.write(&format!("{type_dir}/{relative}"), xml)
    }

    /// Add a folder file.
    pub fn folder(self, key: &str, name: &str) -> Self {
        let xml = format!(r#"<folder key="{key}"><name>{name}</name></folder>"#);
        self.object("folders", key, &xml)
    }

    /// Add a template file living in the folder its key names.
    pub fn template(self, key: &str, name: &str, body: &str) -> Self {
        let xml = format!(
            r#"<template key="{key}"><name>{name}</name><body>{body}</body></template>"#
        );
        self.object("templates", key, &xml)
    }

    /// Contents of `relative`.
    ///
    /// # Panics
    /// Panics if the file cannot be read.
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative))
            .unwrap_or_else(|e| panic!("Failed to read {relative}: {e}"))
    }

    /// Relative paths of every file under `dir`, sorted.
    pub fn files(&self, dir: &str) -> Vec<String> {
        let mut files = Vec::new();
        collect_files(self.root(), &self.path(dir), &mut files);
        files.sort();
        files
    }

    /// Assert that `relative` exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, relative: &str) {
        let full_path = self.path(relative);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `relative` does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, relative: &str) {
        let full_path = self.path(relative);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `relative` contains `needle`.
    pub fn assert_file_contains(&self, relative: &str, needle: &str) {
        let content = self.read(relative);
        assert!(
            content.contains(needle),
            "Expected {relative} to contain {needle:?}, got:\n{content}"
        );
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out);
        } else if let Ok(relative) = path.strip_prefix(root) {
            out.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
}
