//! Filesystem abstraction for content sync
//!
//! Provides normalized path handling, key-to-path mapping for file-tree
//! content, all-or-nothing file writes, and format-agnostic configuration
//! loading.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use path::{NormalizedPath, key_to_relative_path, relative_path_to_key, validate_key_segment};
