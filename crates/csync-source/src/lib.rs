//! Content sources for content sync
//!
//! A [`ContentSource`] is one of three representations of the same content:
//!
//! - [`LiveSource`]: the remote server, reached through a [`Transport`]
//! - [`PackageSource`]: a write-only deployment document
//! - [`FileTreeSource`]: one XML file per object under a root directory
//!
//! Each source owns a [`ContentStore`](csync_model::ContentStore), a
//! [`ContentFilter`] and a [`TemplateLibrary`], and hands out per-type
//! [`ReadMethod`]s and [`WriteMethod`]s.

pub mod error;
pub mod file_tree;
pub mod filter;
pub mod id_map;
pub mod live;
pub mod method;
pub mod package;
pub mod source;
pub mod templates;
pub mod transport;

pub use error::{Error, Result};
pub use file_tree::FileTreeSource;
pub use filter::{AllowAll, ContentFilter, FilterEntry, SimpleContentFilter};
pub use id_map::IdMap;
pub use live::{LiveSource, ModelCache};
pub use method::{
    ReadBatch, ReadFailure, ReadMethod, WriteBatch, WriteFailure, WriteMethod, Written,
};
pub use package::{PACKAGE_NAMESPACE, PackageSource};
pub use source::{ContentSource, is_subobject};
pub use templates::{EXTENDED_VERSION, TemplateLibrary, builtin_template};
pub use transport::{FaultKind, HttpTransport, HttpTransportConfig, MemoryTransport, Transport};
