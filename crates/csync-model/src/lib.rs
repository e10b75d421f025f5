//! Content model for content sync
//!
//! This crate holds the representation-independent core types:
//!
//! - **ContentType / TypeInfo**: the kinds of synchronizable objects and their
//!   capability table (hierarchy, containment, references, version gates)
//! - **ContentHandle**: identity of one object by key and/or id
//! - **ContentObject**: the generic payload for one handle
//! - **ContentTuple**: old/new pairing expressing insert, update, and delete
//! - **ContentStore**: per-source index over both identity projections

pub mod builtins;
pub mod content_type;
pub mod error;
pub mod handle;
pub mod object;
pub mod registry;
pub mod source_kind;
pub mod store;
pub mod tuple;
pub mod value;

pub use content_type::{Capabilities, Category, ContentType, TypeInfo};
pub use error::{Error, Result};
pub use handle::ContentHandle;
pub use object::ContentObject;
pub use registry::TypeRegistry;
pub use source_kind::SourceKind;
pub use store::ContentStore;
pub use tuple::{ContentTuple, TupleKind};
pub use value::{FieldValue, Fields};
