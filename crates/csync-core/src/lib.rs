//! Synchronization layer for content sync
//!
//! This crate sits above the sources and drives a run:
//!
//! - **SyncSettings**: enabled types, platform version, pretty-print flags,
//!   transport timeout and id-map location, loaded from TOML, JSON or YAML
//! - **ReferenceResolver**: rewrites parent and reference handles into the
//!   destination's identity form, creating missing file-tree folders
//! - **SyncDriver**: reads, resolves and writes each type in priority order,
//!   with dry-run and cooperative cancellation
//! - **SyncReport**: per-type counts, skipped types and object failures
//!
//! ```text
//!                  csync-core
//!                      |
//!                 csync-source
//!                 /          \
//!        csync-binding    csync-fs
//!                |
//!           csync-model
//! ```

pub mod driver;
pub mod error;
pub mod logging;
pub mod report;
pub mod resolver;
pub mod settings;

pub use driver::{CancelFlag, SyncDriver, SyncOptions};
pub use error::{Error, Result};
pub use report::{ObjectFailure, SkippedType, SyncReport, TypeCounts};
pub use resolver::ReferenceResolver;
pub use settings::SyncSettings;
