//! Shared test utilities for the content-sync workspace.
//!
//! This crate provides file-tree fixtures for source and driver tests. It is
//! a dev-dependency only and never published.
//!
//! # Modules
//!
//! - [`tree`]: [`ContentTree`] builder laying out file-tree content

pub mod tree;

pub use tree::ContentTree;
