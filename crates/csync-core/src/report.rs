//! Outcome of a sync run

use csync_model::{ContentType, TupleKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-type action counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Identical at the destination already
    pub unchanged: usize,
    /// Rejected by the destination's content filter
    pub filtered: usize,
}

impl TypeCounts {
    pub fn record(&mut self, kind: TupleKind) {
        match kind {
            TupleKind::Insert => self.inserted += 1,
            TupleKind::Update => self.updated += 1,
            TupleKind::Delete => self.deleted += 1,
        }
    }

    pub fn written(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// A type left out of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedType {
    pub content_type: String,
    pub reason: String,
}

/// One object that could not be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFailure {
    /// Display name of the type
    pub content_type: String,
    /// Key or id of the object
    pub object: String,
    pub message: String,
}

/// Report from a sync run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// No object failed
    pub success: bool,
    pub dry_run: bool,
    /// The run stopped at a type boundary on request
    pub cancelled: bool,
    /// Counts keyed by type config key
    pub counts: BTreeMap<String, TypeCounts>,
    pub skipped: Vec<SkippedType>,
    pub failures: Vec<ObjectFailure>,
    /// Planned actions of a dry run
    pub actions: Vec<String>,
}

impl Default for SyncReport {
    fn default() -> Self {
        Self::new(false)
    }
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            success: true,
            dry_run,
            cancelled: false,
            counts: BTreeMap::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Counts for one type (zero when the type was not processed).
    pub fn counts(&self, ty: ContentType) -> TypeCounts {
        self.counts.get(ty.config_key()).copied().unwrap_or_default()
    }

    pub fn counts_mut(&mut self, ty: ContentType) -> &mut TypeCounts {
        self.counts.entry(ty.config_key().to_string()).or_default()
    }

    pub fn skip_type(&mut self, ty: ContentType, reason: impl Into<String>) {
        self.skipped.push(SkippedType {
            content_type: ty.display_name().to_string(),
            reason: reason.into(),
        });
    }

    pub fn fail(&mut self, ty: ContentType, object: impl Into<String>, message: impl Into<String>) {
        self.success = false;
        self.failures.push(ObjectFailure {
            content_type: ty.display_name().to_string(),
            object: object.into(),
            message: message.into(),
        });
    }

    pub fn plan(&mut self, ty: ContentType, kind: TupleKind, object: &str) {
        let verb = match kind {
            TupleKind::Insert => "insert",
            TupleKind::Update => "update",
            TupleKind::Delete => "delete",
        };
        self.actions
            .push(format!("[dry-run] Would {verb} {} '{object}'", ty.display_name()));
    }

    /// Objects written across all types.
    pub fn total_written(&self) -> usize {
        self.counts.values().map(TypeCounts::written).sum()
    }
}
