//! Synchronization driver
//!
//! A run moves every requested type from one source to another, one type at
//! a time in priority order:
//!
//! 1. read the type from the source and fill projections from its store
//! 2. read what the destination already holds
//! 3. resolve each object into the destination's identity form and pair it
//!    with its destination counterpart
//! 4. hand the tuples to the destination's write method
//!
//! Configuration problems are detected before the first read. A type whose
//! service is unavailable is skipped; an object that fails is recorded and
//! the rest of its type carries on.

use crate::report::SyncReport;
use crate::resolver::ReferenceResolver;
use crate::settings::SyncSettings;
use crate::{Error, Result};
use csync_model::{ContentObject, ContentTuple, ContentType, TupleKind};
use csync_source::{ContentSource, ReadBatch};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Options for a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// If true, resolve and plan without writing anything.
    /// Actions are recorded as "[dry-run] Would ..."
    pub dry_run: bool,
    /// Delete destination objects that no longer exist at the source
    pub prune: bool,
}

/// Cooperative cancellation shared with whoever may stop a run.
///
/// Checked between types; an object in progress always completes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives synchronization between two content sources.
pub struct SyncDriver {
    settings: SyncSettings,
    options: SyncOptions,
    cancel: CancelFlag,
}

impl SyncDriver {
    /// Create a driver.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the settings do not validate.
    pub fn new(settings: SyncSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            options: SyncOptions::default(),
            cancel: CancelFlag::new(),
        })
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Move `requested` types (every enabled type when empty) from `source`
    /// to `dest`.
    ///
    /// # Errors
    ///
    /// Configuration errors before any I/O; read failures other than an
    /// unavailable service; failures flushing the destination.
    pub fn run(
        &self,
        requested: &[ContentType],
        source: &mut dyn ContentSource,
        dest: &mut dyn ContentSource,
    ) -> Result<SyncReport> {
        let types = self.settings.resolve_request(requested)?;
        self.check_methods(&types, source, dest)?;

        let version = self.settings.major();
        let mut resolver =
            ReferenceResolver::new(version).with_parent_creation(!self.options.dry_run);
        let mut report = SyncReport::new(self.options.dry_run);
        info!(
            from = %source.kind(),
            to = %dest.kind(),
            types = types.len(),
            dry_run = self.options.dry_run,
            "Starting sync"
        );

        for ty in types {
            if self.cancel.is_cancelled() {
                warn!(next = %ty, "Sync cancelled");
                report.cancelled = true;
                return Ok(report);
            }
            match self.sync_type(ty, &mut resolver, source, dest, &mut report) {
                Ok(()) => {}
                Err(e) if e.is_recoverable_for_type() => {
                    warn!(content_type = %ty, error = %e, "Skipping type");
                    report.skip_type(ty, e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        if !self.options.dry_run {
            dest.finish()?;
            if let Some(map) = dest.id_map().or(source.id_map()) {
                self.settings.save_id_map(map)?;
            }
        }
        info!(
            written = report.total_written(),
            failures = report.failures.len(),
            skipped = report.skipped.len(),
            "Sync finished"
        );
        Ok(report)
    }

    /// Every type needs a read method at the source and a write method at
    /// the destination.
    fn check_methods(
        &self,
        types: &[ContentType],
        source: &mut dyn ContentSource,
        dest: &mut dyn ContentSource,
    ) -> Result<()> {
        let version = self.settings.major();
        for ty in types {
            if source.read_method(*ty, version).is_none() {
                return Err(Error::configuration(format!(
                    "The {} source cannot read {}",
                    source.kind(),
                    ty.info().plural
                )));
            }
            if dest.write_method(*ty, version).is_none() {
                return Err(Error::configuration(format!(
                    "The {} source cannot write {}",
                    dest.kind(),
                    ty.info().plural
                )));
            }
        }
        Ok(())
    }

    fn sync_type(
        &self,
        ty: ContentType,
        resolver: &mut ReferenceResolver,
        source: &mut dyn ContentSource,
        dest: &mut dyn ContentSource,
        report: &mut SyncReport,
    ) -> Result<()> {
        let version = self.settings.major();
        info!(content_type = %ty, "Syncing type");

        let read = read_all(source, ty, version)?;
        let unreadable: Vec<String> = read.failures.iter().map(|f| f.object.clone()).collect();
        for failure in read.failures {
            let e = Error::named(ty, failure.object.clone(), failure.error);
            warn!(error = %e, "Cannot read object");
            report.fail(ty, failure.object, e.to_string());
        }
        let mut objects = read.objects;
        for object in &mut objects {
            resolver.on_load(object, source.store());
        }
        resolver.set_pending(objects.iter().map(ContentObject::handle));

        // An unreadable destination object is rewritten from the source.
        let existing = read_all(dest, ty, version)?;
        for failure in &existing.failures {
            warn!(
                content_type = %ty,
                object = %failure.object,
                error = %failure.error,
                "Destination object unreadable"
            );
        }
        let existing = existing.objects;
        debug!(content_type = %ty, read = objects.len(), existing = existing.len(), "Loaded");

        let mut tuples = Vec::new();
        let mut seen = Vec::new();
        for object in &objects {
            let resolved = match resolver.update_references(object, source, dest) {
                Ok(resolved) => resolved,
                Err(e) if e.is_recoverable_for_type() || e.is_configuration() => return Err(e),
                Err(e) => {
                    let e = Error::object(object, e);
                    warn!(error = %e, "Cannot resolve object");
                    report.fail(ty, object.log_name(), e.to_string());
                    continue;
                }
            };
            seen.push(resolved.handle().clone());
            match dest.store().find(resolved.handle()).cloned() {
                Some(old) if old == resolved => report.counts_mut(ty).unchanged += 1,
                Some(old) => tuples.push(ContentTuple::update(old, resolved)),
                None => tuples.push(ContentTuple::insert(resolved)),
            }
        }
        if self.options.prune {
            tuples.extend(
                existing
                    .into_iter()
                    .filter(|old| !seen.contains(old.handle()))
                    // Still present at the source, only unreadable.
                    .filter(|old| {
                        !old.handle()
                            .key()
                            .is_some_and(|k| unreadable.iter().any(|u| u == k))
                    })
                    .map(ContentTuple::delete),
            );
        }

        if self.options.dry_run {
            self.plan(ty, tuples, dest, report)?;
        } else {
            self.write(ty, tuples, dest, report)?;
        }
        let counts = report.counts(ty);
        info!(
            content_type = %ty,
            inserted = counts.inserted,
            updated = counts.updated,
            deleted = counts.deleted,
            unchanged = counts.unchanged,
            filtered = counts.filtered,
            "Type synced"
        );
        Ok(())
    }

    fn write(
        &self,
        ty: ContentType,
        tuples: Vec<ContentTuple>,
        dest: &mut dyn ContentSource,
        report: &mut SyncReport,
    ) -> Result<()> {
        if tuples.is_empty() {
            return Ok(());
        }
        let batch = {
            let mut method = dest
                .write_method(ty, self.settings.major())
                .ok_or_else(|| Error::configuration(format!("No write method for {ty}")))?;
            method.update_objects(tuples)?
        };

        let counts = report.counts_mut(ty);
        counts.filtered += batch.filtered.len();
        for written in &batch.written {
            counts.record(written.kind);
        }
        for failure in batch.failures {
            let e = Error::named(ty, failure.object.clone(), failure.error);
            report.fail(ty, failure.object, e.to_string());
        }

        // Objects referring to a new object by key now refer to it with its
        // assigned id as well.
        for written in batch.written.iter().filter(|w| w.kind == TupleKind::Insert) {
            let handle = written.object.handle();
            if handle.id().is_some() && handle.key().is_some() {
                dest.store_mut().rename_references(&handle.key_only(), handle);
            }
        }
        Ok(())
    }

    fn plan(
        &self,
        ty: ContentType,
        tuples: Vec<ContentTuple>,
        dest: &mut dyn ContentSource,
        report: &mut SyncReport,
    ) -> Result<()> {
        let method = dest
            .write_method(ty, self.settings.major())
            .ok_or_else(|| Error::configuration(format!("No write method for {ty}")))?;
        for tuple in tuples {
            let kind = tuple.kind()?;
            let Some(subject) = tuple.subject() else {
                continue;
            };
            if subject.handle().key().is_some_and(|key| !method.check_access(key)) {
                report.counts_mut(ty).filtered += 1;
                continue;
            }
            info!(content_type = %ty, object = %subject.log_name(), ?kind, "[dry-run] Would write");
            report.plan(ty, kind, &subject.log_name());
        }
        Ok(())
    }
}

/// Everything of one type a source holds; nothing for write-only sources.
fn read_all(source: &mut dyn ContentSource, ty: ContentType, version: u64) -> Result<ReadBatch> {
    match source.read_method(ty, version) {
        Some(mut method) => Ok(method.read_all()?),
        None => Ok(ReadBatch::default()),
    }
}
