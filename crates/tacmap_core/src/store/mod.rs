//! Marker store: the single owner of persisted marker records.
//!
//! # Responsibility
//! - Expose marker CRUD with semantic errors and change notifications.
//! - Bring lagging stores up to the required schema by rewriting them into a
//!   new location and swapping the result in.
//! - Own the one edit transaction used by interactive gestures.
//!
//! # Invariants
//! - Every read and write goes through a migrated connection.
//! - A failed migration leaves the previous store active and intact.
//! - A store whose file cannot be reopened after a swap is detached and
//!   rejects every operation until [`MarkerStore::reopen`] succeeds.
//! - New markers get the adaptive size for the view they are placed in.
//! - At most one edit transaction is open at any time.
//! - Listeners observe changes in the order they were applied.

mod error;

pub use error::{StoreError, StoreResult};

use crate::db::migrations::{plan_migration, rewrite_in_place, rewrite_into, MigrationPlan};
use crate::config::SizingConfig;
use crate::db::schema::{current_attributes, set_user_version, AttributeSpec};
use crate::db::{open_connection, open_connection_in_memory, DbError, DbResult};
use crate::geometry::sizing::adaptive_size;
use crate::geometry::MapPoint;
use crate::model::marker::{Marker, MarkerId, MarkerPatch, NewMarker, SymbolRef};
use crate::repo::marker_repo::{MarkerRepository, SqliteMarkerRepository};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

const STORE_FILE_SUFFIX: &str = "_markers.db";
const DEFAULT_STORE_FILE: &str = "default_markers.db";
const MIGRATING_SUFFIX: &str = ".migrating";

/// Snapshot sequence returned by [`MarkerStore::list`].
pub type MarkerIter = std::vec::IntoIter<Marker>;

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

/// Outcome of one [`MarkerStore::migrate_schema`] call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationReport {
    /// Attributes added, in declaration order.
    pub added: Vec<&'static str>,
    /// Rows carried into the rewritten store.
    pub carried: usize,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
    }
}

/// Change applied to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    Created(Marker),
    Updated(Marker),
    Deleted(MarkerId),
    Migrated(MigrationReport),
}

/// Receiver of store changes (renderer refresh, dependent panels).
pub trait StoreListener {
    fn on_change(&self, change: &StoreChange);
}

/// Persistent marker collection backed by SQLite.
pub struct MarkerStore {
    conn: Connection,
    location: StoreLocation,
    listeners: Vec<Box<dyn StoreListener>>,
    sizing: SizingConfig,
    detached: Option<String>,
}

/// Opens (or creates) a file-backed store and migrates it to the current
/// schema.
pub fn open_store(path: impl AsRef<Path>) -> StoreResult<MarkerStore> {
    let path = path.as_ref().to_path_buf();
    let conn = open_connection(&path).map_err(StoreError::from_open)?;
    MarkerStore::attach(conn, StoreLocation::File(path))
}

/// Opens an empty in-memory store at the current schema.
pub fn open_store_in_memory() -> StoreResult<MarkerStore> {
    let conn = open_connection_in_memory().map_err(StoreError::from_open)?;
    MarkerStore::attach(conn, StoreLocation::Memory)
}

/// Default store file for a project: `<dir>/<stem>_markers.db` next to the
/// project file, or `default_markers.db` in `fallback_dir` for unsaved
/// projects.
pub fn store_path_for_project(project_file: Option<&Path>, fallback_dir: &Path) -> PathBuf {
    let stem = project_file.and_then(|file| file.file_stem().map(|stem| (file, stem)));
    match stem {
        Some((file, stem)) => {
            let mut name = stem.to_os_string();
            name.push(STORE_FILE_SUFFIX);
            file.with_file_name(name)
        }
        None => fallback_dir.join(DEFAULT_STORE_FILE),
    }
}

/// Fills inline content from the library path when it is missing.
///
/// # Errors
/// - `ResourceUnavailable` when neither part is usable or the file cannot be
///   read.
pub fn resolve_symbol(symbol: SymbolRef) -> StoreResult<SymbolRef> {
    if symbol.inline_content().is_some() {
        return Ok(symbol);
    }
    let Some(path) = symbol.library_path() else {
        return Err(StoreError::ResourceUnavailable {
            reference: symbol.path.clone().unwrap_or_default(),
            reason: "symbol reference has neither path nor content".to_string(),
        });
    };
    let content = fs::read_to_string(path).map_err(|err| StoreError::ResourceUnavailable {
        reference: path.to_string(),
        reason: err.to_string(),
    })?;
    if content.trim().is_empty() {
        return Err(StoreError::ResourceUnavailable {
            reference: path.to_string(),
            reason: "symbol file is empty".to_string(),
        });
    }
    Ok(SymbolRef {
        path: Some(path.to_string()),
        content: Some(content),
    })
}

impl MarkerStore {
    fn attach(conn: Connection, location: StoreLocation) -> StoreResult<Self> {
        let mut store = Self {
            conn,
            location,
            listeners: Vec::new(),
            sizing: SizingConfig::default(),
            detached: None,
        };
        store.migrate_schema(&current_attributes())?;
        Ok(store)
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn sizing(&self) -> &SizingConfig {
        &self.sizing
    }

    /// Replaces the sizing rules used by [`MarkerStore::create`].
    pub fn set_sizing(&mut self, sizing: SizingConfig) {
        self.sizing = sizing;
    }

    /// Registers a listener for subsequent changes.
    pub fn subscribe(&mut self, listener: Box<dyn StoreListener>) {
        self.listeners.push(listener);
    }

    /// Resolves `symbol`, persists a new marker sized for a view at
    /// `map_units_per_pixel` and notifies listeners.
    ///
    /// Nothing is written when the symbol cannot be resolved or the marker
    /// fails validation.
    pub fn create(
        &self,
        position: MapPoint,
        symbol: SymbolRef,
        map_units_per_pixel: f64,
    ) -> StoreResult<Marker> {
        let symbol = resolve_symbol(symbol)?;
        let size = self.initial_size(map_units_per_pixel)?;
        let marker = self
            .repo()?
            .insert_marker(&NewMarker::new(position, symbol, size))?;
        info!(
            "event=marker_create module=store status=ok id={} size={}",
            marker.id, marker.size
        );
        self.notify(&StoreChange::Created(marker.clone()));
        Ok(marker)
    }

    /// Size a marker created now at this resolution would get.
    pub fn initial_size(&self, map_units_per_pixel: f64) -> StoreResult<f64> {
        let smallest = self.smallest_size()?;
        Ok(adaptive_size(map_units_per_pixel, smallest, &self.sizing))
    }

    pub fn get(&self, id: MarkerId) -> StoreResult<Option<Marker>> {
        Ok(self.repo()?.get_marker(id)?)
    }

    /// Applies `patch` in one statement and returns the updated marker.
    pub fn update(&self, id: MarkerId, patch: &MarkerPatch) -> StoreResult<Marker> {
        let current = self.repo()?.get_marker(id)?.ok_or(StoreError::NotFound(id))?;
        if patch.is_empty() {
            return Ok(current);
        }
        let next = patch.apply_to(&current);
        self.repo()?.update_marker(&next)?;
        debug!("event=marker_update module=store status=ok id={id}");
        self.notify(&StoreChange::Updated(next.clone()));
        Ok(next)
    }

    /// Permanently removes a marker. A repeated delete reports `NotFound`.
    pub fn delete(&self, id: MarkerId) -> StoreResult<()> {
        self.repo()?.delete_marker(id)?;
        info!("event=marker_delete module=store status=ok id={id}");
        self.notify(&StoreChange::Deleted(id));
        Ok(())
    }

    /// Snapshot of every marker ordered by id. Calling again restarts.
    pub fn list(&self) -> StoreResult<MarkerIter> {
        Ok(self.repo()?.list_markers()?.into_iter())
    }

    pub fn smallest_size(&self) -> StoreResult<Option<f64>> {
        Ok(self.repo()?.smallest_size()?)
    }

    /// Opens the edit transaction used by interactive gestures.
    pub fn begin_edit(&self) -> StoreResult<()> {
        if self.in_edit() {
            return Err(StoreError::EditInProgress);
        }
        self.attached()?
            .execute_batch("BEGIN IMMEDIATE;")
            .map_err(|err| StoreError::StorageWriteFailed(err.into()))?;
        debug!("event=edit_begin module=store status=ok");
        Ok(())
    }

    pub fn commit_edit(&self) -> StoreResult<()> {
        let conn = self.attached()?;
        if !self.in_edit() {
            return Err(StoreError::NoOpenEdit);
        }
        if let Err(err) = conn.execute_batch("COMMIT;") {
            error!("event=edit_commit module=store status=error error={err}");
            return Err(StoreError::StorageWriteFailed(err.into()));
        }
        debug!("event=edit_commit module=store status=ok");
        Ok(())
    }

    /// Discards every write since `begin_edit`, including writes made by
    /// other callers on this store while the edit was open.
    pub fn rollback_edit(&self) -> StoreResult<()> {
        let conn = self.attached()?;
        if !self.in_edit() {
            return Err(StoreError::NoOpenEdit);
        }
        conn.execute_batch("ROLLBACK;")
            .map_err(|err| StoreError::StorageWriteFailed(err.into()))?;
        debug!("event=edit_rollback module=store status=ok");
        Ok(())
    }

    pub fn in_edit(&self) -> bool {
        self.detached.is_none() && !self.conn.is_autocommit()
    }

    pub fn is_detached(&self) -> bool {
        self.detached.is_some()
    }

    /// Reconnects a detached file store and brings it to the current schema.
    /// Attached stores are left untouched.
    pub fn reopen(&mut self) -> StoreResult<()> {
        if self.detached.is_none() {
            return Ok(());
        }
        let StoreLocation::File(path) = self.location.clone() else {
            return Ok(());
        };
        self.reattach(&path).map_err(StoreError::StorageWriteFailed)?;
        info!("event=store_reopen module=store status=ok");
        self.migrate_schema(&current_attributes())?;
        Ok(())
    }

    /// Ensures every attribute in `required` exists, rewriting the store when
    /// some are missing. Repeated calls with the same set are no-ops.
    ///
    /// # Errors
    /// - `EditInProgress` while an edit transaction is open.
    /// - `SchemaMigrationFailed` when the rewrite or swap fails; the previous
    ///   store stays active.
    /// - `StorageWriteFailed` when the swapped file cannot be reopened; the
    ///   store is detached until [`MarkerStore::reopen`] succeeds.
    pub fn migrate_schema(&mut self, required: &[AttributeSpec]) -> StoreResult<MigrationReport> {
        if self.in_edit() {
            return Err(StoreError::EditInProgress);
        }

        let plan = plan_migration(self.attached()?, required).map_err(StoreError::migration)?;
        if plan.is_noop() {
            if plan.target_version > plan.current_version {
                set_user_version(&self.conn, plan.target_version)
                    .map_err(|err| StoreError::migration(err.into()))?;
            }
            return Ok(MigrationReport::default());
        }

        let started_at = Instant::now();
        let mode = match self.location {
            StoreLocation::File(_) => "file",
            StoreLocation::Memory => "memory",
        };
        info!(
            "event=schema_migrate module=store status=start mode={mode} from_version={} to_version={} added={}",
            plan.current_version,
            plan.target_version,
            plan.added.len()
        );

        let result = match self.location.clone() {
            StoreLocation::Memory => {
                rewrite_in_place(&mut self.conn, &plan).map_err(StoreError::migration)
            }
            StoreLocation::File(path) => self.rewrite_file(&path, &plan),
        };

        match result {
            Ok(carried) => {
                info!(
                    "event=schema_migrate module=store status=ok mode={mode} carried={carried} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                let report = MigrationReport {
                    added: plan.added_names(),
                    carried,
                };
                self.notify(&StoreChange::Migrated(report.clone()));
                Ok(report)
            }
            Err(err) => {
                let error_code = if self.is_detached() {
                    "reopen_failed"
                } else {
                    "migration_failed"
                };
                error!(
                    "event=schema_migrate module=store status=error mode={mode} duration_ms={} error_code={error_code} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn rewrite_file(&mut self, path: &Path, plan: &MigrationPlan) -> StoreResult<usize> {
        let temp = migrating_path(path);
        remove_best_effort(&temp);

        let staged = write_migrated_copy(&self.conn, &temp, plan)
            .and_then(|carried| Ok((carried, Connection::open_in_memory()?)));
        let (carried, placeholder) = match staged {
            Ok(staged) => staged,
            Err(err) => {
                remove_best_effort(&temp);
                return Err(StoreError::migration(err));
            }
        };

        let active = std::mem::replace(&mut self.conn, placeholder);
        if let Err((active, err)) = active.close() {
            self.conn = active;
            remove_best_effort(&temp);
            return Err(StoreError::migration(err.into()));
        }

        if let Err(err) = fs::rename(&temp, path) {
            remove_best_effort(&temp);
            self.reattach(path).map_err(StoreError::StorageWriteFailed)?;
            return Err(StoreError::migration(err.into()));
        }

        self.reattach(path).map_err(StoreError::StorageWriteFailed)?;
        Ok(carried)
    }

    /// Opens `path` as the active connection, retrying once. On failure the
    /// store is detached.
    fn reattach(&mut self, path: &Path) -> DbResult<()> {
        let conn = match open_connection(path) {
            Ok(conn) => conn,
            Err(first) => {
                warn!("event=store_reopen module=store status=retry error={first}");
                match open_connection(path) {
                    Ok(conn) => conn,
                    Err(err) => {
                        error!(
                            "event=store_reopen module=store status=error error_code=store_detached error={err}"
                        );
                        self.detached = Some(err.to_string());
                        return Err(err);
                    }
                }
            }
        };
        self.conn = conn;
        self.detached = None;
        Ok(())
    }

    fn attached(&self) -> StoreResult<&Connection> {
        match &self.detached {
            Some(reason) => Err(StoreError::Detached {
                reason: reason.clone(),
            }),
            None => Ok(&self.conn),
        }
    }

    fn repo(&self) -> StoreResult<SqliteMarkerRepository<'_>> {
        Ok(SqliteMarkerRepository::new(self.attached()?))
    }

    fn notify(&self, change: &StoreChange) {
        for listener in &self.listeners {
            listener.on_change(change);
        }
    }
}

impl Drop for MarkerStore {
    fn drop(&mut self) {
        if self.in_edit() {
            warn!("event=edit_abandoned module=store status=error action=commit");
            if let Err(err) = self.conn.execute_batch("COMMIT;") {
                error!("event=edit_abandoned module=store status=error error={err}");
                let _ = self.conn.execute_batch("ROLLBACK;");
            }
        }
    }
}

fn write_migrated_copy(source: &Connection, temp: &Path, plan: &MigrationPlan) -> DbResult<usize> {
    let mut target = Connection::open(temp)?;
    let carried = rewrite_into(source, &mut target, plan)?;
    target.close().map_err(|(_, err)| DbError::from(err))?;
    Ok(carried)
}

fn migrating_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(MIGRATING_SUFFIX);
    PathBuf::from(name)
}

fn remove_best_effort(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(
            "event=temp_cleanup module=store status=error path={} error={err}",
            path.display()
        ),
    }
}
