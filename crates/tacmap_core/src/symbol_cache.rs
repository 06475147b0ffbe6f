//! On-disk cache of inline marker symbols.
//!
//! # Responsibility
//! - Materialize a marker's inline vector graphic as a file for renderers
//!   that only accept paths.
//! - Purge cache files older than a maximum age.
//!
//! # Invariants
//! - Cache files are named `marker_<unique_id>.svg`, so one marker maps to
//!   one file across stores and migrations.
//! - Purging is best-effort: failures are logged and skipped.

use crate::model::marker::Marker;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

const CACHE_DIR_NAME: &str = "svg_cache";
const FILE_PREFIX: &str = "marker_";
const FILE_EXTENSION: &str = "svg";

/// Age after which cache files are purged by default.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
pub enum CacheError {
    Io(std::io::Error),
    /// Marker has neither inline content nor a library path.
    NoSymbol(Uuid),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "symbol cache io failed: {err}"),
            Self::NoSymbol(id) => write!(f, "marker {id} has no symbol to cache"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::NoSymbol(_) => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Cache rooted at `<root>/svg_cache`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolCache {
    dir: PathBuf,
}

impl SymbolCache {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join(CACHE_DIR_NAME),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, unique_id: Uuid) -> PathBuf {
        self.dir
            .join(format!("{FILE_PREFIX}{unique_id}.{FILE_EXTENSION}"))
    }

    /// Path a renderer should load for `marker`.
    ///
    /// Inline content is written to the cache (rewritten when it changed);
    /// markers without content fall back to their library path.
    pub fn materialize(&self, marker: &Marker) -> Result<PathBuf, CacheError> {
        let Some(content) = marker.symbol.inline_content() else {
            return marker
                .symbol
                .library_path()
                .map(PathBuf::from)
                .ok_or(CacheError::NoSymbol(marker.unique_id));
        };

        let path = self.path_for(marker.unique_id);
        let current = fs::read_to_string(&path).ok();
        if current.as_deref() != Some(content) {
            fs::create_dir_all(&self.dir)?;
            fs::write(&path, content)?;
            debug!(
                "event=symbol_cache_write module=symbol_cache status=ok id={} bytes={}",
                marker.id,
                content.len()
            );
        }
        Ok(path)
    }

    /// Deletes cache files older than `max_age` and removes the directory
    /// when it ends up empty. Returns the number of files deleted.
    pub fn purge_stale(&self, max_age: Duration) -> usize {
        self.purge_stale_at(max_age, SystemTime::now())
    }

    /// [`Self::purge_stale`] against an explicit clock.
    pub fn purge_stale_at(&self, max_age: Duration, now: SystemTime) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_cache_file(&path) {
                continue;
            }
            let modified = entry.metadata().and_then(|metadata| metadata.modified());
            let stale = match modified {
                Ok(modified) => now
                    .duration_since(modified)
                    .map(|age| age > max_age)
                    .unwrap_or(false),
                Err(_) => false,
            };
            if !stale {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) => warn!(
                    "event=symbol_cache_purge module=symbol_cache status=error path={} error={err}",
                    path.display()
                ),
            }
        }

        let empty = fs::read_dir(&self.dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if empty {
            let _ = fs::remove_dir(&self.dir);
        }

        debug!("event=symbol_cache_purge module=symbol_cache status=ok removed={removed}");
        removed
    }
}

fn is_cache_file(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(FILE_PREFIX));
    let extension_matches = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension == FILE_EXTENSION);
    name_matches && extension_matches
}
