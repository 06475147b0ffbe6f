//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections for the marker store.
//! - Configure connection pragmas required by core behavior.
//! - Create the marker table for fresh stores and reject stores written by a
//!   newer binary.
//!
//! # Invariants
//! - Returned connections have a `markers` table.
//! - Upgrading a lagging table is left to the store, which owns the file swap.

use super::migrations::bootstrap_schema;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens a marker store file, creating it when absent.
///
/// # Side effects
/// - Creates the marker table when the file is new.
/// - Emits `db_open` logging events with duration and status.
pub fn open_connection(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path))
}

/// Opens an in-memory marker store.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_connection_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

fn open_with(
    mode: &str,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn) {
        Ok(created) => {
            info!(
                "event=db_open module=db status=ok mode={mode} created={created} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<bool> {
    conn.busy_timeout(Duration::from_secs(5))?;
    bootstrap_schema(conn)
}
