//! Marker repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide row-level CRUD over the `markers` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Marker::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `unique_id` is generated here, once, at insert time.

use crate::db::schema::{
    current_attributes, latest_version, table_columns, table_exists, MARKERS_TABLE,
};
use crate::db::DbError;
use crate::geometry::MapPoint;
use crate::model::marker::{Marker, MarkerId, MarkerValidationError, NewMarker, SymbolRef};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const MARKER_SELECT_SQL: &str = "SELECT
    id,
    unique_id,
    x,
    y,
    name,
    svg_path,
    svg_content,
    size,
    scale_with_view,
    label_text,
    label_visible
FROM markers";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for marker persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(MarkerValidationError),
    Db(DbError),
    NotFound(MarkerId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "marker not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "marker store not migrated: expected schema {expected_version}, found {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted marker data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MarkerValidationError> for RepoError {
    fn from(value: MarkerValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for marker rows.
pub trait MarkerRepository {
    /// Inserts a new marker and returns it with its assigned ids.
    fn insert_marker(&self, marker: &NewMarker) -> RepoResult<Marker>;
    /// Overwrites every mutable attribute of an existing marker.
    fn update_marker(&self, marker: &Marker) -> RepoResult<()>;
    fn get_marker(&self, id: MarkerId) -> RepoResult<Option<Marker>>;
    /// All markers ordered by id ascending.
    fn list_markers(&self) -> RepoResult<Vec<Marker>>;
    fn delete_marker(&self, id: MarkerId) -> RepoResult<()>;
    /// Smallest size among live markers, `None` when the store is empty.
    fn smallest_size(&self) -> RepoResult<Option<f64>>;
}

/// SQLite-backed marker repository.
pub struct SqliteMarkerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMarkerRepository<'conn> {
    /// Creates a repository over a connection already known to be migrated.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Creates a repository after checking the connection is migrated.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_marker_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl MarkerRepository for SqliteMarkerRepository<'_> {
    fn insert_marker(&self, new: &NewMarker) -> RepoResult<Marker> {
        let mut marker = Marker {
            id: 0,
            unique_id: Uuid::new_v4(),
            position: new.position,
            name: new.name.clone(),
            symbol: new.symbol.clone(),
            size: new.size,
            scale_with_view: false,
            label_text: None,
            label_visible: false,
        };
        marker.validate()?;

        self.conn.execute(
            "INSERT INTO markers (
                unique_id,
                x,
                y,
                name,
                svg_path,
                svg_content,
                size,
                scale_with_view,
                label_text,
                label_visible
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                marker.unique_id.to_string(),
                marker.position.x,
                marker.position.y,
                marker.name.as_str(),
                marker.symbol.path.as_deref(),
                marker.symbol.content.as_deref(),
                marker.size,
                bool_to_int(marker.scale_with_view),
                marker.label_text.as_deref(),
                bool_to_int(marker.label_visible),
            ],
        )?;

        marker.id = self.conn.last_insert_rowid();
        Ok(marker)
    }

    fn update_marker(&self, marker: &Marker) -> RepoResult<()> {
        marker.validate()?;

        let changed = self.conn.execute(
            "UPDATE markers
             SET
                x = ?2,
                y = ?3,
                name = ?4,
                svg_path = ?5,
                svg_content = ?6,
                size = ?7,
                scale_with_view = ?8,
                label_text = ?9,
                label_visible = ?10
             WHERE id = ?1;",
            params![
                marker.id,
                marker.position.x,
                marker.position.y,
                marker.name.as_str(),
                marker.symbol.path.as_deref(),
                marker.symbol.content.as_deref(),
                marker.size,
                bool_to_int(marker.scale_with_view),
                marker.label_text.as_deref(),
                bool_to_int(marker.label_visible),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(marker.id));
        }

        Ok(())
    }

    fn get_marker(&self, id: MarkerId) -> RepoResult<Option<Marker>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MARKER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_marker_row(row)?));
        }
        Ok(None)
    }

    fn list_markers(&self) -> RepoResult<Vec<Marker>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MARKER_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut markers = Vec::new();
        while let Some(row) = rows.next()? {
            markers.push(parse_marker_row(row)?);
        }
        Ok(markers)
    }

    fn delete_marker(&self, id: MarkerId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM markers WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn smallest_size(&self) -> RepoResult<Option<f64>> {
        let smallest = self
            .conn
            .query_row("SELECT MIN(size) FROM markers;", [], |row| {
                row.get::<_, Option<f64>>(0)
            })?;
        Ok(smallest)
    }
}

fn parse_marker_row(row: &Row<'_>) -> RepoResult<Marker> {
    let id: MarkerId = row.get("id")?;
    let unique_text: String = row.get("unique_id")?;
    let unique_id = Uuid::parse_str(&unique_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid `{unique_text}` in markers.unique_id (id={id})"
        ))
    })?;

    let marker = Marker {
        id,
        unique_id,
        position: MapPoint::new(row.get("x")?, row.get("y")?),
        name: row.get::<_, Option<String>>("name")?.unwrap_or_default(),
        symbol: SymbolRef {
            path: row.get("svg_path")?,
            content: row.get("svg_content")?,
        },
        size: row.get("size")?,
        scale_with_view: int_to_bool(row.get("scale_with_view")?, "scale_with_view")?,
        label_text: row.get("label_text")?,
        label_visible: int_to_bool(row.get("label_visible")?, "label_visible")?,
    };
    marker
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("marker {id}: {err}")))?;
    Ok(marker)
}

fn ensure_marker_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, MARKERS_TABLE)? {
        return Err(RepoError::MissingRequiredTable(MARKERS_TABLE));
    }

    let columns = table_columns(conn, MARKERS_TABLE)?;
    for attribute in current_attributes() {
        if !columns.iter().any(|column| column.name == attribute.name) {
            return Err(RepoError::MissingRequiredColumn {
                table: MARKERS_TABLE,
                column: attribute.name,
            });
        }
    }

    Ok(())
}

fn int_to_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in markers.{column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
