//! Versioned marker schema descriptor.
//!
//! # Responsibility
//! - List every persisted marker attribute with its type, default and the
//!   schema version that introduced it.
//! - Inspect the physical columns of an existing store.
//!
//! # Invariants
//! - Entries are append-only; `since` values are non-decreasing.
//! - `id` is implicit (`INTEGER PRIMARY KEY AUTOINCREMENT`) and not listed.

use rusqlite::types::Value;
use rusqlite::Connection;
use uuid::Uuid;

/// Logical collection name of the marker layer.
pub const MARKERS_TABLE: &str = "markers";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

/// Value written for rows that predate an attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeDefault {
    Null,
    Integer(i64),
    Real(f64),
    Text(&'static str),
    /// Fresh v4 UUID per row.
    NewUuid,
}

impl AttributeDefault {
    pub fn value(&self) -> Value {
        match *self {
            Self::Null => Value::Null,
            Self::Integer(value) => Value::Integer(value),
            Self::Real(value) => Value::Real(value),
            Self::Text(value) => Value::Text(value.to_string()),
            Self::NewUuid => Value::Text(Uuid::new_v4().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub not_null: bool,
    pub unique: bool,
    pub default: AttributeDefault,
    /// Schema version that introduced the attribute.
    pub since: u32,
}

impl AttributeSpec {
    const fn new(
        name: &'static str,
        column_type: ColumnType,
        default: AttributeDefault,
        since: u32,
    ) -> Self {
        Self {
            name,
            column_type,
            not_null: false,
            unique: false,
            default,
            since,
        }
    }

    const fn required(self) -> Self {
        Self {
            not_null: true,
            ..self
        }
    }

    const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }

    /// Column definition used in `CREATE TABLE`.
    pub fn column_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.column_type.sql());
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        sql
    }
}

/// v1: the legacy layer (position, name, path, size).
/// v2: stable identity, inline symbol content, scale flag.
/// v3: labels.
pub const MARKER_SCHEMA: &[AttributeSpec] = &[
    AttributeSpec::new("x", ColumnType::Real, AttributeDefault::Real(0.0), 1).required(),
    AttributeSpec::new("y", ColumnType::Real, AttributeDefault::Real(0.0), 1).required(),
    AttributeSpec::new("name", ColumnType::Text, AttributeDefault::Text(""), 1),
    AttributeSpec::new("svg_path", ColumnType::Text, AttributeDefault::Null, 1),
    AttributeSpec::new("size", ColumnType::Real, AttributeDefault::Real(30.0), 1).required(),
    AttributeSpec::new("unique_id", ColumnType::Text, AttributeDefault::NewUuid, 2)
        .required()
        .unique(),
    AttributeSpec::new("svg_content", ColumnType::Text, AttributeDefault::Null, 2),
    AttributeSpec::new(
        "scale_with_view",
        ColumnType::Integer,
        AttributeDefault::Integer(0),
        2,
    )
    .required(),
    AttributeSpec::new("label_text", ColumnType::Text, AttributeDefault::Null, 3),
    AttributeSpec::new(
        "label_visible",
        ColumnType::Integer,
        AttributeDefault::Integer(0),
        3,
    )
    .required(),
];

/// Latest schema version known by this binary.
pub fn latest_version() -> u32 {
    MARKER_SCHEMA.last().map_or(0, |attribute| attribute.since)
}

/// Attributes declared up to and including `version`.
pub fn attributes_for_version(version: u32) -> Vec<AttributeSpec> {
    MARKER_SCHEMA
        .iter()
        .filter(|attribute| attribute.since <= version)
        .copied()
        .collect()
}

/// Every attribute of the current schema.
pub fn current_attributes() -> Vec<AttributeSpec> {
    MARKER_SCHEMA.to_vec()
}

/// Looks up a declared attribute by column name.
pub fn find_attribute(name: &str) -> Option<&'static AttributeSpec> {
    MARKER_SCHEMA.iter().find(|attribute| attribute.name == name)
}

/// Physical column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalColumn {
    pub name: String,
    pub declared_type: String,
}

pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Columns of `table` in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<PhysicalColumn>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(PhysicalColumn {
            name: row.get(1)?,
            declared_type: row.get(2)?,
        });
    }
    Ok(columns)
}

pub fn user_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))
}

pub fn set_user_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
}
