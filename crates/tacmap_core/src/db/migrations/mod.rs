//! Additive marker schema migration.
//!
//! # Responsibility
//! - Create the marker table for fresh stores at the latest version.
//! - Plan additive migrations by diffing physical columns against the
//!   required attribute set.
//! - Rewrite the whole collection into a new table or file with the superset
//!   schema, carrying every row and the id sequence forward.
//!
//! # Invariants
//! - Existing columns are never dropped or retyped, including ones this
//!   binary does not know.
//! - Row ids and the `AUTOINCREMENT` high-water mark survive a rewrite, so
//!   ids of deleted markers are never handed out again.
//! - Applied schema version is mirrored to `PRAGMA user_version`.

use crate::db::schema::{
    current_attributes, find_attribute, latest_version, set_user_version, table_columns,
    table_exists, user_version, AttributeSpec, MARKERS_TABLE,
};
use crate::db::{DbError, DbResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};

const NEXT_TABLE: &str = "markers_next";

/// Column carried from the old table into the rewritten one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarriedColumn {
    pub name: String,
    /// Definition used in the new `CREATE TABLE`.
    pub definition: String,
}

/// Result of diffing a store against a required attribute set.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationPlan {
    pub current_version: u32,
    pub target_version: u32,
    pub carried: Vec<CarriedColumn>,
    pub added: Vec<AttributeSpec>,
}

impl MigrationPlan {
    /// True when no attribute is missing.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
    }

    pub fn added_names(&self) -> Vec<&'static str> {
        self.added.iter().map(|attribute| attribute.name).collect()
    }

    fn create_table_sql(&self, table: &str) -> String {
        let mut columns = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
        columns.extend(self.carried.iter().map(|column| column.definition.clone()));
        columns.extend(self.added.iter().map(AttributeSpec::column_sql));
        format!("CREATE TABLE {table} ({});", columns.join(", "))
    }
}

/// Creates the marker table at the latest version when the store is empty.
///
/// Returns `true` when the table was created.
pub fn bootstrap_schema(conn: &mut Connection) -> DbResult<bool> {
    let version = user_version(conn)?;
    let latest = latest_version();
    if version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: version,
            latest_supported: latest,
        });
    }
    if table_exists(conn, MARKERS_TABLE)? {
        return Ok(false);
    }

    let plan = MigrationPlan {
        current_version: 0,
        target_version: latest,
        carried: Vec::new(),
        added: current_attributes(),
    };
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch(&plan.create_table_sql(MARKERS_TABLE))?;
    set_user_version(&tx, latest)?;
    tx.commit()?;
    Ok(true)
}

/// Diffs the physical marker table against `required`.
pub fn plan_migration(conn: &Connection, required: &[AttributeSpec]) -> DbResult<MigrationPlan> {
    let current_version = user_version(conn)?;
    let columns = table_columns(conn, MARKERS_TABLE)?;

    let carried = columns
        .iter()
        .filter(|column| column.name != "id")
        .map(|column| CarriedColumn {
            name: column.name.clone(),
            definition: match find_attribute(&column.name) {
                Some(attribute) => attribute.column_sql(),
                None => format!("{} {}", column.name, column.declared_type).trim().to_string(),
            },
        })
        .collect::<Vec<_>>();

    let mut added: Vec<AttributeSpec> = Vec::new();
    for attribute in required {
        let present = columns.iter().any(|column| column.name == attribute.name);
        let queued = added.iter().any(|queued| queued.name == attribute.name);
        if !present && !queued {
            added.push(*attribute);
        }
    }

    let required_version = required
        .iter()
        .map(|attribute| attribute.since)
        .max()
        .unwrap_or(0);

    Ok(MigrationPlan {
        current_version,
        target_version: current_version.max(required_version),
        carried,
        added,
    })
}

/// Rewrites the marker table inside `conn` through a staging table.
///
/// Runs in one immediate transaction; any failure leaves the original table
/// untouched. Returns the number of rows carried.
pub fn rewrite_in_place(conn: &mut Connection, plan: &MigrationPlan) -> DbResult<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if table_exists(&tx, NEXT_TABLE)? {
        tx.execute_batch(&format!("DROP TABLE {NEXT_TABLE};"))?;
    }
    tx.execute_batch(&plan.create_table_sql(NEXT_TABLE))?;
    let rows = read_rows(&tx, plan)?;
    let carried = insert_rows(&tx, NEXT_TABLE, plan, rows)?;
    let sequence = read_sequence(&tx, MARKERS_TABLE)?;
    write_sequence(&tx, NEXT_TABLE, sequence)?;
    tx.execute_batch(&format!(
        "DROP TABLE {MARKERS_TABLE};
         ALTER TABLE {NEXT_TABLE} RENAME TO {MARKERS_TABLE};"
    ))?;
    set_user_version(&tx, plan.target_version)?;
    tx.commit()?;
    Ok(carried)
}

/// Writes the migrated collection from `source` into the empty database
/// behind `target`. The caller owns the file swap.
pub fn rewrite_into(
    source: &Connection,
    target: &mut Connection,
    plan: &MigrationPlan,
) -> DbResult<usize> {
    let rows = read_rows(source, plan)?;
    let sequence = read_sequence(source, MARKERS_TABLE)?;

    let tx = target.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch(&plan.create_table_sql(MARKERS_TABLE))?;
    let carried = insert_rows(&tx, MARKERS_TABLE, plan, rows)?;
    write_sequence(&tx, MARKERS_TABLE, sequence)?;
    set_user_version(&tx, plan.target_version)?;
    tx.commit()?;
    Ok(carried)
}

fn read_rows(conn: &Connection, plan: &MigrationPlan) -> DbResult<Vec<Vec<Value>>> {
    let mut select = vec!["rowid".to_string()];
    select.extend(plan.carried.iter().map(|column| column.name.clone()));
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {MARKERS_TABLE} ORDER BY rowid ASC;",
        select.join(", ")
    ))?;
    let width = select.len();
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width + plan.added.len());
        for index in 0..width {
            values.push(row.get::<_, Value>(index)?);
        }
        out.push(values);
    }
    Ok(out)
}

fn insert_rows(
    conn: &Connection,
    table: &str,
    plan: &MigrationPlan,
    rows: Vec<Vec<Value>>,
) -> DbResult<usize> {
    let mut names = vec!["id".to_string()];
    names.extend(plan.carried.iter().map(|column| column.name.clone()));
    names.extend(plan.added.iter().map(|attribute| attribute.name.to_string()));
    let placeholders = (1..=names.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders});",
        names.join(", ")
    ))?;

    let mut count = 0;
    for mut values in rows {
        values.extend(plan.added.iter().map(|attribute| attribute.default.value()));
        stmt.execute(params_from_iter(values))?;
        count += 1;
    }
    Ok(count)
}

fn read_sequence(conn: &Connection, table: &str) -> DbResult<Option<i64>> {
    if !table_exists(conn, "sqlite_sequence")? {
        return Ok(None);
    }
    let seq = conn
        .query_row(
            "SELECT seq FROM sqlite_sequence WHERE name = ?1;",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(seq)
}

fn write_sequence(conn: &Connection, table: &str, sequence: Option<i64>) -> DbResult<()> {
    let Some(sequence) = sequence else {
        return Ok(());
    };
    let changed = conn.execute(
        "UPDATE sqlite_sequence SET seq = MAX(seq, ?2) WHERE name = ?1;",
        params![table, sequence],
    )?;
    if changed == 0 {
        conn.execute(
            "INSERT INTO sqlite_sequence (name, seq) VALUES (?1, ?2);",
            params![table, sequence],
        )?;
    }
    Ok(())
}
