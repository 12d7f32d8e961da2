//! Read-side helpers describing tables that already exist in the database.
//!
//! The importer never trusts its own declarations when loading: it asks SQLite
//! what the destination looks like, so externally provisioned tables work too.

use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub non_null: bool,
    pub has_default: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    /// Column sets of every UNIQUE index (including the implicit ones backing
    /// UNIQUE constraints and text primary keys).
    pub unique_sets: Vec<Vec<String>>,
}

impl TableInfo {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns that take part in the row identity used for upserts.
    pub fn is_key_column(&self, name: &str) -> bool {
        self.column(name).map(|c| c.primary_key).unwrap_or(false)
            || self.unique_sets.iter().any(|set| set.iter().any(|c| c == name))
    }

    pub fn has_identity(&self) -> bool {
        self.columns.iter().any(|c| c.primary_key) || !self.unique_sets.is_empty()
    }
}

/// Quotes an identifier for interpolation into SQL text.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1",
        params![table],
        |_| Ok(true),
    )
    .optional()
    .map(|found| found.unwrap_or(false))
}

/// Returns `None` when the table does not exist.
pub fn read_table_info(conn: &Connection, table: &str) -> rusqlite::Result<Option<TableInfo>> {
    if !table_exists(conn, table)? {
        return Ok(None);
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                non_null: row.get::<_, i32>(3)? == 1,
                has_default: row.get::<_, Option<String>>(4)?.is_some(),
                primary_key: row.get::<_, i32>(5)? > 0,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", quote_ident(table)))?;
    let unique_indices: Vec<String> = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let is_unique: i32 = row.get(2)?;
            Ok((name, is_unique))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .filter(|(_, is_unique)| *is_unique == 1)
        .map(|(name, _)| name)
        .collect();

    let mut unique_sets = Vec::with_capacity(unique_indices.len());
    for index_name in unique_indices {
        let mut idx_stmt = conn.prepare(&format!("PRAGMA index_info({})", quote_ident(&index_name)))?;
        let cols = idx_stmt
            .query_map([], |row| row.get::<_, String>(2))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        unique_sets.push(cols);
    }

    Ok(Some(TableInfo {
        name: table.to_string(),
        columns,
        unique_sets,
    }))
}

pub fn count_rows(conn: &Connection, table: &str) -> rusqlite::Result<u64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |r| r.get(0),
    )?;
    Ok(count.max(0) as u64)
}

pub fn is_empty(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let any: Option<i64> = conn
        .query_row(
            &format!("SELECT 1 FROM {} LIMIT 1", quote_ident(table)),
            [],
            |r| r.get(0),
        )
        .optional()?;
    Ok(any.is_none())
}

pub fn list_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}
