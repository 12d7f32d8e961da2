//! Bulk loader: streams normalized rows into an existing table in batched
//! transactions, upserting on the table's key.

use super::error::{ImportError, RowError};
use super::normalizer::{ColumnKind, ColumnSpec, NormalizedRow};
use crate::dataset::RangeRule;
use crate::sqlite_persistence::{quote_ident, read_table_info, TableInfo};
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// Range violations logged at warn level per file.
const VIOLATION_WARN_LIMIT: u64 = 5;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub rows_committed: u64,
    pub rows_skipped: u64,
    pub quality_violations: u64,
}

/// A destination table resolved against one file header.
#[derive(Debug, Clone)]
pub struct LoadTarget {
    pub table: String,
    /// Destination columns in header order.
    pub columns: Vec<ColumnSpec>,
    insert_sql: String,
    checks: Vec<(usize, RangeRule)>,
}

impl LoadTarget {
    /// Maps header names onto the table's columns. Exact names win over
    /// case-insensitive matches; every header name must land somewhere and
    /// every table column left out of the header must be optional.
    pub fn resolve(
        info: &TableInfo,
        header: &[String],
        path: &Path,
        rules: &[RangeRule],
    ) -> Result<Self, ImportError> {
        let mismatch = |detail: String| ImportError::HeaderMismatch {
            path: path.to_path_buf(),
            table: info.name.clone(),
            detail,
        };

        let mut columns: Vec<ColumnSpec> = Vec::with_capacity(header.len());
        let mut unknown = Vec::new();
        for name in header {
            let found = info.column(name).or_else(|| {
                let mut candidates = info
                    .columns
                    .iter()
                    .filter(|c| c.name.eq_ignore_ascii_case(name));
                match (candidates.next(), candidates.next()) {
                    (Some(only), None) => Some(only),
                    _ => None,
                }
            });
            match found {
                Some(column) => {
                    if columns.iter().any(|c| c.name == column.name) {
                        return Err(mismatch(format!("column {} appears twice", column.name)));
                    }
                    columns.push(ColumnSpec {
                        name: column.name.clone(),
                        kind: ColumnKind::from_declared_type(&column.declared_type),
                        is_key: info.is_key_column(&column.name),
                    });
                }
                None => unknown.push(name.as_str()),
            }
        }

        let missing: Vec<&str> = info
            .columns
            .iter()
            .filter(|c| !columns.iter().any(|spec| spec.name == c.name))
            .filter(|c| {
                let rowid_alias = c.primary_key
                    && ColumnKind::from_declared_type(&c.declared_type) == ColumnKind::Integer;
                let required = (c.non_null && !c.has_default) || info.is_key_column(&c.name);
                required && !rowid_alias
            })
            .map(|c| c.name.as_str())
            .collect();

        if !unknown.is_empty() || !missing.is_empty() {
            let mut problems = Vec::new();
            if !unknown.is_empty() {
                problems.push(format!("unknown columns: {}", unknown.join(", ")));
            }
            if !missing.is_empty() {
                problems.push(format!("missing required columns: {}", missing.join(", ")));
            }
            return Err(mismatch(problems.join("; ")));
        }

        let checks = rules
            .iter()
            .filter(|rule| rule.table == info.name)
            .filter_map(|rule| {
                columns
                    .iter()
                    .position(|c| c.name == rule.column)
                    .map(|index| (index, rule.clone()))
            })
            .collect();

        let column_list = columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let insert_sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            quote_ident(&info.name),
            column_list,
            placeholders
        );

        Ok(Self {
            table: info.name.clone(),
            columns,
            insert_sql,
            checks,
        })
    }
}

pub struct TableLoader<'c> {
    conn: &'c mut Connection,
    batch_size: usize,
}

impl<'c> TableLoader<'c> {
    pub fn new(conn: &'c mut Connection, batch_size: usize) -> Self {
        Self {
            conn,
            batch_size: batch_size.max(1),
        }
    }

    /// Reads the destination's shape. Fails with `TableMissing` before any
    /// source data is touched.
    pub fn describe(&self, table: &str) -> Result<TableInfo, ImportError> {
        let info = read_table_info(&*self.conn, table).map_err(|e| ImportError::LoadFailed {
            table: table.to_string(),
            rows_committed: 0,
            diagnostic: e.to_string(),
        })?;
        let info = info.ok_or_else(|| ImportError::TableMissing {
            table: table.to_string(),
        })?;
        if !info.has_identity() {
            warn!(
                "Table {} has no primary key or unique constraint; re-imports will duplicate rows",
                table
            );
        }
        Ok(info)
    }

    /// Streams every row into the table, one transaction per batch.
    ///
    /// On failure the open batch is rolled back and batches already committed
    /// stay in place; the error carries how many rows that is.
    pub fn load<I>(
        &mut self,
        target: &LoadTarget,
        rows: I,
        on_batch: &mut dyn FnMut(u64),
    ) -> Result<LoadStats, ImportError>
    where
        I: Iterator<Item = Result<NormalizedRow, RowError>>,
    {
        let table = target.table.as_str();
        let failed = |committed: u64, e: rusqlite::Error| ImportError::LoadFailed {
            table: table.to_string(),
            rows_committed: committed,
            diagnostic: e.to_string(),
        };

        let mut stats = LoadStats::default();
        let mut rows = rows;
        loop {
            let tx = self
                .conn
                .transaction()
                .map_err(|e| failed(stats.rows_committed, e))?;
            let mut in_batch = 0u64;
            let mut exhausted = false;
            {
                let mut stmt = tx
                    .prepare_cached(&target.insert_sql)
                    .map_err(|e| failed(stats.rows_committed, e))?;
                while in_batch < self.batch_size as u64 {
                    let row = match rows.next() {
                        None => {
                            exhausted = true;
                            break;
                        }
                        Some(Ok(row)) => row,
                        Some(Err(e)) => return Err(e.into_import_error(table, stats.rows_committed)),
                    };
                    stats.quality_violations += check_quality(target, &row, stats.quality_violations);
                    stmt.execute(params_from_iter(row.values.iter()))
                        .map_err(|e| failed(stats.rows_committed, e))?;
                    in_batch += 1;
                }
            }

            if in_batch > 0 {
                tx.commit().map_err(|e| failed(stats.rows_committed, e))?;
                stats.rows_committed += in_batch;
                debug!("{}: committed {} rows", table, stats.rows_committed);
                on_batch(stats.rows_committed);
            }
            if exhausted {
                return Ok(stats);
            }
        }
    }
}

fn check_quality(target: &LoadTarget, row: &NormalizedRow, seen: u64) -> u64 {
    let mut violations = 0;
    for (index, rule) in &target.checks {
        let Some(value) = row.values.get(*index).and_then(|v| v.as_f64()) else {
            continue;
        };
        if rule.contains(value) {
            continue;
        }
        violations += 1;
        if seen + violations <= VIOLATION_WARN_LIMIT {
            warn!(
                "{}: line {}: {} = {} outside [{}, {}]",
                target.table, row.line, rule.column, value, rule.min, rule.max
            );
        }
    }
    violations
}
