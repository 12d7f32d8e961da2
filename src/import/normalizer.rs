//! Turns raw TSV fields into typed values for a destination column.

use super::decoder::RawRow;
use super::error::{DecodeError, FieldCoercionError, RowError};
use super::policy::BadRowPolicy;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::Serialize;
use tracing::{debug, warn};

/// Skipped rows logged at warn level before switching to debug.
const SKIP_WARN_LIMIT: u64 = 5;

/// The dataset's marker for an absent value.
pub const NULL_SENTINEL: &str = "\\N";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Text,
    Integer,
    Decimal,
    Boolean,
}

impl ColumnKind {
    /// Classifies a declared SQLite column type the way SQLite assigns affinity,
    /// with BOOLEAN recognized before the integer rule.
    pub fn from_declared_type(declared: &str) -> Self {
        let declared = declared.to_ascii_uppercase();
        if declared.contains("BOOL") {
            ColumnKind::Boolean
        } else if declared.contains("INT") {
            ColumnKind::Integer
        } else if ["REAL", "FLOA", "DOUB", "DEC", "NUM"]
            .iter()
            .any(|marker| declared.contains(marker))
        {
            ColumnKind::Decimal
        } else {
            ColumnKind::Text
        }
    }
}

/// A destination column as seen by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    /// Part of the row identity: may never be empty or null.
    pub is_key: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Decimal(v) => Some(*v),
            _ => None,
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
            FieldValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            FieldValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            FieldValue::Decimal(v) => ToSqlOutput::Owned(Value::Real(*v)),
            FieldValue::Boolean(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
        })
    }
}

pub fn normalize_field(column: &ColumnSpec, raw: &str) -> Result<FieldValue, FieldCoercionError> {
    let fail = |reason: &str| FieldCoercionError {
        column: column.name.clone(),
        raw_value: raw.to_string(),
        reason: reason.to_string(),
    };

    if raw == NULL_SENTINEL {
        return if column.is_key {
            Err(fail("key column must not be null"))
        } else {
            Ok(FieldValue::Null)
        };
    }
    if raw.is_empty() {
        return if column.is_key {
            Err(fail("key column must not be empty"))
        } else {
            Ok(FieldValue::Null)
        };
    }

    match column.kind {
        // Multi-valued lists (genres, professions, characters) stay flat text.
        ColumnKind::Text => Ok(FieldValue::Text(raw.to_string())),
        ColumnKind::Integer => raw
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| fail("not an integer")),
        ColumnKind::Decimal => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(FieldValue::Decimal(v)),
            Ok(_) => Err(fail("not a finite decimal")),
            Err(_) => Err(fail("not a decimal")),
        },
        ColumnKind::Boolean => match raw {
            "0" => Ok(FieldValue::Boolean(false)),
            "1" => Ok(FieldValue::Boolean(true)),
            _ => Err(fail("boolean must be 0 or 1")),
        },
    }
}

/// Normalizes whole rows against a column list aligned with the file header.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    columns: Vec<ColumnSpec>,
}

impl RecordNormalizer {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn normalize(&self, row: &RawRow) -> Result<Vec<FieldValue>, FieldCoercionError> {
        self.columns
            .iter()
            .enumerate()
            .map(|(index, column)| normalize_field(column, row.get(index).unwrap_or("")))
            .collect()
    }
}

/// A row ready for the loader, in header column order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub line: u64,
    pub values: Vec<FieldValue>,
}

/// Adapts a raw row stream into normalized rows, applying the bad row policy.
pub struct NormalizedRows<I> {
    rows: I,
    normalizer: RecordNormalizer,
    policy: BadRowPolicy,
    table: String,
    skipped: u64,
}

impl<I> NormalizedRows<I>
where
    I: Iterator<Item = Result<RawRow, DecodeError>>,
{
    pub fn new(rows: I, normalizer: RecordNormalizer, policy: BadRowPolicy, table: &str) -> Self {
        Self {
            rows,
            normalizer,
            policy,
            table: table.to_string(),
            skipped: 0,
        }
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn skip(&mut self, line: u64, reason: &dyn std::fmt::Display) {
        self.skipped += 1;
        if self.skipped <= SKIP_WARN_LIMIT {
            warn!("{}: skipping line {}: {}", self.table, line, reason);
        } else {
            debug!("{}: skipping line {}: {}", self.table, line, reason);
        }
    }
}

impl<I> Iterator for NormalizedRows<I>
where
    I: Iterator<Item = Result<RawRow, DecodeError>>,
{
    type Item = Result<NormalizedRow, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.rows.next()? {
                Ok(raw) => match self.normalizer.normalize(&raw) {
                    Ok(values) => {
                        return Some(Ok(NormalizedRow {
                            line: raw.line,
                            values,
                        }))
                    }
                    Err(error) if self.policy == BadRowPolicy::SkipRow => {
                        self.skip(raw.line, &error);
                    }
                    Err(error) => {
                        return Some(Err(RowError::Coercion {
                            line: raw.line,
                            error,
                        }))
                    }
                },
                Err(error) => match error.bad_row_line() {
                    Some(line) if self.policy == BadRowPolicy::SkipRow => self.skip(line, &error),
                    _ => return Some(Err(error.into())),
                },
            }
        }
    }
}
