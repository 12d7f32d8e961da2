use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reading a compressed TSV file.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot read {}: {reason}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        reason: String,
        /// The file does not exist at all, as opposed to being corrupt.
        missing: bool,
    },

    #[error("{}: header line is empty", .path.display())]
    EmptyHeader { path: PathBuf },

    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: {error}")]
    InvalidEncoding {
        line: u64,
        #[source]
        error: FieldCoercionError,
    },
}

impl DecodeError {
    /// Line of a row that is bad on its own; the rest of the file is still readable.
    pub fn bad_row_line(&self) -> Option<u64> {
        match self {
            DecodeError::FieldCount { line, .. } | DecodeError::InvalidEncoding { line, .. } => {
                Some(*line)
            }
            _ => None,
        }
    }
}

/// One value that could not be stored in its destination column.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("column {column}: cannot store {raw_value:?}: {reason}")]
pub struct FieldCoercionError {
    pub column: String,
    pub raw_value: String,
    pub reason: String,
}

/// A row the normalizing stream could not turn into values.
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("line {line}: {error}")]
    Coercion {
        line: u64,
        #[source]
        error: FieldCoercionError,
    },
}

impl RowError {
    pub(crate) fn into_import_error(self, table: &str, rows_committed: u64) -> ImportError {
        match self {
            RowError::Decode(error) => ImportError::from_decode(error, table, rows_committed),
            RowError::Coercion { line, error } => ImportError::FieldCoercion {
                table: table.to_string(),
                line,
                rows_committed,
                error,
            },
        }
    }
}

/// Per-file import failures plus the start-up connectivity failure.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot read {}: {reason}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        reason: String,
        missing: bool,
        rows_committed: u64,
    },

    #[error("{}: header line is empty", .path.display())]
    EmptyHeader { path: PathBuf },

    #[error("header of {} does not match table {table}: {detail}", .path.display())]
    HeaderMismatch {
        path: PathBuf,
        table: String,
        detail: String,
    },

    #[error("table {table}, line {line}: {error}")]
    FieldCoercion {
        table: String,
        line: u64,
        rows_committed: u64,
        #[source]
        error: FieldCoercionError,
    },

    #[error("table {table}, line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        table: String,
        line: u64,
        expected: usize,
        found: usize,
        rows_committed: u64,
    },

    #[error("destination table {table} does not exist")]
    TableMissing { table: String },

    #[error("bulk load into {table} failed after {rows_committed} committed rows: {diagnostic}")]
    LoadFailed {
        table: String,
        rows_committed: u64,
        diagnostic: String,
    },

    #[error("cannot reach database {} after {attempts} attempts: {diagnostic}", .path.display())]
    ConnectivityFailure {
        path: PathBuf,
        attempts: u32,
        diagnostic: String,
    },
}

impl ImportError {
    /// Rows already durable in the destination when the failure happened.
    pub fn rows_committed(&self) -> u64 {
        match self {
            ImportError::SourceUnreadable { rows_committed, .. }
            | ImportError::FieldCoercion { rows_committed, .. }
            | ImportError::MalformedRow { rows_committed, .. }
            | ImportError::LoadFailed { rows_committed, .. } => *rows_committed,
            _ => 0,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::SourceUnreadable { .. } => "SourceUnreadable",
            ImportError::EmptyHeader { .. } => "EmptyHeader",
            ImportError::HeaderMismatch { .. } => "HeaderMismatch",
            ImportError::FieldCoercion { .. } => "FieldCoercionError",
            ImportError::MalformedRow { .. } => "MalformedRow",
            ImportError::TableMissing { .. } => "TableMissing",
            ImportError::LoadFailed { .. } => "LoadFailed",
            ImportError::ConnectivityFailure { .. } => "ConnectivityFailure",
        }
    }

    /// A source file that simply is not there. Never aborts a run.
    pub fn is_missing_source(&self) -> bool {
        matches!(self, ImportError::SourceUnreadable { missing: true, .. })
    }

    pub(crate) fn from_decode(error: DecodeError, table: &str, rows_committed: u64) -> Self {
        match error {
            DecodeError::SourceUnreadable {
                path,
                reason,
                missing,
            } => ImportError::SourceUnreadable {
                path,
                reason,
                missing,
                rows_committed,
            },
            DecodeError::EmptyHeader { path } => ImportError::EmptyHeader { path },
            DecodeError::FieldCount {
                line,
                expected,
                found,
            } => ImportError::MalformedRow {
                table: table.to_string(),
                line,
                expected,
                found,
                rows_committed,
            },
            DecodeError::InvalidEncoding { line, error } => ImportError::FieldCoercion {
                table: table.to_string(),
                line,
                rows_committed,
                error,
            },
        }
    }
}
