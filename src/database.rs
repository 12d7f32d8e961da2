//! Opening the destination database and switching it in and out of load mode.

use crate::config::ConnectionSettings;
use crate::import::ImportError;
use crate::retry::RetryPolicy;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("database file {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("cannot open database: {0}")]
    Open(#[source] rusqlite::Error),

    #[error("database did not answer probe: {0}")]
    Probe(#[source] rusqlite::Error),
}

/// Opens an existing database read-write. Never creates the file.
pub fn open_existing(path: &Path, busy_timeout: Duration) -> Result<Connection, ConnectError> {
    if !path.exists() {
        return Err(ConnectError::NotFound(path.to_path_buf()));
    }
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags).map_err(ConnectError::Open)?;
    conn.busy_timeout(busy_timeout).map_err(ConnectError::Open)?;
    // Reading the schema forces SQLite to look at the file header.
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |r| r.get::<_, i64>(0))
        .map_err(ConnectError::Probe)?;
    Ok(conn)
}

/// Opens the database with bounded retries and fixed backoff.
pub fn connect(settings: &ConnectionSettings) -> Result<Connection, ImportError> {
    let policy = RetryPolicy::new(settings);
    let result = policy.run(
        || open_existing(&settings.db_path, settings.busy_timeout),
        |attempt, e| {
            warn!(
                "Connection attempt {}/{} to {:?} failed: {}; retrying in {:?}",
                attempt,
                policy.max_attempts(),
                settings.db_path,
                e,
                policy.interval
            );
        },
    );
    match result {
        Ok(conn) => {
            info!("Connected to {:?}", settings.db_path);
            Ok(conn)
        }
        Err((e, attempts)) => Err(ImportError::ConnectivityFailure {
            path: settings.db_path.clone(),
            attempts,
            diagnostic: e.to_string(),
        }),
    }
}

/// Trades durability for throughput while tables are bulk loaded. WAL keeps
/// committed batches visible to concurrent readers such as the progress poller.
pub fn enter_load_mode(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.execute_batch(
        "PRAGMA synchronous = OFF;
         PRAGMA foreign_keys = OFF;
         PRAGMA temp_store = MEMORY;
         PRAGMA cache_size = -262144;",
    )
}

/// Restores normal safety settings and refreshes planner statistics.
pub fn leave_load_mode(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA optimize;",
    )
}

/// Orphaned rows per table, as reported by `PRAGMA foreign_key_check`.
pub fn foreign_key_orphans(conn: &Connection) -> rusqlite::Result<Vec<(String, u64)>> {
    let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut counts: Vec<(String, u64)> = Vec::new();
    for table in tables {
        match counts.iter_mut().find(|(name, _)| *name == table) {
            Some((_, n)) => *n += 1,
            None => counts.push((table, 1)),
        }
    }
    Ok(counts)
}
