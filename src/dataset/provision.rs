use super::schema::IMDB_SCHEMA;
use crate::sqlite_persistence::{table_exists, VersionedSchema};
use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

#[derive(Debug, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    Recreated,
    /// Tables were already there; lists every way they differ from the declaration.
    Validated { problems: Vec<String> },
}

/// Creates the destination tables when none exist, or validates the ones
/// that do. `recreate` drops all of them first, data included.
pub fn provision(conn: &mut Connection, recreate: bool) -> Result<Provisioned> {
    let mut existing = 0;
    for table in IMDB_SCHEMA.tables {
        if table_exists(conn, table.name)? {
            existing += 1;
        }
    }

    if recreate {
        let tx = conn.transaction()?;
        IMDB_SCHEMA.drop_all(&tx).context("Failed to drop existing tables")?;
        IMDB_SCHEMA.create(&tx).context("Failed to create tables")?;
        tx.commit()?;
        info!("Recreated {} tables", IMDB_SCHEMA.tables.len());
        return Ok(Provisioned::Recreated);
    }

    if existing == 0 {
        let tx = conn.transaction()?;
        IMDB_SCHEMA.create(&tx).context("Failed to create tables")?;
        tx.commit()?;
        info!("Created {} tables", IMDB_SCHEMA.tables.len());
        return Ok(Provisioned::Created);
    }

    if let Some(version) = VersionedSchema::stamped_version(conn)? {
        if version != IMDB_SCHEMA.version {
            info!(
                "Database schema version {} differs from {}",
                version, IMDB_SCHEMA.version
            );
        }
    }
    let problems = IMDB_SCHEMA.validate(conn)?;
    Ok(Provisioned::Validated { problems })
}
