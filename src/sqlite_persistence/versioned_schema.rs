use super::introspect::{quote_ident, read_table_info};
use anyhow::Result;
use rusqlite::{params, Connection};

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    /// Stored as 0/1, declared as BOOLEAN so loaders can tell it apart from a count.
    Boolean,
}

impl SqlType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Boolean => "BOOLEAN",
        }
    }

    fn from_declared(declared: &str) -> Option<Self> {
        match declared.to_ascii_uppercase().as_str() {
            "TEXT" => Some(SqlType::Text),
            "INTEGER" => Some(SqlType::Integer),
            "REAL" => Some(SqlType::Real),
            "BOOLEAN" => Some(SqlType::Boolean),
            _ => None,
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub default_value: Option<&'static str>,
    pub foreign_key: Option<&'static ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
}

impl Table {
    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let mut def = format!("{} {}", column.name, column.sql_type.as_sql());
                if column.is_primary_key {
                    def.push_str(" PRIMARY KEY");
                }
                if column.non_null {
                    def.push_str(" NOT NULL");
                }
                if let Some(default_value) = column.default_value {
                    def.push_str(&format!(" DEFAULT {}", default_value));
                }
                if let Some(fk) = column.foreign_key {
                    def.push_str(&format!(
                        " REFERENCES {}({})",
                        fk.foreign_table, fk.foreign_column
                    ));
                }
                def
            })
            .collect();

        for unique_constraint in self.unique_constraints {
            parts.push(format!("UNIQUE ({})", unique_constraint.join(", ")));
        }
        format!("CREATE TABLE {} ({});", self.name, parts.join(", "))
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&self.create_sql(), params![])?;
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    pub fn drop(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            &format!("DROP TABLE IF EXISTS {};", quote_ident(self.name)),
            params![],
        )?;
        Ok(())
    }

    /// Compares the live table against this declaration and returns every
    /// discrepancy found. An empty list means the table matches.
    pub fn diff(&self, conn: &Connection) -> Result<Vec<String>> {
        let Some(actual) = read_table_info(conn, self.name)? else {
            return Ok(vec![format!("table {} does not exist", self.name)]);
        };

        let mut problems = Vec::new();
        for expected in self.columns {
            let Some(column) = actual.column(expected.name) else {
                problems.push(format!(
                    "table {} is missing column {}",
                    self.name, expected.name
                ));
                continue;
            };
            if SqlType::from_declared(&column.declared_type) != Some(*expected.sql_type) {
                problems.push(format!(
                    "table {} column {} type mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.sql_type.as_sql(),
                    column.declared_type
                ));
            }
            if column.non_null != expected.non_null {
                problems.push(format!(
                    "table {} column {} non-null mismatch: expected {}, got {}",
                    self.name, expected.name, expected.non_null, column.non_null
                ));
            }
            if column.primary_key != expected.is_primary_key {
                problems.push(format!(
                    "table {} column {} primary key mismatch: expected {}, got {}",
                    self.name, expected.name, expected.is_primary_key, column.primary_key
                ));
            }
        }
        for column in &actual.columns {
            if !self.columns.iter().any(|c| c.name == column.name) {
                problems.push(format!(
                    "table {} has unexpected column {}",
                    self.name, column.name
                ));
            }
        }

        for (index_name, _) in self.indices {
            let index_exists: bool = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !index_exists {
                problems.push(format!(
                    "table {} is missing index '{}'",
                    self.name, index_name
                ));
            }
        }

        for expected_columns in self.unique_constraints {
            let mut expected: Vec<&str> = expected_columns.to_vec();
            expected.sort_unstable();
            let found = actual.unique_sets.iter().any(|actual_cols| {
                let mut cols: Vec<&str> = actual_cols.iter().map(String::as_str).collect();
                cols.sort_unstable();
                cols == expected
            });
            if !found {
                problems.push(format!(
                    "table {} is missing unique constraint on columns ({})",
                    self.name,
                    expected_columns.join(", ")
                ));
            }
        }

        Ok(problems)
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
}

impl VersionedSchema {
    /// Creates every table in declaration order and stamps `user_version`.
    pub fn create(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.create(conn)?;
        }
        conn.pragma_update(None, "user_version", BASE_DB_VERSION + self.version)?;
        Ok(())
    }

    /// Drops every table, dependents first.
    pub fn drop_all(&self, conn: &Connection) -> Result<()> {
        for table in self.tables.iter().rev() {
            table.drop(conn)?;
        }
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<Vec<String>> {
        let mut problems = Vec::new();
        for table in self.tables {
            problems.extend(table.diff(conn)?);
        }
        Ok(problems)
    }

    /// Returns the schema version stamped in the database, if it was created by us.
    pub fn stamped_version(conn: &Connection) -> Result<Option<usize>> {
        let raw: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        Ok((raw as usize).checked_sub(BASE_DB_VERSION))
    }
}

pub const BASE_DB_VERSION: usize = 7000;
