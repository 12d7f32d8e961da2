mod introspect;
mod versioned_schema;

pub use introspect::{
    count_rows, is_empty, list_tables, quote_ident, read_table_info, table_exists, ColumnInfo,
    TableInfo,
};
pub use versioned_schema::{
    Column, ForeignKey, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
};
