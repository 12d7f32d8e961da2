mod files;
mod provision;
mod schema;

pub use files::{default_import_order, default_quality_rules, DatasetFile, RangeRule};
pub use provision::{provision, Provisioned};
pub use schema::IMDB_SCHEMA;
