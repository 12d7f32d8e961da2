//! IMDb dataset importer library
//!
//! Streams the gzipped TSV dumps into an SQLite database in referential order.

pub mod cli_style;
pub mod config;
pub mod database;
pub mod dataset;
pub mod import;
pub mod progress;
pub mod retry;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CliConfig, FileConfig};
pub use import::{build_plan, ImportOptions, ImportOrchestrator, RunReport, RunStatus};
