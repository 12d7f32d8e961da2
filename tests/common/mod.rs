//! Common test infrastructure
//!
//! Every test gets its own `TestWorkspace`: a temporary directory holding a
//! dataset folder and an SQLite database. Tests should only import from this
//! module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestWorkspace, NAME_BASICS_TSV};
//!
//! #[test]
//! fn test_people_load() {
//!     let workspace = TestWorkspace::with_imdb_schema();
//!     workspace.write_tsv_gz("name.basics.tsv.gz", NAME_BASICS_TSV);
//!     let report = workspace.run_default();
//!     assert_eq!(report.table_count("name_basics"), Some(3));
//! }
//! ```

mod constants;
mod fixtures;
mod workspace;

// Public API - this is what tests import
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{write_full_dataset, RecordingObserver};
pub use workspace::TestWorkspace;
