//! The import pipeline: decode, normalize, load, orchestrate.

mod decoder;
mod error;
mod loader;
mod normalizer;
mod orchestrator;
mod plan;
mod policy;
mod report;

pub use decoder::{RawRow, TsvDecoder};
pub use error::{DecodeError, FieldCoercionError, ImportError, RowError};
pub use loader::{LoadStats, LoadTarget, TableLoader};
pub use normalizer::{
    normalize_field, ColumnKind, ColumnSpec, FieldValue, NormalizedRow, NormalizedRows,
    RecordNormalizer, NULL_SENTINEL,
};
pub use orchestrator::{ImportObserver, ImportOptions, ImportOrchestrator, NoopObserver};
pub use plan::{build_plan, PlannedFile};
pub use policy::{BadRowPolicy, FailurePolicy};
pub use report::{FileOutcome, FileReport, RunReport, RunStatus, TableCount};
