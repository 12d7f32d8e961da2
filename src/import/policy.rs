use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// What the orchestrator does after a file fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop the run; files after the failing one are not attempted.
    Abort,
    /// Record the failure and move on to the next file.
    #[default]
    Skip,
}

/// What the loader does with a row whose fields cannot be stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BadRowPolicy {
    /// Fail the whole file at the first bad row.
    #[default]
    RejectFile,
    /// Drop the row, count it, keep loading.
    SkipRow,
}
