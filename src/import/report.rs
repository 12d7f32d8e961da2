//! Per-run result accumulator and the final report built from it.

use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileOutcome {
    Succeeded {
        rows_committed: u64,
        rows_skipped: u64,
        quality_violations: u64,
        elapsed_ms: u64,
    },
    Failed {
        kind: String,
        diagnostic: String,
        rows_committed: u64,
        elapsed_ms: u64,
    },
    NotStarted {
        reason: String,
    },
}

impl FileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileOutcome::Succeeded { .. } => "succeeded",
            FileOutcome::Failed { .. } => "failed",
            FileOutcome::NotStarted { .. } => "not started",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file: String,
    pub table: String,
    pub path: PathBuf,
    pub outcome: FileOutcome,
    pub warnings: Vec<String>,
}

/// Row count read back from the destination after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: String,
    pub rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    CompletedWithFailures { failures: usize },
    Aborted { file: String },
    Interrupted,
}

impl RunStatus {
    /// Exit code for a process supervisor.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunStatus::Completed | RunStatus::CompletedWithFailures { .. } => 0,
            RunStatus::Aborted { .. } => 1,
            RunStatus::Interrupted => 130,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: String,
    pub elapsed_ms: u64,
    pub status: RunStatus,
    pub files: Vec<FileReport>,
    pub table_counts: Vec<TableCount>,
    /// Run-level warnings, such as orphaned foreign keys.
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_failed()).count()
    }

    pub fn table_count(&self, table: &str) -> Option<u64> {
        self.table_counts
            .iter()
            .find(|c| c.table == table)
            .and_then(|c| c.rows)
    }

    pub fn file(&self, file: &str) -> Option<&FileReport> {
        self.files.iter().find(|f| f.file == file)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
