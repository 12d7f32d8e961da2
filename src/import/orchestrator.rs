//! Runs the planned files one after another and accumulates the run report.
//!
//! Each file goes Pending -> Loading -> Succeeded | Failed. Files never
//! reached because the run stopped early end as NotStarted. The connection
//! is owned by the orchestrator for the whole run.

use super::decoder::TsvDecoder;
use super::error::ImportError;
use super::loader::{LoadStats, LoadTarget, TableLoader};
use super::normalizer::{NormalizedRows, RecordNormalizer};
use super::plan::PlannedFile;
use super::policy::{BadRowPolicy, FailurePolicy};
use super::report::{FileOutcome, FileReport, RunReport, RunStatus, TableCount};
use crate::config::AppConfig;
use crate::database;
use crate::dataset::RangeRule;
use crate::sqlite_persistence::{count_rows, is_empty, table_exists};
use chrono::Utc;
use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Receives progress events while a run is in flight.
pub trait ImportObserver {
    fn file_started(&mut self, _file: &PlannedFile, _position: usize, _total: usize) {}
    fn rows_committed(&mut self, _table: &str, _rows_committed: u64) {}
    fn file_finished(&mut self, _report: &FileReport) {}
}

pub struct NoopObserver;

impl ImportObserver for NoopObserver {}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub on_file_failure: FailurePolicy,
    pub on_bad_row: BadRowPolicy,
    pub batch_size: usize,
    pub verify_foreign_keys: bool,
    pub quality_rules: Vec<RangeRule>,
}

impl ImportOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            on_file_failure: config.on_file_failure,
            on_bad_row: config.on_bad_row,
            batch_size: config.batch_size,
            verify_foreign_keys: config.verify_foreign_keys,
            quality_rules: config.quality_rules.clone(),
        }
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            on_file_failure: FailurePolicy::default(),
            on_bad_row: BadRowPolicy::default(),
            batch_size: 50_000,
            verify_foreign_keys: false,
            quality_rules: crate::dataset::default_quality_rules(),
        }
    }
}

enum Stop {
    Aborted(String),
    Interrupted,
}

pub struct ImportOrchestrator<'c> {
    conn: &'c mut Connection,
    options: ImportOptions,
    cancel: Arc<AtomicBool>,
}

impl<'c> ImportOrchestrator<'c> {
    pub fn new(conn: &'c mut Connection, options: ImportOptions) -> Self {
        Self {
            conn,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the flag stops the run before the next file starts.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(&mut self, plan: &[PlannedFile], observer: &mut dyn ImportObserver) -> RunReport {
        let started_at = Utc::now();
        let started = Instant::now();
        let mut run_warnings = Vec::new();

        if let Err(e) = database::enter_load_mode(&*self.conn) {
            warn!("Could not switch database to load mode: {}", e);
        }

        let mut files = Vec::with_capacity(plan.len());
        let mut stop: Option<Stop> = None;
        for (position, planned) in plan.iter().enumerate() {
            if stop.is_none() && self.cancel.load(Ordering::SeqCst) {
                warn!("Interrupted; {} file(s) left unattempted", plan.len() - position);
                stop = Some(Stop::Interrupted);
            }
            if let Some(reason) = &stop {
                let reason = match reason {
                    Stop::Aborted(file) => format!("run aborted after {} failed", file),
                    Stop::Interrupted => "interrupted".to_string(),
                };
                files.push(file_report(planned, FileOutcome::NotStarted { reason }, Vec::new()));
                continue;
            }

            let (report, fatal) = self.run_file(planned, position, plan.len(), observer);
            if fatal && self.options.on_file_failure == FailurePolicy::Abort {
                error!("Aborting run: {} failed", planned.source.file);
                stop = Some(Stop::Aborted(planned.source.file.clone()));
            }
            files.push(report);
        }

        if let Err(e) = database::leave_load_mode(&*self.conn) {
            warn!("Could not restore normal database settings: {}", e);
            run_warnings.push(format!("database settings not restored: {}", e));
        }
        if self.options.verify_foreign_keys {
            run_warnings.extend(self.check_foreign_keys());
        }

        let table_counts = self.recount(plan);
        let failures = files.iter().filter(|f| f.outcome.is_failed()).count();
        let status = match stop {
            Some(Stop::Interrupted) => RunStatus::Interrupted,
            Some(Stop::Aborted(file)) => RunStatus::Aborted { file },
            None if failures > 0 => RunStatus::CompletedWithFailures { failures },
            None => RunStatus::Completed,
        };
        info!("Import finished: {:?} in {:?}", status, started.elapsed());

        RunReport {
            started_at: started_at.to_rfc3339(),
            finished_at: Utc::now().to_rfc3339(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            status,
            files,
            table_counts,
            warnings: run_warnings,
        }
    }

    /// Imports one file. The flag is set for failures that stop the run under
    /// the abort policy; a source file that does not exist is not one of them.
    fn run_file(
        &mut self,
        planned: &PlannedFile,
        position: usize,
        total: usize,
        observer: &mut dyn ImportObserver,
    ) -> (FileReport, bool) {
        let table = planned.source.table.as_str();
        info!(
            "[{}/{}] Importing {} into {}",
            position + 1,
            total,
            planned.source.file,
            table
        );
        observer.file_started(planned, position, total);

        let mut warnings = self.check_predecessors(planned);
        let started = Instant::now();
        let mut rows_skipped = 0;
        let result = self.import_file(planned, observer, &mut rows_skipped);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if rows_skipped > 0 {
            warnings.push(format!("{} malformed rows skipped", rows_skipped));
        }

        let mut fatal = false;
        let outcome = match result {
            Ok(stats) => {
                info!(
                    "{}: {} rows in {:.1}s",
                    table,
                    stats.rows_committed,
                    elapsed_ms as f64 / 1000.0
                );
                if stats.quality_violations > 0 {
                    warn!("{}: {} values out of range", table, stats.quality_violations);
                    warnings.push(format!("{} values out of range", stats.quality_violations));
                }
                FileOutcome::Succeeded {
                    rows_committed: stats.rows_committed,
                    rows_skipped: stats.rows_skipped,
                    quality_violations: stats.quality_violations,
                    elapsed_ms,
                }
            }
            Err(e) => {
                match &e {
                    ImportError::TableMissing { .. } => {
                        error!("{}: {} (schema and import order disagree)", planned.source.file, e)
                    }
                    _ => error!("{}: {}", planned.source.file, e),
                }
                fatal = !e.is_missing_source();
                FileOutcome::Failed {
                    kind: e.kind().to_string(),
                    diagnostic: e.to_string(),
                    rows_committed: e.rows_committed(),
                    elapsed_ms,
                }
            }
        };

        let report = file_report(planned, outcome, warnings);
        observer.file_finished(&report);
        (report, fatal)
    }

    fn import_file(
        &mut self,
        planned: &PlannedFile,
        observer: &mut dyn ImportObserver,
        rows_skipped: &mut u64,
    ) -> Result<LoadStats, ImportError> {
        let table = planned.source.table.as_str();
        let mut loader = TableLoader::new(&mut *self.conn, self.options.batch_size);

        // The destination is checked before the source is opened.
        let info = loader.describe(table)?;
        let decoder = TsvDecoder::open(&planned.path)
            .map_err(|e| ImportError::from_decode(e, table, 0))?;
        let target = LoadTarget::resolve(
            &info,
            decoder.header(),
            &planned.path,
            &self.options.quality_rules,
        )?;

        let normalizer = RecordNormalizer::new(target.columns.clone());
        let mut rows = NormalizedRows::new(decoder, normalizer, self.options.on_bad_row, table);
        let loaded = loader.load(&target, &mut rows, &mut |committed| {
            observer.rows_committed(table, committed)
        });
        // Skips count even when a later batch fails the file.
        *rows_skipped = rows.skipped();
        let mut stats = loaded?;
        stats.rows_skipped = *rows_skipped;
        Ok(stats)
    }

    /// Warns about predecessors that are empty or absent: loading anyway
    /// leaves every foreign key in this file dangling.
    fn check_predecessors(&self, planned: &PlannedFile) -> Vec<String> {
        let mut warnings = Vec::new();
        for dependency in &planned.source.depends_on {
            let state = table_exists(&*self.conn, dependency).and_then(|exists| {
                if exists {
                    is_empty(&*self.conn, dependency).map(|empty| if empty { Some("empty") } else { None })
                } else {
                    Ok(Some("missing"))
                }
            });
            match state {
                Ok(Some(state)) => {
                    warn!(
                        "{} depends on {}, which is {}; its references will be orphaned",
                        planned.source.table, dependency, state
                    );
                    warnings.push(format!("predecessor table {} is {}", dependency, state));
                }
                Ok(None) => {}
                Err(e) => debug!("Could not inspect predecessor {}: {}", dependency, e),
            }
        }
        warnings
    }

    fn check_foreign_keys(&self) -> Vec<String> {
        match database::foreign_key_orphans(&*self.conn) {
            Ok(orphans) => orphans
                .into_iter()
                .map(|(table, count)| {
                    warn!("{}: {} rows reference missing parents", table, count);
                    format!("{}: {} rows with dangling foreign keys", table, count)
                })
                .collect(),
            Err(e) => {
                warn!("Foreign key check failed: {}", e);
                vec![format!("foreign key check failed: {}", e)]
            }
        }
    }

    /// Row counts are always read back from the tables, never accumulated.
    fn recount(&self, plan: &[PlannedFile]) -> Vec<TableCount> {
        let mut counts: Vec<TableCount> = Vec::new();
        for planned in plan {
            let table = &planned.source.table;
            if counts.iter().any(|c| &c.table == table) {
                continue;
            }
            let count = match count_rows(&*self.conn, table) {
                Ok(rows) => TableCount {
                    table: table.clone(),
                    rows: Some(rows),
                    error: None,
                },
                Err(e) => TableCount {
                    table: table.clone(),
                    rows: None,
                    error: Some(e.to_string()),
                },
            };
            counts.push(count);
        }
        counts
    }
}

fn file_report(planned: &PlannedFile, outcome: FileOutcome, warnings: Vec<String>) -> FileReport {
    FileReport {
        file: planned.source.file.clone(),
        table: planned.source.table.clone(),
        path: planned.path.clone(),
        outcome,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetFile;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_gz(dir: &Path, name: &str, content: &str) {
        let file = std::fs::File::create(dir.join(name)).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::fast());
        encoder.write_all(content.as_bytes()).unwrap();
        encoder.finish().unwrap();
    }

    fn planned(dir: &Path, file: &str, table: &str, depends_on: &[&str]) -> PlannedFile {
        PlannedFile {
            source: DatasetFile::new(file, table, depends_on),
            path: dir.join(file),
            declared: true,
        }
    }

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE people (id TEXT PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE credits (person TEXT NOT NULL, ordering INTEGER NOT NULL,
                                   role TEXT, UNIQUE (person, ordering));",
        )
        .unwrap();
        conn
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ImportObserver for Recorder {
        fn file_started(&mut self, file: &PlannedFile, _position: usize, _total: usize) {
            self.events.push(format!("start {}", file.source.table));
        }
        fn file_finished(&mut self, report: &FileReport) {
            self.events
                .push(format!("finish {} {}", report.table, report.outcome.label()));
        }
    }

    #[test]
    fn test_missing_source_never_aborts() {
        let dir = TempDir::new().unwrap();
        write_gz(dir.path(), "credits.tsv.gz", "person\tordering\trole\n");
        let plan = vec![
            planned(dir.path(), "people.tsv.gz", "people", &[]),
            planned(dir.path(), "credits.tsv.gz", "credits", &["people"]),
        ];
        let mut conn = conn();
        let options = ImportOptions {
            on_file_failure: FailurePolicy::Abort,
            ..Default::default()
        };

        let report = ImportOrchestrator::new(&mut conn, options).run(&plan, &mut NoopObserver);

        assert_eq!(report.status, RunStatus::CompletedWithFailures { failures: 1 });
        let people = report.file("people.tsv.gz").unwrap();
        assert!(matches!(&people.outcome, FileOutcome::Failed { kind, .. } if kind == "SourceUnreadable"));
        let credits = report.file("credits.tsv.gz").unwrap();
        assert!(matches!(credits.outcome, FileOutcome::Succeeded { rows_committed: 0, .. }));
        assert_eq!(credits.warnings, vec!["predecessor table people is empty"]);
    }

    #[test]
    fn test_abort_policy_leaves_later_files_unstarted() {
        let dir = TempDir::new().unwrap();
        write_gz(dir.path(), "ghosts.tsv.gz", "id\ng1\n");
        write_gz(dir.path(), "people.tsv.gz", "id\tname\np1\tAda\n");
        let plan = vec![
            planned(dir.path(), "ghosts.tsv.gz", "ghosts", &[]),
            planned(dir.path(), "people.tsv.gz", "people", &[]),
        ];
        let mut conn = conn();
        let options = ImportOptions {
            on_file_failure: FailurePolicy::Abort,
            ..Default::default()
        };
        let mut recorder = Recorder::default();

        let report = ImportOrchestrator::new(&mut conn, options).run(&plan, &mut recorder);

        assert_eq!(
            report.status,
            RunStatus::Aborted {
                file: "ghosts.tsv.gz".to_string()
            }
        );
        assert_eq!(report.status.exit_code(), 1);
        assert!(matches!(
            report.file("people.tsv.gz").unwrap().outcome,
            FileOutcome::NotStarted { .. }
        ));
        assert_eq!(recorder.events, vec!["start ghosts", "finish ghosts failed"]);
        assert_eq!(report.table_count("people"), Some(0));
        assert_eq!(report.table_counts[0].rows, None);
    }

    #[test]
    fn test_cancel_flag_stops_before_first_file() {
        let dir = TempDir::new().unwrap();
        write_gz(dir.path(), "people.tsv.gz", "id\tname\np1\tAda\n");
        let plan = vec![planned(dir.path(), "people.tsv.gz", "people", &[])];
        let mut conn = conn();
        let cancel = Arc::new(AtomicBool::new(true));

        let report = ImportOrchestrator::new(&mut conn, ImportOptions::default())
            .with_cancel_flag(cancel)
            .run(&plan, &mut NoopObserver);

        assert_eq!(report.status, RunStatus::Interrupted);
        assert_eq!(report.status.exit_code(), 130);
        assert_eq!(report.table_count("people"), Some(0));
    }

    #[test]
    fn test_skipped_rows_are_reported() {
        let dir = TempDir::new().unwrap();
        write_gz(
            dir.path(),
            "credits.tsv.gz",
            "person\tordering\trole\np1\t1\tdirector\np1\tfirst\tactor\np2\t1\n",
        );
        let plan = vec![planned(dir.path(), "credits.tsv.gz", "credits", &[])];
        let mut conn = conn();
        let options = ImportOptions {
            on_bad_row: BadRowPolicy::SkipRow,
            ..Default::default()
        };

        let report = ImportOrchestrator::new(&mut conn, options).run(&plan, &mut NoopObserver);

        assert_eq!(report.status, RunStatus::Completed);
        assert!(matches!(
            report.files[0].outcome,
            FileOutcome::Succeeded {
                rows_committed: 1,
                rows_skipped: 2,
                ..
            }
        ));
        assert_eq!(report.table_count("credits"), Some(1));
    }
}
