//! Console progress: a spinner per file, fed both by committed batches and by
//! an independent poller that reads the destination's row count.
//!
//! The poller only observes. It owns a separate read-only connection, and any
//! error it hits is logged at debug level and otherwise ignored.

use crate::cli_style::{self, format_count};
use crate::import::{FileOutcome, FileReport, ImportObserver, PlannedFile};
use crate::sqlite_persistence::count_rows;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

pub struct RowCountPoller {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl RowCountPoller {
    pub fn spawn<F>(db_path: &Path, table: &str, interval: Duration, on_count: F) -> Self
    where
        F: Fn(u64) + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();
        let db_path = db_path.to_path_buf();
        let table = table.to_string();

        let handle = thread::spawn(move || {
            let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            let conn = match Connection::open_with_flags(&db_path, flags) {
                Ok(conn) => conn,
                Err(e) => {
                    debug!("Row count poller could not open {:?}: {}", db_path, e);
                    return;
                }
            };
            loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => match count_rows(&conn, &table) {
                        Ok(rows) => on_count(rows),
                        Err(e) => debug!("Row count poll on {} failed: {}", table, e),
                    },
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Self { stop, handle }
    }

    pub fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            debug!("Row count poller panicked");
        }
    }
}

/// Observer rendering one spinner per file and a result line when it ends.
pub struct ConsoleProgress {
    db_path: PathBuf,
    poll_interval: Option<Duration>,
    spinner: Option<ProgressBar>,
    poller: Option<RowCountPoller>,
    started: Option<Instant>,
}

impl ConsoleProgress {
    pub fn new(db_path: &Path, poll_interval: Option<Duration>) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
            poll_interval,
            spinner: None,
            poller: None,
            started: None,
        }
    }

    fn finish(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.yellow} [{elapsed_precise}] {prefix:.bold} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl ImportObserver for ConsoleProgress {
    fn file_started(&mut self, file: &PlannedFile, position: usize, total: usize) {
        self.finish();

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_prefix(format!(
            "[{}/{}] {}",
            position + 1,
            total,
            file.source.table
        ));
        spinner.set_message("starting");
        spinner.enable_steady_tick(Duration::from_millis(120));

        if let Some(interval) = self.poll_interval {
            let bar = spinner.clone();
            self.poller = Some(RowCountPoller::spawn(
                &self.db_path,
                &file.source.table,
                interval,
                move |rows| bar.set_message(format!("{} rows in table", format_count(rows))),
            ));
        }
        self.spinner = Some(spinner);
        self.started = Some(Instant::now());
    }

    fn rows_committed(&mut self, _table: &str, rows_committed: u64) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(format!("{} rows committed", format_count(rows_committed)));
        }
    }

    fn file_finished(&mut self, report: &FileReport) {
        self.finish();
        let took = self
            .started
            .take()
            .map(|s| HumanDuration(s.elapsed()).to_string())
            .unwrap_or_default();

        match &report.outcome {
            FileOutcome::Succeeded { rows_committed, .. } => cli_style::print_success(&format!(
                "{}: {} rows ({})",
                report.table,
                format_count(*rows_committed),
                took
            )),
            FileOutcome::Failed { kind, .. } => {
                cli_style::print_error(&format!("{}: {} ({})", report.table, kind, took))
            }
            FileOutcome::NotStarted { .. } => {}
        }
        for warning in &report.warnings {
            cli_style::print_warning(&format!("{}: {}", report.table, warning));
        }
    }
}

impl Drop for ConsoleProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
