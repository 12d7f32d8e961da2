//! Dataset fixtures and a recording observer.

use super::constants::*;
use super::workspace::TestWorkspace;
use imdb_import::import::{FileReport, ImportObserver, PlannedFile};

/// Writes all seven IMDb files into the workspace dataset directory.
pub fn write_full_dataset(workspace: &TestWorkspace) {
    workspace.write_tsv_gz("name.basics.tsv.gz", NAME_BASICS_TSV);
    workspace.write_tsv_gz("title.basics.tsv.gz", TITLE_BASICS_TSV);
    workspace.write_tsv_gz("title.ratings.tsv.gz", TITLE_RATINGS_TSV);
    workspace.write_tsv_gz("title.crew.tsv.gz", TITLE_CREW_TSV);
    workspace.write_tsv_gz("title.episode.tsv.gz", TITLE_EPISODE_TSV);
    workspace.write_tsv_gz("title.akas.tsv.gz", TITLE_AKAS_TSV);
    workspace.write_tsv_gz("title.principals.tsv.gz", TITLE_PRINCIPALS_TSV);
}

/// Keeps every observer callback as a readable event string.
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Vec<String>,
    pub commits: Vec<(String, u64)>,
}

#[allow(dead_code)]
impl RecordingObserver {
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }
}

impl ImportObserver for RecordingObserver {
    fn file_started(&mut self, file: &PlannedFile, _position: usize, _total: usize) {
        self.events.push(format!("start {}", file.source.table));
    }

    fn rows_committed(&mut self, table: &str, rows_committed: u64) {
        self.commits.push((table.to_string(), rows_committed));
    }

    fn file_finished(&mut self, report: &FileReport) {
        self.events.push(format!("finish {}", report.table));
    }
}
