//! Temporary dataset directory plus database, wired to the real pipeline.
#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use imdb_import::config::{AppConfig, CliConfig};
use imdb_import::database;
use imdb_import::dataset::{provision, DatasetFile};
use imdb_import::import::{
    build_plan, ImportObserver, ImportOptions, ImportOrchestrator, NoopObserver, RunReport,
};
use rusqlite::Connection;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestWorkspace {
    // Held for its Drop: removes everything below.
    _dir: TempDir,
    pub dataset_dir: PathBuf,
    pub db_path: PathBuf,
}

impl TestWorkspace {
    /// An empty database file with no tables.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let dataset_dir = dir.path().join("dataset");
        fs::create_dir_all(&dataset_dir).expect("Failed to create dataset dir");
        let db_path = dir.path().join("imdb.db");
        Connection::open(&db_path)
            .and_then(|conn| conn.execute_batch("PRAGMA user_version = 0;"))
            .expect("Failed to create database");

        Self {
            _dir: dir,
            dataset_dir,
            db_path,
        }
    }

    /// A database provisioned with the seven IMDb tables.
    pub fn with_imdb_schema() -> Self {
        let workspace = Self::new();
        let mut conn = workspace.connection();
        provision(&mut conn, false).expect("Failed to provision schema");
        workspace
    }

    /// A database provisioned with arbitrary DDL.
    pub fn with_sql(sql: &str) -> Self {
        let workspace = Self::new();
        workspace
            .connection()
            .execute_batch(sql)
            .expect("Failed to run setup SQL");
        workspace
    }

    pub fn connection(&self) -> Connection {
        Connection::open(&self.db_path).expect("Failed to open database")
    }

    pub fn write_tsv_gz(&self, name: &str, content: &str) -> PathBuf {
        self.write_gz_bytes(name, content.as_bytes())
    }

    /// Compressed fixture that need not be valid UTF-8.
    pub fn write_gz_bytes(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.dataset_dir.join(name);
        let file = File::create(&path).expect("Failed to create fixture");
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(content).expect("Failed to write fixture");
        encoder.finish().expect("Failed to finish gzip stream");
        path
    }

    pub fn write_raw(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dataset_dir.join(name);
        fs::write(&path, bytes).expect("Failed to write fixture");
        path
    }

    /// Config as the binary would resolve it with no flags, pointed here.
    pub fn config(&self) -> AppConfig {
        let cli = CliConfig {
            db_path: self.db_path.clone(),
            dataset_dir: self.dataset_dir.clone(),
            retry_interval_secs: 0,
            progress_interval_secs: 0,
            ..Default::default()
        };
        AppConfig::resolve(&cli, None).expect("Failed to resolve config")
    }

    pub fn run_default(&self) -> RunReport {
        self.run(&self.config().import_order, ImportOptions::default())
    }

    pub fn run(&self, order: &[DatasetFile], options: ImportOptions) -> RunReport {
        self.run_observed(order, options, &mut NoopObserver, Arc::new(AtomicBool::new(false)))
    }

    pub fn run_observed(
        &self,
        order: &[DatasetFile],
        options: ImportOptions,
        observer: &mut dyn ImportObserver,
        cancel: Arc<AtomicBool>,
    ) -> RunReport {
        let config = self.config();
        let mut conn = database::connect(&config.connection).expect("Failed to connect");
        let plan = build_plan(&self.dataset_dir, order, false);
        ImportOrchestrator::new(&mut conn, options)
            .with_cancel_flag(cancel)
            .run(&plan, observer)
    }

    pub fn count(&self, table: &str) -> u64 {
        let count: i64 = self
            .connection()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .expect("Failed to count rows");
        count as u64
    }

    pub fn path(&self) -> &Path {
        &self.dataset_dir
    }
}
