mod file_config;

pub use file_config::FileConfig;

use crate::dataset::{default_import_order, default_quality_rules, DatasetFile, RangeRule};
use crate::import::{BadRowPolicy, FailurePolicy};
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: PathBuf,
    pub dataset_dir: PathBuf,
    pub on_file_failure: FailurePolicy,
    pub on_bad_row: BadRowPolicy,
    pub connect_retries: u32,
    pub retry_interval_secs: u64,
    pub busy_timeout_ms: u64,
    pub batch_size: usize,
    pub progress_interval_secs: u64,
    pub verify_foreign_keys: bool,
    pub discover_extra_files: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("imdb.db"),
            dataset_dir: PathBuf::from("dataset"),
            on_file_failure: FailurePolicy::default(),
            on_bad_row: BadRowPolicy::default(),
            connect_retries: 3,
            retry_interval_secs: 2,
            busy_timeout_ms: 5000,
            batch_size: 50_000,
            progress_interval_secs: 5,
            verify_foreign_keys: false,
            discover_extra_files: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub db_path: PathBuf,
    /// Retries after the first failed attempt.
    pub retries: u32,
    pub retry_interval: Duration,
    pub busy_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub connection: ConnectionSettings,
    pub dataset_dir: PathBuf,
    pub on_file_failure: FailurePolicy,
    pub on_bad_row: BadRowPolicy,
    pub batch_size: usize,
    /// `None` disables the row count poller.
    pub progress_interval: Option<Duration>,
    pub verify_foreign_keys: bool,
    pub discover_extra_files: bool,
    pub import_order: Vec<DatasetFile>,
    pub quality_rules: Vec<RangeRule>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.db_path.clone());
        let dataset_dir = file
            .dataset_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.dataset_dir.clone());

        let batch_size = file.batch_size.unwrap_or(cli.batch_size);
        if batch_size == 0 {
            bail!("batch_size must be at least 1");
        }

        let import_order = file.import_order.unwrap_or_else(default_import_order);
        validate_import_order(&import_order)?;

        let progress_secs = file
            .progress_interval_secs
            .unwrap_or(cli.progress_interval_secs);
        let progress_interval = (progress_secs > 0).then(|| Duration::from_secs(progress_secs));

        Ok(Self {
            connection: ConnectionSettings {
                db_path,
                retries: file.connect_retries.unwrap_or(cli.connect_retries),
                retry_interval: Duration::from_secs(
                    file.retry_interval_secs.unwrap_or(cli.retry_interval_secs),
                ),
                busy_timeout: Duration::from_millis(
                    file.busy_timeout_ms.unwrap_or(cli.busy_timeout_ms),
                ),
            },
            dataset_dir,
            on_file_failure: file.on_file_failure.unwrap_or(cli.on_file_failure),
            on_bad_row: file.on_bad_row.unwrap_or(cli.on_bad_row),
            batch_size,
            progress_interval,
            verify_foreign_keys: file.verify_foreign_keys.unwrap_or(cli.verify_foreign_keys),
            discover_extra_files: file
                .discover_extra_files
                .unwrap_or(cli.discover_extra_files),
            import_order,
            quality_rules: file.quality_rules.unwrap_or_else(default_quality_rules),
        })
    }
}

fn validate_import_order(order: &[DatasetFile]) -> Result<()> {
    for (i, entry) in order.iter().enumerate() {
        if entry.file.trim().is_empty() || entry.table.trim().is_empty() {
            bail!("import_order entry {} needs both file and table", i + 1);
        }
        if order[..i].iter().any(|earlier| earlier.file == entry.file) {
            bail!("import_order lists {} more than once", entry.file);
        }
    }
    Ok(())
}
