use crate::dataset::{DatasetFile, RangeRule};
use crate::import::{BadRowPolicy, FailurePolicy};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Locations (can override CLI)
    pub db_path: Option<String>,
    pub dataset_dir: Option<String>,

    // Failure handling
    pub on_file_failure: Option<FailurePolicy>,
    pub on_bad_row: Option<BadRowPolicy>,

    // Connection
    pub connect_retries: Option<u32>,
    pub retry_interval_secs: Option<u64>,
    pub busy_timeout_ms: Option<u64>,

    // Loading
    pub batch_size: Option<usize>,
    pub progress_interval_secs: Option<u64>,
    pub verify_foreign_keys: Option<bool>,
    pub discover_extra_files: Option<bool>,

    /// Replaces the built-in IMDb order entirely when present.
    pub import_order: Option<Vec<DatasetFile>>,
    /// Replaces the built-in data quality rules when present.
    pub quality_rules: Option<Vec<RangeRule>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
