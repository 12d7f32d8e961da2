//! The IMDb dump files and the order they have to be imported in.

use serde::{Deserialize, Serialize};

/// One source file and the table it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFile {
    pub file: String,
    pub table: String,
    /// Tables whose rows this table references. Checked for emptiness before loading.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl DatasetFile {
    pub fn new(file: &str, table: &str, depends_on: &[&str]) -> Self {
        Self {
            file: file.to_string(),
            table: table.to_string(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Derives the table for an undeclared file: `title.basics.tsv.gz` -> `title_basics`.
    pub fn discovered(file: &str) -> Option<Self> {
        let stem = file.strip_suffix(".tsv.gz")?;
        if stem.is_empty() {
            return None;
        }
        Some(Self {
            file: file.to_string(),
            table: stem.replace('.', "_"),
            depends_on: Vec::new(),
        })
    }
}

/// People and titles first, then everything pointing at them. Principals is
/// by far the largest file, so it goes last.
pub fn default_import_order() -> Vec<DatasetFile> {
    vec![
        DatasetFile::new("name.basics.tsv.gz", "name_basics", &[]),
        DatasetFile::new("title.basics.tsv.gz", "title_basics", &[]),
        DatasetFile::new("title.ratings.tsv.gz", "title_ratings", &["title_basics"]),
        DatasetFile::new("title.crew.tsv.gz", "title_crew", &["title_basics"]),
        DatasetFile::new("title.episode.tsv.gz", "title_episode", &["title_basics"]),
        DatasetFile::new("title.akas.tsv.gz", "title_akas", &["title_basics"]),
        DatasetFile::new(
            "title.principals.tsv.gz",
            "title_principals",
            &["title_basics", "name_basics"],
        ),
    ]
}

/// A bound a numeric column is expected to respect. Violations are reported,
/// never dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRule {
    pub table: String,
    pub column: String,
    pub min: f64,
    pub max: f64,
}

impl RangeRule {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub fn default_quality_rules() -> Vec<RangeRule> {
    vec![RangeRule {
        table: "title_ratings".to_string(),
        column: "averageRating".to_string(),
        min: 0.0,
        max: 10.0,
    }]
}
