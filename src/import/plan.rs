//! Builds the ordered list of files a run will attempt.

use crate::dataset::DatasetFile;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub source: DatasetFile,
    pub path: PathBuf,
    /// Listed in the configured import order rather than found on disk.
    pub declared: bool,
}

/// Declared files first, in their configured order, whether or not they exist
/// on disk. With `discover`, any other `*.tsv.gz` directly inside
/// `dataset_dir` follows, sorted by file name.
pub fn build_plan(dataset_dir: &Path, order: &[DatasetFile], discover: bool) -> Vec<PlannedFile> {
    let mut plan: Vec<PlannedFile> = order
        .iter()
        .map(|source| PlannedFile {
            path: dataset_dir.join(&source.file),
            source: source.clone(),
            declared: true,
        })
        .collect();

    if !discover {
        return plan;
    }
    if !dataset_dir.is_dir() {
        warn!("Dataset directory {:?} not found; no extra files discovered", dataset_dir);
        return plan;
    }

    let walker = WalkDir::new(dataset_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable dataset entry: {}", e);
                None
            }
        });

    for entry in walker {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if order.iter().any(|declared| declared.file == name) {
            continue;
        }
        if let Some(source) = DatasetFile::discovered(name) {
            debug!("Discovered {} -> table {}", source.file, source.table);
            plan.push(PlannedFile {
                path: entry.path().to_path_buf(),
                source,
                declared: false,
            });
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::default_import_order;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) {
        std::fs::write(dir.path().join(name), b"").unwrap();
    }

    fn tables(plan: &[PlannedFile]) -> Vec<&str> {
        plan.iter().map(|p| p.source.table.as_str()).collect()
    }

    #[test]
    fn test_declared_order_comes_first_even_when_files_are_absent() {
        let dir = TempDir::new().unwrap();
        let plan = build_plan(dir.path(), &default_import_order(), true);

        assert_eq!(
            tables(&plan),
            vec![
                "name_basics",
                "title_basics",
                "title_ratings",
                "title_crew",
                "title_episode",
                "title_akas",
                "title_principals",
            ]
        );
        assert!(plan.iter().all(|p| p.declared));
        assert_eq!(plan[0].path, dir.path().join("name.basics.tsv.gz"));
    }

    #[test]
    fn test_undeclared_files_are_appended_by_name() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "zeta.extra.tsv.gz");
        touch(&dir, "title.basics.tsv.gz");
        touch(&dir, "alpha.tsv.gz");
        touch(&dir, "readme.txt");
        std::fs::create_dir(dir.path().join("nested.tsv.gz")).unwrap();

        let order = vec![DatasetFile::new("title.basics.tsv.gz", "title_basics", &[])];
        let plan = build_plan(dir.path(), &order, true);

        assert_eq!(tables(&plan), vec!["title_basics", "alpha", "zeta_extra"]);
        assert!(!plan[1].declared);
    }

    #[test]
    fn test_discovery_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "alpha.tsv.gz");

        let plan = build_plan(dir.path(), &[], false);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_missing_directory_keeps_declared_files() {
        let dir = TempDir::new().unwrap();
        let order = vec![DatasetFile::new("people.tsv.gz", "people", &[])];

        let plan = build_plan(&dir.path().join("nope"), &order, true);
        assert_eq!(tables(&plan), vec!["people"]);
    }
}
