//! Input file discovery.
//!
//! Expands a `ScanSource`'s include pattern under its root directory and
//! derives each file's sort key. Never opens file contents; worksheet
//! scanning lives in the `worksheet` submodule.

pub mod worksheet;

use crate::config::ScanSource;
use crate::error::{Result, SheetMergeError};
use crate::pattern::SubstRule;
use globset::GlobBuilder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One discovered input file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Absolute path.
    pub filename: PathBuf,
    /// Path relative to the scan root, used in diagnostics and reports.
    pub sourcename: String,
    /// Ordering key for most-recent-wins deduplication.
    pub sort_key: String,
}

impl FileRecord {
    /// Record for a file referenced outside a scan, e.g. from an edited
    /// match report.
    pub fn with_sort_key(filename: impl Into<PathBuf>, sort_key: impl Into<String>) -> Self {
        let filename = filename.into();
        let sourcename = filename.to_string_lossy().into_owned();
        Self {
            filename,
            sourcename,
            sort_key: sort_key.into(),
        }
    }
}

/// Expands `source.include` under its root into deduplicated, ordered file
/// records. A malformed glob or sort-key rule is a configuration error and
/// fails fast.
pub fn find_input_files(source: &ScanSource) -> Result<Vec<FileRecord>> {
    // Compile before touching the filesystem, so a malformed pattern is
    // reported even when the root path is misspelled.
    let matcher = GlobBuilder::new(&source.include)
        .literal_separator(true)
        .build()
        .map_err(|e| SheetMergeError::Glob {
            pattern: source.include.clone(),
            reason: e.to_string(),
        })?
        .compile_matcher();

    let rules = source
        .sort_keys
        .iter()
        .map(|expr| SubstRule::parse(expr))
        .collect::<Result<Vec<_>>>()?;

    let root = source
        .root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    if !root.exists() {
        return Ok(Vec::new());
    }
    let root = root.canonicalize()?;

    let mut files: BTreeSet<PathBuf> = BTreeSet::new();
    for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = match entry.path().strip_prefix(&root) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if matcher.is_match(relative) {
            files.insert(entry.path().to_path_buf());
        }
    }

    let records = files
        .into_iter()
        .map(|filename| {
            let sourcename = filename
                .strip_prefix(&root)
                .unwrap_or(&filename)
                .to_string_lossy()
                .into_owned();
            let sort_key = derive_sort_key(&sourcename, &rules);
            tracing::debug!(file = %filename.display(), sort_key, "discovered input file");
            FileRecord {
                filename,
                sourcename,
                sort_key,
            }
        })
        .collect();

    Ok(records)
}

/// Applies each rule in turn; a rule that does not match leaves the key
/// unchanged.
fn derive_sort_key(sourcename: &str, rules: &[SubstRule]) -> String {
    let mut key = sourcename.to_string();
    for rule in rules {
        if let Some(replaced) = rule.apply(&key) {
            key = replaced;
        }
    }
    key
}

/// Convenience: matches a single path (no globbing) into a record,
/// optionally with explicit sort-key rules applied to it.
pub fn record_for_path(path: &Path, sort_keys: &[String]) -> Result<FileRecord> {
    let rules = sort_keys
        .iter()
        .map(|expr| SubstRule::parse(expr))
        .collect::<Result<Vec<_>>>()?;
    let sourcename = path.to_string_lossy().into_owned();
    Ok(FileRecord {
        filename: path.to_path_buf(),
        sort_key: derive_sort_key(&sourcename, &rules),
        sourcename,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap();
    }

    #[test]
    fn test_find_input_files_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScanSource::new("*.xlsx").with_root(dir.path());
        assert!(find_input_files(&source).unwrap().is_empty());
    }

    #[test]
    fn test_find_input_files_missing_root() {
        let source = ScanSource::new("*.xlsx").with_root("/nonexistent/folder/12345");
        assert!(find_input_files(&source).unwrap().is_empty());
    }

    #[test]
    fn test_find_input_files_flat() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.xlsx"));
        touch(&dir.path().join("b.txt"));
        touch(&dir.path().join("deep/c.xlsx"));

        let source = ScanSource::new("*.xlsx").with_root(dir.path());
        let result = find_input_files(&source).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].sourcename, "a.xlsx");
        assert_eq!(result[0].sort_key, "a.xlsx");
        assert!(result[0].filename.is_absolute());
    }

    #[test]
    fn test_find_input_files_recursive() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("example-01.xlsx"));
        touch(&dir.path().join("deep/example-02.xlsx"));
        touch(&dir.path().join("deep/other.txt"));

        let source = ScanSource::new("**/ex*.xlsx").with_root(dir.path());
        let result = find_input_files(&source).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_find_input_files_sort_keys() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("example-01.xlsx"));

        let source = ScanSource::new("**/ex*.xlsx")
            .with_root(dir.path())
            .with_sort_keys(vec![r"/.*?(\d+).*/\1/i".to_string()]);
        let result = find_input_files(&source).unwrap();
        assert_eq!(result[0].sort_key, "01");
    }

    #[test]
    fn test_find_input_files_sort_key_fallback() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("example.xlsx"));

        // No digits, so the rule does not match and the key passes through.
        let source = ScanSource::new("*.xlsx")
            .with_root(dir.path())
            .with_sort_keys(vec![r"/.*?(\d+).*/\1/i".to_string()]);
        let result = find_input_files(&source).unwrap();
        assert_eq!(result[0].sort_key, "example.xlsx");
    }

    #[test]
    fn test_bad_glob_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScanSource::new("a{b").with_root(dir.path());
        assert!(find_input_files(&source).is_err());
    }

    #[test]
    fn test_bad_rules_fail_fast_when_root_missing() {
        let source = ScanSource::new("a{b").with_root("/nonexistent/folder/12345");
        assert!(find_input_files(&source).is_err());

        let source = ScanSource::new("*.xlsx")
            .with_root("/nonexistent/folder/12345")
            .with_sort_keys(vec!["/broken".to_string()]);
        assert!(find_input_files(&source).is_err());
    }

    #[test]
    fn test_bad_sort_key_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.xlsx"));
        let source = ScanSource::new("*.xlsx")
            .with_root(dir.path())
            .with_sort_keys(vec!["/broken".to_string()]);
        assert!(find_input_files(&source).is_err());
    }
}
