//! Configuration loading.
//!
//! The JSON config describes where to look for input files (`inputs`) and
//! which table types to reconcile them into (`tables`). All regex
//! expressions compile at load time; a malformed expression aborts the run
//! before any scanning starts.

use crate::error::Result;
use crate::matcher::spec::MatcherSpec;
use crate::pattern;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One unit of file discovery: a glob pattern plus optional sort-key rules.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanSource {
    /// Glob pattern, relative to `root` (supports recursive `**`).
    pub include: String,
    /// Directory the pattern is resolved under; defaults to the working
    /// directory.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// `/pattern/replacement/flags` rules applied in order to derive each
    /// file's sort key.
    #[serde(default)]
    pub sort_keys: Vec<String>,
}

impl ScanSource {
    pub fn new(include: impl Into<String>) -> Self {
        Self {
            include: include.into(),
            root: None,
            sort_keys: Vec::new(),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_sort_keys(mut self, sort_keys: Vec<String>) -> Self {
        self.sort_keys = sort_keys;
        self
    }
}

/// Custom regex configuration: a single expression or an ordered list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RegexSpec {
    One(String),
    Many(Vec<String>),
}

impl RegexSpec {
    fn exprs(&self) -> Vec<String> {
        match self {
            RegexSpec::One(expr) => vec![expr.clone()],
            RegexSpec::Many(exprs) => exprs.clone(),
        }
    }
}

/// Declared value type of a canonical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Date,
}

/// A canonical column of a table type.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    /// Part of the deduplication key for the table.
    #[serde(default)]
    pub unique: bool,
    #[serde(rename = "type", default)]
    pub column_type: Option<ColumnType>,
    #[serde(default)]
    regex: Option<RegexSpec>,
    #[serde(skip)]
    pub matchers: MatcherSpec,
}

impl ColumnConfig {
    /// Custom expressions are tried before the generated default, not
    /// instead of it.
    fn init_matchers(&mut self) -> Result<()> {
        let mut exprs = self.regex.as_ref().map_or_else(Vec::new, |r| r.exprs());
        exprs.push(pattern::default_expr(&self.name));
        self.matchers = MatcherSpec::from_exprs(&exprs)?;
        Ok(())
    }
}

/// A configured table type: sheet matchers plus the ordered canonical
/// columns. Column order defines both match precedence and output order.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    regex: Option<RegexSpec>,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    #[serde(skip)]
    pub matchers: MatcherSpec,
}

impl SourceConfig {
    /// Sheet-name matching uses the custom expressions when configured,
    /// otherwise the generated default.
    fn init_matchers(&mut self) -> Result<()> {
        let exprs = self
            .regex
            .as_ref()
            .map_or_else(|| vec![pattern::default_expr(&self.name)], |r| r.exprs());
        self.matchers = MatcherSpec::from_exprs(&exprs)?;
        for column in &mut self.columns {
            column.init_matchers()?;
        }
        Ok(())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn unique_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.unique)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnConfig> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    #[serde(default)]
    pub inputs: Vec<ScanSource>,
    pub tables: Vec<SourceConfig>,
}

impl MergeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: MergeConfig = serde_json::from_str(json)?;
        for table in &mut config.tables {
            table.init_matchers()?;
        }
        Ok(config)
    }

    pub fn table(&self, name: &str) -> Option<&SourceConfig> {
        self.tables.iter().find(|t| t.name == name)
    }
}
