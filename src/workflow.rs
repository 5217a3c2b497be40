//! Pipeline orchestration.
//!
//! Two entry paths produce the same `SheetWithHeaders` set: `find_sources`
//! (fully automatic matching) and `read_sources` (reconstruction from an
//! edited match report). `merge_tables_by_type` then carries either result
//! through loading, normalisation, coercion and merging.

use crate::config::MergeConfig;
use crate::error::Result;
use crate::loader::{load_table, WorkbookCache};
use crate::matcher::{self, SheetWithHeaders};
use crate::merger;
use crate::normalizer::{self, CoercionFailure};
use crate::report;
use crate::scanner::{self, worksheet::find_worksheets, worksheet::WorksheetRecord};
use crate::table::DataTable;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Scans the filesystem and matches sheets and columns automatically.
pub fn find_sources(
    config: &MergeConfig,
    show_progress: bool,
) -> Result<(Vec<SheetWithHeaders>, Vec<WorksheetRecord>)> {
    let mut files = Vec::new();
    for input in &config.inputs {
        files.extend(scanner::find_input_files(input)?);
    }
    tracing::info!(count = files.len(), "found candidate input files");

    let bar = if show_progress {
        let bar = ProgressBar::new(files.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}") {
            bar.set_style(style);
        }
        Some(bar)
    } else {
        None
    };

    let mut worksheets = Vec::new();
    for file in &files {
        if let Some(bar) = &bar {
            bar.set_message(file.sourcename.clone());
        }
        worksheets.extend(find_worksheets(file));
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    tracing::info!(count = worksheets.len(), "found candidate data sources");

    let (matched, unmatched) = matcher::match_data_sources(worksheets, &config.tables);
    let sheets = matcher::match_columns(matched);
    Ok((sheets, unmatched))
}

/// Reconstructs the match set from an edited match report.
pub fn read_sources(
    report_path: &Path,
    config: &MergeConfig,
) -> Result<(Vec<SheetWithHeaders>, Vec<WorksheetRecord>)> {
    let inputs = report::parse_report(report_path)?;
    report::process_report(&inputs, &config.tables)
}

/// Loads, normalises and merges all matched sheets, one output table per
/// configured table type (in configuration order). A sheet whose rows can
/// no longer be read degrades to a warning, not an abort.
pub fn merge_tables_by_type(
    sheets: &[SheetWithHeaders],
    config: &MergeConfig,
    cache: &mut WorkbookCache,
) -> Result<(Vec<(String, DataTable)>, Vec<CoercionFailure>)> {
    let mut output = Vec::new();
    let mut failures = Vec::new();

    for table_config in &config.tables {
        let sources: Vec<&SheetWithHeaders> = sheets
            .iter()
            .filter(|s| s.sheet.source.name == table_config.name)
            .collect();
        tracing::info!(
            count = sources.len(),
            table = %table_config.name,
            "loading sources"
        );

        let column_names = table_config.column_names();
        let mut tagged: Vec<(DataTable, String)> = Vec::new();

        for source in sources {
            let record = &source.sheet.sheet;
            let raw = match load_table(record, cache) {
                Ok(table) => table,
                Err(e) => {
                    tracing::warn!(
                        sheet = %record.sheet_name,
                        file = %record.file.sourcename,
                        error = %e,
                        "failed to load sheet, skipping"
                    );
                    continue;
                }
            };
            let mut table = normalizer::normalise(&raw, &column_names, &source.column_map());
            failures.extend(normalizer::clean_datatypes(
                &mut table,
                &table_config.columns,
                &record.file.sourcename,
                &record.sheet_name,
            ));
            tagged.push((table, record.file.sort_key.clone()));
        }

        let merged = if tagged.is_empty() {
            DataTable::new(column_names)
        } else {
            merger::merge_tables(&tagged, &table_config.unique_columns(), &column_names)
        };
        output.push((table_config.name.clone(), merged));
    }

    Ok((output, failures))
}
