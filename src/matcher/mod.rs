//! Sheet-to-table matching.
//!
//! Each scanned worksheet is claimed by the first configured table type
//! whose matcher accepts the sheet name; configuration order is the only
//! precedence. Header-to-column matching lives in the `columns` submodule.

pub mod columns;
pub mod spec;

pub use columns::{match_columns, match_columns_single, MatchedColumn, SheetWithHeaders};

use crate::config::SourceConfig;
use crate::scanner::worksheet::WorksheetRecord;

/// A worksheet claimed by exactly one table type.
#[derive(Debug, Clone)]
pub struct MatchedSheet {
    pub sheet: WorksheetRecord,
    pub source: SourceConfig,
}

/// Matches each sheet to at most one table type, first match in configured
/// order. Unclaimed sheets are returned separately and logged for the match
/// report; re-running on identical input yields identical assignments.
pub fn match_data_sources(
    sheets: Vec<WorksheetRecord>,
    sources: &[SourceConfig],
) -> (Vec<MatchedSheet>, Vec<WorksheetRecord>) {
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();

    for sheet in sheets {
        match sources
            .iter()
            .find(|source| source.matchers.accepts(&sheet.sheet_name))
        {
            Some(source) => {
                tracing::debug!(
                    sheet = %sheet.sheet_name,
                    table = %source.name,
                    "matched sheet to table"
                );
                matched.push(MatchedSheet {
                    sheet,
                    source: source.clone(),
                });
            }
            None => {
                tracing::warn!(
                    sheet = %sheet.sheet_name,
                    file = %sheet.file.sourcename,
                    "no table type identified for sheet"
                );
                unmatched.push(sheet);
            }
        }
    }

    (matched, unmatched)
}
