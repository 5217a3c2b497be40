//! Header-to-column matching.
//!
//! Greedy first-fit: columns are processed in configured order, each
//! claiming the first remaining header one of its matchers accepts. A
//! claimed header leaves the pool, so no two columns share a header and no
//! backtracking occurs.

use crate::config::ColumnConfig;
use crate::matcher::MatchedSheet;
use crate::scanner::worksheet::HeaderItem;
use std::collections::{HashMap, HashSet};

/// A canonical column bound to one header cell of the sheet.
#[derive(Debug, Clone)]
pub struct MatchedColumn {
    pub column: ColumnConfig,
    pub header: HeaderItem,
}

/// Terminal match artifact for one sheet, consumed by the loader and
/// normalizer.
#[derive(Debug, Clone)]
pub struct SheetWithHeaders {
    pub sheet: MatchedSheet,
    pub columns: Vec<MatchedColumn>,
    /// Configured columns no header matched; filled with nulls downstream.
    pub unmatched_columns: Vec<ColumnConfig>,
}

impl SheetWithHeaders {
    /// Headers whose position was claimed by no column.
    pub fn unmatched_headers(&self) -> Vec<&HeaderItem> {
        let claimed: HashSet<usize> =
            self.columns.iter().map(|c| c.header.column_index).collect();
        self.sheet
            .sheet
            .headers
            .iter()
            .filter(|h| h.value.is_some() && !claimed.contains(&h.column_index))
            .collect()
    }

    /// Source header text to canonical column name, for renaming on load.
    pub fn column_map(&self) -> HashMap<String, String> {
        self.columns
            .iter()
            .filter_map(|c| {
                c.header
                    .value
                    .as_ref()
                    .map(|v| (v.clone(), c.column.name.clone()))
            })
            .collect()
    }

    pub fn header_for_column(&self, name: &str) -> Option<&HeaderItem> {
        self.columns
            .iter()
            .find(|c| c.column.name == name)
            .map(|c| &c.header)
    }
}

/// Matches the sheet's headers against its table type's column
/// configuration. Matcher-major: a column's custom patterns are tried
/// across all remaining headers before its generated default.
pub fn match_columns_single(sheet: MatchedSheet) -> SheetWithHeaders {
    let mut remaining: Vec<HeaderItem> = sheet
        .sheet
        .headers
        .iter()
        .filter(|h| h.value.is_some())
        .cloned()
        .collect();

    let mut columns = Vec::new();
    let mut unmatched_columns = Vec::new();

    for column in &sheet.source.columns {
        let mut bound = None;
        'matchers: for matcher in column.matchers.matchers() {
            for (i, header) in remaining.iter().enumerate() {
                let value = header.value.as_deref().unwrap_or_default();
                if matcher.accepts(value) {
                    bound = Some(i);
                    break 'matchers;
                }
            }
        }

        match bound {
            Some(i) => columns.push(MatchedColumn {
                column: column.clone(),
                header: remaining.remove(i),
            }),
            None => unmatched_columns.push(column.clone()),
        }
    }

    SheetWithHeaders {
        sheet,
        columns,
        unmatched_columns,
    }
}

/// Batch form; output order mirrors input order.
pub fn match_columns(sheets: Vec<MatchedSheet>) -> Vec<SheetWithHeaders> {
    sheets.into_iter().map(match_columns_single).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MergeConfig;
    use crate::scanner::FileRecord;
    use crate::scanner::worksheet::WorksheetRecord;

    fn matched_sheet(config_json: &str, headers: &[&str]) -> MatchedSheet {
        let config = MergeConfig::from_json(config_json).unwrap();
        let sheet = WorksheetRecord {
            file: FileRecord::with_sort_key("test.xlsx", "A"),
            sheet_name: "Sheet1".to_string(),
            header_row_index: 1,
            headers: headers
                .iter()
                .enumerate()
                .map(|(i, h)| HeaderItem {
                    value: if h.is_empty() {
                        None
                    } else {
                        Some(h.to_string())
                    },
                    column_index: i,
                })
                .collect(),
        };
        MatchedSheet {
            sheet,
            source: config.tables[0].clone(),
        }
    }

    #[test]
    fn test_headers_exclusively_consumed() {
        // Both columns accept "ID"; the first configured column claims it.
        let sheet = matched_sheet(
            r#"{"tables": [{"name": "T", "columns": [
                {"name": "ID"},
                {"name": "Child ID"}
            ]}]}"#,
            &["Child ID", "Other"],
        );
        let result = match_columns_single(sheet);
        assert_eq!(result.columns.len(), 1);
        assert_eq!(result.columns[0].column.name, "ID");
        assert_eq!(result.columns[0].header.column_index, 0);
        assert_eq!(result.unmatched_columns.len(), 1);
        assert_eq!(result.unmatched_columns[0].name, "Child ID");
    }

    #[test]
    fn test_no_duplicate_column_index() {
        let sheet = matched_sheet(
            r#"{"tables": [{"name": "T", "columns": [
                {"name": "Date"},
                {"name": "Date of Birth"}
            ]}]}"#,
            &["Date", "Date of Birth"],
        );
        let result = match_columns_single(sheet);
        assert_eq!(result.columns.len(), 2);
        let mut indices: Vec<usize> =
            result.columns.iter().map(|c| c.header.column_index).collect();
        indices.dedup();
        assert_eq!(indices.len(), 2);
    }

    #[test]
    fn test_custom_regex_tried_before_default() {
        // The default for "Code" would claim "Code (old)" first by position;
        // the custom pattern targets the second header and wins.
        let sheet = matched_sheet(
            r#"{"tables": [{"name": "T", "columns": [
                {"name": "Code", "regex": "/.*new.*/i"}
            ]}]}"#,
            &["Code (old)", "Code (new)"],
        );
        let result = match_columns_single(sheet);
        assert_eq!(
            result.columns[0].header.value.as_deref(),
            Some("Code (new)")
        );
    }

    #[test]
    fn test_unmatched_headers_exposed() {
        let sheet = matched_sheet(
            r#"{"tables": [{"name": "T", "columns": [{"name": "ID"}]}]}"#,
            &["ID", "", "Mystery"],
        );
        let result = match_columns_single(sheet);
        let unmatched: Vec<_> = result
            .unmatched_headers()
            .iter()
            .map(|h| h.value.clone().unwrap())
            .collect();
        assert_eq!(unmatched, vec!["Mystery".to_string()]);
    }

    #[test]
    fn test_column_map() {
        let sheet = matched_sheet(
            r#"{"tables": [{"name": "T", "columns": [{"name": "ID"}]}]}"#,
            &["Child ID"],
        );
        let result = match_columns_single(sheet);
        let map = result.column_map();
        assert_eq!(map.get("Child ID").map(String::as_str), Some("ID"));
    }
}
