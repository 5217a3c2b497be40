//! The match report: a flat, human-editable projection of the matching
//! outcome, and its inverse.
//!
//! Export writes one row per matched column, per unmatched column, per
//! unclaimed header and per entirely unmatched sheet. A reviewer edits the
//! `table`/`column_name` cells and re-imports; rows carrying both a column
//! and a header name are authoritative and bypass re-matching, which makes
//! the report the recovery path for ambiguous automatic matches.

use crate::config::{ScanSource, SourceConfig};
use crate::error::{Result, SheetMergeError};
use crate::matcher::{self, MatchedColumn, MatchedSheet, SheetWithHeaders};
use crate::scanner::worksheet::{cell_text, find_worksheets, WorksheetRecord};
use crate::scanner::{self, FileRecord};
use calamine::{open_workbook_auto, Reader};
use rust_xlsxwriter::Workbook;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Fixed column order of the report file; re-import relies on these names.
pub const REPORT_COLUMNS: [&str; 9] = [
    "filename",
    "sort_key",
    "header_starts",
    "sheetname",
    "table",
    "column_name",
    "header_name",
    "header_pos",
    "unmatched",
];

pub const REPORT_SHEET: &str = "MatchReport";

/// Reviewer-facing marker for what is missing on a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedKind {
    /// The sheet matched no table type.
    Table,
    /// The header was claimed by no column.
    Column,
    /// The column got no header.
    Header,
}

impl fmt::Display for UnmatchedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedKind::Table => write!(f, "TABLE"),
            UnmatchedKind::Column => write!(f, "COLUMN"),
            UnmatchedKind::Header => write!(f, "HEADER"),
        }
    }
}

/// One exported report row.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReportRow {
    pub filename: String,
    pub sort_key: String,
    pub header_starts: u32,
    pub sheetname: String,
    pub table: Option<String>,
    pub column_name: Option<String>,
    pub header_name: Option<String>,
    pub header_pos: Option<usize>,
    pub unmatched: Option<UnmatchedKind>,
}

impl MatchReportRow {
    fn sheet_info(sheet: &WorksheetRecord) -> Self {
        Self {
            filename: sheet.file.filename.display().to_string(),
            sort_key: sheet.file.sort_key.clone(),
            header_starts: sheet.header_row_index,
            sheetname: sheet.sheet_name.clone(),
            table: None,
            column_name: None,
            header_name: None,
            header_pos: None,
            unmatched: None,
        }
    }
}

/// Flattens the match outcome into report rows, sorted by
/// `(sort_key, sheetname)`.
pub fn to_report(
    sheets: &[SheetWithHeaders],
    unmatched: &[WorksheetRecord],
) -> Vec<MatchReportRow> {
    let mut rows = Vec::new();

    for sheet in unmatched {
        let base = MatchReportRow {
            unmatched: Some(UnmatchedKind::Table),
            ..MatchReportRow::sheet_info(sheet)
        };
        let headers: Vec<_> = sheet
            .headers
            .iter()
            .filter(|h| h.value.is_some())
            .collect();
        if headers.is_empty() {
            rows.push(base);
        } else {
            for header in headers {
                rows.push(MatchReportRow {
                    header_name: header.value.clone(),
                    header_pos: Some(header.column_index),
                    ..base.clone()
                });
            }
        }
    }

    for source in sheets {
        let base = MatchReportRow {
            table: Some(source.sheet.source.name.clone()),
            ..MatchReportRow::sheet_info(&source.sheet.sheet)
        };

        for column in &source.sheet.source.columns {
            let bound = source.header_for_column(&column.name);
            rows.push(MatchReportRow {
                column_name: Some(column.name.clone()),
                header_name: bound.and_then(|h| h.value.clone()),
                header_pos: bound.map(|h| h.column_index),
                unmatched: if bound.is_none() {
                    Some(UnmatchedKind::Header)
                } else {
                    None
                },
                ..base.clone()
            });
        }

        for header in source.unmatched_headers() {
            rows.push(MatchReportRow {
                header_name: header.value.clone(),
                header_pos: Some(header.column_index),
                unmatched: Some(UnmatchedKind::Column),
                ..base.clone()
            });
        }
    }

    rows.sort_by(|a, b| {
        (a.sort_key.as_str(), a.sheetname.as_str())
            .cmp(&(b.sort_key.as_str(), b.sheetname.as_str()))
    });
    rows
}

/// Writes report rows to an xlsx file.
pub fn write_report(rows: &[MatchReportRow], path: &Path) -> Result<()> {
    tracing::info!(file = %path.display(), "writing match report");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(REPORT_SHEET)?;

    for (col, name) in REPORT_COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, &row.filename)?;
        sheet.write_string(r, 1, &row.sort_key)?;
        sheet.write_number(r, 2, row.header_starts as f64)?;
        sheet.write_string(r, 3, &row.sheetname)?;
        if let Some(table) = &row.table {
            sheet.write_string(r, 4, table)?;
        }
        if let Some(column_name) = &row.column_name {
            sheet.write_string(r, 5, column_name)?;
        }
        if let Some(header_name) = &row.header_name {
            sheet.write_string(r, 6, header_name)?;
        }
        if let Some(header_pos) = row.header_pos {
            sheet.write_number(r, 7, header_pos as f64)?;
        }
        if let Some(unmatched) = row.unmatched {
            sheet.write_string(r, 8, unmatched.to_string().as_str())?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// One parsed (possibly human-edited) report row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchInput {
    pub filename: String,
    pub sort_key: Option<String>,
    pub header_starts: Option<u32>,
    pub sheetname: Option<String>,
    pub table: Option<String>,
    pub column_name: Option<String>,
    pub header_name: Option<String>,
}

/// Reads an edited report back in. Rows are deduplicated on
/// `(filename, sheetname, header_name)` keeping the first occurrence, since
/// reviewers occasionally copy rows.
pub fn parse_report(path: &Path) -> Result<Vec<MatchInput>> {
    tracing::info!(file = %path.display(), "reading match configuration");

    let mut workbook =
        open_workbook_auto(path).map_err(|e| SheetMergeError::WorkbookOpen {
            filename: path.display().to_string(),
            reason: e.to_string(),
        })?;
    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = sheet_names
        .iter()
        .find(|n| n.as_str() == REPORT_SHEET)
        .or_else(|| sheet_names.first())
        .ok_or_else(|| SheetMergeError::Report("report has no sheets".to_string()))?
        .clone();
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SheetMergeError::Report(e.to_string()))?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| SheetMergeError::Report("report is empty".to_string()))?;
    let positions: HashMap<String, usize> = header_row
        .iter()
        .enumerate()
        .filter_map(|(i, cell)| cell_text(cell).map(|name| (name, i)))
        .collect();

    for required in ["filename", "sheetname", "table", "column_name", "header_name"] {
        if !positions.contains_key(required) {
            return Err(SheetMergeError::Report(format!(
                "missing column '{}'",
                required
            )));
        }
    }

    let field = |row: &[calamine::Data], name: &str| -> Option<String> {
        positions.get(name).and_then(|&i| row.get(i)).and_then(cell_text)
    };

    let mut seen: HashSet<(String, Option<String>, Option<String>)> = HashSet::new();
    let mut inputs = Vec::new();
    for row in rows {
        let Some(filename) = field(row, "filename") else {
            continue;
        };
        let sheetname = field(row, "sheetname");
        let header_name = field(row, "header_name");
        if !seen.insert((filename.clone(), sheetname.clone(), header_name.clone())) {
            continue;
        }
        inputs.push(MatchInput {
            filename,
            sort_key: field(row, "sort_key"),
            header_starts: field(row, "header_starts")
                .and_then(|v| v.parse::<f64>().ok())
                .map(|v| v as u32),
            sheetname,
            table: field(row, "table"),
            column_name: field(row, "column_name"),
            header_name,
        });
    }

    Ok(inputs)
}

/// Per-run cache of worksheet scans during report processing, so each file
/// is opened once however many rows reference it.
struct ScanCache {
    scans: HashMap<PathBuf, Vec<WorksheetRecord>>,
}

impl ScanCache {
    fn new() -> Self {
        Self {
            scans: HashMap::new(),
        }
    }

    fn sheet(
        &mut self,
        filename: &str,
        sort_key: Option<&str>,
        sheetname: &str,
    ) -> Result<WorksheetRecord> {
        let path = PathBuf::from(filename);
        let record =
            FileRecord::with_sort_key(&path, sort_key.unwrap_or(filename));
        let worksheets = self
            .scans
            .entry(path)
            .or_insert_with(|| find_worksheets(&record));
        let mut sheet = worksheets
            .iter()
            .find(|w| w.sheet_name == sheetname)
            .cloned()
            .ok_or_else(|| SheetMergeError::SheetNotFound {
                filename: filename.to_string(),
                sheet: sheetname.to_string(),
            })?;
        sheet.file = record;
        Ok(sheet)
    }
}

type SheetKey = (String, Option<String>, String, Option<String>);

/// Reconstructs the match set from edited report rows.
///
/// Three kinds of row drive three paths: rows without a sheet name expand
/// via file discovery and fully automatic matching; rows naming a table but
/// no columns re-scan that one sheet and match its columns automatically;
/// rows with both a column and a header name are taken as authoritative
/// bindings.
pub fn process_report(
    inputs: &[MatchInput],
    tables: &[SourceConfig],
) -> Result<(Vec<SheetWithHeaders>, Vec<WorksheetRecord>)> {
    let mut scan_sources: Vec<(String, Option<String>)> = Vec::new();
    let mut columns_per_sheet: BTreeMap<SheetKey, BTreeSet<String>> = BTreeMap::new();
    let mut mappings: BTreeMap<SheetKey, Vec<(String, String)>> = BTreeMap::new();

    for input in inputs {
        match &input.sheetname {
            None => {
                // Files that still need discovery.
                scan_sources.push((input.filename.clone(), input.sort_key.clone()));
            }
            Some(sheetname) => {
                let key: SheetKey = (
                    input.filename.clone(),
                    input.sort_key.clone(),
                    sheetname.clone(),
                    input.table.clone(),
                );
                let columns = columns_per_sheet.entry(key.clone()).or_default();
                if let Some(column_name) = &input.column_name {
                    columns.insert(column_name.clone());
                    if let Some(header_name) = &input.header_name {
                        mappings
                            .entry(key)
                            .or_default()
                            .push((column_name.clone(), header_name.clone()));
                    }
                }
            }
        }
    }

    let mut matched_list: Vec<MatchedSheet> = Vec::new();
    let mut unmatched_list: Vec<WorksheetRecord> = Vec::new();
    let mut cache = ScanCache::new();

    for (filename, sort_key) in scan_sources {
        for file in expand_report_file(&filename, sort_key.as_deref())? {
            let worksheets = find_worksheets(&file);
            let (matched, unmatched) = matcher::match_data_sources(worksheets, tables);
            matched_list.extend(matched);
            unmatched_list.extend(unmatched);
        }
    }

    // Sheets assigned a table but no column mapping get automatic column
    // matching.
    for ((filename, sort_key, sheetname, table), columns) in &columns_per_sheet {
        if !columns.is_empty() {
            continue;
        }
        let Some(table_name) = table else {
            continue;
        };
        let source = lookup_table(tables, table_name)?;
        let sheet = cache.sheet(filename, sort_key.as_deref(), sheetname)?;
        matched_list.push(MatchedSheet {
            sheet,
            source: source.clone(),
        });
    }

    let mut sheets = matcher::match_columns(matched_list);

    // Authoritative rows: reconstruct the binding directly, bypassing
    // matching.
    for ((filename, sort_key, sheetname, table), pairs) in &mappings {
        let table_name = table.as_ref().ok_or_else(|| {
            SheetMergeError::Report(format!(
                "row for '{}' in '{}' maps columns but names no table",
                sheetname, filename
            ))
        })?;
        let source = lookup_table(tables, table_name)?;
        let sheet = cache.sheet(filename, sort_key.as_deref(), sheetname)?;

        let mut columns: Vec<MatchedColumn> = Vec::new();
        for (column_name, header_name) in pairs {
            let column = source.column(column_name).ok_or_else(|| {
                SheetMergeError::UnknownColumn {
                    table: table_name.clone(),
                    column: column_name.clone(),
                }
            })?;
            let header = sheet.header_by_value(header_name).ok_or_else(|| {
                SheetMergeError::UnknownHeader {
                    filename: filename.clone(),
                    sheet: sheetname.clone(),
                    header: header_name.clone(),
                }
            })?;
            columns.push(MatchedColumn {
                column: column.clone(),
                header: header.clone(),
            });
        }

        sheets.push(SheetWithHeaders {
            sheet: MatchedSheet {
                sheet,
                source: source.clone(),
            },
            columns,
            unmatched_columns: Vec::new(),
        });
    }

    Ok((sheets, unmatched_list))
}

fn lookup_table<'a>(tables: &'a [SourceConfig], name: &str) -> Result<&'a SourceConfig> {
    tables
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| SheetMergeError::UnknownTable(name.to_string()))
}

/// Expands a report `filename` cell into file records. A plain path maps
/// directly; a path containing wildcards goes through the file scanner with
/// the non-wildcard prefix as root.
fn expand_report_file(filename: &str, sort_key: Option<&str>) -> Result<Vec<FileRecord>> {
    const WILDCARDS: &[char] = &['*', '?', '['];

    if !filename.contains(WILDCARDS) {
        let path = Path::new(filename);
        if !path.exists() {
            return Err(SheetMergeError::FileNotFound(filename.to_string()));
        }
        let mut record = scanner::record_for_path(path, &[])?;
        if let Some(sort_key) = sort_key {
            record.sort_key = sort_key.to_string();
        }
        return Ok(vec![record]);
    }

    let mut root = PathBuf::new();
    let mut include: Vec<String> = Vec::new();
    for component in Path::new(filename).components() {
        let text = component.as_os_str().to_string_lossy().into_owned();
        if include.is_empty() && !text.contains(WILDCARDS) {
            root.push(&text);
        } else {
            include.push(text);
        }
    }

    let mut source = ScanSource::new(include.join("/"));
    if root.as_os_str().is_empty() {
        source.root = None;
    } else {
        source.root = Some(root);
    }
    if let Some(sort_key) = sort_key {
        source.sort_keys = vec![format!("/.*/{}/", sort_key)];
    }
    scanner::find_input_files(&source)
}
