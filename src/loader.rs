//! Row data loading with workbook-handle caching.
//!
//! Reading several sheets from one large workbook must not re-parse the
//! file each time, so open handles are cached per filename. The cache has
//! no process-wide default; callers create one per run and pass it in.

use crate::error::{Result, SheetMergeError};
use crate::scanner::worksheet::WorksheetRecord;
use crate::table::{DataTable, Value};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Filename-keyed cache of open workbook handles. A given file is opened
/// at most once per cache.
#[derive(Default)]
pub struct WorkbookCache {
    files: HashMap<PathBuf, Sheets<BufReader<File>>>,
}

impl WorkbookCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of workbooks opened so far.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Cached handle for `filename`, opening the workbook on first use.
    fn open(&mut self, filename: &Path) -> Result<&mut Sheets<BufReader<File>>> {
        match self.files.entry(filename.to_path_buf()) {
            Entry::Occupied(entry) => {
                tracing::debug!(file = %filename.display(), "fetching workbook from cache");
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                tracing::debug!(file = %filename.display(), "opening workbook");
                let workbook = open_workbook_auto(filename).map_err(|e| {
                    SheetMergeError::WorkbookOpen {
                        filename: filename.display().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(entry.insert(workbook))
            }
        }
    }
}

/// Reads the row data of one sheet, starting immediately below its header
/// row. Columns are the sheet's non-blank header texts at their recorded
/// positions; fully blank rows are skipped.
pub fn load_table(sheet: &WorksheetRecord, cache: &mut WorkbookCache) -> Result<DataTable> {
    tracing::debug!(
        sheet = %sheet.sheet_name,
        file = %sheet.file.sourcename,
        header_row = sheet.header_row_index,
        "reading sheet"
    );

    let workbook = cache.open(&sheet.file.filename)?;
    let range = workbook
        .worksheet_range(&sheet.sheet_name)
        .map_err(|_| SheetMergeError::SheetNotFound {
            filename: sheet.file.sourcename.clone(),
            sheet: sheet.sheet_name.clone(),
        })?;

    let columns: Vec<(String, u32)> = sheet
        .headers
        .iter()
        .filter_map(|h| h.value.clone().map(|v| (v, h.column_index as u32)))
        .collect();

    let mut table = DataTable::new(columns.iter().map(|(name, _)| name.clone()).collect());

    if let Some(end) = range.end() {
        // header_row_index is 1-based, so data starts at that 0-based row.
        for row in sheet.header_row_index..=end.0 {
            let values: Vec<Value> = columns
                .iter()
                .map(|(_, col)| {
                    range
                        .get_value((row, *col))
                        .map_or(Value::Empty, to_value)
                })
                .collect();
            if values.iter().all(Value::is_empty) {
                continue;
            }
            table.push_row(values);
        }
    }

    tracing::debug!(
        rows = table.len(),
        cols = table.columns().len(),
        sheet = %sheet.sheet_name,
        "read sheet"
    );

    Ok(table)
}

fn to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                Value::Empty
            } else {
                Value::Text(s.clone())
            }
        }
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::Number(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|naive| Value::Date(naive.date()))
            .unwrap_or(Value::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(_) => Value::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::worksheet::find_worksheets;
    use crate::scanner::FileRecord;
    use rust_xlsxwriter::Workbook;

    fn write_fixture(path: &Path) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("People").unwrap();
        for (col, header) in ["ID", "Name", "Age", "Active"].iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        sheet.write_number(1, 0, 1.0).unwrap();
        sheet.write_string(1, 1, "Ann").unwrap();
        sheet.write_number(1, 2, 34.0).unwrap();
        sheet.write_boolean(1, 3, true).unwrap();
        sheet.write_number(2, 0, 2.0).unwrap();
        sheet.write_string(2, 1, "Ben").unwrap();

        let second = workbook.add_worksheet();
        second.set_name("More People").unwrap();
        for (col, header) in ["ID", "Name", "Age", "Active"].iter().enumerate() {
            second.write_string(0, col as u16, *header).unwrap();
        }
        workbook.save(path).unwrap();
    }

    #[test]
    fn test_load_rows_below_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.xlsx");
        write_fixture(&path);

        let sheets = find_worksheets(&FileRecord::with_sort_key(&path, "A"));
        let mut cache = WorkbookCache::new();
        let table = load_table(&sheets[0], &mut cache).unwrap();

        assert_eq!(
            table.columns(),
            &["ID".to_string(), "Name".to_string(), "Age".to_string(), "Active".to_string()]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "Name"), Some(&Value::Text("Ann".into())));
        assert_eq!(table.value(0, "Age"), Some(&Value::Number(34.0)));
        assert_eq!(table.value(0, "Active"), Some(&Value::Bool(true)));
        assert_eq!(table.value(1, "Age"), Some(&Value::Empty));
    }

    #[test]
    fn test_workbook_opened_once_per_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.xlsx");
        write_fixture(&path);

        let sheets = find_worksheets(&FileRecord::with_sort_key(&path, "A"));
        let mut cache = WorkbookCache::new();
        load_table(&sheets[0], &mut cache).unwrap();
        load_table(&sheets[1], &mut cache).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let sheets = WorksheetRecord {
            file: FileRecord::with_sort_key("/nonexistent/file.xlsx", "A"),
            sheet_name: "People".to_string(),
            header_row_index: 1,
            headers: Vec::new(),
        };
        let mut cache = WorkbookCache::new();
        assert!(load_table(&sheets, &mut cache).is_err());
    }
}
