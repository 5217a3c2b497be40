//! Worksheet scanning and header detection.
//!
//! Opens a workbook (legacy `.xls` and modern `.xlsx` behind one call via
//! calamine's auto-detection) and locates each sheet's header row: the first
//! row among the leading five containing more than three non-blank cells.
//! Sheets without a detectable header are still returned so they surface as
//! unmatched instead of silently disappearing.

use crate::scanner::FileRecord;
use calamine::{open_workbook_auto, Data, Range, Reader};

/// Rows inspected when looking for the header row.
const HEADER_SCAN_ROWS: u32 = 5;
/// A header row must contain more than this many non-blank cells.
const MIN_HEADER_CELLS: usize = 3;

/// One candidate header cell. Blank cells are kept (as `None`) so column
/// positions are preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderItem {
    pub value: Option<String>,
    /// Zero-based column position within the sheet.
    pub column_index: usize,
}

/// One sheet of one input workbook.
#[derive(Debug, Clone)]
pub struct WorksheetRecord {
    pub file: FileRecord,
    pub sheet_name: String,
    /// 1-based row the header was found on; 1 when no header was detected.
    pub header_row_index: u32,
    pub headers: Vec<HeaderItem>,
}

impl WorksheetRecord {
    /// Non-blank header texts, in column order.
    pub fn header_names(&self) -> Vec<&str> {
        self.headers
            .iter()
            .filter_map(|h| h.value.as_deref())
            .collect()
    }

    pub fn header_by_value(&self, value: &str) -> Option<&HeaderItem> {
        self.headers
            .iter()
            .find(|h| h.value.as_deref() == Some(value))
    }
}

/// Scans every sheet of the workbook. Failure to open the workbook is
/// non-fatal: a warning is logged and the file contributes zero records.
pub fn find_worksheets(file: &FileRecord) -> Vec<WorksheetRecord> {
    tracing::debug!(file = %file.filename.display(), "opening workbook");

    let mut workbook = match open_workbook_auto(&file.filename) {
        Ok(workbook) => workbook,
        Err(e) => {
            tracing::warn!(
                file = %file.sourcename,
                error = %e,
                "failed to open workbook, skipping file"
            );
            return Vec::new();
        }
    };

    let sheet_names = workbook.sheet_names().to_vec();
    let mut records = Vec::new();

    for sheet_name in sheet_names {
        tracing::debug!(sheet = %sheet_name, file = %file.sourcename, "checking sheet");
        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!(
                    sheet = %sheet_name,
                    file = %file.sourcename,
                    error = %e,
                    "failed to read sheet, skipping"
                );
                continue;
            }
        };

        let (header_row_index, headers) = detect_header_row(&range);
        records.push(WorksheetRecord {
            file: file.clone(),
            sheet_name,
            header_row_index,
            headers,
        });
    }

    records
}

/// Finds the first of the sheet's leading rows with more than
/// `MIN_HEADER_CELLS` non-blank cells. Returns the 1-based row index and the
/// row's cells with absolute column positions; `(1, [])` when no row
/// qualifies.
fn detect_header_row(range: &Range<Data>) -> (u32, Vec<HeaderItem>) {
    let Some((start_row, start_col)) = range.start() else {
        return (1, Vec::new());
    };

    for (offset, row) in range.rows().enumerate() {
        let row_index = start_row + offset as u32;
        if row_index >= HEADER_SCAN_ROWS {
            break;
        }

        let non_blank = row.iter().filter(|c| !cell_is_blank(c)).count();
        if non_blank <= MIN_HEADER_CELLS {
            continue;
        }

        let mut headers: Vec<HeaderItem> = (0..start_col as usize)
            .map(|column_index| HeaderItem {
                value: None,
                column_index,
            })
            .collect();
        headers.extend(row.iter().enumerate().map(|(i, cell)| HeaderItem {
            value: cell_text(cell),
            column_index: start_col as usize + i,
        }));
        return (row_index + 1, headers);
    }

    (1, Vec::new())
}

fn cell_is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Header cell content as text; `None` for blank cells.
pub(crate) fn cell_text(cell: &Data) -> Option<String> {
    if cell_is_blank(cell) {
        return None;
    }
    let text = match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        other => other.to_string(),
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::path::Path;

    fn record(path: &Path) -> FileRecord {
        FileRecord::with_sort_key(path, "A")
    }

    fn write_fixture(path: &Path) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("List_1").unwrap();
        // Title on row 1, header on row 2.
        sheet.write_string(0, 0, "Annual report").unwrap();
        for (col, header) in ["ID", "Name", "Date of Birth", "Notes"].iter().enumerate() {
            sheet.write_string(1, col as u16, *header).unwrap();
        }
        sheet.write_string(2, 0, "1").unwrap();

        let sparse = workbook.add_worksheet();
        sparse.set_name("Notes").unwrap();
        sparse.write_string(0, 0, "only one cell").unwrap();

        workbook.save(path).unwrap();
    }

    #[test]
    fn test_find_worksheets_detects_header_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.xlsx");
        write_fixture(&path);

        let sheets = find_worksheets(&record(&path));
        assert_eq!(sheets.len(), 2);

        let list_1 = &sheets[0];
        assert_eq!(list_1.sheet_name, "List_1");
        assert_eq!(list_1.header_row_index, 2);
        assert_eq!(
            list_1.header_names(),
            vec!["ID", "Name", "Date of Birth", "Notes"]
        );
        assert_eq!(list_1.headers[0].column_index, 0);
    }

    #[test]
    fn test_sheet_without_header_still_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.xlsx");
        write_fixture(&path);

        let sheets = find_worksheets(&record(&path));
        let notes = &sheets[1];
        assert_eq!(notes.sheet_name, "Notes");
        assert_eq!(notes.header_row_index, 1);
        assert!(notes.headers.is_empty());
    }

    #[test]
    fn test_corrupt_file_yields_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"this is not a workbook").unwrap();

        let sheets = find_worksheets(&record(&path));
        assert!(sheets.is_empty());
    }

    #[test]
    fn test_offset_header_keeps_column_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offset.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        // Header starts at column C of row 3.
        for (i, header) in ["A", "B", "C", "D"].iter().enumerate() {
            sheet.write_string(2, 2 + i as u16, *header).unwrap();
        }
        workbook.save(&path).unwrap();

        let sheets = find_worksheets(&record(&path));
        let ws = &sheets[0];
        assert_eq!(ws.header_row_index, 3);
        assert_eq!(ws.headers[0].value, None);
        assert_eq!(ws.headers[1].value, None);
        assert_eq!(ws.header_by_value("A").unwrap().column_index, 2);
        assert_eq!(ws.header_by_value("D").unwrap().column_index, 5);
    }
}
