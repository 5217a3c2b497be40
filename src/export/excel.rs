//! Merged workbook and diagnostic report writers.

use crate::error::Result;
use crate::normalizer::CoercionFailure;
use crate::table::{DataTable, Value};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;

/// Writes the merged output: one sheet per table type, in the given order,
/// with the canonical header row. Tables with no matched sources still get
/// their (empty) sheet.
pub fn write_output(tables: &[(String, DataTable)], path: &Path) -> Result<()> {
    tracing::info!(file = %path.display(), "writing merged output");

    let mut workbook = Workbook::new();
    for (name, table) in tables {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_table(sheet, table)?;
    }
    workbook.save(path)?;
    Ok(())
}

fn write_table(sheet: &mut Worksheet, table: &DataTable) -> Result<()> {
    for (col, name) in table.columns().iter().enumerate() {
        sheet.write_string(0, col as u16, name)?;
    }
    for (row, values) in table.rows().iter().enumerate() {
        for (col, value) in values.iter().enumerate() {
            write_value(sheet, (row + 1) as u32, col as u16, value)?;
        }
    }
    Ok(())
}

fn write_value(sheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<()> {
    match value {
        Value::Empty => {}
        Value::Int(i) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        Value::Number(n) => {
            sheet.write_number(row, col, *n)?;
        }
        Value::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        // Dates and sentinels are written as their text form.
        other => {
            sheet.write_string(row, col, other.display().as_str())?;
        }
    }
    Ok(())
}

/// Writes the coercion error report: one row per rejected value.
pub fn write_error_report(failures: &[CoercionFailure], path: &Path) -> Result<()> {
    tracing::info!(
        file = %path.display(),
        count = failures.len(),
        "writing coercion error report"
    );

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Errors")?;

    let columns = ["sourcename", "sheetname", "column", "column_type", "original"];
    for (col, name) in columns.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }
    for (i, failure) in failures.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, &failure.sourcename)?;
        sheet.write_string(row, 1, &failure.sheetname)?;
        sheet.write_string(row, 2, &failure.column)?;
        sheet.write_string(row, 3, &failure.column_type)?;
        sheet.write_string(row, 4, &failure.original)?;
    }
    workbook.save(path)?;
    Ok(())
}
