//! Column normalisation and type coercion.
//!
//! After matching, each loaded table is reshaped onto its table type's
//! canonical columns: matched headers renamed, unmapped source columns
//! dropped, missing canonical columns null-filled, order enforced. Columns
//! declared `date` are then coerced, day-first; a value that fails to parse
//! becomes an `InvalidDate` sentinel and one diagnostic row, never an error.

use crate::config::{ColumnConfig, ColumnType};
use crate::table::{DataTable, Value};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// One value rejected by type coercion, for the diagnostic report.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionFailure {
    pub sourcename: String,
    pub sheetname: String,
    pub column: String,
    pub column_type: String,
    pub original: String,
}

/// Renames matched headers to canonical names, drops unmapped source
/// columns, adds missing canonical columns empty, and orders the result
/// exactly as `column_names`.
pub fn normalise(
    table: &DataTable,
    column_names: &[String],
    column_map: &HashMap<String, String>,
) -> DataTable {
    let mapped: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| column_map.contains_key(*c))
        .cloned()
        .collect();
    let mut table = table.select(&mapped);
    table.rename_columns(column_map);
    table.select(column_names)
}

/// Applies per-column type coercion in place. Failures are per-value:
/// each becomes a sentinel plus a diagnostic row, and a warning reports the
/// per-column count.
pub fn clean_datatypes(
    table: &mut DataTable,
    columns: &[ColumnConfig],
    sourcename: &str,
    sheetname: &str,
) -> Vec<CoercionFailure> {
    let mut failures = Vec::new();

    for column in columns {
        if column.column_type != Some(ColumnType::Date) {
            continue;
        }
        let mut rejected = 0usize;
        for row in 0..table.len() {
            let Some(value) = table.value(row, &column.name).cloned() else {
                continue;
            };
            match coerce_date(&value) {
                CoercedDate::Unchanged => {}
                CoercedDate::Date(date) => {
                    table.set_value(row, &column.name, Value::Date(date));
                }
                CoercedDate::Invalid => {
                    rejected += 1;
                    failures.push(CoercionFailure {
                        sourcename: sourcename.to_string(),
                        sheetname: sheetname.to_string(),
                        column: column.name.clone(),
                        column_type: "date".to_string(),
                        original: value.display(),
                    });
                    table.set_value(row, &column.name, Value::InvalidDate(value.display()));
                }
            }
        }
        if rejected > 0 {
            tracing::warn!(
                count = rejected,
                column = %column.name,
                sheet = %sheetname,
                file = %sourcename,
                "values rejected by date coercion"
            );
        }
    }

    failures
}

enum CoercedDate {
    Unchanged,
    Date(NaiveDate),
    Invalid,
}

fn coerce_date(value: &Value) -> CoercedDate {
    match value {
        Value::Empty | Value::Date(_) | Value::InvalidDate(_) => CoercedDate::Unchanged,
        Value::Text(s) => match parse_date_dayfirst(s) {
            Some(date) => CoercedDate::Date(date),
            None => CoercedDate::Invalid,
        },
        Value::Int(i) => match serial_to_date(*i as f64) {
            Some(date) => CoercedDate::Date(date),
            None => CoercedDate::Invalid,
        },
        Value::Number(n) => match serial_to_date(*n) {
            Some(date) => CoercedDate::Date(date),
            None => CoercedDate::Invalid,
        },
        Value::Bool(_) => CoercedDate::Invalid,
    }
}

const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d/%m/%y",
    "%d-%m-%Y",
    "%d-%m-%y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Day-first date parsing over a fixed set of formats.
pub fn parse_date_dayfirst(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime.date());
        }
    }
    None
}

/// Interprets a numeric cell as a spreadsheet serial date number.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    // Spreadsheet day 0 is 1899-12-30 (accounting for the 1900 leap bug).
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .map(|epoch| epoch + Duration::days(serial.trunc() as i64))
}
