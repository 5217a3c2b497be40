use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetMergeError {
    #[error("invalid regex expression '{expr}': {reason}")]
    Pattern { expr: String, reason: String },

    #[error("invalid glob pattern '{pattern}': {reason}")]
    Glob { pattern: String, reason: String },

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("failed to open workbook '{filename}': {reason}")]
    WorkbookOpen { filename: String, reason: String },

    #[error("sheet '{sheet}' not found in '{filename}'")]
    SheetNotFound { filename: String, sheet: String },

    #[error("unknown table '{0}' in match report")]
    UnknownTable(String),

    #[error("unknown column '{column}' for table '{table}' in match report")]
    UnknownColumn { table: String, column: String },

    #[error("header '{header}' not found in sheet '{sheet}' of '{filename}'")]
    UnknownHeader {
        filename: String,
        sheet: String,
        header: String,
    },

    #[error("match report error: {0}")]
    Report(String),

    #[error("Excel write error: {0}")]
    ExcelWrite(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rust_xlsxwriter::XlsxError> for SheetMergeError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        SheetMergeError::ExcelWrite(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SheetMergeError>;
