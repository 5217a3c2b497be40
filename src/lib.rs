//! sheetmerge
//!
//! Identifies which sheets of a heterogeneous pile of spreadsheet workbooks
//! correspond to which configured table types, matches their headers to
//! canonical columns, and merges everything into one deduplicated table per
//! type, with a human-correctable match report round trip.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod matcher;
pub mod merger;
pub mod normalizer;
pub mod pattern;
pub mod report;
pub mod scanner;
pub mod table;
pub mod workflow;

pub use config::{ColumnConfig, ColumnType, MergeConfig, ScanSource, SourceConfig};
pub use error::{Result, SheetMergeError};
pub use loader::WorkbookCache;
pub use matcher::{MatchedColumn, MatchedSheet, SheetWithHeaders};
pub use scanner::worksheet::{HeaderItem, WorksheetRecord};
pub use scanner::FileRecord;
pub use table::{DataTable, Value};
