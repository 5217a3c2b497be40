pub mod excel;

pub use excel::{write_error_report, write_output};
