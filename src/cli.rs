use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetmerge")]
#[command(about = "Spreadsheet table discovery, matching and merge tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan input files and write the match report for review
    Scan {
        /// Configuration file (JSON)
        #[arg(short, long, required = true)]
        config: PathBuf,

        /// Match report output file
        #[arg(short, long, default_value = "match-report.xlsx")]
        report: PathBuf,
    },

    /// Merge all matched sheets into one workbook
    Merge {
        /// Configuration file (JSON)
        #[arg(short, long, required = true)]
        config: PathBuf,

        /// Merged workbook output file
        #[arg(short, long, default_value = "merged.xlsx")]
        output: PathBuf,

        /// Reconstruct matches from an edited match report instead of
        /// re-matching
        #[arg(long)]
        from_report: Option<PathBuf>,

        /// Also write the (updated) match report here
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write values rejected by type coercion here
        #[arg(long)]
        error_report: Option<PathBuf>,
    },
}
