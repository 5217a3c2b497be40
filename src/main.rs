use anyhow::Context;
use clap::Parser;
use sheetmerge::cli::{Cli, Commands};
use sheetmerge::config::MergeConfig;
use sheetmerge::loader::WorkbookCache;
use sheetmerge::{export, report, workflow};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan { config, report: report_path } => {
            println!("📊 sheetmerge - scan\n");

            println!("[1/3] Loading configuration...");
            let config = MergeConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            println!(
                "✔ {} table types, {} input patterns\n",
                config.tables.len(),
                config.inputs.len()
            );

            println!("[2/3] Scanning workbooks...");
            let (sheets, unmatched) = workflow::find_sources(&config, true)?;
            println!(
                "✔ {} sheets matched, {} unmatched\n",
                sheets.len(),
                unmatched.len()
            );

            println!("[3/3] Writing match report...");
            let rows = report::to_report(&sheets, &unmatched);
            report::write_report(&rows, &report_path)?;
            println!("✔ Match report: {}", report_path.display());

            println!("\n✅ Done");
        }

        Commands::Merge {
            config,
            output,
            from_report,
            report: report_path,
            error_report,
        } => {
            println!("📊 sheetmerge - merge\n");

            println!("[1/4] Loading configuration...");
            let config = MergeConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            println!("✔ {} table types configured\n", config.tables.len());

            println!("[2/4] Matching sheets and columns...");
            let (sheets, unmatched) = match &from_report {
                Some(path) => {
                    println!("- Reconstructing matches from {}", path.display());
                    workflow::read_sources(path, &config)?
                }
                None => workflow::find_sources(&config, true)?,
            };
            println!(
                "✔ {} sheets matched, {} unmatched\n",
                sheets.len(),
                unmatched.len()
            );

            if let Some(path) = &report_path {
                let rows = report::to_report(&sheets, &unmatched);
                report::write_report(&rows, path)?;
                println!("✔ Match report: {}\n", path.display());
            }

            println!("[3/4] Loading and merging tables...");
            let mut cache = WorkbookCache::new();
            let (tables, failures) =
                workflow::merge_tables_by_type(&sheets, &config, &mut cache)?;
            for (name, table) in &tables {
                println!("- {}: {} rows", name, table.len());
            }
            if !failures.is_empty() {
                println!("⚠ {} values rejected by type coercion", failures.len());
            }
            if let Some(path) = &error_report {
                if failures.is_empty() {
                    println!("- No coercion failures, skipping error report");
                } else {
                    export::write_error_report(&failures, path)?;
                    println!("✔ Error report: {}", path.display());
                }
            }
            println!();

            println!("[4/4] Writing output...");
            export::write_output(&tables, &output)?;
            println!("✔ Merged workbook: {}", output.display());

            println!("\n✅ Done");
        }
    }

    Ok(())
}
