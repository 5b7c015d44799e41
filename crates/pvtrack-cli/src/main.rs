use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "pvtrack-cli")]
#[command(about = "PA solar PV facility tracker command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Merge the latest raw snapshot into the accumulated dataset.
    Merge,
    /// Write standalone chart, map, and summary-table documents.
    Report {
        #[arg(long, default_value = "./reports/site")]
        out_dir: PathBuf,
    },
    /// Serve the dashboard.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Merge) {
        Commands::Merge => {
            let summary = pvtrack_merge::run_merge_once_from_env()?;
            println!("columns: {}", summary.columns.join(", "));
            println!(
                "merge complete: run_id={} rows={} new={} duplicates_skipped={} reports={}",
                summary.run_id,
                summary.total_rows,
                summary.new_rows_added,
                summary.duplicate_ids_skipped,
                summary.reports_dir
            );
        }
        Commands::Report { out_dir } => {
            let config = pvtrack_merge::MergeConfig::from_env();
            let written = pvtrack_web::write_report_documents(&config, &out_dir)?;
            for path in written {
                println!("wrote {}", path.display());
            }
        }
        Commands::Serve => {
            pvtrack_web::serve_from_env().await?;
        }
    }

    Ok(())
}
