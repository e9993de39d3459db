#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the dealer feed tool.

use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dealer_feed_ingest::IngestService;
use dealer_feed_source::DataDomain;
use dealer_feed_source::filter::RecordFilter;
use dealer_feed_source::parsing::parse_iso_date;

#[derive(Parser)]
#[command(
    name = "dealer_feed_ingest",
    about = "Branch sheet queries and service report intake"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured branches
    Branches,
    /// Check whether the spreadsheet host is reachable
    Probe,
    /// Fetch one data domain for a branch, or for every branch
    Fetch {
        /// Data domain (sales, stock, service, enquiry, bookings)
        #[arg(value_parser = parse_domain)]
        domain: DataDomain,
        /// Branch id (e.g., "Bhavani"). Omit for all branches.
        #[arg(long)]
        branch: Option<String>,
        /// Case-insensitive text to search for
        #[arg(long)]
        search: Option<String>,
    },
    /// Extract and store a technician productivity report PDF
    UploadReport {
        /// Path to the report PDF
        file: PathBuf,
        /// Branch the report belongs to
        #[arg(long)]
        branch: String,
        /// Day the report covers (YYYY-MM-DD). Defaults to today.
        #[arg(long, value_parser = parse_iso_date)]
        date: Option<NaiveDate>,
    },
    /// Print stored service report rows
    Reports {
        /// Only rows for this branch
        #[arg(long)]
        branch: Option<String>,
        /// Only rows for this day (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        date: Option<NaiveDate>,
    },
}

fn parse_domain(s: &str) -> Result<DataDomain, String> {
    s.parse::<DataDomain>().map_err(|_| {
        let names: Vec<String> = DataDomain::ALL.iter().map(ToString::to_string).collect();
        format!("unknown data domain '{s}' (expected one of {})", names.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let service = IngestService::from_env()?;

    match cli.command {
        Commands::Branches => {
            println!("{}", serde_json::to_string_pretty(&service.list_branches())?);
        }
        Commands::Probe => {
            let connected = service.probe().await;
            println!(
                "{}",
                serde_json::json!({
                    "connected": connected,
                    "lastProbeAt": service.connectivity().last_probe_at(),
                })
            );
        }
        Commands::Fetch {
            domain,
            branch,
            search,
        } => {
            let start = Instant::now();
            let records = service.get_domain_data(domain, branch.as_deref()).await?;

            let filter = RecordFilter::for_domain(domain).search(search.as_deref().unwrap_or(""));
            let records = filter.apply(records);

            log::info!(
                "{} {domain} records in {:.1}s",
                records.len(),
                start.elapsed().as_secs_f64()
            );
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::UploadReport { file, branch, date } => {
            let bytes = tokio::fs::read(&file).await?;
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let upload = service
                .ingest_service_report(&file_name, bytes, &branch, date)
                .await?;

            if !upload.header_found {
                log::warn!("{}: no technician table found", file.display());
            }
            println!("{}", serde_json::to_string_pretty(&upload)?);
        }
        Commands::Reports { branch, date } => {
            let rows = service.get_reports(branch.as_deref(), date).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}
