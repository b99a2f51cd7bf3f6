use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tariff_engine::catalog::domain::{TariffQuery, TariffResponse};
use tariff_engine::catalog::ingestion::{self, TariffSheetImporter};
use tariff_engine::catalog::TariffCatalog;
use tariff_engine::error::AppError;

use crate::infra::InMemoryTariffStore;
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "Feed-in Tariff Service",
    about = "Normalize regulatory tariff sheets and match installations against them",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Normalize a tariff sheet and print the result
    Ingest(IngestArgs),
    /// Run a one-shot query against a freshly ingested sheet
    Query(QueryArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Tariff sheet to seed the store with at startup
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct IngestArgs {
    /// Path to the exported tariff sheet
    #[arg(long)]
    input: PathBuf,
    /// Print the normalized records as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct QueryArgs {
    /// Path to the exported tariff sheet
    #[arg(long)]
    catalog: PathBuf,
    /// Energy carrier partition to query
    #[arg(long)]
    energy_type: String,
    /// Commissioning date of the installation (YYYY-MM-DD)
    #[arg(long)]
    commissioning_date: Option<NaiveDate>,
    /// Power output of the installation in kW
    #[arg(long)]
    power_output: Option<f64>,
    /// Substring filter on the raw criteria text
    #[arg(long)]
    criteria: Option<String>,
    /// Substring filter on the category designation
    #[arg(long)]
    bezeichnung: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Ingest(args) => run_ingest(args),
        Command::Query(args) => run_query(args),
    }
}

fn run_ingest(args: IngestArgs) -> Result<(), AppError> {
    let records = TariffSheetImporter::from_path(&args.input)?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&records)
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        println!("{rendered}");
    } else {
        let with_dates = records
            .iter()
            .filter(|record| record.date_range.is_some())
            .count();
        let with_power = records
            .iter()
            .filter(|record| record.power_range.is_some())
            .count();
        println!(
            "{} records normalized ({} with a date range, {} with a power range)",
            records.len(),
            with_dates,
            with_power
        );
    }

    Ok(())
}

fn run_query(args: QueryArgs) -> Result<(), AppError> {
    let records = TariffSheetImporter::from_path(&args.catalog)?;
    let store = Arc::new(InMemoryTariffStore::default());
    ingestion::persist(&records, store.as_ref());

    let catalog = TariffCatalog::new(store);
    let query = TariffQuery {
        energy_source: args.energy_type,
        commissioning_date: args.commissioning_date,
        power_output: args.power_output,
        criteria_text: args.criteria,
        designation_text: args.bezeichnung,
    };
    let selection = catalog.query(&query)?;

    let response = TariffResponse::from(selection);
    let rendered = serde_json::to_string_pretty(&response)
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
    println!("{rendered}");

    Ok(())
}
