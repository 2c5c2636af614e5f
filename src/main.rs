use clap::{Parser, Subcommand};
use log::error;
use miette::{IntoDiagnostic, Result, miette};
use postal_tax::application::cancel::{CancelSignal, cancel_pair};
use postal_tax::application::service::{HistoryOutcome, TaxService};
use postal_tax::config::TaxConfig;
use postal_tax::domain::ports::HistoryStoreBox;
use postal_tax::error::TaxError;
use postal_tax::infrastructure::in_memory::InMemoryHistoryStore;
use postal_tax::interfaces::csv::history_writer::HistoryWriter;
use postal_tax::interfaces::csv::request_reader::RequestReader;
use postal_tax::interfaces::response::{CalculateResponse, ErrorResponse};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Calculator configuration (JSON). Uses the built-in rule set if omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to persistent history database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Calculate the tax for one income
    Calculate {
        /// Postal code selecting the calculator; omit to use the default
        #[arg(long)]
        postal_code: Option<String>,

        #[arg(long, allow_negative_numbers = true)]
        income: Decimal,
    },
    /// Calculate every `postal_code,income` row of a CSV file, then print the history
    Batch {
        /// Input requests CSV file
        input: PathBuf,
    },
    /// Print the calculation history
    History,
}

fn history_store(db_path: Option<PathBuf>) -> Result<HistoryStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store =
                postal_tax::infrastructure::rocksdb::RocksDBHistoryStore::open(path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryHistoryStore::new()))
        }
        None => Ok(Box::new(InMemoryHistoryStore::new())),
    }
}

/// Reports an error the way a caller would see it.
fn report(e: &TaxError) -> String {
    ErrorResponse::from(e).message
}

/// Logs the full error of a failed calculation and returns the caller-facing message.
fn calculation_failed(e: &TaxError) -> String {
    error!("Tax calculation failed: {}", e);
    report(e)
}

fn history_failed(e: &TaxError) -> String {
    error!("Reading history failed: {}", e);
    report(e)
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TaxConfig::from_path(path).into_diagnostic()?,
        None => TaxConfig::builtin(),
    };
    let resolver = config.resolver().into_diagnostic()?;
    let service = TaxService::new(Box::new(resolver), history_store(cli.db_path)?);

    let (cancel_handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_handle.cancel();
        }
    });

    let stdout = io::stdout();
    match cli.command {
        Command::Calculate {
            postal_code,
            income,
        } => {
            let outcome = service
                .calculate_tax_with_cancel(postal_code.as_deref(), income, &cancel)
                .await
                .map_err(|e| miette!("{}", calculation_failed(&e)))?;
            if let HistoryOutcome::Failed(e) = &outcome.history {
                eprintln!("Warning: calculation was not recorded: {}", report(e));
            }
            HistoryWriter::new(stdout.lock())
                .write_response(&CalculateResponse::from(&outcome.result))
                .into_diagnostic()?;
        }
        Command::Batch { input } => {
            run_batch(&service, input, &cancel).await?;
            let records = service.history().await.map_err(|e| miette!("{}", history_failed(&e)))?;
            HistoryWriter::new(stdout.lock())
                .write_history(&records)
                .into_diagnostic()?;
        }
        Command::History => {
            let records = service.history().await.map_err(|e| miette!("{}", history_failed(&e)))?;
            HistoryWriter::new(stdout.lock())
                .write_history(&records)
                .into_diagnostic()?;
        }
    }

    Ok(())
}

async fn run_batch(service: &TaxService, input: PathBuf, cancel: &CancelSignal) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let reader = RequestReader::new(file);
    for request in reader.requests() {
        if cancel.is_cancelled() {
            break;
        }
        match request {
            Ok(request) => {
                match service
                    .calculate_tax_with_cancel(request.postal_code.as_deref(), request.income, cancel)
                    .await
                {
                    Ok(outcome) => {
                        if let HistoryOutcome::Failed(e) = &outcome.history {
                            eprintln!("Warning: calculation was not recorded: {}", report(e));
                        }
                    }
                    Err(e) => eprintln!("Error processing request: {}", calculation_failed(&e)),
                }
            }
            Err(e) => {
                eprintln!("Error reading request: {}", e);
            }
        }
    }
    Ok(())
}
