use clap::Parser;
use membership_pay::config::PaymentSettings;
use membership_pay::infrastructure::in_memory::InMemoryStore;
use membership_pay::infrastructure::simulated_gateway::SimulatedGateway;
use membership_pay::interfaces::csv::report_writer::ReportWriter;
use membership_pay::interfaces::csv::scenario_reader::ScenarioReader;
use membership_pay::interfaces::scenario::ScenarioRunner;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario CSV file (action, membership, actor, amount)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Settings file (TOML, YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = PaymentSettings::load(cli.config.as_deref()).into_diagnostic()?;
    let gateway = SimulatedGateway::default();

    let runner = match cli.db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(db_path) => {
            let store = membership_pay::infrastructure::rocksdb::RocksDBStore::open(db_path)
                .into_diagnostic()?;
            ScenarioRunner::new(store, gateway, settings)
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
            );
            ScenarioRunner::new(InMemoryStore::new(), gateway, settings)
        }
        None => ScenarioRunner::new(InMemoryStore::new(), gateway, settings),
    };

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = ScenarioReader::new(file);
    for (line, step) in reader.steps().enumerate() {
        match step {
            Ok(step) => {
                if let Err(e) = runner.apply(step).await {
                    error!("Step {} failed: {}", line + 1, e.user_message());
                }
            }
            Err(e) => {
                error!("Error reading step {}: {}", line + 1, e);
            }
        }
    }

    let memberships = runner.memberships().await.into_diagnostic()?;
    let transactions = runner.transactions().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer
        .write_report(memberships, transactions)
        .into_diagnostic()?;

    Ok(())
}
