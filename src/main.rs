use ap2_protocol::application::orchestrator::Orchestrator;
use ap2_protocol::config::Config;
use ap2_protocol::domain::address::AddressPolicy;
use ap2_protocol::domain::flow::FlowState;
use ap2_protocol::domain::ports::{CatalogEntry, CatalogHandle, LedgerHandle};
use ap2_protocol::infrastructure::in_memory::{InMemoryLedger, StaticCatalog};
use ap2_protocol::interfaces::csv::intent_reader::IntentReader;
use ap2_protocol::interfaces::csv::receipt_writer::ReceiptWriter;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input CSV of intents: prompt,summary,amount,recipient,memo,decision,reason
    input: PathBuf,

    /// JSON configuration file. Missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Timeout for each principal call, in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Recipient address format accepted by the processor (any, bitcoin).
    #[arg(long)]
    address_policy: Option<AddressPolicy>,

    /// Spendable balance of the simulated ledger. Unlimited when omitted.
    #[arg(long)]
    ledger_balance: Option<Decimal>,

    /// JSON file with catalog entries for merchant order matching.
    #[arg(long)]
    catalog: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path).into_diagnostic()?,
        None => Config::default(),
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        config.call_timeout_ms = timeout_ms;
    }
    if let Some(policy) = cli.address_policy {
        config.address_policy = policy;
    }
    config.cart_ttl().into_diagnostic()?;

    let ledger: LedgerHandle = match cli.ledger_balance {
        Some(balance) => Arc::new(InMemoryLedger::with_balance(balance)),
        None => Arc::new(InMemoryLedger::new()),
    };
    let catalog: Option<CatalogHandle> = match &cli.catalog {
        Some(path) => {
            let raw = std::fs::read_to_string(path).into_diagnostic()?;
            let entries: Vec<CatalogEntry> = serde_json::from_str(&raw).into_diagnostic()?;
            Some(Arc::new(StaticCatalog::new(entries)))
        }
        None => None,
    };

    let orchestrator = Orchestrator::in_process(&config, ledger, catalog);

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = IntentReader::new(file);
    let stdout = io::stdout();
    let mut writer = ReceiptWriter::new(stdout.lock());

    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                error!("Error reading intent at row {}: {}", row + 1, e);
                continue;
            }
        };

        let (input, decision) = record.into_parts();
        let mut flow = FlowState::new();
        match orchestrator.run(&mut flow, input, decision).await {
            Ok(receipt) => writer.write_receipt(&receipt).into_diagnostic()?,
            Err(e) if e.is_fatal() => {
                error!("Error processing intent at row {}: {}", row + 1, e)
            }
            Err(e) => warn!("Error processing intent at row {}: {}", row + 1, e),
        }
    }

    writer.flush().into_diagnostic()?;
    Ok(())
}
