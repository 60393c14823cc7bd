use clap::{Parser, Subcommand};
use merch_ledger::application::service::MerchService;
use merch_ledger::config::{DEFAULT_STARTING_BALANCE, LedgerConfig};
use merch_ledger::domain::catalog::DEFAULT_CATALOG;
use merch_ledger::domain::coins::Amount;
use merch_ledger::domain::ports::LedgerStoreRef;
use merch_ledger::infrastructure::in_memory::InMemoryLedgerStore;
#[cfg(feature = "storage-rocksdb")]
use merch_ledger::infrastructure::rocksdb::RocksDbLedgerStore;
use merch_ledger::interfaces::csv::balance_writer::BalanceWriter;
use merch_ledger::interfaces::csv::catalog_reader::read_catalog;
use merch_ledger::interfaces::csv::command_reader::{Command, CommandReader};
use merch_ledger::telemetry;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "MERCH_DB_PATH", global = true)]
    db_path: Option<PathBuf>,

    /// Catalog CSV with `name, price` rows. Defaults to the built-in merch list.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Coins granted to an employee on enrollment.
    #[arg(
        long,
        env = "MERCH_STARTING_BALANCE",
        default_value_t = DEFAULT_STARTING_BALANCE,
        global = true
    )]
    starting_balance: u64,

    /// Maximum time an atomic unit may stay open, in milliseconds.
    #[arg(long, env = "MERCH_ATOMIC_TIMEOUT_MS", default_value_t = 5000, global = true)]
    atomic_timeout_ms: u64,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Replay a commands CSV and print the resulting balances
    Replay {
        /// Input commands CSV file (`op, user, target, amount`)
        input: PathBuf,
    },
    /// Print an employee's inventory and coin history as JSON
    Activity {
        username: String,

        /// Commands CSV to replay before reading the activity
        #[arg(long)]
        replay: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();

    let config = LedgerConfig::default()
        .with_starting_balance(cli.starting_balance)
        .with_atomic_timeout(Duration::from_millis(cli.atomic_timeout_ms));
    let service = MerchService::new(open_store(cli.db_path)?, config);
    provision(&service, cli.catalog.as_deref()).await?;

    match cli.command {
        Mode::Replay { input } => {
            replay(&service, &input).await?;

            let employees = service.employees().await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = BalanceWriter::new(stdout.lock());
            writer.write_balances(&employees).into_diagnostic()?;
        }
        Mode::Activity { username, replay: input } => {
            if let Some(input) = input {
                replay(&service, &input).await?;
            }

            let activity = service.activity(&username).await.into_diagnostic()?;
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &activity).into_diagnostic()?;
            writeln!(stdout).into_diagnostic()?;
        }
    }

    Ok(())
}

fn open_store(db_path: Option<PathBuf>) -> Result<LedgerStoreRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDbLedgerStore::open(&path).into_diagnostic()?;
            info!(path = %path.display(), "using RocksDB storage");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(path) => {
            warn!(
                path = %path.display(),
                "persistent storage requested via --db-path, but the 'storage-rocksdb' feature is not enabled; falling back to in-memory storage"
            );
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
        None => Ok(Arc::new(InMemoryLedgerStore::new())),
    }
}

async fn provision(service: &MerchService, catalog: Option<&Path>) -> Result<()> {
    let items = match catalog {
        Some(path) => {
            let file = File::open(path).into_diagnostic()?;
            read_catalog(file).into_diagnostic()?
        }
        None => DEFAULT_CATALOG
            .iter()
            .map(|(name, price)| Amount::new(*price).map(|price| (name.to_string(), price)))
            .collect::<merch_ledger::error::Result<Vec<_>>>()
            .into_diagnostic()?,
    };

    service
        .provision_catalog(items.iter().map(|(name, price)| (name.as_str(), *price)))
        .await
        .into_diagnostic()?;
    Ok(())
}

/// Applies every command in `input`. A failing row is logged and skipped.
async fn replay(service: &MerchService, input: &Path) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let reader = CommandReader::new(file);

    let (mut applied, mut failed) = (0usize, 0usize);
    for (index, command) in reader.commands().enumerate() {
        let row = index + 1;
        let outcome = match command {
            Ok(Command::Enroll {
                username,
                credential_hash,
            }) => service.enroll(&username, &credential_hash).await.map(|_| ()),
            Ok(Command::Buy { buyer, item }) => service.purchase(&buyer, &item).await.map(|_| ()),
            Ok(Command::Send {
                sender,
                receiver,
                amount,
            }) => service.transfer(&sender, &receiver, amount).await.map(|_| ()),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(()) => applied += 1,
            Err(err) => {
                failed += 1;
                warn!(row, kind = ?err.kind(), error = %err, "command failed");
            }
        }
    }

    info!(applied, failed, "replay finished");
    Ok(())
}
