//! fill-recon CLI
//!
//! Usage:
//!   fill-recon verify --wallet 0xabc --start-ms 0 --mode grouped
//!   echo '{"wallet":"0xabc","start_ms":0,"end_ms":1762093860372}' | fill-recon event
//!   fill-recon fetch --wallet 0xabc --sample 3
//!   fill-recon backfill --wallet-id 42 --wallet 0xabc --start-ms 1700000000000

use std::io::Read;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fill_recon::backfill::BackfillEngine;
use fill_recon::domain::TimeWindow;
use fill_recon::error::is_retryable_failure;
use fill_recon::exchange::HttpInfoTransport;
use fill_recon::providers::{ExchangeFillProvider, WarehouseFillProvider};
use fill_recon::sink::{MemorySink, SqliteFillSink};
use fill_recon::state::{SqliteStateRepository, StateRepository};
use fill_recon::verify::{self, FetchSummary, VerifyRequest};
use fill_recon::AppConfig;

/// Table the `backfill` command writes fills into, next to the state table.
const BACKFILL_TABLE: &str = "hl_fills";
const SINK_BATCH_SIZE: usize = 1000;

/// Reconcile warehouse fills against the exchange
#[derive(Parser, Debug)]
#[command(name = "fill-recon")]
#[command(about = "Backfill exchange fills and reconcile them against the trade warehouse")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare one wallet's fills over a window
    Verify {
        #[arg(long)]
        wallet: String,

        #[arg(long, default_value = "0")]
        start_ms: i64,

        /// Defaults to now
        #[arg(long)]
        end_ms: Option<i64>,

        /// Restrict to one instrument
        #[arg(long)]
        coin: Option<String>,

        /// `fills` (per-fill tolerances) or `grouped` (hash, coin, side)
        #[arg(long, default_value = "fills")]
        mode: String,
    },

    /// Read a JSON verify request from stdin and print the result
    Event,

    /// Pull a wallet's fills from the exchange and print a summary
    Fetch {
        #[arg(long)]
        wallet: String,

        #[arg(long, default_value = "0")]
        start_ms: i64,

        #[arg(long)]
        end_ms: Option<i64>,

        /// Rows shown from the head and the tail
        #[arg(long, default_value = "3")]
        sample: usize,
    },

    /// Resumable chunked backfill into the local fill store
    Backfill {
        #[arg(long)]
        wallet_id: i64,

        #[arg(long)]
        wallet: String,

        /// Used when the wallet has no saved cursor
        #[arg(long, default_value = "0")]
        start_ms: i64,

        /// Start here regardless of the saved cursor
        #[arg(long)]
        start_override: Option<i64>,

        /// Clear a finished marker before running
        #[arg(long)]
        reopen: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    run(cli, &config).map_err(|err| {
        if is_retryable_failure(&err) {
            warn!("upstream still unavailable, safe to rerun later");
        }
        err
    })
}

fn run(cli: Cli, config: &AppConfig) -> Result<()> {
    match cli.command {
        Commands::Verify {
            wallet,
            start_ms,
            end_ms,
            coin,
            mode,
        } => {
            let request = VerifyRequest {
                wallet,
                start_ms,
                end_ms: end_ms.unwrap_or_else(now_ms),
                coin,
                mode: Some(mode),
            };
            run_verify(config, &request)
        }
        Commands::Event => {
            let mut payload = String::new();
            std::io::stdin()
                .read_to_string(&mut payload)
                .context("Failed to read request from stdin")?;
            let request: VerifyRequest =
                serde_json::from_str(&payload).context("Invalid verify request")?;
            run_verify(config, &request)
        }
        Commands::Fetch {
            wallet,
            start_ms,
            end_ms,
            sample,
        } => run_fetch(config, &wallet, start_ms, end_ms.unwrap_or_else(now_ms), sample),
        Commands::Backfill {
            wallet_id,
            wallet,
            start_ms,
            start_override,
            reopen,
        } => run_backfill(config, wallet_id, &wallet, start_ms, start_override, reopen),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fill_recon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn exchange_engine(config: &AppConfig) -> Result<BackfillEngine<HttpInfoTransport>> {
    let transport = HttpInfoTransport::new(&config.info_url, config.timeout)?;
    Ok(BackfillEngine::new(transport, config.retry_policy()))
}

fn run_verify(config: &AppConfig, request: &VerifyRequest) -> Result<()> {
    let warehouse =
        WarehouseFillProvider::open(&config.warehouse_db_path, &config.warehouse_table)?;
    let exchange = ExchangeFillProvider::new(exchange_engine(config)?, config.fill_count_policy());

    let response = verify::run(request, &warehouse, &exchange, config.tolerances.clone())?;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

fn run_fetch(
    config: &AppConfig,
    wallet: &str,
    start_ms: i64,
    end_ms: i64,
    sample: usize,
) -> Result<()> {
    let window = TimeWindow::new(start_ms, end_ms)?;
    info!(wallet = %wallet, start_ms, end_ms, "fetching fills");

    let engine = exchange_engine(config)?;
    let mut sink = MemorySink::default();
    engine.process_wallet(wallet, &window, &mut sink)?;

    let summary = FetchSummary::from_fills(wallet, window, sink.rows(), sample);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_backfill(
    config: &AppConfig,
    wallet_id: i64,
    wallet: &str,
    start_ms: i64,
    start_override: Option<i64>,
    reopen: bool,
) -> Result<()> {
    let state_repo = SqliteStateRepository::open(&config.state_db_path)?;
    let mut sink = SqliteFillSink::open(&config.state_db_path, BACKFILL_TABLE, SINK_BATCH_SIZE)?;

    if reopen {
        let state = state_repo.load(wallet_id)?;
        if state.finished {
            let cursor = state.next_start_ms.unwrap_or(start_ms);
            state_repo.save(wallet_id, cursor, false)?;
            info!(wallet = %wallet, wallet_id, cursor, "finished marker cleared");
        }
    }

    let plan = config.chunk_plan(start_ms).with_override(start_override);
    let engine = exchange_engine(config)?;
    let run = engine.process_wallet_chunked(wallet_id, wallet, &plan, &mut sink, &state_repo)?;
    config.fill_count_policy().check_chunked(wallet, &run)?;

    info!(wallet = %wallet, written = sink.written(), "fill store updated");
    println!("{}", serde_json::to_string_pretty(&run)?);
    Ok(())
}
