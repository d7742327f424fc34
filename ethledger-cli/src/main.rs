//! EthLedger CLI — backfill, live-update, and status commands.
//!
//! Commands:
//! - `backfill` — page the CryptoCompare daily history and merge it into the store
//! - `live` — fetch the current CoinGecko spot price and record it as today's row
//! - `status` — report record count, date range, price range, and file size

use anyhow::Result;
use clap::{Parser, Subcommand};
use ethledger_core::data::{
    run_backfill, run_live_update, BackfillConfig, CoinGeckoSource, CryptoCompareSource,
};
use ethledger_core::store::PriceStore;
use std::path::PathBuf;

const DEFAULT_STORE_PATH: &str = "data/ethereum_price.parquet";

#[derive(Parser)]
#[command(name = "ethledger", about = "EthLedger CLI — daily ETH/USD price ledger")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Page the CryptoCompare daily history and merge it into the store.
    Backfill {
        /// Store file.
        #[arg(long, default_value = DEFAULT_STORE_PATH)]
        store_path: PathBuf,

        /// Asset symbol on the history API.
        #[arg(long, default_value = "ETH")]
        symbol: String,

        /// Quote currency.
        #[arg(long, default_value = "USD")]
        quote: String,

        /// Maximum pages to request in one run.
        #[arg(long, default_value_t = 2)]
        max_pages: usize,

        /// Maximum points per page (the API caps this at 2000).
        #[arg(long, default_value_t = 2000)]
        page_limit: usize,
    },
    /// Fetch the current spot price and record it as today's row.
    Live {
        /// Store file.
        #[arg(long, default_value = DEFAULT_STORE_PATH)]
        store_path: PathBuf,
    },
    /// Report record count, date range, price range, and file size.
    Status {
        /// Store file.
        #[arg(long, default_value = DEFAULT_STORE_PATH)]
        store_path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Backfill {
            store_path,
            symbol,
            quote,
            max_pages,
            page_limit,
        } => run_backfill_cmd(store_path, symbol, quote, max_pages, page_limit),
        Commands::Live { store_path } => run_live_cmd(store_path),
        Commands::Status { store_path } => run_status_cmd(store_path),
    }
}

fn run_backfill_cmd(
    store_path: PathBuf,
    symbol: String,
    quote: String,
    max_pages: usize,
    page_limit: usize,
) -> Result<()> {
    let api_key = std::env::var("CRYPTOCOMPARE_API_KEY").ok();
    if api_key.is_none() {
        eprintln!("WARNING: CRYPTOCOMPARE_API_KEY is not set — requests may be rejected");
    }

    let source = CryptoCompareSource::new(symbol, quote, api_key);
    let store = PriceStore::new(&store_path);
    let cfg = BackfillConfig {
        page_limit,
        max_pages,
    };

    let outcome = run_backfill(&source, &store, &cfg)?;

    println!("Fetched {} daily rows from CryptoCompare", outcome.fetched);
    println!(
        "Wrote {} rows to {}",
        outcome.total_after_merge,
        store_path.display()
    );
    Ok(())
}

fn run_live_cmd(store_path: PathBuf) -> Result<()> {
    let source = CoinGeckoSource::new("ethereum", "usd");
    let store = PriceStore::new(&store_path);

    println!("Fetching Ethereum price from CoinGecko...");
    let outcome = run_live_update(&source, &store)?;

    println!(
        "Recorded {} for {} ({} rows total)",
        outcome.point.price, outcome.point.date, outcome.total_after_merge
    );
    Ok(())
}

fn run_status_cmd(store_path: PathBuf) -> Result<()> {
    let store = PriceStore::new(&store_path);
    let summary = store.summary();

    println!("Store:       {}", store_path.display());
    println!("Records:     {}", summary.total_records);
    match &summary.date_range {
        Some(r) => println!("Date range:  {} to {}", r.start, r.end),
        None => println!("Date range:  (empty)"),
    }
    match &summary.price_range {
        Some(p) => println!(
            "Price range: min {:.2}  max {:.2}  mean {:.2}",
            p.min, p.max, p.mean
        ),
        None => println!("Price range: (empty)"),
    }
    match store.latest_price() {
        Some(price) => println!("Latest:      {price}"),
        None => println!("Latest:      (empty)"),
    }
    println!("File size:   {:.2} MB", summary.file_size_mb);
    Ok(())
}
