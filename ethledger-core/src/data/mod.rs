//! Price acquisition: provider traits, API clients, and the two pipelines.

pub mod backfill;
pub mod coingecko;
pub mod cryptocompare;
pub mod live;
pub mod provider;

pub use backfill::{fetch_history, run_backfill, BackfillConfig, BackfillOutcome};
pub use coingecko::CoinGeckoSource;
pub use cryptocompare::CryptoCompareSource;
pub use live::{run_live_update, LiveOutcome};
pub use provider::{DataError, HistorySource, SpotSource};
