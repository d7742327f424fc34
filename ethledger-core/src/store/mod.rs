//! Date-keyed Parquet storage.

pub mod parquet;

pub use parquet::{DateRange, PriceStats, PriceStore, StoreError, StoreSummary};
