//! EthLedger Core — daily ETH/USD price ledger.
//!
//! This crate contains the heart of the ledger:
//! - Domain type (`PricePoint` — one date/price fact)
//! - Parquet-backed date-keyed store with merge-on-write upsert semantics
//! - Provider traits and structured errors for the two price APIs
//! - History backfill assembler (cursor pagination over a bulk endpoint)
//! - Live spot-price updater

pub mod data;
pub mod domain;
pub mod store;
