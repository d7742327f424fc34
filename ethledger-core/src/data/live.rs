//! Live spot-price updater.
//!
//! One fetch, one row: today's date (local process date) gets the current
//! spot price, overwriting any earlier value recorded for today and leaving
//! every other date untouched.

use super::provider::{DataError, SpotSource};
use crate::domain::PricePoint;
use crate::store::PriceStore;
use chrono::NaiveDate;

/// Outcome of a live update, for reporting.
#[derive(Debug)]
pub struct LiveOutcome {
    pub point: PricePoint,
    pub total_after_merge: usize,
}

/// Fetch the current spot price and record it as today's row.
pub fn run_live_update(
    source: &dyn SpotSource,
    store: &PriceStore,
) -> Result<LiveOutcome, DataError> {
    update_for_date(source, store, chrono::Local::now().date_naive())
}

fn update_for_date(
    source: &dyn SpotSource,
    store: &PriceStore,
    date: NaiveDate,
) -> Result<LiveOutcome, DataError> {
    let price = source.fetch_spot()?;
    let point = PricePoint { date, price };
    let total = store.upsert(&[point])?;
    Ok(LiveOutcome {
        point,
        total_after_merge: total,
    })
}
