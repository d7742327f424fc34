//! PricePoint — the fundamental unit of the price series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One ETH/USD fact: the closing (or spot) price for a single calendar day.
///
/// Dates carry no time-of-day and no timezone. The store keys on them: at
/// most one point per calendar day survives a write.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}
