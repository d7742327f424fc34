//! History backfill assembler.
//!
//! Walks a paginated bulk-history source backward in time: each page ends at
//! an "as of" cursor, and the next cursor is one day before the earliest
//! date in the page. Paging stops when a page comes back short of the limit
//! (source exhausted) or when the page cap is hit; the cap bounds how far
//! back a single run reaches and is deliberately configurable.

use super::provider::{DataError, HistorySource};
use crate::domain::PricePoint;
use crate::store::PriceStore;
use chrono::NaiveDate;
use std::collections::BTreeMap;

const SECS_PER_DAY: i64 = 86_400;

/// Pagination parameters for a backfill run.
#[derive(Debug, Clone)]
pub struct BackfillConfig {
    /// Maximum points per page the source will return.
    pub page_limit: usize,
    /// Maximum pages to request in one run.
    pub max_pages: usize,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            page_limit: 2000,
            max_pages: 2,
        }
    }
}

/// Outcome of a backfill run, for reporting.
#[derive(Debug)]
pub struct BackfillOutcome {
    /// Clean rows assembled from the source.
    pub fetched: usize,
    /// Rows in the store after the merge.
    pub total_after_merge: usize,
}

/// Assemble the historical series, newest page first, starting from now.
pub fn fetch_history(
    source: &dyn HistorySource,
    cfg: &BackfillConfig,
) -> Result<Vec<PricePoint>, DataError> {
    fetch_history_as_of(source, cfg, chrono::Utc::now().timestamp())
}

/// Assemble the historical series ending at an explicit cursor.
pub fn fetch_history_as_of(
    source: &dyn HistorySource,
    cfg: &BackfillConfig,
    as_of: i64,
) -> Result<Vec<PricePoint>, DataError> {
    let mut cursor = as_of;
    let mut pages: Vec<Vec<PricePoint>> = Vec::new();

    for _ in 0..cfg.max_pages {
        let page = source.fetch_page(cursor, cfg.page_limit)?;
        let exhausted = page.len() < cfg.page_limit;
        let earliest = page.iter().map(|p| p.date).min();
        pages.push(page);

        if exhausted {
            break;
        }
        match earliest {
            // One day before the earliest date seen in this page.
            Some(date) => cursor = date_to_epoch(date) - SECS_PER_DAY,
            None => break,
        }
    }

    Ok(merge_pages(pages))
}

/// Fetch the full history and merge it into the store.
pub fn run_backfill(
    source: &dyn HistorySource,
    store: &PriceStore,
    cfg: &BackfillConfig,
) -> Result<BackfillOutcome, DataError> {
    store.ensure_initialized()?;
    let points = fetch_history(source, cfg)?;
    let total = store.upsert(&points)?;
    Ok(BackfillOutcome {
        fetched: points.len(),
        total_after_merge: total,
    })
}

/// Flatten fetched pages into one clean series: positive prices only, one
/// row per date (last occurrence in processing order wins), sorted ascending.
fn merge_pages(pages: Vec<Vec<PricePoint>>) -> Vec<PricePoint> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for point in pages.into_iter().flatten() {
        if point.price <= 0.0 {
            continue;
        }
        by_date.insert(point.date, point.price);
    }
    by_date
        .into_iter()
        .map(|(date, price)| PricePoint { date, price })
        .collect()
}

/// Midnight UTC of `date` as epoch seconds.
fn date_to_epoch(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp()
}
