//! Parquet-backed date→price store.
//!
//! One flat file per asset with a fixed two-column schema
//! (`date`: Date, `price`: Float64). Every upsert is a full
//! read-merge-rewrite: existing rows and the new batch are folded, in that
//! order, into an ordered map keyed by date (later entries win), then the
//! whole file is rewritten sorted ascending.
//!
//! Failure asymmetry: a corrupt or unreadable file degrades to an empty
//! dataset (warned on stderr, never raised); a failed write propagates.

use crate::domain::PricePoint;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Structured error type for store write paths. Read paths never produce
/// errors — they degrade to an empty dataset instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(String),

    #[error("parquet error: {0}")]
    Parquet(String),
}

/// Inclusive date span of the persisted dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Min/max/mean over all persisted prices.
#[derive(Debug, Clone, Serialize)]
pub struct PriceStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Snapshot of the persisted dataset for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub total_records: usize,
    pub date_range: Option<DateRange>,
    pub price_range: Option<PriceStats>,
    pub file_size_mb: f64,
}

/// The Parquet-backed price store.
pub struct PriceStore {
    path: PathBuf,
}

impl PriceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the backing file with zero rows and the fixed schema if it
    /// does not exist yet. Parent directories are created as needed.
    /// Idempotent.
    pub fn ensure_initialized(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Io(format!("create dir: {e}")))?;
            }
        }
        let df = points_to_dataframe(&[])?;
        self.write_atomic(df)
    }

    /// Merge a batch into the persisted dataset and rewrite the file.
    ///
    /// For any date present both on disk and in `points`, the batch value
    /// wins; within the batch the last occurrence wins. Returns the total
    /// row count after the merge.
    pub fn upsert(&self, points: &[PricePoint]) -> Result<usize, StoreError> {
        self.ensure_initialized()?;

        let mut merged: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for p in self.load_or_empty() {
            merged.insert(p.date, p.price);
        }
        for p in points {
            merged.insert(p.date, p.price);
        }

        let combined: Vec<PricePoint> = merged
            .into_iter()
            .map(|(date, price)| PricePoint { date, price })
            .collect();

        let df = points_to_dataframe(&combined)?;
        self.write_atomic(df)?;
        Ok(combined.len())
    }

    /// All rows sorted by date ascending. A missing or unreadable file
    /// yields an empty Vec.
    pub fn read_all(&self) -> Vec<PricePoint> {
        self.load_or_empty()
    }

    /// Rows with `start <= date <= end`. An inverted range yields empty.
    pub fn read_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
        self.load_or_empty()
            .into_iter()
            .filter(|p| p.date >= start && p.date <= end)
            .collect()
    }

    /// Price at the maximum persisted date, or `None` on an empty store.
    pub fn latest_price(&self) -> Option<f64> {
        self.load_or_empty().last().map(|p| p.price)
    }

    /// Price for the exact date, or `None` if absent. Should duplicates
    /// ever end up on disk, the first match in ascending order is returned.
    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.load_or_empty()
            .iter()
            .find(|p| p.date == date)
            .map(|p| p.price)
    }

    /// Record count, date range, price range, and backing-file size.
    pub fn summary(&self) -> StoreSummary {
        let points = self.load_or_empty();
        let file_size_mb = fs::metadata(&self.path)
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0);

        if points.is_empty() {
            return StoreSummary {
                total_records: 0,
                date_range: None,
                price_range: None,
                file_size_mb,
            };
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for p in &points {
            min = min.min(p.price);
            max = max.max(p.price);
            sum += p.price;
        }

        StoreSummary {
            total_records: points.len(),
            date_range: Some(DateRange {
                start: points.first().unwrap().date,
                end: points.last().unwrap().date,
            }),
            price_range: Some(PriceStats {
                min,
                max,
                mean: sum / points.len() as f64,
            }),
            file_size_mb,
        }
    }

    /// Load the full dataset, degrading to empty on any read problem.
    /// A missing file is the normal first-run case; a present-but-unreadable
    /// file is warned about on stderr.
    fn load_or_empty(&self) -> Vec<PricePoint> {
        if !self.path.exists() {
            return Vec::new();
        }
        match read_parquet(&self.path) {
            Ok(mut points) => {
                points.sort_by_key(|p| p.date);
                points
            }
            Err(e) => {
                eprintln!(
                    "WARNING: unreadable store file {}: {e} — treating as empty",
                    self.path.display()
                );
                Vec::new()
            }
        }
    }

    /// Write to .tmp, then rename into place.
    fn write_atomic(&self, df: DataFrame) -> Result<(), StoreError> {
        let tmp_path = self.path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            // Clean up temp file on rename failure
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(format!("atomic rename failed: {e}"))
        })
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

/// Convert points to a two-column Polars DataFrame.
fn points_to_dataframe(points: &[PricePoint]) -> Result<DataFrame, StoreError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let dates: Vec<i32> = points
        .iter()
        .map(|p| (p.date - epoch).num_days() as i32)
        .collect();
    let prices: Vec<f64> = points.iter().map(|p| p.price).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| StoreError::Parquet(format!("date cast: {e}")))?,
        Column::new("price".into(), prices),
    ])
    .map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))
}

/// Write a DataFrame to a Parquet file.
fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), StoreError> {
    let file =
        fs::File::create(path).map_err(|e| StoreError::Io(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| StoreError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

/// Load a Parquet file back into points.
fn read_parquet(path: &Path) -> Result<Vec<PricePoint>, StoreError> {
    let file = fs::File::open(path).map_err(|e| StoreError::Io(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| StoreError::Parquet(format!("read: {e}")))?;
    dataframe_to_points(&df)
}

/// Convert a DataFrame back to points.
fn dataframe_to_points(df: &DataFrame) -> Result<Vec<PricePoint>, StoreError> {
    let dates = df
        .column("date")
        .map_err(|e| StoreError::Parquet(format!("column read: {e}")))?;
    let prices = df
        .column("price")
        .map_err(|e| StoreError::Parquet(format!("column read: {e}")))?;

    let date_ca = dates
        .date()
        .map_err(|e| StoreError::Parquet(format!("date column type: {e}")))?;
    let price_ca = prices
        .f64()
        .map_err(|e| StoreError::Parquet(format!("price column type: {e}")))?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let n = df.height();
    let mut points = Vec::with_capacity(n);

    for i in 0..n {
        let date_days = date_ca
            .get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null date at row {i}")))?;
        points.push(PricePoint {
            date: epoch + chrono::Duration::days(date_days as i64),
            price: price_ca.get(i).unwrap_or(f64::NAN),
        });
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_store() -> (PriceStore, PathBuf) {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("ethledger_store_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        (PriceStore::new(dir.join("ethereum_price.parquet")), dir)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn initializes_empty_file_idempotently() {
        let (store, dir) = temp_store();

        store.ensure_initialized().unwrap();
        assert!(store.path().exists());
        assert!(store.read_all().is_empty());

        // Second call must not fail or clobber anything
        store.ensure_initialized().unwrap();
        assert!(store.read_all().is_empty());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn creates_parent_directories() {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("ethledger_nested_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let store = PriceStore::new(dir.join("a/b/ethereum_price.parquet"));
        store.ensure_initialized().unwrap();
        assert!(store.path().exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn upsert_then_read_all_sorted() {
        let (store, dir) = temp_store();

        let total = store
            .upsert(&[
                PricePoint::new(d(2024, 1, 2), 110.0),
                PricePoint::new(d(2024, 1, 1), 100.0),
            ])
            .unwrap();
        assert_eq!(total, 2);

        let all = store.read_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], PricePoint::new(d(2024, 1, 1), 100.0));
        assert_eq!(all[1], PricePoint::new(d(2024, 1, 2), 110.0));
        assert_eq!(store.latest_price(), Some(110.0));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn upsert_overwrites_existing_date() {
        let (store, dir) = temp_store();

        store.upsert(&[PricePoint::new(d(2024, 1, 2), 110.0)]).unwrap();
        let total = store
            .upsert(&[
                PricePoint::new(d(2024, 1, 2), 115.0),
                PricePoint::new(d(2024, 1, 3), 120.0),
            ])
            .unwrap();
        assert_eq!(total, 2);

        let all = store.read_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], PricePoint::new(d(2024, 1, 2), 115.0));
        assert_eq!(all[1], PricePoint::new(d(2024, 1, 3), 120.0));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_dates_within_batch_last_wins() {
        let (store, dir) = temp_store();

        store
            .upsert(&[
                PricePoint::new(d(2024, 1, 1), 100.0),
                PricePoint::new(d(2024, 1, 1), 105.0),
            ])
            .unwrap();

        assert_eq!(store.read_all().len(), 1);
        assert_eq!(store.price_on(d(2024, 1, 1)), Some(105.0));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn upsert_is_idempotent() {
        let (store, dir) = temp_store();

        let batch = [
            PricePoint::new(d(2024, 1, 1), 100.0),
            PricePoint::new(d(2024, 1, 2), 110.0),
        ];
        store.upsert(&batch).unwrap();
        let once = store.read_all();
        store.upsert(&batch).unwrap();
        let twice = store.read_all();
        assert_eq!(once, twice);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_batch_is_a_noop_beyond_initialization() {
        let (store, dir) = temp_store();

        assert_eq!(store.upsert(&[]).unwrap(), 0);
        assert!(store.path().exists());
        assert!(store.read_all().is_empty());

        store.upsert(&[PricePoint::new(d(2024, 1, 1), 100.0)]).unwrap();
        assert_eq!(store.upsert(&[]).unwrap(), 1);
        assert_eq!(store.read_all().len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_range_is_inclusive_both_ends() {
        let (store, dir) = temp_store();

        store
            .upsert(&[
                PricePoint::new(d(2024, 1, 1), 100.0),
                PricePoint::new(d(2024, 1, 2), 110.0),
                PricePoint::new(d(2024, 1, 3), 120.0),
                PricePoint::new(d(2024, 1, 4), 130.0),
            ])
            .unwrap();

        let range = store.read_range(d(2024, 1, 2), d(2024, 1, 3));
        assert_eq!(range.len(), 2);
        assert_eq!(range[0].date, d(2024, 1, 2));
        assert_eq!(range[1].date, d(2024, 1, 3));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn inverted_range_yields_empty() {
        let (store, dir) = temp_store();

        store
            .upsert(&[
                PricePoint::new(d(2024, 1, 1), 100.0),
                PricePoint::new(d(2024, 1, 2), 110.0),
            ])
            .unwrap();

        assert!(store.read_range(d(2024, 1, 2), d(2024, 1, 1)).is_empty());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_store_lookups() {
        let (store, dir) = temp_store();
        store.ensure_initialized().unwrap();

        assert_eq!(store.latest_price(), None);
        assert_eq!(store.price_on(d(2024, 1, 1)), None);
        assert!(store.read_all().is_empty());

        let summary = store.summary();
        assert_eq!(summary.total_records, 0);
        assert!(summary.date_range.is_none());
        assert!(summary.price_range.is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn summary_reflects_dataset() {
        let (store, dir) = temp_store();

        store
            .upsert(&[
                PricePoint::new(d(2024, 1, 1), 100.0),
                PricePoint::new(d(2024, 1, 2), 110.0),
                PricePoint::new(d(2024, 1, 3), 120.0),
            ])
            .unwrap();

        let summary = store.summary();
        assert_eq!(summary.total_records, 3);
        let range = summary.date_range.unwrap();
        assert_eq!(range.start, d(2024, 1, 1));
        assert_eq!(range.end, d(2024, 1, 3));
        let prices = summary.price_range.unwrap();
        assert_eq!(prices.min, 100.0);
        assert_eq!(prices.max, 120.0);
        assert!((prices.mean - 110.0).abs() < 1e-9);
        assert!(summary.file_size_mb > 0.0);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn latest_price_reflects_max_date_not_write_order() {
        let (store, dir) = temp_store();

        store.upsert(&[PricePoint::new(d(2024, 1, 5), 150.0)]).unwrap();
        // Older date written later must not displace the latest
        store.upsert(&[PricePoint::new(d(2024, 1, 1), 100.0)]).unwrap();

        assert_eq!(store.latest_price(), Some(150.0));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_degrades_to_empty_and_recovers_on_upsert() {
        let (store, dir) = temp_store();

        fs::write(store.path(), b"not a parquet file").unwrap();

        assert!(store.read_all().is_empty());
        assert_eq!(store.latest_price(), None);
        assert_eq!(store.summary().total_records, 0);

        // A fresh backfill can always proceed over a corrupt file
        let total = store.upsert(&[PricePoint::new(d(2024, 1, 1), 100.0)]).unwrap();
        assert_eq!(total, 1);
        assert_eq!(store.read_all().len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }
}
