//! Provider traits and structured error types.
//!
//! The two traits abstract over the price APIs (bulk daily history, live
//! spot price) so the pipelines can be driven by mocks in tests.

use crate::domain::PricePoint;
use crate::store::StoreError;
use thiserror::Error;

/// Structured error types for fetch-and-store operations.
///
/// Fetch failures abort the invocation; store read problems never surface
/// here (the store degrades them to an empty dataset), only write failures do.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("data error: {0}")]
    Other(String),
}

/// A paginated daily-history source, addressed by an "as of" cursor.
///
/// One page holds at most `limit` normalized points ending at `as_of`,
/// going backward in time. A page shorter than `limit` means the source
/// has no older data.
pub trait HistorySource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch one page of daily points ending at `as_of` (epoch seconds, UTC).
    fn fetch_page(&self, as_of: i64, limit: usize) -> Result<Vec<PricePoint>, DataError>;
}

/// A spot-price source returning the current price with no history.
pub trait SpotSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch the current price.
    fn fetch_spot(&self) -> Result<f64, DataError>;
}
