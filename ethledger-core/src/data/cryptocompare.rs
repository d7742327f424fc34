//! CryptoCompare bulk-history client.
//!
//! Fetches daily points from the `histoday` endpoint, addressed by a `toTs`
//! cursor and capped at 2000 points per call. Each point is normalized to a
//! UTC calendar date and its close price; all other fields are discarded.

use super::provider::{DataError, HistorySource};
use crate::domain::PricePoint;
use serde::Deserialize;
use std::time::Duration;

const HISTODAY_URL: &str = "https://min-api.cryptocompare.com/data/v2/histoday";

/// `histoday` response envelope.
#[derive(Debug, Deserialize)]
struct HistoResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Data")]
    data: Option<HistoData>,
}

#[derive(Debug, Deserialize)]
struct HistoData {
    #[serde(rename = "Data")]
    points: Vec<HistoPoint>,
}

#[derive(Debug, Deserialize)]
struct HistoPoint {
    time: i64,
    close: f64,
}

/// CryptoCompare daily-history client.
pub struct CryptoCompareSource {
    client: reqwest::blocking::Client,
    symbol: String,
    quote: String,
    api_key: Option<String>,
}

impl CryptoCompareSource {
    pub fn new(
        symbol: impl Into<String>,
        quote: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            symbol: symbol.into(),
            quote: quote.into(),
            api_key,
        }
    }

    /// Parse a `histoday` body into normalized points.
    fn parse_response(resp: HistoResponse) -> Result<Vec<PricePoint>, DataError> {
        if resp.response != "Success" {
            return Err(DataError::ResponseFormatChanged(format!(
                "histoday error response: {}",
                resp.message
            )));
        }

        let data = resp
            .data
            .ok_or_else(|| DataError::ResponseFormatChanged("missing Data envelope".into()))?;

        let mut points = Vec::with_capacity(data.points.len());
        for pt in data.points {
            let date = chrono::DateTime::from_timestamp(pt.time, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {}", pt.time))
                })?;
            points.push(PricePoint {
                date,
                price: pt.close,
            });
        }

        Ok(points)
    }
}

impl HistorySource for CryptoCompareSource {
    fn name(&self) -> &str {
        "cryptocompare"
    }

    fn fetch_page(&self, as_of: i64, limit: usize) -> Result<Vec<PricePoint>, DataError> {
        let mut request = self
            .client
            .get(HISTODAY_URL)
            .query(&[("fsym", self.symbol.as_str()), ("tsym", self.quote.as_str())])
            .query(&[("limit", limit as i64), ("toTs", as_of)]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }

        let resp = request
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DataError::AuthenticationRequired(
                "CryptoCompare rejected the API key".into(),
            ));
        }

        if !status.is_success() {
            return Err(DataError::Other(format!(
                "HTTP {status} for {}/{}",
                self.symbol, self.quote
            )));
        }

        let body: HistoResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse histoday response: {e}"))
        })?;

        Self::parse_response(body)
    }
}
