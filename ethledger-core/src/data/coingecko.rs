//! CoinGecko spot-price client.
//!
//! One request, one number: the current price for a single asset/quote pair
//! from the `simple/price` endpoint. No credential required.

use super::provider::{DataError, SpotSource};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// `simple/price` response: `{ "ethereum": { "usd": 3021.55 } }`.
#[derive(Debug, Deserialize)]
struct SimplePriceResponse(HashMap<String, HashMap<String, f64>>);

/// CoinGecko spot-price client.
pub struct CoinGeckoSource {
    client: reqwest::blocking::Client,
    asset_id: String,
    quote: String,
}

impl CoinGeckoSource {
    pub fn new(asset_id: impl Into<String>, quote: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            asset_id: asset_id.into(),
            quote: quote.into(),
        }
    }

    fn price_url(&self) -> String {
        format!(
            "https://api.coingecko.com/api/v3/simple/price?ids={}&vs_currencies={}",
            self.asset_id, self.quote
        )
    }

    /// Pull the one price out of the nested response.
    fn extract_price(&self, body: &SimplePriceResponse) -> Result<f64, DataError> {
        body.0
            .get(&self.asset_id)
            .and_then(|quotes| quotes.get(&self.quote))
            .copied()
            .ok_or_else(|| {
                DataError::ResponseFormatChanged(format!(
                    "no {}/{} price in response",
                    self.asset_id, self.quote
                ))
            })
    }
}

impl SpotSource for CoinGeckoSource {
    fn name(&self) -> &str {
        "coingecko"
    }

    fn fetch_spot(&self) -> Result<f64, DataError> {
        let resp = self
            .client
            .get(self.price_url())
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

        if !status.is_success() {
            return Err(DataError::Other(format!(
                "HTTP {status} for {}",
                self.asset_id
            )));
        }

        let body: SimplePriceResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse price response: {e}"))
        })?;

        self.extract_price(&body)
    }
}
