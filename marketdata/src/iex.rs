//! IEX Cloud batch quote provider.
//!
//! Both calls go through the market batch endpoint:
//! `GET {base}/stock/market/batch?symbols=A,B&types=stats&token=…` for key
//! statistics and `types=previous` for the previous session's bar. The
//! response is keyed by symbol, then by type:
//!
//! ```text
//! { "AAPL": { "stats": { "marketcap": 2.6e12, ... } } }
//! ```

use std::time::Duration;

use capweight::Symbol;
use log::debug;
use reqwest::blocking::Client;
use serde_json::Value;
use zeroize::Zeroizing;

use crate::error::MarketDataError;
use crate::{FieldTable, MAX_BATCH, QuoteProvider};

/// Production endpoint.
pub const CLOUD_URL: &str = "https://cloud.iexapis.com/stable";

/// Batch `types` value for key statistics.
pub const STATS_TYPE: &str = "stats";
/// Batch `types` value for the previous day's bar.
pub const PREVIOUS_TYPE: &str = "previous";

/// Blocking IEX Cloud client.
pub struct IexClient {
    client: Client,
    base_url: String,
    token: Zeroizing<String>,
}

impl IexClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketDataError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Zeroizing::new(token.to_string()),
        })
    }

    /// Read the API token from the named environment variable.
    pub fn from_env(base_url: &str, token_var: &str, timeout: Duration) -> Result<Self, MarketDataError> {
        let token = Zeroizing::new(
            std::env::var(token_var)
                .map_err(|_| MarketDataError::Auth(format!("{token_var} is not set")))?,
        );
        Self::new(base_url, &token, timeout)
    }

    /// Fetch one data type for a batch of symbols.
    pub fn batch(&self, symbols: &[Symbol], data_type: &str) -> Result<FieldTable, MarketDataError> {
        if symbols.len() > MAX_BATCH {
            return Err(MarketDataError::BatchTooLarge {
                len: symbols.len(),
                max: MAX_BATCH,
            });
        }
        if symbols.is_empty() {
            return Ok(FieldTable::new());
        }

        let joined = symbols
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/stock/market/batch", self.base_url);

        debug!("IEX batch {data_type}: {} symbols", symbols.len());

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("symbols", joined.as_str()),
                ("types", data_type),
                ("token", self.token.as_str()),
            ])
            .send()
            .map_err(|e| MarketDataError::Transport(format!("batch {data_type} request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(MarketDataError::Status {
                what: format!("batch {data_type}"),
                status: resp.status().as_u16(),
            });
        }

        let body: Value = resp
            .json()
            .map_err(|e| MarketDataError::Parse(format!("batch {data_type}: {e}")))?;

        parse_batch(&body, data_type)
    }
}

impl QuoteProvider for IexClient {
    fn key_stats(&self, batch: &[Symbol]) -> Result<FieldTable, MarketDataError> {
        self.batch(batch, STATS_TYPE)
    }

    fn previous_close(&self, batch: &[Symbol]) -> Result<FieldTable, MarketDataError> {
        self.batch(batch, PREVIOUS_TYPE)
    }
}

/// Pull `{SYMBOL: {data_type: {...}}}` apart into a field table.
///
/// Symbols whose entry lacks `data_type` (or has it as `null`) are left out.
pub fn parse_batch(body: &Value, data_type: &str) -> Result<FieldTable, MarketDataError> {
    let entries = body
        .as_object()
        .ok_or_else(|| MarketDataError::Parse("batch response is not an object".into()))?;

    let mut table = FieldTable::new();
    for (raw, entry) in entries {
        let symbol = Symbol::try_new(raw)
            .ok_or_else(|| MarketDataError::Parse(format!("invalid symbol in batch response: {raw:?}")))?;
        match entry.get(data_type) {
            Some(Value::Object(fields)) => {
                table.insert(symbol, fields.clone());
            }
            Some(Value::Null) | None => {}
            Some(other) => {
                return Err(MarketDataError::Parse(format!(
                    "{raw}.{data_type} is not an object: {other}"
                )));
            }
        }
    }
    Ok(table)
}
