//! Alpaca Trading API v2 REST client.

use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::auth::Credentials;
use super::types::{
    AccountResponse, ApiErrorResponse, CalendarResponse, ClockResponse, OrderRequest,
    OrderResponse, PositionResponse,
};
use crate::error::BrokerError;

/// Paper-trading endpoint.
pub const PAPER_URL: &str = "https://paper-api.alpaca.markets";
/// Live-trading endpoint.
pub const LIVE_URL: &str = "https://api.alpaca.markets";

/// Blocking Alpaca REST client.
pub struct AlpacaClient {
    client: Client,
    credentials: Credentials,
    base_url: String,
}

impl AlpacaClient {
    /// Create a new client against `base_url` (no trailing slash needed).
    pub fn new(
        credentials: Credentials,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get account information (GET /v2/account).
    pub fn account(&self) -> Result<AccountResponse, BrokerError> {
        self.get("/v2/account", &[])
    }

    /// Get all open positions (GET /v2/positions).
    pub fn positions(&self) -> Result<Vec<PositionResponse>, BrokerError> {
        self.get("/v2/positions", &[])
    }

    /// Submit a new order (POST /v2/orders).
    pub fn submit_order(&self, order: &OrderRequest) -> Result<OrderResponse, BrokerError> {
        let url = format!("{}/v2/orders", self.base_url);

        debug!(
            "Submitting Alpaca order: {} {} {} {} {}",
            order.side, order.qty, order.symbol, order.order_type, order.time_in_force
        );

        let resp = self
            .credentials
            .apply(self.client.post(&url))
            .json(order)
            .send()
            .map_err(|e| BrokerError::Order(format!("order request failed: {e}")))?;

        // Alpaca answers 403 for insufficient buying power, so every
        // rejection here is an order error rather than an auth failure.
        if !resp.status().is_success() {
            return Err(match error_for(resp, "order") {
                BrokerError::Connection(msg) | BrokerError::Auth(msg) => BrokerError::Order(msg),
                other => other,
            });
        }

        resp.json::<OrderResponse>()
            .map_err(|e| BrokerError::Parse(format!("order response: {e}")))
    }

    /// List orders with the given status filter (GET /v2/orders).
    pub fn orders(&self, status: &str) -> Result<Vec<OrderResponse>, BrokerError> {
        self.get("/v2/orders", &[("status", status), ("limit", "500")])
    }

    /// Get the market clock (GET /v2/clock).
    pub fn clock(&self) -> Result<ClockResponse, BrokerError> {
        self.get("/v2/clock", &[])
    }

    /// Get the trading calendar (GET /v2/calendar).
    pub fn calendar(&self) -> Result<Vec<CalendarResponse>, BrokerError> {
        self.get("/v2/calendar", &[])
    }

    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, BrokerError> {
        let url = format!("{}{path}", self.base_url);
        let request: RequestBuilder = self.credentials.apply(self.client.get(&url)).query(query);

        let resp = request
            .send()
            .map_err(|e| BrokerError::Connection(format!("{path} request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(error_for(resp, path));
        }

        resp.json::<T>()
            .map_err(|e| BrokerError::Parse(format!("{path}: {e}")))
    }
}

/// Map a non-success response to a broker error, keeping Alpaca's message.
fn error_for(resp: Response, what: &str) -> BrokerError {
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BrokerError::Auth(format!("{what} returned {status}: {message}"))
        }
        StatusCode::TOO_MANY_REQUESTS => BrokerError::RateLimit,
        _ => BrokerError::Connection(format!("{what} returned {status}: {message}")),
    }
}
