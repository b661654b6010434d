//! Alpaca-specific API request and response types.

use serde::{Deserialize, Serialize};

/// Alpaca account response (`GET /v2/account`). Money fields are decimal strings.
#[derive(Debug, Deserialize)]
pub struct AccountResponse {
    pub portfolio_value: String,
    #[serde(default)]
    pub cash: String,
    #[serde(default)]
    pub buying_power: String,
    #[serde(default)]
    pub status: String,
}

/// Alpaca position entry (`GET /v2/positions`).
#[derive(Debug, Deserialize)]
pub struct PositionResponse {
    pub symbol: String,
    pub qty: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub market_value: Option<String>,
}

/// Alpaca order submission body (`POST /v2/orders`).
#[derive(Debug, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: String,
    pub side: &'static str,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub time_in_force: &'static str,
}

/// Alpaca order object (`POST /v2/orders`, `GET /v2/orders`).
#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    #[serde(default)]
    pub client_order_id: String,
    pub symbol: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub qty: Option<String>,
    pub status: String,
}

/// Alpaca market clock (`GET /v2/clock`).
#[derive(Debug, Deserialize)]
pub struct ClockResponse {
    /// RFC 3339 with the exchange's UTC offset, e.g. `2024-04-01T09:31:02.12-04:00`.
    pub timestamp: String,
    pub is_open: bool,
    #[serde(default)]
    pub next_open: Option<String>,
    #[serde(default)]
    pub next_close: Option<String>,
}

/// Alpaca calendar entry (`GET /v2/calendar`).
#[derive(Debug, Deserialize)]
pub struct CalendarResponse {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub open: String,
    /// `HH:MM`
    pub close: String,
}

/// Alpaca error body.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub code: Option<u64>,
    pub message: String,
}
