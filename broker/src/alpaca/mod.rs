//! Alpaca broker implementation.

pub mod auth;
pub mod client;
pub mod types;

use std::time::Duration;

use capweight::Symbol;
use chrono::{DateTime, NaiveDate, NaiveTime};
use log::warn;

use crate::Broker;
use crate::error::BrokerError;
use crate::types::*;
use client::AlpacaClient;

pub use auth::Credentials;

/// Alpaca broker implementing the generic Broker trait.
///
/// Uses the REST API for all operations. Blocking (sync) via reqwest::blocking.
pub struct AlpacaBroker {
    client: AlpacaClient,
}

impl AlpacaBroker {
    /// Create a broker handle for `base_url` (paper or live endpoint).
    pub fn new(
        credentials: Credentials,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        Ok(Self {
            client: AlpacaClient::new(credentials, base_url, timeout)?,
        })
    }

    pub fn client(&self) -> &AlpacaClient {
        &self.client
    }
}

impl Broker for AlpacaBroker {
    fn account(&self) -> Result<Account, BrokerError> {
        let info = self.client.account()?;
        Ok(Account {
            portfolio_value: info.portfolio_value,
            cash: info.cash,
            buying_power: info.buying_power,
        })
    }

    fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        convert_positions(&self.client.positions()?)
    }

    fn submit_order(&self, order: &BrokerOrder) -> Result<OrderId, BrokerError> {
        let request = types::OrderRequest {
            symbol: order.symbol.as_str().to_string(),
            qty: order.quantity.to_string(),
            side: order.side.as_str(),
            order_type: order.order_type.as_str(),
            time_in_force: order.time_in_force.as_str(),
        };
        let resp = self.client.submit_order(&request)?;
        Ok(OrderId(resp.id))
    }

    fn open_orders(&self) -> Result<Vec<OpenOrder>, BrokerError> {
        Ok(self
            .client
            .orders("open")?
            .into_iter()
            .map(|o| OpenOrder {
                id: OrderId(o.id),
                side: parse_side(&o.side),
                symbol: o.symbol,
                status: o.status,
            })
            .collect())
    }

    fn clock(&self) -> Result<Clock, BrokerError> {
        let clock = self.client.clock()?;
        let timestamp = DateTime::parse_from_rfc3339(&clock.timestamp)
            .map_err(|e| BrokerError::Parse(format!("clock timestamp {:?}: {e}", clock.timestamp)))?;
        Ok(Clock {
            timestamp,
            is_open: clock.is_open,
        })
    }

    fn calendar(&self) -> Result<Vec<CalendarDay>, BrokerError> {
        self.client
            .calendar()?
            .iter()
            .map(|c| {
                Ok(CalendarDay {
                    date: NaiveDate::parse_from_str(&c.date, "%Y-%m-%d")
                        .map_err(|e| BrokerError::Parse(format!("calendar date {:?}: {e}", c.date)))?,
                    open: parse_session_time(&c.open)?,
                    close: parse_session_time(&c.close)?,
                })
            })
            .collect()
    }
}

/// Map wire positions to broker positions.
///
/// A position whose symbol cannot be a [`Symbol`] is skipped with a warning so
/// one odd holding does not block every rebalance.
pub fn convert_positions(wire: &[types::PositionResponse]) -> Result<Vec<Position>, BrokerError> {
    let mut positions = Vec::with_capacity(wire.len());
    for p in wire {
        let Some(symbol) = Symbol::try_new(&p.symbol) else {
            warn!("skipping position with unsupported symbol {:?} (qty {})", p.symbol, p.qty);
            continue;
        };
        positions.push(Position {
            symbol,
            quantity: parse_whole_qty(&p.qty)?,
            market_value: p
                .market_value
                .as_deref()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),
        });
    }
    Ok(positions)
}

/// Parse a position quantity. Fractional holdings are rejected.
pub fn parse_whole_qty(raw: &str) -> Result<i64, BrokerError> {
    let trimmed = raw.trim();
    if let Ok(q) = trimmed.parse::<i64>() {
        return Ok(q);
    }
    // Alpaca may render whole quantities with a decimal part ("12.0").
    match trimmed.parse::<f64>() {
        Ok(q) if q.is_finite() && q.fract() == 0.0 && q.abs() < i64::MAX as f64 => Ok(q as i64),
        _ => Err(BrokerError::Parse(format!("position qty {raw:?} is not a whole number"))),
    }
}

fn parse_side(raw: &str) -> Option<BrokerSide> {
    match raw {
        "buy" => Some(BrokerSide::Buy),
        "sell" => Some(BrokerSide::Sell),
        _ => None,
    }
}

/// Parse an `HH:MM` (or `HH:MM:SS`) session boundary.
pub fn parse_session_time(raw: &str) -> Result<NaiveTime, BrokerError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| BrokerError::Parse(format!("session time {raw:?}: {e}")))
}
