//! Shared broker types: accounts, positions, orders, clock, calendar.

use std::fmt;

use capweight::Symbol;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::Serialize;

/// Account summary from the broker.
///
/// Monetary values are kept as the decimal strings the broker reports;
/// callers parse what they need so malformed values surface as data errors.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub portfolio_value: String,
    pub cash: String,
    pub buying_power: String,
}

/// Broker-level position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub symbol: Symbol,
    /// Positive = long, negative = short.
    pub quantity: i64,
    pub market_value: f64,
}

/// Order to submit to a broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerOrder {
    pub symbol: Symbol,
    pub side: BrokerSide,
    pub quantity: u64,
    pub order_type: BrokerOrderType,
    pub time_in_force: TimeInForce,
}

impl BrokerOrder {
    /// Market order valid for the current session only.
    pub fn market_day(symbol: Symbol, side: BrokerSide, quantity: u64) -> Self {
        Self {
            symbol,
            side,
            quantity,
            order_type: BrokerOrderType::Market,
            time_in_force: TimeInForce::Day,
        }
    }
}

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerSide {
    Buy,
    Sell,
}

impl BrokerSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerSide::Buy => "buy",
            BrokerSide::Sell => "sell",
        }
    }
}

impl fmt::Display for BrokerSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerSide::Buy => write!(f, "BUY"),
            BrokerSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Order pricing. Rebalancing only trades at market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerOrderType {
    Market,
}

impl BrokerOrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerOrderType::Market => "market",
        }
    }
}

/// How long an order stays working.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    /// Valid for the current trading session only.
    Day,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Day => "day",
        }
    }
}

/// Opaque order ID returned by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An order the broker still lists as working.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenOrder {
    pub id: OrderId,
    /// Kept as a string: open orders may be for instruments outside the index.
    pub symbol: String,
    pub side: Option<BrokerSide>,
    pub status: String,
}

/// Market clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    /// Current time at the exchange's UTC offset.
    pub timestamp: DateTime<FixedOffset>,
    pub is_open: bool,
}

/// One trading session in the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub open: NaiveTime,
    pub close: NaiveTime,
}
