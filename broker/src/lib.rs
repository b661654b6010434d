//! Broker trait and implementations for capweight.
//!
//! Provides a generic `Broker` trait that abstracts over the brokerage the
//! rebalancer trades through. Implementations:
//!
//! - **Mock** (always built): scripted in-memory broker for tests
//! - **Alpaca** (feature `alpaca`): Alpaca Trading API v2 over blocking REST

pub mod error;
pub mod mock;
pub mod types;

#[cfg(feature = "alpaca")]
pub mod alpaca;

pub use error::BrokerError;
pub use types::*;

/// A brokerage account that can report holdings, accept orders, and tell
/// the market clock.
///
/// All calls are blocking. Implementations hold their own connection state
/// and are passed explicitly to whatever needs them.
pub trait Broker {
    /// Account summary (portfolio value as reported).
    fn account(&self) -> Result<Account, BrokerError>;

    /// All current positions.
    fn positions(&self) -> Result<Vec<Position>, BrokerError>;

    /// Submit an order. Returns the broker-assigned order ID.
    fn submit_order(&self, order: &BrokerOrder) -> Result<OrderId, BrokerError>;

    /// Orders that are still open (not filled, cancelled, or expired).
    fn open_orders(&self) -> Result<Vec<OpenOrder>, BrokerError>;

    /// Current market clock.
    fn clock(&self) -> Result<Clock, BrokerError>;

    /// Trading calendar: every date the market is open.
    fn calendar(&self) -> Result<Vec<CalendarDay>, BrokerError>;
}
