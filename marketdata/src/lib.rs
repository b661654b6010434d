//! Market data sources for capweight.
//!
//! Two collaborator traits feed the rebalancer:
//!
//! - [`MembershipSource`]: which symbols make up the tracked index
//! - [`QuoteProvider`]: per-symbol key statistics and previous close, in
//!   bounded batches
//!
//! Implementations:
//!
//! - **Mock** (always built): in-memory sources for tests
//! - **IEX Cloud** (feature `iex`): batch quote endpoint
//! - **HTML table** (feature `scrape`): membership scraped from a web page

pub mod error;
pub mod mock;

#[cfg(feature = "iex")]
pub mod iex;

#[cfg(feature = "scrape")]
pub mod membership;

use std::collections::BTreeMap;

use capweight::{Fields, Symbol};

pub use error::MarketDataError;

/// Provider fields per symbol, as returned by one batch call.
pub type FieldTable = BTreeMap<Symbol, Fields>;

/// Largest batch the IEX batch endpoint accepts.
pub const MAX_BATCH: usize = 99;

/// A source of index constituents.
pub trait MembershipSource {
    /// Constituent symbols in the order the source lists them.
    fn index_symbols(&self) -> Result<Vec<Symbol>, MarketDataError>;
}

/// A batch quote provider.
///
/// Each call covers at most [`QuoteProvider::max_batch`] symbols. Symbols the
/// provider does not know are simply absent from the returned table.
pub trait QuoteProvider {
    /// Key statistics, including `marketcap`.
    fn key_stats(&self, batch: &[Symbol]) -> Result<FieldTable, MarketDataError>;

    /// Previous session's bar, including `close`.
    fn previous_close(&self, batch: &[Symbol]) -> Result<FieldTable, MarketDataError>;

    /// Largest batch a single call accepts.
    fn max_batch(&self) -> usize {
        MAX_BATCH
    }
}
