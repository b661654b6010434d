//! In-memory market data sources for testing.
//!
//! `StaticQuotes` answers from fixed tables and records every batch it was
//! asked for; `StaticMembership` returns a fixed symbol list. Both can be told
//! to fail so tests can exercise error paths without a network.

use std::sync::Mutex;

use capweight::{Fields, Symbol};

use crate::error::MarketDataError;
use crate::{FieldTable, MAX_BATCH, MembershipSource, QuoteProvider};

/// Which endpoint a recorded call went to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuoteCall {
    KeyStats,
    PreviousClose,
}

/// Fixed-table quote provider.
pub struct StaticQuotes {
    stats: FieldTable,
    previous: FieldTable,
    max_batch: usize,
    /// Fail every call once this many calls have succeeded.
    fail_after: Option<usize>,
    calls: Mutex<Vec<(QuoteCall, Vec<Symbol>)>>,
}

impl StaticQuotes {
    pub fn new() -> Self {
        Self {
            stats: FieldTable::new(),
            previous: FieldTable::new(),
            max_batch: MAX_BATCH,
            fail_after: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Add a symbol with the given market cap and previous close.
    pub fn with_quote(mut self, symbol: Symbol, marketcap: f64, close: f64) -> Self {
        let mut stats = Fields::new();
        stats.insert("marketcap".into(), serde_json::json!(marketcap));
        stats.insert("companyName".into(), serde_json::json!(symbol.as_str()));
        let mut previous = Fields::new();
        previous.insert("close".into(), serde_json::json!(close));
        previous.insert("symbol".into(), serde_json::json!(symbol.as_str()));
        self.stats.insert(symbol, stats);
        self.previous.insert(symbol, previous);
        self
    }

    /// Add a symbol that only the key-stats endpoint knows about.
    pub fn with_stats_only(mut self, symbol: Symbol, marketcap: f64) -> Self {
        let mut stats = Fields::new();
        stats.insert("marketcap".into(), serde_json::json!(marketcap));
        self.stats.insert(symbol, stats);
        self
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }

    /// Fail with a transport error once `n` calls have been answered.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<(QuoteCall, Vec<Symbol>)> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(
        &self,
        call: QuoteCall,
        batch: &[Symbol],
        table: &FieldTable,
    ) -> Result<FieldTable, MarketDataError> {
        if batch.len() > self.max_batch {
            return Err(MarketDataError::BatchTooLarge {
                len: batch.len(),
                max: self.max_batch,
            });
        }
        let mut calls = self.calls.lock().unwrap();
        if self.fail_after.is_some_and(|n| calls.len() >= n) {
            return Err(MarketDataError::Transport("mock: provider unavailable".into()));
        }
        calls.push((call, batch.to_vec()));

        Ok(batch
            .iter()
            .filter_map(|s| table.get(s).map(|f| (*s, f.clone())))
            .collect())
    }
}

impl Default for StaticQuotes {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteProvider for StaticQuotes {
    fn key_stats(&self, batch: &[Symbol]) -> Result<FieldTable, MarketDataError> {
        self.answer(QuoteCall::KeyStats, batch, &self.stats)
    }

    fn previous_close(&self, batch: &[Symbol]) -> Result<FieldTable, MarketDataError> {
        self.answer(QuoteCall::PreviousClose, batch, &self.previous)
    }

    fn max_batch(&self) -> usize {
        self.max_batch
    }
}

/// Fixed membership list.
pub struct StaticMembership {
    symbols: Vec<Symbol>,
    fail: bool,
}

impl StaticMembership {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self {
            symbols,
            fail: false,
        }
    }

    /// A source whose every call fails with a transport error.
    pub fn failing() -> Self {
        Self {
            symbols: Vec::new(),
            fail: true,
        }
    }
}

impl MembershipSource for StaticMembership {
    fn index_symbols(&self) -> Result<Vec<Symbol>, MarketDataError> {
        if self.fail {
            return Err(MarketDataError::Transport("mock: membership unavailable".into()));
        }
        Ok(self.symbols.clone())
    }
}
