//! CURRENT→TARGET order diff.
//!
//! Signed share changes per symbol. Negative entries are sells, positive
//! entries are buys; zero entries are never stored.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::Symbol;

/// Signed share changes keyed by symbol.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OrderDiff {
    deltas: BTreeMap<Symbol, i64>,
}

impl OrderDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the change for `symbol`. A zero delta removes the entry.
    pub fn set(&mut self, symbol: Symbol, delta: i64) {
        if delta == 0 {
            self.deltas.remove(&symbol);
        } else {
            self.deltas.insert(symbol, delta);
        }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<i64> {
        self.deltas.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, i64)> + '_ {
        self.deltas.iter().map(|(s, d)| (*s, *d))
    }

    /// Sell quantities (absolute) for every negative delta, in symbol order.
    pub fn sells(&self) -> Vec<(Symbol, u64)> {
        self.iter()
            .filter(|&(_, d)| d < 0)
            .map(|(s, d)| (s, d.unsigned_abs()))
            .collect()
    }

    /// Buy quantities for every positive delta, in symbol order.
    pub fn buys(&self) -> Vec<(Symbol, u64)> {
        self.iter()
            .filter(|&(_, d)| d > 0)
            .map(|(s, d)| (s, d.unsigned_abs()))
            .collect()
    }
}

impl FromIterator<(Symbol, i64)> for OrderDiff {
    fn from_iter<I: IntoIterator<Item = (Symbol, i64)>>(iter: I) -> Self {
        let mut diff = OrderDiff::new();
        for (sym, delta) in iter {
            diff.set(sym, delta);
        }
        diff
    }
}
