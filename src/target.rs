//! Market-cap weighted target computation.
//!
//! Turns a quote table, the current holdings, and the account's portfolio
//! value into a per-symbol target share count. Symbols held but not quoted
//! (dropped from the index) get a zero target so the diff liquidates them.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::diff::OrderDiff;
use crate::error::DataError;
use crate::quote::QuoteTable;
use crate::types::{Holdings, Symbol};

/// Computed row for one symbol.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TargetRow {
    /// Whole shares to hold after rebalancing (floored, never rounded up).
    pub target_qty: i64,
    /// Shares held now (negative = short).
    pub current_qty: i64,
    pub last_close: f64,
    /// Fraction of total index market cap, in `[0, 1]`.
    pub weight: f64,
    pub marketcap: f64,
}

impl TargetRow {
    /// Signed share change needed to reach the target, saturating at the
    /// `i64` bounds for absurd broker-reported holdings.
    pub fn delta(&self) -> i64 {
        self.target_qty.saturating_sub(self.current_qty)
    }
}

/// Target rows for the union of quoted and held symbols.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TargetTable {
    rows: BTreeMap<Symbol, TargetRow>,
}

impl TargetTable {
    pub fn get(&self, symbol: &Symbol) -> Option<&TargetRow> {
        self.rows.get(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &TargetRow)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of all weights (1.0 up to float error when any market cap is positive).
    pub fn weight_sum(&self) -> f64 {
        self.rows.values().map(|r| r.weight).sum()
    }

    /// Value of the target portfolio at last close prices.
    pub fn invested_value(&self) -> f64 {
        self.rows
            .values()
            .map(|r| r.target_qty as f64 * r.last_close)
            .sum()
    }

    /// Per-symbol `target_qty - current_qty`, with zero entries dropped.
    pub fn diff(&self) -> OrderDiff {
        self.rows
            .iter()
            .map(|(sym, row)| (*sym, row.delta()))
            .collect()
    }
}

/// Parse the broker-reported portfolio value.
///
/// Accepts any finite, non-negative decimal (surrounding whitespace ignored).
pub fn parse_portfolio_value(raw: &str) -> Result<f64, DataError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(DataError::InvalidPortfolioValue(raw.to_string())),
    }
}

/// Compute market-cap weighted targets.
///
/// `weight(s) = marketcap(s) / Σ marketcap` over `quotes`, and
/// `target_qty(s) = floor(portfolio_value * weight(s) / close(s))`.
/// Symbols only present in `holdings` get weight 0 and target 0.
///
/// # Errors
///
/// - [`DataError::InvalidPortfolioValue`] if `portfolio_value` is negative or not finite
/// - [`DataError::InvalidMarketCap`] if a market cap is negative or not finite
/// - [`DataError::InvalidClose`] if a close price is not strictly positive
/// - [`DataError::ZeroTotalMarketCap`] if the market caps sum to zero
pub fn compute_targets(
    quotes: &QuoteTable,
    holdings: &Holdings,
    portfolio_value: f64,
) -> Result<TargetTable, DataError> {
    if !portfolio_value.is_finite() || portfolio_value < 0.0 {
        return Err(DataError::InvalidPortfolioValue(portfolio_value.to_string()));
    }

    for (sym, q) in quotes {
        if !q.marketcap.is_finite() || q.marketcap < 0.0 {
            return Err(DataError::InvalidMarketCap {
                symbol: *sym,
                marketcap: q.marketcap,
            });
        }
        if !q.close.is_finite() || q.close <= 0.0 {
            return Err(DataError::InvalidClose {
                symbol: *sym,
                close: q.close,
            });
        }
    }

    let total: f64 = quotes.values().map(|q| q.marketcap).sum();
    if total <= 0.0 {
        return Err(DataError::ZeroTotalMarketCap);
    }

    let mut rows = BTreeMap::new();

    for (sym, q) in quotes {
        let weight = q.marketcap / total;
        let target_qty = (portfolio_value * weight / q.close).floor() as i64;
        rows.insert(
            *sym,
            TargetRow {
                target_qty,
                current_qty: holdings.get(sym).copied().unwrap_or(0),
                last_close: q.close,
                weight,
                marketcap: q.marketcap,
            },
        );
    }

    // Held but no longer in the index: liquidate.
    for (sym, &qty) in holdings {
        rows.entry(*sym).or_insert(TargetRow {
            target_qty: 0,
            current_qty: qty,
            last_close: 0.0,
            weight: 0.0,
            marketcap: 0.0,
        });
    }

    Ok(TargetTable { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::QuoteRecord;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    fn quotes(rows: &[(&str, f64, f64)]) -> QuoteTable {
        rows.iter()
            .map(|&(s, mc, close)| (sym(s), QuoteRecord::new(mc, close)))
            .collect()
    }

    #[test]
    fn two_symbol_scenario() {
        let q = quotes(&[("AAA", 100.0, 10.0), ("BBB", 300.0, 20.0)]);
        let holdings: Holdings = [(sym("AAA"), 5)].into_iter().collect();

        let table = compute_targets(&q, &holdings, 4000.0).unwrap();

        let aaa = table.get(&sym("AAA")).unwrap();
        assert!((aaa.weight - 0.25).abs() < 1e-12);
        assert_eq!(aaa.target_qty, 100);
        assert_eq!(aaa.current_qty, 5);
        assert_eq!(aaa.delta(), 95);

        let bbb = table.get(&sym("BBB")).unwrap();
        assert!((bbb.weight - 0.75).abs() < 1e-12);
        assert_eq!(bbb.target_qty, 150);
        assert_eq!(bbb.current_qty, 0);
        assert_eq!(bbb.delta(), 150);
    }

    #[test]
    fn floors_fractional_shares() {
        // weight 0.1 of 10_000 at $33 = 30.30 shares
        let q = quotes(&[("AAA", 10.0, 33.0), ("BBB", 90.0, 1000.0)]);
        let table = compute_targets(&q, &Holdings::new(), 10_000.0).unwrap();
        assert_eq!(table.get(&sym("AAA")).unwrap().target_qty, 30);
        assert_eq!(table.get(&sym("BBB")).unwrap().target_qty, 9);
    }

    #[test]
    fn held_outside_index_is_liquidated() {
        let q = quotes(&[("AAA", 100.0, 10.0)]);
        let holdings: Holdings = [(sym("OLD"), 40), (sym("SHRT"), -7)].into_iter().collect();

        let table = compute_targets(&q, &holdings, 1000.0).unwrap();
        assert_eq!(table.len(), 3);

        let old = table.get(&sym("OLD")).unwrap();
        assert_eq!(old.target_qty, 0);
        assert_eq!(old.weight, 0.0);
        assert_eq!(old.marketcap, 0.0);
        assert_eq!(old.last_close, 0.0);
        assert_eq!(old.delta(), -40);

        assert_eq!(table.get(&sym("SHRT")).unwrap().delta(), 7);
    }

    #[test]
    fn extreme_holdings_saturate_delta() {
        let q = quotes(&[("AAA", 100.0, 10.0)]);
        let holdings: Holdings = [(sym("AAA"), i64::MIN), (sym("OLD"), i64::MIN)]
            .into_iter()
            .collect();

        let table = compute_targets(&q, &holdings, 1000.0).unwrap();
        assert_eq!(table.get(&sym("AAA")).unwrap().delta(), i64::MAX);
        assert_eq!(table.get(&sym("OLD")).unwrap().delta(), i64::MAX);
        assert_eq!(table.diff().get(&sym("OLD")), Some(i64::MAX));
    }

    #[test]
    fn zero_marketcap_member_gets_zero_target() {
        let q = quotes(&[("AAA", 100.0, 10.0), ("ZERO", 0.0, 5.0)]);
        let table = compute_targets(&q, &Holdings::new(), 1000.0).unwrap();
        let zero = table.get(&sym("ZERO")).unwrap();
        assert_eq!(zero.weight, 0.0);
        assert_eq!(zero.target_qty, 0);
    }

    #[test]
    fn zero_total_marketcap_rejected() {
        let q = quotes(&[("AAA", 0.0, 10.0), ("BBB", 0.0, 20.0)]);
        assert_eq!(
            compute_targets(&q, &Holdings::new(), 1000.0),
            Err(DataError::ZeroTotalMarketCap)
        );
    }

    #[test]
    fn empty_quotes_rejected() {
        let holdings: Holdings = [(sym("AAA"), 1)].into_iter().collect();
        assert_eq!(
            compute_targets(&QuoteTable::new(), &holdings, 1000.0),
            Err(DataError::ZeroTotalMarketCap)
        );
    }

    #[test]
    fn bad_close_rejected() {
        let q = quotes(&[("AAA", 100.0, 0.0)]);
        assert!(matches!(
            compute_targets(&q, &Holdings::new(), 1000.0),
            Err(DataError::InvalidClose { .. })
        ));

        let q = quotes(&[("AAA", 100.0, -3.0)]);
        assert!(matches!(
            compute_targets(&q, &Holdings::new(), 1000.0),
            Err(DataError::InvalidClose { .. })
        ));
    }

    #[test]
    fn negative_marketcap_rejected() {
        let q = quotes(&[("AAA", -1.0, 10.0)]);
        assert!(matches!(
            compute_targets(&q, &Holdings::new(), 1000.0),
            Err(DataError::InvalidMarketCap { .. })
        ));
    }

    #[test]
    fn negative_portfolio_value_rejected() {
        let q = quotes(&[("AAA", 100.0, 10.0)]);
        assert!(matches!(
            compute_targets(&q, &Holdings::new(), -1.0),
            Err(DataError::InvalidPortfolioValue(_))
        ));
    }

    #[test]
    fn zero_portfolio_value_targets_nothing() {
        let q = quotes(&[("AAA", 100.0, 10.0)]);
        let holdings: Holdings = [(sym("AAA"), 3)].into_iter().collect();
        let table = compute_targets(&q, &holdings, 0.0).unwrap();
        assert_eq!(table.get(&sym("AAA")).unwrap().target_qty, 0);
        assert_eq!(table.diff().get(&sym("AAA")), Some(-3));
    }

    #[test]
    fn parse_portfolio_value_accepts_decimal_strings() {
        assert_eq!(parse_portfolio_value("103456.78").unwrap(), 103_456.78);
        assert_eq!(parse_portfolio_value(" 0 ").unwrap(), 0.0);
    }

    #[test]
    fn parse_portfolio_value_rejects_garbage() {
        for raw in ["", "abc", "-5", "NaN", "inf"] {
            assert!(
                matches!(
                    parse_portfolio_value(raw),
                    Err(DataError::InvalidPortfolioValue(_))
                ),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn invested_value_never_exceeds_portfolio() {
        let q = quotes(&[("AAA", 123.0, 17.0), ("BBB", 456.0, 91.0), ("CCC", 789.0, 3.3)]);
        let table = compute_targets(&q, &Holdings::new(), 25_000.0).unwrap();
        assert!(table.invested_value() <= 25_000.0);
        assert!((table.weight_sum() - 1.0).abs() < 1e-9);
    }
}
