//! # capweight
//!
//! Market-cap weighted index tracking: turn index quotes and current holdings
//! into whole-share targets and the signed order diff that reaches them.
//!
//! This crate is pure computation. Fetching quotes, reading the account and
//! submitting orders live in `capweight-marketdata`, `capweight-broker` and
//! `capweight-rebalancer`.
//!
//! ## Quick Start
//!
//! ```
//! use capweight::{compute_targets, Holdings, QuoteRecord, QuoteTable, Symbol};
//!
//! let quotes: QuoteTable = [
//!     (Symbol::new("AAA"), QuoteRecord::new(100.0, 10.0)),
//!     (Symbol::new("BBB"), QuoteRecord::new(300.0, 20.0)),
//! ]
//! .into_iter()
//! .collect();
//! let holdings: Holdings = [(Symbol::new("AAA"), 5)].into_iter().collect();
//!
//! let targets = compute_targets(&quotes, &holdings, 4_000.0).unwrap();
//! assert_eq!(targets.get(&Symbol::new("AAA")).unwrap().target_qty, 100);
//! assert_eq!(targets.get(&Symbol::new("BBB")).unwrap().target_qty, 150);
//!
//! let diff = targets.diff();
//! assert_eq!(diff.buys(), vec![(Symbol::new("AAA"), 95), (Symbol::new("BBB"), 150)]);
//! assert!(diff.sells().is_empty());
//! ```
//!
//! ## Weighting
//!
//! | Quantity | Formula |
//! |----------|---------|
//! | weight | `marketcap / Σ marketcap` over quoted symbols |
//! | target_qty | `floor(portfolio_value * weight / close)` |
//! | delta | `target_qty - current_qty` |
//!
//! Targets are floored, so the target portfolio never costs more than the
//! portfolio value at last close. Held symbols that are not quoted get a zero
//! target and are sold off.

pub mod diff;
pub mod error;
pub mod quote;
pub mod target;
pub mod types;

pub use diff::OrderDiff;
pub use error::DataError;
pub use quote::{Fields, QuoteRecord, QuoteTable};
pub use target::{TargetRow, TargetTable, compute_targets, parse_portfolio_value};
pub use types::{Holdings, SYMBOL_MAX_LEN, Symbol};
