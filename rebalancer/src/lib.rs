//! capweight-rebalancer: keeps an Alpaca account market-cap weighted against
//! an index.
//!
//! Every position is sized to its share of the index's total market cap
//! and the difference is traded with market orders: all sells, wait for
//! them to clear, then all buys. In daemon mode this happens once per trading day
//! after a configurable cutoff, with a JSONL audit trail of every run.

pub mod aggregate;
pub mod audit;
pub mod clients;
pub mod commands;
pub mod config;
pub mod error;
pub mod execution;
pub mod rebalance;
pub mod scheduler;
