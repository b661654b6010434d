//! Error types for the rebalancer.

use std::path::PathBuf;

use capweight::{DataError, Symbol};
use capweight_broker::{BrokerError, BrokerSide};
use capweight_marketdata::MarketDataError;

use crate::execution::ExecutionReport;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("market data error: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("{call} response is missing {symbol}")]
    MissingQuote { symbol: Symbol, call: &'static str },

    #[error("{open} {side} order(s) still open after {waited_secs}s")]
    OrdersDidNotClear {
        side: BrokerSide,
        open: usize,
        waited_secs: u64,
    },

    #[error("stopped before completion")]
    Cancelled,

    /// Execution stopped partway; `report` holds every order placed so far.
    #[error("{source} ({} submitted, {} failed before halting)", .report.submitted(), .report.failed())]
    Halted {
        report: Box<ExecutionReport>,
        source: Box<Error>,
    },

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

impl Error {
    /// The underlying error, looking through [`Error::Halted`].
    pub fn root(&self) -> &Error {
        match self {
            Error::Halted { source, .. } => source.root(),
            other => other,
        }
    }

    /// Orders already placed when execution halted.
    pub fn partial_report(&self) -> Option<&ExecutionReport> {
        match self {
            Error::Halted { report, .. } => Some(&**report),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
