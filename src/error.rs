//! Data-validity errors raised by target computation.

use crate::types::Symbol;

/// Errors returned when market or account data cannot produce a target.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DataError {
    /// Portfolio value is not a finite, non-negative number.
    #[error("invalid portfolio value: {0:?}")]
    InvalidPortfolioValue(String),

    /// Market cap is negative or not finite.
    #[error("invalid market cap for {symbol}: {marketcap}")]
    InvalidMarketCap { symbol: Symbol, marketcap: f64 },

    /// Close price is zero, negative, or not finite.
    #[error("invalid close price for {symbol}: {close}")]
    InvalidClose { symbol: Symbol, close: f64 },

    /// Market caps of all quoted symbols sum to zero, so no weight exists.
    #[error("total market cap is zero")]
    ZeroTotalMarketCap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            DataError::InvalidPortfolioValue("abc".into()).to_string(),
            "invalid portfolio value: \"abc\""
        );
        assert_eq!(
            DataError::InvalidClose {
                symbol: Symbol::new("AAPL"),
                close: 0.0
            }
            .to_string(),
            "invalid close price for AAPL: 0"
        );
        assert_eq!(
            DataError::ZeroTotalMarketCap.to_string(),
            "total market cap is zero"
        );
    }

    #[test]
    fn is_error() {
        let err: Box<dyn std::error::Error> = Box::new(DataError::ZeroTotalMarketCap);
        assert!(err.to_string().contains("market cap"));
    }
}
