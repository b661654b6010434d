//! Market data error types.

/// Errors that can occur while fetching membership or quotes.
#[derive(Debug, thiserror::Error)]
pub enum MarketDataError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("{what} returned HTTP {status}")]
    Status { what: String, status: u16 },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("batch of {len} symbols exceeds provider limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("missing credentials: {0}")]
    Auth(String),
}
