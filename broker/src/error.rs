//! Broker error types.

/// Errors that can occur during broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("order error: {0}")]
    Order(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("failed to parse broker response: {0}")]
    Parse(String),

    #[error("rate limit exceeded")]
    RateLimit,
}
