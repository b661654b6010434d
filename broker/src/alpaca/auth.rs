//! API key credentials for Alpaca requests.

use std::fmt;

use reqwest::blocking::RequestBuilder;
use zeroize::Zeroizing;

use crate::error::BrokerError;

/// Header carrying the API key ID.
pub const KEY_ID_HEADER: &str = "APCA-API-KEY-ID";
/// Header carrying the API secret.
pub const SECRET_KEY_HEADER: &str = "APCA-API-SECRET-KEY";

/// Alpaca API key pair. The secret is wiped from memory on drop.
#[derive(Clone)]
pub struct Credentials {
    key_id: String,
    secret_key: Zeroizing<String>,
}

impl Credentials {
    pub fn new(key_id: &str, secret_key: &str) -> Self {
        Self {
            key_id: key_id.to_string(),
            secret_key: Zeroizing::new(secret_key.to_string()),
        }
    }

    /// Read the key pair from the named environment variables.
    pub fn from_env(key_id_var: &str, secret_key_var: &str) -> Result<Self, BrokerError> {
        let key_id = std::env::var(key_id_var)
            .map_err(|_| BrokerError::Auth(format!("{key_id_var} is not set")))?;
        let secret_key = Zeroizing::new(
            std::env::var(secret_key_var)
                .map_err(|_| BrokerError::Auth(format!("{secret_key_var} is not set")))?,
        );
        if key_id.is_empty() || secret_key.is_empty() {
            return Err(BrokerError::Auth("empty API credentials".into()));
        }
        Ok(Self { key_id, secret_key })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Attach both auth headers to a request.
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(KEY_ID_HEADER, &self.key_id)
            .header(SECRET_KEY_HEADER, self.secret_key.as_str())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &self.key_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("PKTEST", "supersecret");
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("PKTEST"));
        assert!(!dbg.contains("supersecret"));
    }

    #[test]
    fn missing_env_is_auth_error() {
        let err = Credentials::from_env(
            "CAPWEIGHT_TEST_UNSET_KEY_ID",
            "CAPWEIGHT_TEST_UNSET_SECRET",
        )
        .unwrap_err();
        assert!(matches!(err, BrokerError::Auth(_)));
        assert!(err.to_string().contains("CAPWEIGHT_TEST_UNSET_KEY_ID"));
    }

    #[test]
    fn apply_sets_headers() {
        let creds = Credentials::new("PKTEST", "shh");
        let request = creds
            .apply(reqwest::blocking::Client::new().get("http://localhost/v2/clock"))
            .build()
            .unwrap();
        assert_eq!(request.headers()[KEY_ID_HEADER], "PKTEST");
        assert_eq!(request.headers()[SECRET_KEY_HEADER], "shh");
    }
}
