//! Production collaborators built from config and the environment.

use std::time::Duration;

use capweight_broker::alpaca::{AlpacaBroker, Credentials};
use capweight_marketdata::iex::IexClient;
use capweight_marketdata::membership::HtmlTableMembership;

use crate::config::Config;
use crate::error::Result;

/// The three live collaborators one process talks to.
pub struct Clients {
    pub broker: AlpacaBroker,
    pub quotes: IexClient,
    pub membership: HtmlTableMembership,
}

impl Clients {
    /// Build every client. Fails if a credential variable is unset.
    pub fn connect(config: &Config) -> Result<Self> {
        Ok(Self {
            broker: connect_broker(config)?,
            quotes: IexClient::from_env(
                &config.market_data.base_url,
                &config.market_data.token_env,
                Duration::from_secs(config.market_data.timeout_secs),
            )?,
            membership: HtmlTableMembership::new(
                &config.index.url,
                config.index.layout(),
                Duration::from_secs(config.index.timeout_secs),
            )?,
        })
    }
}

/// Just the broker, for commands that never touch market data.
pub fn connect_broker(config: &Config) -> Result<AlpacaBroker> {
    let credentials =
        Credentials::from_env(&config.broker.key_id_env, &config.broker.secret_key_env)?;
    Ok(AlpacaBroker::new(
        credentials,
        &config.broker.base_url,
        Duration::from_secs(config.broker.timeout_secs),
    )?)
}
