//! TOML configuration loading and validation.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a paper-trading setup that reads credentials from the
//! environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use capweight_broker::alpaca::client::PAPER_URL;
use capweight_marketdata::MAX_BATCH;
use capweight_marketdata::iex::CLOUD_URL;
use capweight_marketdata::membership::{SP100_URL, TableLayout};
use chrono::NaiveTime;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::execution::ExecutionOptions;
use crate::scheduler::FailurePolicy;

/// Path tried when `--config` is not given.
pub const DEFAULT_PATH: &str = "config.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub broker: BrokerConfig,
    pub market_data: MarketDataConfig,
    pub index: IndexConfig,
    pub execution: ExecutionConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_url")]
    pub base_url: String,
    /// Environment variable holding the API key ID.
    #[serde(default = "default_key_id_env")]
    pub key_id_env: String,
    /// Environment variable holding the API secret.
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_broker_url() -> String {
    PAPER_URL.into()
}
fn default_key_id_env() -> String {
    "APCA_API_KEY_ID".into()
}
fn default_secret_key_env() -> String {
    "APCA_API_SECRET_KEY".into()
}
fn default_timeout() -> u64 {
    30
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: default_broker_url(),
            key_id_env: default_key_id_env(),
            secret_key_env: default_secret_key_env(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_market_data_url")]
    pub base_url: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Symbols per batch call, at most 99.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_market_data_url() -> String {
    CLOUD_URL.into()
}
fn default_token_env() -> String {
    "IEX_TOKEN".into()
}
fn default_batch_size() -> usize {
    MAX_BATCH
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_market_data_url(),
            token_env: default_token_env(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_url")]
    pub url: String,
    #[serde(default = "default_table_index")]
    pub table_index: usize,
    #[serde(default = "default_header_rows")]
    pub header_rows: usize,
    #[serde(default)]
    pub symbol_column: usize,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_index_url() -> String {
    SP100_URL.into()
}
fn default_table_index() -> usize {
    TableLayout::default().table_index
}
fn default_header_rows() -> usize {
    TableLayout::default().header_rows
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            table_index: default_table_index(),
            header_rows: default_header_rows(),
            symbol_column: TableLayout::default().symbol_column,
            timeout_secs: default_timeout(),
        }
    }
}

impl IndexConfig {
    pub fn layout(&self) -> TableLayout {
        TableLayout {
            table_index: self.table_index,
            header_rows: self.header_rows,
            symbol_column: self.symbol_column,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Delay between open-order polls.
    #[serde(default = "default_poll_ms")]
    pub poll_interval_ms: u64,
    /// Give up waiting for a phase to clear after this long. 0 waits forever.
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_poll_ms() -> u64 {
    1000
}
fn default_max_wait() -> u64 {
    600
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_ms(),
            max_wait_secs: default_max_wait(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Delay between clock checks in the scheduler loop.
    #[serde(default = "default_schedule_poll")]
    pub poll_interval_secs: u64,
    /// Exchange-local time of day after which a trading day is due.
    #[serde(default = "default_cutoff")]
    pub cutoff: String,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

fn default_schedule_poll() -> u64 {
    30
}
fn default_cutoff() -> String {
    "09:30".into()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_schedule_poll(),
            cutoff: default_cutoff(),
            on_failure: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub audit: bool,
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_true() -> bool {
    true
}
fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            audit: true,
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&contents)
    }

    /// Load an explicitly given file, or `config.toml` if it exists, or fall
    /// back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None if Path::new(DEFAULT_PATH).exists() => Self::load(Path::new(DEFAULT_PATH)),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Parse and validate TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.broker.base_url.is_empty() {
            return Err(Error::Config("broker.base_url must not be empty".into()));
        }
        if self.market_data.base_url.is_empty() {
            return Err(Error::Config("market_data.base_url must not be empty".into()));
        }
        if self.index.url.is_empty() {
            return Err(Error::Config("index.url must not be empty".into()));
        }
        if self.market_data.batch_size == 0 || self.market_data.batch_size > MAX_BATCH {
            return Err(Error::Config(format!(
                "market_data.batch_size must be in 1..={MAX_BATCH}"
            )));
        }
        if self.execution.poll_interval_ms == 0 {
            return Err(Error::Config("execution.poll_interval_ms must be > 0".into()));
        }
        if self.schedule.poll_interval_secs == 0 {
            return Err(Error::Config("schedule.poll_interval_secs must be > 0".into()));
        }
        self.cutoff()?;
        Ok(())
    }

    /// Scheduler cutoff as a time of day.
    pub fn cutoff(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.schedule.cutoff, "%H:%M").map_err(|e| {
            Error::Config(format!(
                "schedule.cutoff {:?} is not HH:MM: {e}",
                self.schedule.cutoff
            ))
        })
    }

    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            poll_interval: Duration::from_millis(self.execution.poll_interval_ms),
            max_wait: match self.execution.max_wait_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            dry_run: self.execution.dry_run,
        }
    }

    pub fn schedule_poll_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.poll_interval_secs)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}
