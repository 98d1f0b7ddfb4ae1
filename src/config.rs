//! Configuration module for LP Rugwatch

use alloy::primitives::{Address, U256};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while loading configuration. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid address in {name}: {value}")]
    InvalidAddress { name: &'static str, value: String },

    #[error("invalid url in {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Chain endpoints
    pub rpc_http_url: Url,
    pub rpc_ws_url: Url,

    // Watched addresses
    pub dev_wallet: Address,
    pub v2_pair_address: Address,
    pub v3_manager_address: Address,
    pub position_token_id: U256,

    // Telegram Alerts
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub alert_timeout: Duration,

    // Rug Detection
    pub rug_threshold_percent: f64,
    pub supply_refresh_interval: Duration,
    pub poll_interval: Duration,

    // Market data
    pub dexscreener_chain: String,
    pub market_timeout: Duration,

    // Exit tooling, not read by the watchers
    pub sell_percent: u32,

    // Dashboard
    pub dashboard_port: u16,
}

impl Config {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        Ok(Self {
            rpc_http_url: vars.required_url("RPC_HTTP_URL")?,
            rpc_ws_url: vars.required_url("RPC_WS_URL")?,

            dev_wallet: vars.required_address("DEV_WALLET")?,
            v2_pair_address: vars.required_address("V2_PAIR_ADDRESS")?,
            v3_manager_address: vars.required_address("V3_MANAGER_ADDRESS")?,
            position_token_id: vars.parsed_or("POSITION_TOKEN_ID", U256::from(203u64)),

            telegram_bot_token: vars.optional("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: vars.optional("TELEGRAM_CHAT_ID"),
            alert_timeout: vars.secs_or("ALERT_TIMEOUT_SECS", 10),

            rug_threshold_percent: vars.parsed_or("RUG_THRESHOLD_PERCENT", 30.0),
            supply_refresh_interval: vars.secs_or("SUPPLY_REFRESH_SECS", 60),
            poll_interval: vars.secs_or("POLL_INTERVAL_SECS", 2),

            dexscreener_chain: vars
                .optional("DEXSCREENER_CHAIN")
                .unwrap_or_else(|| "base".to_string()),
            market_timeout: vars.secs_or("MARKET_TIMEOUT_SECS", 10),

            sell_percent: vars.parsed_or("SELL_PERCENT", 100),

            dashboard_port: vars.parsed_or("DASHBOARD_PORT", 3000),
        })
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parsed_or<T: FromStr>(&self, name: &str, default: T) -> T {
        self.optional(name)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Whole seconds. Zero would make `tokio::time::interval` panic, so it
    /// falls back to the default like any other unusable value.
    fn secs_or(&self, name: &str, default: u64) -> Duration {
        let secs = self.parsed_or(name, default);
        Duration::from_secs(if secs == 0 { default } else { secs })
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn required_url(&self, name: &'static str) -> Result<Url, ConfigError> {
        let value = self.required(name)?;
        Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { name, source })
    }

    fn required_address(&self, name: &'static str) -> Result<Address, ConfigError> {
        let value = self.required(name)?;
        parse_address(name, &value)
    }
}

/// Parse a hex address. Checksum casing is not enforced.
pub fn parse_address(name: &'static str, value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value.trim()).map_err(|_| ConfigError::InvalidAddress {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        rpc_http_url: Url::parse("http://localhost:8545").unwrap(),
        rpc_ws_url: Url::parse("ws://localhost:8546").unwrap(),
        dev_wallet: Address::repeat_byte(0xde),
        v2_pair_address: Address::repeat_byte(0x02),
        v3_manager_address: Address::repeat_byte(0x03),
        position_token_id: U256::from(203u64),
        telegram_bot_token: None,
        telegram_chat_id: None,
        alert_timeout: Duration::from_secs(10),
        rug_threshold_percent: 30.0,
        supply_refresh_interval: Duration::from_secs(60),
        poll_interval: Duration::from_secs(2),
        dexscreener_chain: "base".to_string(),
        market_timeout: Duration::from_secs(10),
        sell_percent: 100,
        dashboard_port: 3000,
    }
}
