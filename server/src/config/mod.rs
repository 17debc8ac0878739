//! Runtime configuration read from the environment

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::ledger::{RetryPolicy, TxDefaults, U256};
use crate::models::StatusPolicy;

pub mod contracts;

pub use contracts::ContractsConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub rpc_url: String,
    pub contracts: ContractsConfig,
    pub port: u16,
    pub tx: TxDefaults,
    /// Wei attached to the operator's `fund` call
    pub funding_value: U256,
    pub poll_interval: Duration,
    pub call_timeout: Duration,
    pub receipt_timeout: Duration,
    pub retry: RetryPolicy,
    pub responder_concurrency: usize,
    pub status_policy: StatusPolicy,
    pub strict_registration: bool,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let responder_concurrency: usize = parse_or("RESPONDER_CONCURRENCY", 8)?;
        if responder_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "RESPONDER_CONCURRENCY",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            rpc_url: env::var("LEDGER_RPC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8545".to_string()),
            contracts: ContractsConfig::from_env()?,
            port: parse_or("PORT", 3000)?,
            tx: TxDefaults {
                gas: parse_or("TX_GAS", 4_712_388)?,
                gas_price: parse_wei_or("TX_GAS_PRICE", 100_000_000_000)?,
            },
            funding_value: parse_wei_or("AIRLINE_FUNDING_WEI", 10)?,
            poll_interval: Duration::from_secs(parse_or("EVENT_POLL_INTERVAL_SECONDS", 2)?),
            call_timeout: Duration::from_secs(parse_or("LEDGER_CALL_TIMEOUT_SECONDS", 30)?),
            receipt_timeout: Duration::from_secs(parse_or("LEDGER_RECEIPT_TIMEOUT_SECONDS", 60)?),
            retry: RetryPolicy {
                max_retries: parse_or("LEDGER_MAX_RETRIES", 3)?,
                initial_backoff: Duration::from_millis(parse_or("LEDGER_RETRY_BACKOFF_MS", 250)?),
            },
            responder_concurrency,
            status_policy: parse_or("STATUS_POLICY", StatusPolicy::Deterministic)?,
            strict_registration: parse_or("ORACLE_REGISTRATION_STRICT", false)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:8000".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        })
    }
}

fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

/// Wei amounts are decimal; `U256`'s own `FromStr` reads hex.
fn parse_wei_or(key: &'static str, default: u64) -> Result<U256, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_wei(key, &raw),
        Err(_) => Ok(U256::from(default)),
    }
}

fn parse_wei(key: &'static str, raw: &str) -> Result<U256, ConfigError> {
    U256::from_dec_str(raw.trim()).map_err(|_| ConfigError::Invalid {
        key,
        reason: format!("expected a decimal amount of wei, got {raw:?}"),
    })
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
        key,
        reason: err.to_string(),
    })
}
