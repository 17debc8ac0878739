use std::env;

use crate::config::ConfigError;
use crate::ledger::Address;

#[derive(Clone, Debug)]
pub struct ContractsConfig {
    pub app_address: Address,
    pub data_address: Address,
}

impl ContractsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            app_address: required_address("FLIGHT_SURETY_APP_ADDRESS")?,
            data_address: required_address("FLIGHT_SURETY_DATA_ADDRESS")?,
        })
    }
}

fn required_address(key: &'static str) -> Result<Address, ConfigError> {
    let raw = env::var(key).map_err(|_| ConfigError::Missing(key))?;
    raw.parse().map_err(|err| ConfigError::Invalid {
        key,
        reason: format!("{err}"),
    })
}
