//! Account and funding initialization

use tracing::{error, info, warn};

use crate::config::ContractsConfig;
use crate::error::CoordinatorError;
use crate::ledger::{Address, Ledger, U256};
use crate::models::{Account, AccountRole};

/// Accounts available to the coordinator once startup is through.
#[derive(Debug, Clone)]
pub struct AccountSetup {
    pub accounts: Vec<Account>,
    /// `accounts[0]`, which authorized the app contract
    pub operator: Address,
    /// Whether the operator's airline funding went through. When false the
    /// process keeps running without airline privileges.
    pub funded: bool,
}

impl AccountSetup {
    pub fn addresses(&self) -> Vec<Address> {
        self.accounts.iter().map(|account| account.address).collect()
    }
}

/// Lists node accounts, authorizes the app contract from the first one and
/// funds it as an airline.
///
/// Listing and authorization failures abort startup; a funding failure is
/// logged and reported through [`AccountSetup::funded`].
pub async fn initialize_accounts(
    ledger: &dyn Ledger,
    contracts: &ContractsConfig,
    funding_value: U256,
) -> Result<AccountSetup, CoordinatorError> {
    let addresses = ledger
        .accounts()
        .await
        .map_err(CoordinatorError::Connection)?;
    let operator = *addresses.first().ok_or(CoordinatorError::NoAccounts)?;
    info!(%operator, accounts = addresses.len(), "ledger accounts loaded");

    // Success is the mined transaction itself, not whatever the call returns.
    match ledger.authorize_caller(operator, contracts.app_address).await {
        Ok(tx_hash) => {
            info!(caller = %contracts.app_address, %tx_hash, "app contract authorized on data contract")
        }
        Err(err) => {
            error!(caller = %contracts.app_address, error = %err, "app contract authorization failed");
            return Err(CoordinatorError::Authorization(err));
        }
    }

    let funded = match ledger.fund(operator, operator, funding_value).await {
        Ok(tx_hash) => {
            info!(airline = %operator, value = %funding_value, %tx_hash, "operator funded as airline");
            true
        }
        Err(err) => {
            warn!(airline = %operator, error = %err, "funding the operator failed; continuing without airline privileges");
            false
        }
    };

    let accounts = addresses
        .into_iter()
        .enumerate()
        .map(|(i, address)| Account {
            address,
            role: if i == 0 {
                AccountRole::Airline
            } else {
                AccountRole::Oracle
            },
        })
        .collect();

    Ok(AccountSetup {
        accounts,
        operator,
        funded,
    })
}
