//! Data models for the FlightSurety oracle server

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ledger::Address;

pub mod oracle;
pub mod status;

pub use oracle::{Oracle, OracleIndexes, OracleRequestEvent, OracleResponse, INDEXES_PER_ORACLE};
pub use status::{select_status, StatusCode, StatusPolicy};

/// Role an account plays for this process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    /// The operating account; authorizes the app contract and is funded as an airline.
    Airline,
    Oracle,
}

/// Account exposed by the connected node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub role: AccountRole,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Hash of a mined transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterFlightRequest {
    pub airline: Address,
    #[validate(length(min = 1, max = 32))]
    pub flight: String,
    pub timestamp: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FlightStatusRequest {
    pub airline: Address,
    #[validate(length(min = 1, max = 32))]
    pub flight: String,
    pub timestamp: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BuyInsuranceRequest {
    pub passenger: Address,
    #[validate(length(min = 1, max = 32))]
    pub flight: String,
    /// Premium in wei
    #[validate(range(min = 1))]
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawCreditsRequest {
    pub passenger: Address,
}
