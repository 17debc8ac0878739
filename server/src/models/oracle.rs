use serde::{Deserialize, Serialize};

use crate::ledger::Address;
use crate::models::status::StatusCode;

/// Number of indexes the app contract assigns to each oracle.
pub const INDEXES_PER_ORACLE: usize = 3;

/// Opaque indexes the contract assigned to an oracle at registration.
pub type OracleIndexes = [u8; INDEXES_PER_ORACLE];

/// A registered oracle identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Oracle {
    pub address: Address,
    pub indexes: OracleIndexes,
}

/// Decoded `OracleRequest` event emitted by the app contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequestEvent {
    pub airline: Address,
    pub flight: String,
    pub timestamp: u64,
}

/// Arguments of one `submitOracleResponse` transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleResponse {
    pub index: u8,
    pub airline: Address,
    pub flight: String,
    pub timestamp: u64,
    pub status: StatusCode,
}

impl OracleResponse {
    pub fn for_request(request: &OracleRequestEvent, index: u8, status: StatusCode) -> Self {
        Self {
            index,
            airline: request.airline,
            flight: request.flight.clone(),
            timestamp: request.timestamp,
            status,
        }
    }
}
