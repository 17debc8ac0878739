//! Error types shared across the coordinator

use std::time::Duration;

use thiserror::Error;

use crate::ledger::abi::AbiError;
use crate::ledger::Address;

/// Failure of a single call against the ledger node.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("ledger node unreachable: {0}")]
    Connection(String),
    #[error("ledger call timed out after {0:?}")]
    Timeout(Duration),
    #[error("ledger transport error: {0}")]
    Transport(String),
    #[error("json-rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("transaction reverted: {0}")]
    Reverted(String),
    #[error("malformed ledger response: {0}")]
    Decode(String),
}

impl LedgerError {
    /// Failures worth retrying: the node may not have seen the request at all.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LedgerError::Connection(_) | LedgerError::Timeout(_) | LedgerError::Transport(_)
        )
    }

    pub fn is_revert(&self) -> bool {
        matches!(self, LedgerError::Reverted(_))
    }

    pub(crate) fn from_rpc(code: i64, message: String) -> Self {
        if message.to_ascii_lowercase().contains("revert") {
            LedgerError::Reverted(message)
        } else {
            LedgerError::Rpc { code, message }
        }
    }
}

impl From<AbiError> for LedgerError {
    fn from(err: AbiError) -> Self {
        LedgerError::Decode(err.to_string())
    }
}

/// Where a single account's oracle registration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStage {
    Register,
    Indexes,
}

#[derive(Debug, Clone, Error)]
#[error("oracle registration for {address} failed at {stage:?}: {error}")]
pub struct RegistrationFailure {
    pub address: Address,
    pub stage: RegistrationStage,
    #[source]
    pub error: LedgerError,
}

/// Startup failures of the coordinator.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("could not list accounts from the ledger node: {0}")]
    Connection(#[source] LedgerError),
    #[error("ledger node exposes no accounts")]
    NoAccounts,
    #[error("authorizing the app contract failed: {0}")]
    Authorization(#[source] LedgerError),
    #[error("could not read the oracle registration fee: {0}")]
    RegistrationFee(#[source] LedgerError),
    #[error("{} of {attempted} oracle registrations failed", failures.len())]
    Registration {
        attempted: usize,
        failures: Vec<RegistrationFailure>,
    },
}
