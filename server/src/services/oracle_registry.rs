//! Oracle registration and the in-memory registry of oracle identities

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{CoordinatorError, LedgerError, RegistrationFailure, RegistrationStage};
use crate::ledger::{Address, Ledger, U256};
use crate::models::Oracle;

/// Oracles this process answers requests for.
///
/// Filled once after registration and read by the responder and the REST
/// handlers.
#[derive(Debug, Default)]
pub struct OracleRegistry {
    oracles: RwLock<Vec<Oracle>>,
}

impl OracleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn install(&self, oracles: Vec<Oracle>) {
        let mut guard = self.oracles.write().await;
        guard.extend(oracles);
    }

    pub async fn snapshot(&self) -> Vec<Oracle> {
        self.oracles.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.oracles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.oracles.read().await.is_empty()
    }
}

/// Outcome of registering a batch of accounts as oracles.
#[derive(Debug, Default)]
pub struct RegistrationReport {
    /// Registered oracles in completion order
    pub oracles: Vec<Oracle>,
    pub failures: Vec<RegistrationFailure>,
}

impl RegistrationReport {
    pub fn attempted(&self) -> usize {
        self.oracles.len() + self.failures.len()
    }

    /// All-or-nothing view: any failure rejects the whole batch.
    pub fn into_strict(self) -> Result<Vec<Oracle>, CoordinatorError> {
        if self.failures.is_empty() {
            Ok(self.oracles)
        } else {
            Err(CoordinatorError::Registration {
                attempted: self.attempted(),
                failures: self.failures,
            })
        }
    }
}

/// Registers every account as an oracle, concurrently.
///
/// Reading the fee is the only fatal step. Each account is isolated: a failed
/// registration or index query is recorded in the report and the others carry
/// on.
pub async fn register_oracles(
    ledger: &dyn Ledger,
    accounts: &[Address],
) -> Result<RegistrationReport, CoordinatorError> {
    let fee = ledger
        .registration_fee()
        .await
        .map_err(CoordinatorError::RegistrationFee)?;
    info!(fee = %fee, accounts = accounts.len(), "registering oracles");

    let mut pending: FuturesUnordered<_> = accounts
        .iter()
        .map(|&address| register_one(ledger, address, fee))
        .collect();

    let mut report = RegistrationReport::default();
    while let Some(result) = pending.next().await {
        match result {
            Ok(oracle) => {
                info!(
                    oracle = %oracle.address,
                    indexes = ?oracle.indexes,
                    "oracle registered"
                );
                report.oracles.push(oracle);
            }
            Err(failure) => {
                warn!(error = %failure, "oracle registration failed");
                report.failures.push(failure);
            }
        }
    }

    info!(
        registered = report.oracles.len(),
        failed = report.failures.len(),
        "oracle registration complete"
    );
    Ok(report)
}

async fn register_one(
    ledger: &dyn Ledger,
    address: Address,
    fee: U256,
) -> Result<Oracle, RegistrationFailure> {
    let fail = |stage: RegistrationStage| {
        move |error: LedgerError| RegistrationFailure {
            address,
            stage,
            error,
        }
    };

    ledger
        .register_oracle(address, fee)
        .await
        .map_err(fail(RegistrationStage::Register))?;
    let indexes = ledger
        .oracle_indexes(address)
        .await
        .map_err(fail(RegistrationStage::Indexes))?;

    Ok(Oracle { address, indexes })
}
