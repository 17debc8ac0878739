//! Access to the FlightSurety contracts on the ledger
//!
//! The contracts themselves live on-chain; this module only knows how to call
//! them. [`Ledger`] is the seam the coordinator and REST handlers depend on,
//! [`RpcLedger`] talks JSON-RPC to a node.

use async_trait::async_trait;

use crate::error::LedgerError;
use crate::models::{OracleIndexes, OracleRequestEvent, OracleResponse};

pub mod abi;
mod address;
pub mod retry;
pub mod rpc;

pub use address::{Address, AddressError};
pub use primitive_types::U256;
pub use retry::RetryPolicy;
pub use rpc::{RpcLedger, TxDefaults};

/// Hash of a mined transaction, as 0x-prefixed hex.
pub type TxHash = String;

/// Calls and sends against the app and data contracts.
///
/// Sends resolve once the transaction is mined; a reverted transaction is
/// reported as [`LedgerError::Reverted`].
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Accounts managed by the connected node.
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError>;

    async fn is_operational(&self) -> Result<bool, LedgerError>;

    /// `authorizeCaller(app)` on the data contract.
    async fn authorize_caller(&self, from: Address, caller: Address) -> Result<TxHash, LedgerError>;

    async fn fund(&self, from: Address, airline: Address, value: U256) -> Result<TxHash, LedgerError>;

    async fn registration_fee(&self) -> Result<U256, LedgerError>;

    async fn register_oracle(&self, from: Address, fee: U256) -> Result<TxHash, LedgerError>;

    /// Indexes assigned to `oracle`; the contract keys them on `msg.sender`.
    async fn oracle_indexes(&self, oracle: Address) -> Result<OracleIndexes, LedgerError>;

    async fn active_airlines(&self) -> Result<Vec<Address>, LedgerError>;

    async fn register_flight(
        &self,
        from: Address,
        flight: &str,
        timestamp: u64,
    ) -> Result<TxHash, LedgerError>;

    async fn fetch_flight_status(
        &self,
        from: Address,
        airline: Address,
        flight: &str,
        timestamp: u64,
    ) -> Result<TxHash, LedgerError>;

    async fn buy_insurance(
        &self,
        from: Address,
        flight: &str,
        amount: U256,
    ) -> Result<TxHash, LedgerError>;

    async fn withdraw_credits(&self, from: Address) -> Result<TxHash, LedgerError>;

    async fn credit_insurees(
        &self,
        from: Address,
        insuree: Address,
        flight: &str,
    ) -> Result<TxHash, LedgerError>;

    async fn submit_oracle_response(
        &self,
        from: Address,
        response: &OracleResponse,
    ) -> Result<TxHash, LedgerError>;

    async fn latest_block(&self) -> Result<u64, LedgerError>;

    /// `OracleRequest` events emitted in `from_block..=to_block`.
    async fn oracle_requests(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<OracleRequestEvent>, LedgerError>;
}
