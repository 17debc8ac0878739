//! Scripted in-memory ledger shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use flightsurety_server::error::LedgerError;
use flightsurety_server::ledger::{Address, Ledger, TxHash, U256};
use flightsurety_server::models::{OracleIndexes, OracleRequestEvent, OracleResponse};

pub fn addr(n: u8) -> Address {
    Address::new([n; 20])
}

pub fn app_address() -> Address {
    addr(0xa0)
}

pub fn data_address() -> Address {
    addr(0xd0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Accounts,
    IsOperational,
    AuthorizeCaller { from: Address, caller: Address },
    Fund { from: Address, airline: Address, value: U256 },
    RegistrationFee,
    RegisterOracle { from: Address, fee: U256 },
    OracleIndexes(Address),
    ActiveAirlines,
    RegisterFlight { from: Address, flight: String, timestamp: u64 },
    FetchFlightStatus { from: Address, airline: Address, flight: String, timestamp: u64 },
    BuyInsurance { from: Address, flight: String, amount: U256 },
    WithdrawCredits(Address),
    CreditInsurees { from: Address, insuree: Address, flight: String },
    SubmitOracleResponse { from: Address, response: OracleResponse },
    LatestBlock,
    OracleRequests { from_block: u64, to_block: u64 },
}

fn revert(reason: &str) -> LedgerError {
    LedgerError::Reverted(reason.to_string())
}

#[derive(Default)]
pub struct MockLedger {
    accounts: Vec<Address>,
    accounts_unreachable: bool,
    operational_unavailable: bool,
    fee: U256,
    fee_unavailable: bool,
    reject_authorization: bool,
    reject_funding: bool,
    indexes: HashMap<Address, OracleIndexes>,
    rejected_registrations: HashSet<Address>,
    accepted_index: Option<u8>,
    airlines: Option<Vec<Address>>,
    reject_flights: bool,
    reject_credits: bool,
    latest_block: Mutex<u64>,
    block_unavailable: Mutex<bool>,
    requests: Mutex<Vec<(u64, OracleRequestEvent)>>,
    calls: Mutex<Vec<Call>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            fee: U256::exp10(18),
            airlines: Some(Vec::new()),
            ..Default::default()
        }
    }

    pub fn with_accounts(mut self, accounts: Vec<Address>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_unreachable_node(mut self) -> Self {
        self.accounts_unreachable = true;
        self
    }

    pub fn with_unavailable_operational_status(mut self) -> Self {
        self.operational_unavailable = true;
        self
    }

    pub fn with_unavailable_fee(mut self) -> Self {
        self.fee_unavailable = true;
        self
    }

    pub fn rejecting_authorization(mut self) -> Self {
        self.reject_authorization = true;
        self
    }

    pub fn rejecting_funding(mut self) -> Self {
        self.reject_funding = true;
        self
    }

    pub fn rejecting_flights(mut self) -> Self {
        self.reject_flights = true;
        self
    }

    pub fn rejecting_credits(mut self) -> Self {
        self.reject_credits = true;
        self
    }

    pub fn with_indexes(mut self, oracle: Address, indexes: OracleIndexes) -> Self {
        self.indexes.insert(oracle, indexes);
        self
    }

    pub fn rejecting_registration_of(mut self, oracle: Address) -> Self {
        self.rejected_registrations.insert(oracle);
        self
    }

    /// Only responses carrying `index` are accepted, like the contract's
    /// request index filter.
    pub fn accepting_index(mut self, index: u8) -> Self {
        self.accepted_index = Some(index);
        self
    }

    pub fn with_airlines(mut self, airlines: Option<Vec<Address>>) -> Self {
        self.airlines = airlines;
        self
    }

    pub fn set_latest_block(&self, block: u64) {
        *self.latest_block.lock().unwrap() = block;
    }

    pub fn set_block_unavailable(&self, unavailable: bool) {
        *self.block_unavailable.lock().unwrap() = unavailable;
    }

    pub fn emit_request(&self, block: u64, event: OracleRequestEvent) {
        self.requests.lock().unwrap().push((block, event));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn tx_hash(&self) -> TxHash {
        format!("0x{:064x}", self.calls.lock().unwrap().len())
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        self.record(Call::Accounts);
        if self.accounts_unreachable {
            return Err(LedgerError::Connection("connection refused".into()));
        }
        Ok(self.accounts.clone())
    }

    async fn is_operational(&self) -> Result<bool, LedgerError> {
        self.record(Call::IsOperational);
        if self.operational_unavailable {
            return Err(LedgerError::Connection("connection refused".into()));
        }
        Ok(true)
    }

    async fn authorize_caller(&self, from: Address, caller: Address) -> Result<TxHash, LedgerError> {
        self.record(Call::AuthorizeCaller { from, caller });
        if self.reject_authorization {
            return Err(revert("Caller is not contract owner"));
        }
        Ok(self.tx_hash())
    }

    async fn fund(&self, from: Address, airline: Address, value: U256) -> Result<TxHash, LedgerError> {
        self.record(Call::Fund {
            from,
            airline,
            value,
        });
        if self.reject_funding {
            return Err(revert("Airline is not registered"));
        }
        Ok(self.tx_hash())
    }

    async fn registration_fee(&self) -> Result<U256, LedgerError> {
        self.record(Call::RegistrationFee);
        if self.fee_unavailable {
            return Err(LedgerError::Timeout(std::time::Duration::from_secs(30)));
        }
        Ok(self.fee)
    }

    async fn register_oracle(&self, from: Address, fee: U256) -> Result<TxHash, LedgerError> {
        self.record(Call::RegisterOracle { from, fee });
        if self.rejected_registrations.contains(&from) {
            return Err(revert("Registration fee is required"));
        }
        Ok(self.tx_hash())
    }

    async fn oracle_indexes(&self, oracle: Address) -> Result<OracleIndexes, LedgerError> {
        self.record(Call::OracleIndexes(oracle));
        self.indexes
            .get(&oracle)
            .copied()
            .ok_or_else(|| revert("Not registered as an oracle"))
    }

    async fn active_airlines(&self) -> Result<Vec<Address>, LedgerError> {
        self.record(Call::ActiveAirlines);
        self.airlines
            .clone()
            .ok_or_else(|| LedgerError::Connection("connection refused".into()))
    }

    async fn register_flight(
        &self,
        from: Address,
        flight: &str,
        timestamp: u64,
    ) -> Result<TxHash, LedgerError> {
        self.record(Call::RegisterFlight {
            from,
            flight: flight.to_string(),
            timestamp,
        });
        if self.reject_flights {
            return Err(revert("Airline is not funded"));
        }
        Ok(self.tx_hash())
    }

    async fn fetch_flight_status(
        &self,
        from: Address,
        airline: Address,
        flight: &str,
        timestamp: u64,
    ) -> Result<TxHash, LedgerError> {
        self.record(Call::FetchFlightStatus {
            from,
            airline,
            flight: flight.to_string(),
            timestamp,
        });
        Ok(self.tx_hash())
    }

    async fn buy_insurance(
        &self,
        from: Address,
        flight: &str,
        amount: U256,
    ) -> Result<TxHash, LedgerError> {
        self.record(Call::BuyInsurance {
            from,
            flight: flight.to_string(),
            amount,
        });
        Ok(self.tx_hash())
    }

    async fn withdraw_credits(&self, from: Address) -> Result<TxHash, LedgerError> {
        self.record(Call::WithdrawCredits(from));
        Ok(self.tx_hash())
    }

    async fn credit_insurees(
        &self,
        from: Address,
        insuree: Address,
        flight: &str,
    ) -> Result<TxHash, LedgerError> {
        self.record(Call::CreditInsurees {
            from,
            insuree,
            flight: flight.to_string(),
        });
        if self.reject_credits {
            return Err(revert("Flight is not insured"));
        }
        Ok(self.tx_hash())
    }

    async fn submit_oracle_response(
        &self,
        from: Address,
        response: &OracleResponse,
    ) -> Result<TxHash, LedgerError> {
        self.record(Call::SubmitOracleResponse {
            from,
            response: response.clone(),
        });
        if self.accepted_index == Some(response.index) {
            Ok(self.tx_hash())
        } else {
            Err(revert("Index does not match oracle request"))
        }
    }

    async fn latest_block(&self) -> Result<u64, LedgerError> {
        self.record(Call::LatestBlock);
        if *self.block_unavailable.lock().unwrap() {
            return Err(LedgerError::Connection("connection refused".into()));
        }
        Ok(*self.latest_block.lock().unwrap())
    }

    async fn oracle_requests(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<OracleRequestEvent>, LedgerError> {
        self.record(Call::OracleRequests {
            from_block,
            to_block,
        });
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(block, _)| (from_block..=to_block).contains(block))
            .map(|(_, event)| event.clone())
            .collect())
    }
}
