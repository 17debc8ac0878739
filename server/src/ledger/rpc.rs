//! JSON-RPC client for an EVM node hosting the FlightSurety contracts
//!
//! Transactions are sent with `eth_sendTransaction` from node-managed
//! accounts, so no signing happens in this process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::{Config, ContractsConfig};
use crate::error::LedgerError;
use crate::ledger::abi::{self, Token};
use crate::ledger::retry::{Idempotency, RetryPolicy};
use crate::ledger::{Address, Ledger, TxHash, U256};
use crate::models::{OracleIndexes, OracleRequestEvent, OracleResponse};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

mod sig {
    pub const IS_OPERATIONAL: &str = "isOperational()";
    pub const AUTHORIZE_CALLER: &str = "authorizeCaller(address)";
    pub const FUND: &str = "fund(address)";
    pub const REGISTRATION_FEE: &str = "REGISTRATION_FEE()";
    pub const REGISTER_ORACLE: &str = "registerOracle()";
    pub const GET_MY_INDEXES: &str = "getMyIndexes()";
    pub const GET_ACTIVE_AIRLINES: &str = "getActiveAirlines()";
    pub const REGISTER_FLIGHT: &str = "registerFlight(string,uint256)";
    pub const FETCH_FLIGHT_STATUS: &str = "fetchFlightStatus(address,string,uint256)";
    pub const BUY_INSURANCE: &str = "buyInsurance(string,uint256)";
    pub const WITHDRAW_CREDITS: &str = "withdrawCredits()";
    pub const CREDIT_INSUREES: &str = "creditInsurees(address,string)";
    pub const SUBMIT_ORACLE_RESPONSE: &str =
        "submitOracleResponse(uint8,address,string,uint256,uint8)";
}

/// Gas settings applied to every transaction.
#[derive(Debug, Clone, Copy)]
pub struct TxDefaults {
    pub gas: u64,
    pub gas_price: U256,
}

pub struct RpcLedger {
    rpc_url: String,
    contracts: ContractsConfig,
    tx: TxDefaults,
    retry: RetryPolicy,
    call_timeout: Duration,
    receipt_timeout: Duration,
    http: Client,
    next_id: AtomicU64,
}

impl RpcLedger {
    pub fn new(config: &Config) -> Result<Self, LedgerError> {
        let http = Client::builder()
            .timeout(config.call_timeout)
            .build()
            .map_err(|err| LedgerError::Transport(err.to_string()))?;

        Ok(Self {
            rpc_url: config.rpc_url.clone(),
            contracts: config.contracts.clone(),
            tx: config.tx,
            retry: config.retry,
            call_timeout: config.call_timeout,
            receipt_timeout: config.receipt_timeout,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    fn classify(&self, err: reqwest::Error) -> LedgerError {
        if err.is_connect() {
            LedgerError::Connection(err.to_string())
        } else if err.is_timeout() {
            LedgerError::Timeout(self.call_timeout)
        } else if err.is_decode() {
            LedgerError::Decode(err.to_string())
        } else {
            LedgerError::Transport(err.to_string())
        }
    }

    async fn rpc_once(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .http
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await
            .map_err(|err| self.classify(err))?
            .error_for_status()
            .map_err(|err| self.classify(err))?
            .json::<Value>()
            .await
            .map_err(|err| self.classify(err))?;

        parse_rpc_response(response)
    }

    async fn rpc(
        &self,
        method: &str,
        params: Value,
        idempotency: Idempotency,
    ) -> Result<Value, LedgerError> {
        self.retry
            .run(method, idempotency, || self.rpc_once(method, params.clone()))
            .await
    }

    async fn call(
        &self,
        from: Option<Address>,
        to: Address,
        data: Vec<u8>,
    ) -> Result<Vec<u8>, LedgerError> {
        let mut request = json!({
            "to": to.to_string(),
            "data": format!("0x{}", hex::encode(data)),
        });
        if let Some(from) = from {
            request["from"] = json!(from.to_string());
        }

        let result = self
            .rpc("eth_call", json!([request, "latest"]), Idempotency::Read)
            .await?;
        let payload = result
            .as_str()
            .ok_or_else(|| LedgerError::Decode("eth_call result is not a string".into()))?;
        Ok(abi::decode_hex(payload)?)
    }

    async fn send(
        &self,
        from: Address,
        to: Address,
        data: Vec<u8>,
        value: U256,
    ) -> Result<TxHash, LedgerError> {
        let mut tx = json!({
            "from": from.to_string(),
            "to": to.to_string(),
            "data": format!("0x{}", hex::encode(data)),
            "gas": quantity(U256::from(self.tx.gas)),
            "gasPrice": quantity(self.tx.gas_price),
        });
        if !value.is_zero() {
            tx["value"] = json!(quantity(value));
        }

        let hash = self
            .rpc("eth_sendTransaction", json!([tx]), Idempotency::Write)
            .await?;
        let hash = hash
            .as_str()
            .ok_or_else(|| LedgerError::Decode("transaction hash is not a string".into()))?
            .to_string();

        self.wait_for_receipt(&hash).await?;
        debug!(%from, %to, tx_hash = %hash, "transaction mined");
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: &str) -> Result<(), LedgerError> {
        let deadline = Instant::now() + self.receipt_timeout;
        loop {
            let receipt = self
                .rpc("eth_getTransactionReceipt", json!([hash]), Idempotency::Read)
                .await?;
            if !receipt.is_null() {
                return receipt_outcome(hash, &receipt);
            }
            if Instant::now() >= deadline {
                return Err(LedgerError::Timeout(self.receipt_timeout));
            }
            sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        let result = self.rpc("eth_accounts", json!([]), Idempotency::Read).await?;
        result
            .as_array()
            .ok_or_else(|| LedgerError::Decode("eth_accounts result is not an array".into()))?
            .iter()
            .map(|value| {
                value
                    .as_str()
                    .ok_or_else(|| LedgerError::Decode("account is not a string".into()))?
                    .parse::<Address>()
                    .map_err(|err| LedgerError::Decode(err.to_string()))
            })
            .collect()
    }

    async fn is_operational(&self) -> Result<bool, LedgerError> {
        let data = abi::encode_call(sig::IS_OPERATIONAL, &[]);
        let out = self.call(None, self.contracts.app_address, data).await?;
        Ok(abi::decode_bool(&out)?)
    }

    async fn authorize_caller(&self, from: Address, caller: Address) -> Result<TxHash, LedgerError> {
        let data = abi::encode_call(sig::AUTHORIZE_CALLER, &[Token::Address(caller)]);
        self.send(from, self.contracts.data_address, data, U256::zero()).await
    }

    async fn fund(&self, from: Address, airline: Address, value: U256) -> Result<TxHash, LedgerError> {
        let data = abi::encode_call(sig::FUND, &[Token::Address(airline)]);
        self.send(from, self.contracts.app_address, data, value).await
    }

    async fn registration_fee(&self) -> Result<U256, LedgerError> {
        let data = abi::encode_call(sig::REGISTRATION_FEE, &[]);
        let out = self.call(None, self.contracts.app_address, data).await?;
        Ok(abi::decode_uint(&out)?)
    }

    async fn register_oracle(&self, from: Address, fee: U256) -> Result<TxHash, LedgerError> {
        let data = abi::encode_call(sig::REGISTER_ORACLE, &[]);
        self.send(from, self.contracts.app_address, data, fee).await
    }

    async fn oracle_indexes(&self, oracle: Address) -> Result<OracleIndexes, LedgerError> {
        let data = abi::encode_call(sig::GET_MY_INDEXES, &[]);
        let out = self
            .call(Some(oracle), self.contracts.app_address, data)
            .await?;
        Ok(abi::decode_indexes(&out)?)
    }

    async fn active_airlines(&self) -> Result<Vec<Address>, LedgerError> {
        let data = abi::encode_call(sig::GET_ACTIVE_AIRLINES, &[]);
        let out = self.call(None, self.contracts.app_address, data).await?;
        Ok(abi::decode_address_array(&out)?)
    }

    async fn register_flight(
        &self,
        from: Address,
        flight: &str,
        timestamp: u64,
    ) -> Result<TxHash, LedgerError> {
        let data = abi::encode_call(
            sig::REGISTER_FLIGHT,
            &[Token::String(flight.to_string()), Token::Uint(timestamp.into())],
        );
        self.send(from, self.contracts.app_address, data, U256::zero()).await
    }

    async fn fetch_flight_status(
        &self,
        from: Address,
        airline: Address,
        flight: &str,
        timestamp: u64,
    ) -> Result<TxHash, LedgerError> {
        let data = abi::encode_call(
            sig::FETCH_FLIGHT_STATUS,
            &[
                Token::Address(airline),
                Token::String(flight.to_string()),
                Token::Uint(timestamp.into()),
            ],
        );
        self.send(from, self.contracts.app_address, data, U256::zero()).await
    }

    async fn buy_insurance(
        &self,
        from: Address,
        flight: &str,
        amount: U256,
    ) -> Result<TxHash, LedgerError> {
        let data = abi::encode_call(
            sig::BUY_INSURANCE,
            &[Token::String(flight.to_string()), Token::Uint(amount)],
        );
        self.send(from, self.contracts.app_address, data, amount).await
    }

    async fn withdraw_credits(&self, from: Address) -> Result<TxHash, LedgerError> {
        let data = abi::encode_call(sig::WITHDRAW_CREDITS, &[]);
        self.send(from, self.contracts.app_address, data, U256::zero()).await
    }

    async fn credit_insurees(
        &self,
        from: Address,
        insuree: Address,
        flight: &str,
    ) -> Result<TxHash, LedgerError> {
        let data = abi::encode_call(
            sig::CREDIT_INSUREES,
            &[Token::Address(insuree), Token::String(flight.to_string())],
        );
        self.send(from, self.contracts.app_address, data, U256::zero()).await
    }

    async fn submit_oracle_response(
        &self,
        from: Address,
        response: &OracleResponse,
    ) -> Result<TxHash, LedgerError> {
        let data = abi::encode_call(
            sig::SUBMIT_ORACLE_RESPONSE,
            &[
                Token::Uint(response.index.into()),
                Token::Address(response.airline),
                Token::String(response.flight.clone()),
                Token::Uint(response.timestamp.into()),
                Token::Uint(response.status.code().into()),
            ],
        );
        self.send(from, self.contracts.app_address, data, U256::zero()).await
    }

    async fn latest_block(&self) -> Result<u64, LedgerError> {
        let result = self
            .rpc("eth_blockNumber", json!([]), Idempotency::Read)
            .await?;
        parse_quantity(&result)
    }

    async fn oracle_requests(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<OracleRequestEvent>, LedgerError> {
        let filter = json!({
            "fromBlock": quantity(U256::from(from_block)),
            "toBlock": quantity(U256::from(to_block)),
            "address": self.contracts.app_address.to_string(),
            "topics": [abi::event_topic(abi::ORACLE_REQUEST_EVENT)],
        });

        let logs = self
            .rpc("eth_getLogs", json!([filter]), Idempotency::Read)
            .await?;
        let logs = logs
            .as_array()
            .ok_or_else(|| LedgerError::Decode("eth_getLogs result is not an array".into()))?;

        Ok(logs.iter().filter_map(parse_request_log).collect())
    }
}

fn parse_request_log(log: &Value) -> Option<OracleRequestEvent> {
    let data = log.pointer("/data").and_then(|value| value.as_str())?;
    match abi::decode_hex(data).and_then(|bytes| abi::decode_oracle_request(&bytes)) {
        Ok(event) => Some(event),
        Err(err) => {
            let tx_hash = log
                .pointer("/transactionHash")
                .and_then(|value| value.as_str())
                .unwrap_or("unknown-tx");
            warn!(tx_hash, error = %err, "skipping malformed OracleRequest log");
            None
        }
    }
}

fn parse_rpc_response(mut response: Value) -> Result<Value, LedgerError> {
    if let Some(error) = response.get("error").filter(|error| !error.is_null()) {
        let code = error
            .pointer("/code")
            .and_then(|value| value.as_i64())
            .unwrap_or(-32603);
        let message = error
            .pointer("/message")
            .and_then(|value| value.as_str())
            .unwrap_or("unknown json-rpc error")
            .to_string();
        return Err(LedgerError::from_rpc(code, message));
    }

    response
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| LedgerError::Decode("json-rpc response has no result".into()))
}

fn receipt_outcome(hash: &str, receipt: &Value) -> Result<(), LedgerError> {
    match receipt.pointer("/status").and_then(|value| value.as_str()) {
        Some("0x0") => Err(LedgerError::Reverted(format!("transaction {hash} reverted"))),
        _ => Ok(()),
    }
}

fn quantity(value: U256) -> String {
    if value.is_zero() {
        "0x0".to_string()
    } else {
        format!("0x{value:x}")
    }
}

fn parse_quantity(value: &Value) -> Result<u64, LedgerError> {
    let text = value
        .as_str()
        .ok_or_else(|| LedgerError::Decode("quantity is not a string".into()))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    u64::from_str_radix(digits, 16)
        .map_err(|err| LedgerError::Decode(format!("invalid quantity {text}: {err}")))
}
