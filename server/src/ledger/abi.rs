//! Minimal Solidity ABI codec for the FlightSurety contract surface
//!
//! Only the shapes the contracts actually use are supported: `address`,
//! `uint256`, `bool` and `string` arguments; `bool`,
//! `uint256`, `uint8[3]` and `address[]` return values; and the
//! `OracleRequest` log payload.

use primitive_types::U256;
use sha3::{Digest, Keccak256};
use thiserror::Error;

use crate::ledger::Address;
use crate::models::{OracleIndexes, OracleRequestEvent, INDEXES_PER_ORACLE};

const WORD: usize = 32;

/// Canonical signature of the request event emitted by the app contract.
pub const ORACLE_REQUEST_EVENT: &str = "OracleRequest(uint8,address,string,uint256)";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("payload too short: need {needed} bytes, have {actual}")]
    OutOfBounds { needed: usize, actual: usize },
    #[error("value does not fit in {0} bits")]
    Overflow(u32),
    #[error("string is not valid utf-8")]
    InvalidUtf8,
    #[error("invalid hex payload: {0}")]
    InvalidHex(String),
}

/// A single call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(U256),
    String(String),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_))
    }
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Topic-0 of a log emitted for `signature`, as 0x-prefixed hex.
pub fn event_topic(signature: &str) -> String {
    format!("0x{}", hex::encode(keccak256(signature.as_bytes())))
}

/// Calldata for `signature` invoked with `args`.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode_args(args));
    out
}

pub fn encode_args(args: &[Token]) -> Vec<u8> {
    let head_len = args.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        if arg.is_dynamic() {
            head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
        }
        match arg {
            Token::Address(address) => head.extend_from_slice(&address_word(address)),
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::String(value) => {
                let bytes = value.as_bytes();
                tail.extend_from_slice(&uint_word(U256::from(bytes.len())));
                tail.extend_from_slice(bytes);
                let padding = (WORD - bytes.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
        }
    }

    head.extend(tail);
    head
}

fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

fn address_word(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

pub fn decode_hex(payload: &str) -> Result<Vec<u8>, AbiError> {
    let digits = payload.strip_prefix("0x").unwrap_or(payload);
    hex::decode(digits).map_err(|e| AbiError::InvalidHex(e.to_string()))
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    let end = offset.checked_add(WORD).ok_or(AbiError::Overflow(64))?;
    data.get(offset..end).ok_or(AbiError::OutOfBounds {
        needed: end,
        actual: data.len(),
    })
}

/// Narrows a decoded word to at most `bits` (<= 64) significant bits.
fn narrow(value: U256, bits: u32) -> Result<u64, AbiError> {
    if value.bits() > bits as usize {
        return Err(AbiError::Overflow(bits));
    }
    Ok(value.low_u64())
}

fn word_to_usize(word: &[u8]) -> Result<usize, AbiError> {
    let bits = usize::BITS.min(u64::BITS);
    usize::try_from(narrow(U256::from_big_endian(word), bits)?)
        .map_err(|_| AbiError::Overflow(bits))
}

fn word_to_address(word: &[u8]) -> Address {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Address::new(bytes)
}

pub fn decode_uint(data: &[u8]) -> Result<U256, AbiError> {
    Ok(U256::from_big_endian(word_at(data, 0)?))
}

pub fn decode_bool(data: &[u8]) -> Result<bool, AbiError> {
    Ok(!decode_uint(data)?.is_zero())
}

/// Decodes a static `uint8[3]` return value.
pub fn decode_indexes(data: &[u8]) -> Result<OracleIndexes, AbiError> {
    let mut indexes = [0u8; INDEXES_PER_ORACLE];
    for (i, slot) in indexes.iter_mut().enumerate() {
        let value = U256::from_big_endian(word_at(data, i * WORD)?);
        *slot = narrow(value, 8)? as u8;
    }
    Ok(indexes)
}

/// Decodes a single dynamic `address[]` return value.
pub fn decode_address_array(data: &[u8]) -> Result<Vec<Address>, AbiError> {
    let offset = word_to_usize(word_at(data, 0)?)?;
    let len = word_to_usize(word_at(data, offset)?)?;
    (0..len)
        .map(|i| word_at(data, offset + WORD * (i + 1)).map(word_to_address))
        .collect()
}

fn decode_string_at(data: &[u8], offset: usize) -> Result<String, AbiError> {
    let len = word_to_usize(word_at(data, offset)?)?;
    let start = offset + WORD;
    let end = start.checked_add(len).ok_or(AbiError::Overflow(64))?;
    let bytes = data.get(start..end).ok_or(AbiError::OutOfBounds {
        needed: end,
        actual: data.len(),
    })?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
}

/// Decodes the non-indexed data of an `OracleRequest` log.
///
/// Layout: `index`, `airline`, offset of `flight`, `timestamp`, then the
/// string tail. The index is the contract's choice of responders; it is not
/// needed off-chain because every oracle index is tried.
pub fn decode_oracle_request(data: &[u8]) -> Result<OracleRequestEvent, AbiError> {
    let airline = word_to_address(word_at(data, WORD)?);
    let flight_offset = word_to_usize(word_at(data, 2 * WORD)?)?;
    let timestamp = narrow(U256::from_big_endian(word_at(data, 3 * WORD)?), 64)?;

    Ok(OracleRequestEvent {
        airline,
        flight: decode_string_at(data, flight_offset)?,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airline() -> Address {
        "0xf17f52151ebef6c7334fad080c5704d77216b732".parse().unwrap()
    }

    #[test]
    fn computes_known_selectors() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
    }

    #[test]
    fn encodes_static_arguments_in_place() {
        let data = encode_args(&[Token::Address(airline()), Token::Uint(U256::from(10u64))]);
        assert_eq!(data.len(), 64);
        assert_eq!(&data[12..32], airline().as_bytes());
        assert_eq!(data[63], 10);
    }

    #[test]
    fn encodes_strings_in_the_tail() {
        let data = encode_args(&[
            Token::Uint(U256::from(2u64)),
            Token::Address(airline()),
            Token::String("ND1309".to_string()),
            Token::Uint(U256::from(1_700_000_000u64)),
            Token::Uint(U256::from(20u64)),
        ]);

        // five head words, then length word and one padded data word
        assert_eq!(data.len(), 7 * WORD);
        assert_eq!(decode_uint(&data[2 * WORD..]).unwrap(), U256::from(5 * WORD));
        assert_eq!(decode_uint(&data[5 * WORD..]).unwrap(), U256::from(6u64));
        assert_eq!(&data[6 * WORD..6 * WORD + 6], b"ND1309");
        assert!(data[6 * WORD + 6..].iter().all(|b| *b == 0));
    }

    #[test]
    fn decodes_oracle_request_log() {
        let data = encode_args(&[
            Token::Uint(U256::from(7u64)),
            Token::Address(airline()),
            Token::String("ND1309".to_string()),
            Token::Uint(U256::from(1_700_000_000u64)),
        ]);

        let event = decode_oracle_request(&data).unwrap();
        assert_eq!(event.airline, airline());
        assert_eq!(event.flight, "ND1309");
        assert_eq!(event.timestamp, 1_700_000_000);
    }

    #[test]
    fn decodes_return_values() {
        let mut indexes = Vec::new();
        for i in [3u64, 7, 9] {
            indexes.extend_from_slice(&uint_word(U256::from(i)));
        }
        assert_eq!(decode_indexes(&indexes).unwrap(), [3, 7, 9]);

        let other: Address = "0x627306090abab3a6e1400e9345bc60c78a8bef57".parse().unwrap();
        let mut airlines = uint_word(U256::from(32u64)).to_vec();
        airlines.extend_from_slice(&uint_word(U256::from(2u64)));
        airlines.extend_from_slice(&address_word(&airline()));
        airlines.extend_from_slice(&address_word(&other));
        assert_eq!(decode_address_array(&airlines).unwrap(), vec![airline(), other]);

        assert!(decode_bool(&uint_word(U256::one())).unwrap());
        let wei = U256::exp10(18);
        assert_eq!(decode_uint(&uint_word(wei)).unwrap(), wei);
    }

    #[test]
    fn round_trips_full_width_uint256() {
        let value = U256::MAX - U256::from(1u64);
        let data = encode_args(&[Token::Uint(value)]);
        assert_eq!(data.len(), WORD);
        assert_eq!(decode_uint(&data).unwrap(), value);

        let above_u128 = U256::from(u128::MAX) + U256::one();
        assert_eq!(decode_uint(&uint_word(above_u128)).unwrap(), above_u128);
    }

    #[test]
    fn narrowing_rejects_wide_timestamps() {
        let mut data = encode_args(&[
            Token::Uint(U256::from(1u64)),
            Token::Address(airline()),
            Token::String("ND1309".to_string()),
            Token::Uint(U256::from(u64::MAX) + U256::one()),
        ]);
        assert_eq!(decode_oracle_request(&data), Err(AbiError::Overflow(64)));

        data[3 * WORD..4 * WORD].copy_from_slice(&uint_word(U256::from(u64::MAX)));
        assert_eq!(decode_oracle_request(&data).unwrap().timestamp, u64::MAX);
    }

    #[test]
    fn rejects_truncated_payloads() {
        assert!(matches!(
            decode_indexes(&uint_word(U256::one())),
            Err(AbiError::OutOfBounds { .. })
        ));
        let mut too_big = [0u8; WORD];
        too_big[31] = 1;
        too_big[30] = 1;
        assert_eq!(decode_indexes(&[too_big, too_big, too_big].concat()), Err(AbiError::Overflow(8)));
    }

    #[test]
    fn decodes_hex_with_or_without_prefix() {
        assert_eq!(decode_hex("0x0a0b").unwrap(), vec![10, 11]);
        assert_eq!(decode_hex("0a0b").unwrap(), vec![10, 11]);
        assert!(decode_hex("0xzz").is_err());
    }
}
