//! Ledger account addresses

use std::fmt;
use std::str::FromStr;

use primitive_types::H160;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// A 20-byte externally-owned or contract address.
///
/// Thin wrapper over [`H160`]. Parsing accepts any letter case; display and
/// serialization always use the EIP-55 mixed-case checksum form, which is what
/// node clients return.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(H160);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("address must be 40 hex characters: {0}")]
    InvalidLength(String),
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),
}

impl Address {
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(H160(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        self.0.as_fixed_bytes()
    }

    fn to_checksum(self) -> String {
        let lower = hex::encode(self.0.as_bytes());
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| AddressError::MissingPrefix(s.to_string()))?;
        if digits.len() != 40 {
            return Err(AddressError::InvalidLength(s.to_string()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| AddressError::InvalidHex(s.to_string()))?;
        Ok(Self::new(bytes))
    }
}

impl From<H160> for Address {
    fn from(hash: H160) -> Self {
        Self(hash)
    }
}

impl From<Address> for H160 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_checksum()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}
