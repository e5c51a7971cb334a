//! Account addresses

use crate::error::{DaoError, DaoResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hex digits after the `0x` prefix.
const ADDRESS_HEX_LEN: usize = 40;

/// A 20-byte account address, always stored as lower-case `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> DaoResult<Self> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| DaoError::InvalidAddress(format!("{} is missing the 0x prefix", raw)))?;

        if digits.len() != ADDRESS_HEX_LEN {
            return Err(DaoError::InvalidAddress(format!(
                "{} must have {} hex digits, got {}",
                raw,
                ADDRESS_HEX_LEN,
                digits.len()
            )));
        }
        if hex::decode(digits).is_err() {
            return Err(DaoError::InvalidAddress(format!("{} is not valid hex", raw)));
        }

        Ok(Address(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// Deterministic address derived from a short label, used for system accounts.
    pub fn system(label: &str) -> Self {
        let hex_label = hex::encode(label.as_bytes());
        let tail: String = hex_label
            .chars()
            .rev()
            .take(ADDRESS_HEX_LEN)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        Address(format!("0x{:0>40}", tail))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = DaoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = DaoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}
