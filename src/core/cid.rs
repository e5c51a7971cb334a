//! Content reference packing
//!
//! Content identifiers produced by the storage network are variable length
//! strings. Records keep a fixed 32-byte key next to the full identifier:
//! hex identifiers (`0x...`) are decoded to bytes, anything else is taken as
//! UTF-8. The bytes are zero padded to 32, or truncated when longer.
//!
//! Unpacking strips the trailing zero padding, so an identifier survives the
//! round-trip exactly when its payload fits in 32 bytes and does not itself
//! end in a NUL byte. Longer identifiers lose their tail; the full string is
//! kept in the `content_refs/` side-channel and resolved through
//! [`crate::dao::DataDao::resolve_content`].

use crate::error::{DaoError, DaoResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PACKED_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bytes32([u8; PACKED_LEN]);

impl Bytes32 {
    pub const ZERO: Bytes32 = Bytes32([0u8; PACKED_LEN]);

    pub fn from_cid(cid: &str) -> Self {
        let payload = payload_bytes(cid);
        let mut out = [0u8; PACKED_LEN];
        let n = payload.len().min(PACKED_LEN);
        out[..n].copy_from_slice(&payload[..n]);
        Bytes32(out)
    }

    /// Whether packing `cid` loses nothing.
    pub fn fits(cid: &str) -> bool {
        let payload = payload_bytes(cid);
        payload.len() <= PACKED_LEN && payload.last() != Some(&0)
    }

    pub fn as_bytes(&self) -> &[u8; PACKED_LEN] {
        &self.0
    }

    fn trimmed(&self) -> &[u8] {
        let end = self
            .0
            .iter()
            .rposition(|b| *b != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.0[..end]
    }

    /// Recover an identifier that was packed from UTF-8 text.
    pub fn to_utf8_cid(&self) -> DaoResult<String> {
        String::from_utf8(self.trimmed().to_vec())
            .map_err(|_| DaoError::InvalidContentRef(format!("{} is not UTF-8", self.to_hex())))
    }

    /// Recover an identifier that was packed from `0x` hex.
    pub fn to_hex_cid(&self) -> String {
        format!("0x{}", hex::encode(self.trimmed()))
    }

    /// Full 32-byte hex form used as the storage side-channel key.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(raw: &str) -> DaoResult<Self> {
        let digits = raw.strip_prefix("0x").unwrap_or(raw);
        let bytes = hex::decode(digits)
            .map_err(|e| DaoError::InvalidContentRef(format!("{}: {}", raw, e)))?;
        let arr: [u8; PACKED_LEN] = bytes.try_into().map_err(|_| {
            DaoError::InvalidContentRef(format!("{} is not {} bytes", raw, PACKED_LEN))
        })?;
        Ok(Bytes32(arr))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; PACKED_LEN]
    }
}

fn payload_bytes(cid: &str) -> Vec<u8> {
    if let Some(digits) = cid.strip_prefix("0x") {
        if digits.len() % 2 == 0 {
            if let Ok(bytes) = hex::decode(digits) {
                return bytes;
            }
        }
    }
    cid.as_bytes().to_vec()
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Bytes32 {
    type Error = DaoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Bytes32::from_hex(&value)
    }
}

impl From<Bytes32> for String {
    fn from(b: Bytes32) -> Self {
        b.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_cid_roundtrips() {
        let cid = "bafkreigh2akiscaild";
        let packed = Bytes32::from_cid(cid);
        assert!(Bytes32::fits(cid));
        assert_eq!(packed.to_utf8_cid().unwrap(), cid);
    }

    #[test]
    fn test_exactly_32_bytes_roundtrips() {
        let cid = "abcdefghijklmnopqrstuvwxyz012345";
        assert_eq!(cid.len(), 32);
        assert_eq!(Bytes32::from_cid(cid).to_utf8_cid().unwrap(), cid);
    }

    #[test]
    fn test_long_cid_is_truncated() {
        let cid = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
        assert!(!Bytes32::fits(cid));
        let recovered = Bytes32::from_cid(cid).to_utf8_cid().unwrap();
        assert_eq!(recovered, &cid[..32]);
        assert_ne!(recovered, cid);
    }

    #[test]
    fn test_hex_cid_roundtrips() {
        let cid = "0x1220deadbeef";
        let packed = Bytes32::from_cid(cid);
        assert_eq!(&packed.as_bytes()[..6], &[0x12u8, 0x20, 0xde, 0xad, 0xbe, 0xef][..]);
        assert_eq!(packed.to_hex_cid(), cid);
    }

    #[test]
    fn test_trailing_nul_does_not_fit() {
        assert!(!Bytes32::fits("0xab00"));
        assert_eq!(Bytes32::from_cid("0xab00").to_hex_cid(), "0xab");
    }

    #[test]
    fn test_hex_form_parses_back() {
        let packed = Bytes32::from_cid("dataset-v1");
        let parsed = Bytes32::from_hex(&packed.to_hex()).unwrap();
        assert_eq!(parsed, packed);
        assert!(Bytes32::from_hex("0x1234").is_err());
    }

    #[test]
    fn test_empty_cid_is_zero() {
        assert!(Bytes32::from_cid("").is_zero());
        assert_eq!(Bytes32::ZERO.to_utf8_cid().unwrap(), "");
    }
}
