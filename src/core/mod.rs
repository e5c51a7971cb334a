//! Core types: addresses, content references and domain records.

pub mod address;
pub mod cid;
pub mod types;

pub use address::Address;
pub use cid::Bytes32;
pub use types::*;
