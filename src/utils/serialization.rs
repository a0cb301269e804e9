// src/utils/serialization.rs
//! Serialization utilities for ledger values and chaincode payloads.
//!
//! Ledger values are raw bytes; certificates travel as JSON. These helpers
//! keep the byte/JSON conversion in one place and map failures onto
//! contract error kinds.

use crate::contracts::errors::ContractError;
use serde::{de::DeserializeOwned, Serialize};

/// Serializes a value to JSON bytes for storage or a chaincode response.
///
/// # Errors
/// `InvalidData` if the value cannot be represented as JSON.
pub fn to_ledger_bytes<T: Serialize>(data: &T) -> Result<Vec<u8>, ContractError> {
    serde_json::to_vec(data).map_err(|e| ContractError::InvalidData(format!("serialization failed: {}", e)))
}

/// Deserializes a value previously written with [`to_ledger_bytes`].
///
/// # Errors
/// `InvalidData` if the bytes are not valid JSON for `T`. A stored record
/// that fails to decode means the key holds something the contract did not
/// write.
pub fn from_ledger_bytes<T: DeserializeOwned>(data: &[u8]) -> Result<T, ContractError> {
    serde_json::from_slice(data).map_err(|e| ContractError::InvalidData(format!("malformed ledger value: {}", e)))
}

/// Parses a JSON argument passed to a chaincode function.
pub fn parse_json_arg<T: DeserializeOwned>(arg: &str) -> Result<T, ContractError> {
    serde_json::from_str(arg).map_err(|e| ContractError::InvalidData(format!("invalid JSON: {}", e)))
}
