// src/models/identity.rs
//! Caller identity model.
//!
//! The ledger platform authenticates every invocation and hands the contract
//! the caller's organizational membership (MSP id) plus an enrollment id.

use serde::{Deserialize, Serialize};

/// Identity of the client submitting or evaluating a transaction.
///
/// # Fields
/// - `msp_id`: Organization the caller's certificate was issued by
///   Example: "Org1MSP"
/// - `id`: Enrollment identity within that organization
///   Example: "User1@org1.example.com"
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientIdentity {
    pub msp_id: String,
    pub id: String,
}

impl ClientIdentity {
    pub fn new(msp_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            msp_id: msp_id.into(),
            id: id.into(),
        }
    }
}
