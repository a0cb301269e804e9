// src/models/mod.rs
//! Data structures shared by the contract, the ledger adapters and the gateway.

pub mod certificate;
pub mod identity;
