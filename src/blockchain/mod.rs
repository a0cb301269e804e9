// src/blockchain/mod.rs
//! Ledger platform boundary.

pub mod ledger;
