// src/storage/mod.rs
//! Ledger adapters.

pub mod memory_ledger;
