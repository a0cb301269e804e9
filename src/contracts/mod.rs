// src/contracts/mod.rs
//! Certificate chaincode: lifecycle state machine and the gates around it.

pub mod access_control;
pub mod certificate_registry;
pub mod dispatcher;
pub mod errors;
pub mod history;
pub mod query;
pub mod validation;
