// src/contracts/errors.rs
//! Error kinds raised by the certificate contract.
//!
//! Every kind carries a stable code. The `Display` form is `[CODE] message`,
//! so logs and raw chaincode responses stay greppable, while the gateway maps
//! on [`ContractError::code`] instead of matching text.

use crate::blockchain::ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("[CERT_001] certificate '{0}' not found")]
    NotFound(String),

    #[error("[CERT_002] certificate '{0}' already exists")]
    AlreadyExists(String),

    /// A required field is missing or blank, or the payload is not a certificate.
    #[error("[CERT_003] invalid certificate data: {0}")]
    InvalidData(String),

    #[error("[CERT_004] operation allowed only to registrar {required}, caller MSP is {actual}")]
    Unauthorized { required: String, actual: String },

    #[error("[CERT_005] fechaEmision must be an ISO-8601 date: '{0}'")]
    InvalidDateFormat(String),

    #[error("[CERT_006] hashDoc must be a SHA-256 digest (64 hex characters)")]
    InvalidHashFormat,

    /// The certificate's status does not allow the requested transition.
    #[error("[CERT_007] operation '{operation}' not allowed while certificate is {estado}")]
    InvalidStateForOperation { operation: &'static str, estado: String },

    #[error("[CERT_008] unknown contract function '{0}'")]
    UnknownFunction(String),

    #[error("[CERT_008] function '{function}' expects {expected} argument(s), got {got}")]
    InvalidArguments {
        function: String,
        expected: &'static str,
        got: usize,
    },

    #[error("[{}] {}", ledger_code(.0), .0)]
    Ledger(#[from] LedgerError),
}

fn ledger_code(err: &LedgerError) -> &'static str {
    match err {
        LedgerError::MvccReadConflict { .. } => "LEDGER_409",
        _ => "LEDGER_001",
    }
}

impl ContractError {
    /// Stable, machine-matchable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ContractError::NotFound(_) => "CERT_001",
            ContractError::AlreadyExists(_) => "CERT_002",
            ContractError::InvalidData(_) => "CERT_003",
            ContractError::Unauthorized { .. } => "CERT_004",
            ContractError::InvalidDateFormat(_) => "CERT_005",
            ContractError::InvalidHashFormat => "CERT_006",
            ContractError::InvalidStateForOperation { .. } => "CERT_007",
            ContractError::UnknownFunction(_) | ContractError::InvalidArguments { .. } => "CERT_008",
            ContractError::Ledger(err) => ledger_code(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code() {
        let err = ContractError::NotFound("CERT-9".into());
        assert_eq!(err.to_string(), "[CERT_001] certificate 'CERT-9' not found");
        assert_eq!(err.code(), "CERT_001");
    }

    #[test]
    fn test_ledger_conflict_code() {
        let err = ContractError::from(LedgerError::MvccReadConflict { key: "k".into() });
        assert_eq!(err.code(), "LEDGER_409");
        assert!(err.to_string().starts_with("[LEDGER_409]"));
        assert_eq!(ContractError::from(LedgerError::IteratorClosed).code(), "LEDGER_001");
    }
}
