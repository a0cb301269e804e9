// src/contracts/dispatcher.rs
//! Chaincode entry point: routes a function name and string arguments to the
//! matching contract operation and encodes the result as JSON bytes.

use crate::blockchain::ledger::ChaincodeStub;
use crate::contracts::certificate_registry::{CertificateContract, Context};
use crate::contracts::errors::ContractError;
use crate::models::certificate::CertificateRequest;
use crate::utils::serialization::{parse_json_arg, to_ledger_bytes};
use log::{debug, warn};

pub const FN_ISSUE: &str = "issueCertificate";
pub const FN_READ: &str = "readCertificate";
pub const FN_REVOKE: &str = "revokeCertificate";
pub const FN_UPDATE_HASH: &str = "updateCertificateHash";
pub const FN_VERIFY: &str = "verifyCertificate";
pub const FN_HISTORY: &str = "getCertificateHistory";
pub const FN_QUERY_BY_STUDENT: &str = "queryByStudent";

/// Functions that write to the ledger and must be submitted, not evaluated.
pub const SUBMIT_FUNCTIONS: [&str; 3] = [FN_ISSUE, FN_REVOKE, FN_UPDATE_HASH];

impl CertificateContract {
    /// Invokes a contract function by name.
    ///
    /// # Arguments
    /// * `function` - Chaincode function name, e.g. `issueCertificate`
    /// * `args` - Positional string arguments; `issueCertificate` takes the
    ///   certificate as JSON, optional trailing arguments may be omitted
    ///
    /// # Returns
    /// JSON-encoded result, or an empty payload for mutations
    ///
    /// # Errors
    /// `UnknownFunction`, `InvalidArguments`, or whatever the operation raises
    pub fn invoke<S: ChaincodeStub>(
        &self,
        ctx: &mut Context<'_, S>,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError> {
        debug!("invoke {} with {} argument(s) as {}", function, args.len(), ctx.identity.msp_id);

        let result = self.dispatch(ctx, function, args);
        if let Err(err) = &result {
            warn!("{} failed in tx {}: {}", function, ctx.stub.tx_id(), err);
        }
        result
    }

    fn dispatch<S: ChaincodeStub>(
        &self,
        ctx: &mut Context<'_, S>,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError> {
        match function {
            FN_ISSUE => {
                arity(function, args, 1, 1)?;
                let request: CertificateRequest = parse_json_arg(&args[0])?;
                self.issue(ctx, request.into())?;
                Ok(Vec::new())
            }
            FN_READ => {
                arity(function, args, 1, 1)?;
                to_ledger_bytes(&self.read(ctx, &args[0])?)
            }
            FN_REVOKE => {
                arity(function, args, 1, 2)?;
                self.revoke(ctx, &args[0], optional(args, 1))?;
                Ok(Vec::new())
            }
            FN_UPDATE_HASH => {
                arity(function, args, 2, 2)?;
                self.update_hash(ctx, &args[0], &args[1])?;
                Ok(Vec::new())
            }
            FN_VERIFY => {
                arity(function, args, 1, 2)?;
                to_ledger_bytes(&self.verify(ctx, &args[0], optional(args, 1))?)
            }
            FN_HISTORY => {
                arity(function, args, 1, 1)?;
                to_ledger_bytes(&self.history(ctx, &args[0])?)
            }
            FN_QUERY_BY_STUDENT => {
                arity(function, args, 1, 1)?;
                to_ledger_bytes(&self.query_by_student(ctx, &args[0])?)
            }
            other => Err(ContractError::UnknownFunction(other.to_string())),
        }
    }
}

fn arity(function: &str, args: &[String], min: usize, max: usize) -> Result<(), ContractError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = match (min, max) {
        (1, 1) => "1",
        (2, 2) => "2",
        _ => "1 or 2",
    };
    Err(ContractError::InvalidArguments {
        function: function.to_string(),
        expected,
        got: args.len(),
    })
}

fn optional(args: &[String], index: usize) -> Option<&str> {
    args.get(index).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::ledger::LedgerNetwork;
    use crate::models::certificate::{CertStatus, Certificate, HistoryEntry, VerificationResult};
    use crate::models::identity::ClientIdentity;
    use crate::storage::memory_ledger::MemoryLedger;
    use serde_json::json;

    fn call(ledger: &MemoryLedger, msp: &str, function: &str, args: &[&str]) -> Result<Vec<u8>, ContractError> {
        let contract = CertificateContract::default();
        let identity = ClientIdentity::new(msp, "tester");
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let mut stub = ledger.begin()?;
        let out = contract.invoke(&mut Context::new(&mut stub, &identity), function, &args)?;
        ledger.commit(stub)?;
        Ok(out)
    }

    fn cert_json(id: &str) -> String {
        json!({
            "id": id,
            "alumno": "Ana Perez",
            "carrera": "Arquitectura",
            "fechaEmision": "2024-01-15T00:00:00Z",
            "issuer": "Universidad Nacional",
            "hashDoc": "f".repeat(64),
            "estado": "REVOCADO",
        })
        .to_string()
    }

    #[test]
    fn test_issue_and_read_by_name() {
        let ledger = MemoryLedger::new();
        let out = call(&ledger, "Org1MSP", FN_ISSUE, &[&cert_json("D-1")]).unwrap();
        assert!(out.is_empty());

        let raw = call(&ledger, "OtherMSP", FN_READ, &["D-1"]).unwrap();
        let cert: Certificate = serde_json::from_slice(&raw).unwrap();
        assert_eq!(cert.estado, CertStatus::Vigente);
    }

    #[test]
    fn test_issue_rejects_malformed_json() {
        let ledger = MemoryLedger::new();
        let err = call(&ledger, "Org1MSP", FN_ISSUE, &["{\"id\": 42"]).unwrap_err();
        assert_eq!(err.code(), "CERT_003");

        let err = call(&ledger, "Org1MSP", FN_ISSUE, &["{\"id\": \"x\"}"]).unwrap_err();
        assert_eq!(err.code(), "CERT_003");
    }

    #[test]
    fn test_missing_fields_report_validation_kind() {
        let ledger = MemoryLedger::new();
        let full = json!({
            "id": "D-4",
            "alumno": "Ana Perez",
            "carrera": "Arquitectura",
            "fechaEmision": "2024-01-15",
            "issuer": "Universidad Nacional",
            "hashDoc": "a".repeat(64),
        });

        let cases = [
            ("id", "CERT_003"),
            ("alumno", "CERT_003"),
            ("carrera", "CERT_003"),
            ("issuer", "CERT_003"),
            ("fechaEmision", "CERT_005"),
            ("hashDoc", "CERT_006"),
        ];
        for (field, code) in cases {
            let mut payload = full.clone();
            payload.as_object_mut().unwrap().remove(field);
            let err = call(&ledger, "Org1MSP", FN_ISSUE, &[&payload.to_string()]).unwrap_err();
            assert_eq!(err.code(), code, "missing {}", field);
        }

        let mut no_date = full.clone();
        no_date.as_object_mut().unwrap().remove("fechaEmision");
        assert_eq!(
            call(&ledger, "Org1MSP", FN_ISSUE, &[&no_date.to_string()]),
            Err(ContractError::InvalidDateFormat(String::new()))
        );
        assert_eq!(ledger.block_height(), 0);
    }

    #[test]
    fn test_optional_arguments() {
        let ledger = MemoryLedger::new();
        call(&ledger, "Org1MSP", FN_ISSUE, &[&cert_json("D-2")]).unwrap();

        let raw = call(&ledger, "X", FN_VERIFY, &["D-2"]).unwrap();
        let result: VerificationResult = serde_json::from_slice(&raw).unwrap();
        assert!(result.verified);

        let raw = call(&ledger, "X", FN_VERIFY, &["D-2", &"0".repeat(64)]).unwrap();
        let result: VerificationResult = serde_json::from_slice(&raw).unwrap();
        assert!(!result.verified);

        call(&ledger, "Org1MSP", FN_REVOKE, &["D-2"]).unwrap();
        let raw = call(&ledger, "X", FN_HISTORY, &["D-2"]).unwrap();
        let history: Vec<HistoryEntry> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(history.len(), 2);

        let raw = call(&ledger, "X", FN_QUERY_BY_STUDENT, &["Ana Perez"]).unwrap();
        let found: Vec<Certificate> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].estado, CertStatus::Revocado);
    }

    #[test]
    fn test_unknown_function_and_arity() {
        let ledger = MemoryLedger::new();
        assert_eq!(
            call(&ledger, "Org1MSP", "deleteCertificate", &["D-3"]),
            Err(ContractError::UnknownFunction("deleteCertificate".into()))
        );
        assert_eq!(
            call(&ledger, "Org1MSP", FN_UPDATE_HASH, &["D-3"]),
            Err(ContractError::InvalidArguments {
                function: FN_UPDATE_HASH.into(),
                expected: "2",
                got: 1,
            })
        );
        assert!(call(&ledger, "Org1MSP", FN_READ, &[]).is_err());
    }

    #[test]
    fn test_submit_functions_are_mutations() {
        assert!(SUBMIT_FUNCTIONS.contains(&FN_ISSUE));
        assert!(!SUBMIT_FUNCTIONS.contains(&FN_VERIFY));
    }
}
