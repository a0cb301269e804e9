// src/contracts/certificate_registry.rs
//! Certificate Registry chaincode.
//!
//! Runs inside the ledger's execution environment and is the only place where
//! certificate validation, authorization and lifecycle transitions are
//! enforced:
//! - Issue new certificates (registrar only)
//! - Revoke certificates (registrar only, terminal)
//! - Replace the document hash of a valid certificate (registrar only)
//! - Read, verify, list history and query by student (anyone)
//!
//! The contract holds configuration only. All state lives on the ledger and
//! reaches the contract through the [`Context`] of the current invocation.

use crate::blockchain::ledger::ChaincodeStub;
use crate::contracts::access_control::RegistrarGuard;
use crate::contracts::errors::ContractError;
use crate::contracts::history::assemble_history;
use crate::contracts::query::StudentQuery;
use crate::contracts::validation::{validate_certificate, validate_hash};
use crate::models::certificate::{
    CertStatus, Certificate, HistoryEntry, VerificationResult, DEFAULT_REVOCATION_REASON,
};
use crate::models::identity::ClientIdentity;
use crate::utils::serialization::{from_ledger_bytes, to_ledger_bytes};
use chrono::SecondsFormat;
use log::{debug, info};

pub const EVENT_ISSUED: &str = "CertificateIssued";
pub const EVENT_REVOKED: &str = "CertificateRevoked";
pub const EVENT_HASH_UPDATED: &str = "CertificateHashUpdated";

/// One invocation's view of the world: the ledger stub and the caller.
pub struct Context<'a, S: ChaincodeStub> {
    pub stub: &'a mut S,
    pub identity: &'a ClientIdentity,
}

impl<'a, S: ChaincodeStub> Context<'a, S> {
    pub fn new(stub: &'a mut S, identity: &'a ClientIdentity) -> Self {
        Self { stub, identity }
    }
}

/// The certificate lifecycle state machine.
///
/// # States
/// `VIGENTE` (initial) → `REVOCADO` (terminal). Hash updates keep the state.
#[derive(Debug, Clone, Default)]
pub struct CertificateContract {
    guard: RegistrarGuard,
    student_query: StudentQuery,
}

impl CertificateContract {
    /// Creates a contract bound to one registrar identity and one student index.
    pub fn new(guard: RegistrarGuard, student_query: StudentQuery) -> Self {
        Self { guard, student_query }
    }

    pub fn guard(&self) -> &RegistrarGuard {
        &self.guard
    }

    /// Issues a new certificate.
    ///
    /// # Arguments
    /// * `cert` - Certificate to store; any supplied `estado` or
    ///   `revocation_reason` is discarded
    ///
    /// # Errors
    /// Checked in order: `Unauthorized`, validation kinds, `AlreadyExists`.
    ///
    /// # Events
    /// `CertificateIssued` with the certificate id as payload
    pub fn issue<S: ChaincodeStub>(
        &self,
        ctx: &mut Context<'_, S>,
        mut cert: Certificate,
    ) -> Result<(), ContractError> {
        self.guard.assert_registrar(ctx.identity)?;
        validate_certificate(&cert)?;

        if Self::exists(ctx, &cert.id)? {
            return Err(ContractError::AlreadyExists(cert.id));
        }

        cert.estado = CertStatus::Vigente;
        cert.revocation_reason = None;
        Self::store(ctx, &cert)?;
        ctx.stub.set_event(EVENT_ISSUED, cert.id.clone().into_bytes())?;

        info!("certificate {} issued in tx {}", cert.id, ctx.stub.tx_id());
        Ok(())
    }

    /// Reads the current state of a certificate.
    ///
    /// # Errors
    /// `NotFound` if nothing is stored under `id`
    pub fn read<S: ChaincodeStub>(
        &self,
        ctx: &mut Context<'_, S>,
        id: &str,
    ) -> Result<Certificate, ContractError> {
        Self::load(ctx, id)
    }

    /// Revokes a certificate.
    ///
    /// The recorded reason is `reason` when non-empty, otherwise the reason
    /// recorded by an earlier revocation, otherwise a fixed placeholder.
    /// Revoking an already revoked certificate is allowed and rewrites it.
    ///
    /// # Errors
    /// `Unauthorized`, then `NotFound`
    ///
    /// # Events
    /// `CertificateRevoked` with the certificate id as payload
    pub fn revoke<S: ChaincodeStub>(
        &self,
        ctx: &mut Context<'_, S>,
        id: &str,
        reason: Option<&str>,
    ) -> Result<(), ContractError> {
        self.guard.assert_registrar(ctx.identity)?;
        let mut cert = Self::load(ctx, id)?;

        let reason = reason
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .or_else(|| cert.revocation_reason.take())
            .unwrap_or_else(|| DEFAULT_REVOCATION_REASON.to_string());

        cert.estado = CertStatus::Revocado;
        cert.revocation_reason = Some(reason);
        Self::store(ctx, &cert)?;
        ctx.stub.set_event(EVENT_REVOKED, id.as_bytes().to_vec())?;

        info!("certificate {} revoked in tx {}", id, ctx.stub.tx_id());
        Ok(())
    }

    /// Replaces the document hash of a `VIGENTE` certificate.
    ///
    /// # Errors
    /// Checked in order: `Unauthorized`, `NotFound`,
    /// `InvalidStateForOperation`, `InvalidHashFormat`.
    ///
    /// # Events
    /// `CertificateHashUpdated` with the certificate id as payload
    pub fn update_hash<S: ChaincodeStub>(
        &self,
        ctx: &mut Context<'_, S>,
        id: &str,
        new_hash: &str,
    ) -> Result<(), ContractError> {
        self.guard.assert_registrar(ctx.identity)?;
        let mut cert = Self::load(ctx, id)?;

        if cert.estado != CertStatus::Vigente {
            return Err(ContractError::InvalidStateForOperation {
                operation: "updateHash",
                estado: cert.estado.to_string(),
            });
        }
        validate_hash(new_hash)?;

        cert.hash_doc = new_hash.to_string();
        Self::store(ctx, &cert)?;
        ctx.stub.set_event(EVENT_HASH_UPDATED, id.as_bytes().to_vec())?;

        info!("certificate {} hash updated in tx {}", id, ctx.stub.tx_id());
        Ok(())
    }

    /// Compares a document hash against the stored one.
    ///
    /// `verified` is true when `hash_doc` is omitted or empty, or when it is
    /// byte-for-byte equal to the stored hash. The status is not consulted;
    /// callers read it from the returned certificate.
    ///
    /// # Errors
    /// `NotFound` if nothing is stored under `id`
    pub fn verify<S: ChaincodeStub>(
        &self,
        ctx: &mut Context<'_, S>,
        id: &str,
        hash_doc: Option<&str>,
    ) -> Result<VerificationResult, ContractError> {
        let cert = Self::load(ctx, id)?;
        let verified = match hash_doc {
            None | Some("") => true,
            Some(hash) => hash == cert.hash_doc,
        };
        debug!("verification of {}: {}", id, verified);

        Ok(VerificationResult {
            id: id.to_string(),
            verified,
            certificate: cert,
            verification_date: ctx
                .stub
                .tx_timestamp()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }

    /// Lists every committed version of a certificate in ledger order.
    pub fn history<S: ChaincodeStub>(
        &self,
        ctx: &mut Context<'_, S>,
        id: &str,
    ) -> Result<Vec<HistoryEntry>, ContractError> {
        assemble_history(ctx.stub, id)
    }

    /// Lists every certificate whose `alumno` equals `alumno` exactly.
    pub fn query_by_student<S: ChaincodeStub>(
        &self,
        ctx: &mut Context<'_, S>,
        alumno: &str,
    ) -> Result<Vec<Certificate>, ContractError> {
        self.student_query.run(ctx.stub, alumno)
    }

    fn exists<S: ChaincodeStub>(ctx: &mut Context<'_, S>, id: &str) -> Result<bool, ContractError> {
        Ok(ctx.stub.get_state(id)?.map_or(false, |data| !data.is_empty()))
    }

    fn load<S: ChaincodeStub>(ctx: &mut Context<'_, S>, id: &str) -> Result<Certificate, ContractError> {
        match ctx.stub.get_state(id)? {
            Some(data) if !data.is_empty() => from_ledger_bytes(&data),
            _ => Err(ContractError::NotFound(id.to_string())),
        }
    }

    fn store<S: ChaincodeStub>(ctx: &mut Context<'_, S>, cert: &Certificate) -> Result<(), ContractError> {
        let bytes = to_ledger_bytes(cert)?;
        ctx.stub.put_state(&cert.id, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory_ledger::MemoryLedger;
    use crate::blockchain::ledger::LedgerNetwork;
    use tokio_test::{assert_err, assert_ok};

    fn registrar() -> ClientIdentity {
        ClientIdentity::new("Org1MSP", "admin@org1.example.com")
    }

    fn outsider() -> ClientIdentity {
        ClientIdentity::new("Org2MSP", "user@org2.example.com")
    }

    fn certificate(id: &str, alumno: &str) -> Certificate {
        Certificate {
            id: id.into(),
            alumno: alumno.into(),
            carrera: "Ingenieria Civil".into(),
            fecha_emision: "2024-01-15T00:00:00Z".into(),
            issuer: "Universidad Nacional".into(),
            hash_doc: "a".repeat(64),
            estado: CertStatus::Vigente,
            revocation_reason: None,
        }
    }

    /// Runs `op` in its own transaction and commits it when it succeeds.
    fn submit<T>(
        ledger: &MemoryLedger,
        identity: &ClientIdentity,
        op: impl FnOnce(&CertificateContract, &mut Context<'_, <MemoryLedger as LedgerNetwork>::Stub>) -> Result<T, ContractError>,
    ) -> Result<T, ContractError> {
        let contract = CertificateContract::default();
        let mut stub = ledger.begin()?;
        let out = op(&contract, &mut Context::new(&mut stub, identity))?;
        ledger.commit(stub)?;
        Ok(out)
    }

    fn issue(ledger: &MemoryLedger, cert: Certificate) -> Result<(), ContractError> {
        submit(ledger, &registrar(), |c, ctx| c.issue(ctx, cert))
    }

    fn read(ledger: &MemoryLedger, id: &str) -> Result<Certificate, ContractError> {
        submit(ledger, &outsider(), |c, ctx| c.read(ctx, id))
    }

    #[test]
    fn test_issue_then_duplicate() {
        let ledger = MemoryLedger::new();
        assert_ok!(issue(&ledger, certificate("CERT-1", "Ana")));
        assert_eq!(read(&ledger, "CERT-1").unwrap().estado, CertStatus::Vigente);

        assert_eq!(
            issue(&ledger, certificate("CERT-1", "Otra")),
            Err(ContractError::AlreadyExists("CERT-1".into()))
        );
        assert_eq!(read(&ledger, "CERT-1").unwrap().alumno, "Ana");
    }

    #[test]
    fn test_issue_forces_vigente() {
        let ledger = MemoryLedger::new();
        let mut cert = certificate("CERT-2", "Ana");
        cert.estado = CertStatus::Revocado;
        cert.revocation_reason = Some("pre-filled".into());
        assert_ok!(issue(&ledger, cert));

        let stored = read(&ledger, "CERT-2").unwrap();
        assert_eq!(stored.estado, CertStatus::Vigente);
        assert!(stored.revocation_reason.is_none());
    }

    #[test]
    fn test_issue_format_checks() {
        let ledger = MemoryLedger::new();

        let mut bad_hash = certificate("CERT-3", "Ana");
        bad_hash.hash_doc = "abc".into();
        assert_eq!(issue(&ledger, bad_hash), Err(ContractError::InvalidHashFormat));

        let mut bad_date = certificate("CERT-3", "Ana");
        bad_date.fecha_emision = "not-a-date".into();
        assert!(matches!(issue(&ledger, bad_date), Err(ContractError::InvalidDateFormat(_))));

        assert!(matches!(read(&ledger, "CERT-3"), Err(ContractError::NotFound(_))));
        assert_ok!(issue(&ledger, certificate("CERT-3", "Ana")));
    }

    #[test]
    fn test_issue_emits_event() {
        let ledger = MemoryLedger::new();
        assert_ok!(issue(&ledger, certificate("CERT-4", "Ana")));

        let events = ledger.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, EVENT_ISSUED);
        assert_eq!(events[0].payload, b"CERT-4".to_vec());
    }

    #[test]
    fn test_revoke_missing_and_default_reason() {
        let ledger = MemoryLedger::new();
        assert_eq!(
            submit(&ledger, &registrar(), |c, ctx| c.revoke(ctx, "nope", None)),
            Err(ContractError::NotFound("nope".into()))
        );

        assert_ok!(issue(&ledger, certificate("CERT-5", "Ana")));
        assert_ok!(submit(&ledger, &registrar(), |c, ctx| c.revoke(ctx, "CERT-5", Some(""))));

        let stored = read(&ledger, "CERT-5").unwrap();
        assert_eq!(stored.estado, CertStatus::Revocado);
        assert_eq!(stored.revocation_reason.as_deref(), Some(DEFAULT_REVOCATION_REASON));
    }

    #[test]
    fn test_re_revoke_keeps_previous_reason() {
        let ledger = MemoryLedger::new();
        assert_ok!(issue(&ledger, certificate("CERT-6", "Ana")));
        assert_ok!(submit(&ledger, &registrar(), |c, ctx| c.revoke(ctx, "CERT-6", Some("plagio"))));
        assert_ok!(submit(&ledger, &registrar(), |c, ctx| c.revoke(ctx, "CERT-6", None)));
        assert_eq!(read(&ledger, "CERT-6").unwrap().revocation_reason.as_deref(), Some("plagio"));

        assert_ok!(submit(&ledger, &registrar(), |c, ctx| c.revoke(ctx, "CERT-6", Some("error de carga"))));
        assert_eq!(
            read(&ledger, "CERT-6").unwrap().revocation_reason.as_deref(),
            Some("error de carga")
        );
    }

    #[test]
    fn test_update_hash_lifecycle() {
        let ledger = MemoryLedger::new();
        assert_ok!(issue(&ledger, certificate("CERT-7", "Ana")));

        let new_hash = "B".repeat(64);
        assert_ok!(submit(&ledger, &registrar(), |c, ctx| c.update_hash(ctx, "CERT-7", &new_hash)));
        let stored = read(&ledger, "CERT-7").unwrap();
        assert_eq!(stored.hash_doc, new_hash);
        assert_eq!(stored.estado, CertStatus::Vigente);

        assert_eq!(
            submit(&ledger, &registrar(), |c, ctx| c.update_hash(ctx, "CERT-7", "xyz")),
            Err(ContractError::InvalidHashFormat)
        );

        assert_ok!(submit(&ledger, &registrar(), |c, ctx| c.revoke(ctx, "CERT-7", None)));
        let err = submit(&ledger, &registrar(), |c, ctx| c.update_hash(ctx, "CERT-7", &"c".repeat(64)))
            .unwrap_err();
        assert_eq!(err.code(), "CERT_007");
        assert_eq!(read(&ledger, "CERT-7").unwrap().hash_doc, new_hash);
    }

    #[test]
    fn test_state_checked_before_hash_format() {
        let ledger = MemoryLedger::new();
        assert_ok!(issue(&ledger, certificate("CERT-8", "Ana")));
        assert_ok!(submit(&ledger, &registrar(), |c, ctx| c.revoke(ctx, "CERT-8", None)));

        let err = submit(&ledger, &registrar(), |c, ctx| c.update_hash(ctx, "CERT-8", "bad")).unwrap_err();
        assert!(matches!(err, ContractError::InvalidStateForOperation { .. }));
    }

    #[test]
    fn test_verify_semantics() {
        let ledger = MemoryLedger::new();
        assert_ok!(issue(&ledger, certificate("CERT-9", "Ana")));
        let stored = "a".repeat(64);

        let exact = submit(&ledger, &outsider(), |c, ctx| c.verify(ctx, "CERT-9", Some(&stored))).unwrap();
        assert!(exact.verified);
        assert_eq!(exact.id, "CERT-9");
        assert_eq!(exact.certificate.hash_doc, stored);

        let other = submit(&ledger, &outsider(), |c, ctx| c.verify(ctx, "CERT-9", Some(&"b".repeat(64)))).unwrap();
        assert!(!other.verified);

        let upper = submit(&ledger, &outsider(), |c, ctx| c.verify(ctx, "CERT-9", Some(&"A".repeat(64)))).unwrap();
        assert!(!upper.verified);

        assert!(submit(&ledger, &outsider(), |c, ctx| c.verify(ctx, "CERT-9", Some(""))).unwrap().verified);
        assert!(submit(&ledger, &outsider(), |c, ctx| c.verify(ctx, "CERT-9", None)).unwrap().verified);

        assert_err!(submit(&ledger, &outsider(), |c, ctx| c.verify(ctx, "missing", None)));
    }

    #[test]
    fn test_verify_date_is_tx_timestamp() {
        let ledger = MemoryLedger::new();
        assert_ok!(issue(&ledger, certificate("CERT-10", "Ana")));

        let contract = CertificateContract::default();
        let caller = outsider();
        let mut stub = ledger.begin().unwrap();
        let expected = stub.tx_timestamp().to_rfc3339_opts(SecondsFormat::Millis, true);
        let result = contract
            .verify(&mut Context::new(&mut stub, &caller), "CERT-10", None)
            .unwrap();
        assert_eq!(result.verification_date, expected);
    }

    #[test]
    fn test_history_lists_successful_writes() {
        let ledger = MemoryLedger::new();
        assert_ok!(issue(&ledger, certificate("CERT-11", "Ana")));
        assert_ok!(submit(&ledger, &registrar(), |c, ctx| c.revoke(ctx, "CERT-11", Some("duplicado"))));
        assert_err!(submit(&ledger, &registrar(), |c, ctx| c.update_hash(ctx, "CERT-11", &"d".repeat(64))));

        let history = submit(&ledger, &outsider(), |c, ctx| c.history(ctx, "CERT-11")).unwrap();
        assert_eq!(history.len(), 2);
        assert_ne!(history[0].tx_id, history[1].tx_id);
        assert!(history.iter().all(|entry| !entry.is_delete));
        assert_eq!(history[0].value.as_ref().unwrap().estado, CertStatus::Vigente);
        assert_eq!(history[1].value.as_ref().unwrap().estado, CertStatus::Revocado);
        assert_eq!(ledger.open_iterators(), 0);
    }

    #[test]
    fn test_history_of_unknown_id_is_empty() {
        let ledger = MemoryLedger::new();
        let history = submit(&ledger, &outsider(), |c, ctx| c.history(ctx, "ghost")).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_query_by_student() {
        let ledger = MemoryLedger::new();
        assert_ok!(issue(&ledger, certificate("CERT-12", "Ana Perez")));
        assert_ok!(issue(&ledger, certificate("CERT-13", "Ana Perez")));
        assert_ok!(issue(&ledger, certificate("CERT-14", "Luis Gomez")));

        let mut ids: Vec<String> = submit(&ledger, &outsider(), |c, ctx| c.query_by_student(ctx, "Ana Perez"))
            .unwrap()
            .into_iter()
            .map(|cert| cert.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["CERT-12", "CERT-13"]);

        let partial = submit(&ledger, &outsider(), |c, ctx| c.query_by_student(ctx, "Ana")).unwrap();
        assert!(partial.is_empty());
        assert_eq!(ledger.open_iterators(), 0);
    }

    #[test]
    fn test_query_returns_every_match() {
        let ledger = MemoryLedger::new();
        for n in 0..250 {
            assert_ok!(issue(&ledger, certificate(&format!("BULK-{:03}", n), "Masivo")));
        }
        let all = submit(&ledger, &outsider(), |c, ctx| c.query_by_student(ctx, "Masivo")).unwrap();
        assert_eq!(all.len(), 250);
    }

    #[test]
    fn test_only_registrar_mutates() {
        let ledger = MemoryLedger::new();
        assert_ok!(issue(&ledger, certificate("CERT-15", "Ana")));

        let denied = |result: Result<(), ContractError>| {
            assert!(matches!(result, Err(ContractError::Unauthorized { .. })));
        };
        denied(submit(&ledger, &outsider(), |c, ctx| c.issue(ctx, certificate("CERT-16", "Ana"))));
        denied(submit(&ledger, &outsider(), |c, ctx| c.revoke(ctx, "CERT-15", None)));
        denied(submit(&ledger, &outsider(), |c, ctx| c.update_hash(ctx, "CERT-15", &"e".repeat(64))));
        denied(submit(&ledger, &outsider(), |c, ctx| c.revoke(ctx, "does-not-exist", None)));

        assert_ok!(read(&ledger, "CERT-15"));
        assert_ok!(submit(&ledger, &outsider(), |c, ctx| c.verify(ctx, "CERT-15", None)));
        assert_ok!(submit(&ledger, &outsider(), |c, ctx| c.history(ctx, "CERT-15")));
        assert_ok!(submit(&ledger, &outsider(), |c, ctx| c.query_by_student(ctx, "Ana")));
        assert_eq!(read(&ledger, "CERT-15").unwrap().estado, CertStatus::Vigente);
    }

    #[test]
    fn test_failed_invocation_writes_nothing() {
        let ledger = MemoryLedger::new();
        let contract = CertificateContract::default();
        let caller = registrar();

        let mut stub = ledger.begin().unwrap();
        {
            let mut ctx = Context::new(&mut stub, &caller);
            assert_ok!(contract.issue(&mut ctx, certificate("CERT-17", "Ana")));
            assert_err!(contract.issue(&mut ctx, certificate("", "Ana")));
        }
        drop(stub);

        assert!(matches!(read(&ledger, "CERT-17"), Err(ContractError::NotFound(_))));
        assert!(ledger.events().is_empty());
    }
}
