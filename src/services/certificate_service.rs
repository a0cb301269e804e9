// src/services/certificate_service.rs
//! Certificate Gateway Service
//!
//! Runs certificate contract operations against a ledger network on behalf of
//! one configured client identity. Each call is one transaction:
//! - read operations are evaluated, their transaction is discarded
//! - mutations are submitted, their transaction is committed
//!
//! The service holds no certificate state of its own.

use crate::blockchain::ledger::LedgerNetwork;
use crate::contracts::certificate_registry::{CertificateContract, Context};
use crate::contracts::dispatcher::SUBMIT_FUNCTIONS;
use crate::contracts::errors::ContractError;
use crate::models::certificate::{Certificate, HistoryEntry, VerificationResult};
use crate::models::identity::ClientIdentity;
use log::{debug, warn};
use std::sync::Arc;

/// Gateway-side entry point to the certificate contract.
///
/// # Type Parameters
/// * `N` - Ledger network the transactions run on
pub struct CertificateService<N: LedgerNetwork> {
    network: Arc<N>,
    contract: CertificateContract,
    identity: ClientIdentity,
}

impl<N: LedgerNetwork> CertificateService<N> {
    /// Creates a new CertificateService.
    ///
    /// # Arguments
    /// * `network` - Shared ledger network
    /// * `contract` - Contract configured with the registrar and student index
    /// * `identity` - Identity every transaction is signed as
    pub fn new(network: Arc<N>, contract: CertificateContract, identity: ClientIdentity) -> Self {
        Self {
            network,
            contract,
            identity,
        }
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Issues a certificate (submit).
    pub fn create_certificate(&self, cert: Certificate) -> Result<(), ContractError> {
        self.submit("issueCertificate", |contract, ctx| contract.issue(ctx, cert))
    }

    /// Reads a certificate by id (evaluate).
    pub fn get_certificate(&self, id: &str) -> Result<Certificate, ContractError> {
        self.evaluate("readCertificate", |contract, ctx| contract.read(ctx, id))
    }

    /// Verifies a document hash against a stored certificate (evaluate).
    pub fn verify_certificate(
        &self,
        id: &str,
        hash_doc: Option<&str>,
    ) -> Result<VerificationResult, ContractError> {
        self.evaluate("verifyCertificate", |contract, ctx| contract.verify(ctx, id, hash_doc))
    }

    /// Revokes a certificate (submit).
    pub fn revoke_certificate(&self, id: &str, reason: Option<&str>) -> Result<(), ContractError> {
        self.submit("revokeCertificate", |contract, ctx| contract.revoke(ctx, id, reason))
    }

    /// Replaces the document hash of a valid certificate (submit).
    pub fn update_certificate_hash(&self, id: &str, new_hash: &str) -> Result<(), ContractError> {
        self.submit("updateCertificateHash", |contract, ctx| {
            contract.update_hash(ctx, id, new_hash)
        })
    }

    /// Lists the committed versions of a certificate (evaluate).
    pub fn get_certificate_history(&self, id: &str) -> Result<Vec<HistoryEntry>, ContractError> {
        self.evaluate("getCertificateHistory", |contract, ctx| contract.history(ctx, id))
    }

    /// Lists the certificates of one student (evaluate).
    pub fn query_by_student(&self, alumno: &str) -> Result<Vec<Certificate>, ContractError> {
        self.evaluate("queryByStudent", |contract, ctx| contract.query_by_student(ctx, alumno))
    }

    /// Invokes a chaincode function by name with raw string arguments.
    ///
    /// Mutating functions are submitted, everything else is evaluated.
    /// This is the raw chaincode-style entry point for embedders and tools
    /// that address functions by name; the HTTP gateway uses the typed
    /// methods above.
    ///
    /// # Returns
    /// The function's JSON-encoded result
    pub fn transact(&self, function: &str, args: &[String]) -> Result<Vec<u8>, ContractError> {
        if SUBMIT_FUNCTIONS.contains(&function) {
            self.submit(function, |contract, ctx| contract.invoke(ctx, function, args))
        } else {
            self.evaluate(function, |contract, ctx| contract.invoke(ctx, function, args))
        }
    }

    fn evaluate<T>(
        &self,
        label: &str,
        op: impl FnOnce(&CertificateContract, &mut Context<'_, N::Stub>) -> Result<T, ContractError>,
    ) -> Result<T, ContractError> {
        let mut stub = self.network.begin()?;
        let result = op(&self.contract, &mut Context::new(&mut stub, &self.identity));
        debug!("evaluated {} ({})", label, if result.is_ok() { "ok" } else { "failed" });
        result
    }

    fn submit<T>(
        &self,
        label: &str,
        op: impl FnOnce(&CertificateContract, &mut Context<'_, N::Stub>) -> Result<T, ContractError>,
    ) -> Result<T, ContractError> {
        let mut stub = self.network.begin()?;
        let output = op(&self.contract, &mut Context::new(&mut stub, &self.identity))?;

        match self.network.commit(stub) {
            Ok(receipt) => {
                debug!("submitted {} as tx {} (height {})", label, receipt.tx_id, receipt.block_height);
                Ok(output)
            }
            Err(err) => {
                warn!("{} endorsed but not committed: {}", label, err);
                Err(err.into())
            }
        }
    }
}

impl<N: LedgerNetwork> Clone for CertificateService<N> {
    /// Creates a clone sharing the same ledger network
    fn clone(&self) -> Self {
        Self {
            network: self.network.clone(),
            contract: self.contract.clone(),
            identity: self.identity.clone(),
        }
    }
}
