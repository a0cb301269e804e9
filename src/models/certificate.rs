// src/models/certificate.rs
//! Academic certificate data model.
//!
//! Defines the record stored under each certificate id on the ledger, the
//! lifecycle status it carries, and the read-side projections (verification
//! result and history entry) returned by the contract.

use serde::{Deserialize, Serialize};

/// Reason recorded when a certificate is revoked without one being supplied
/// and none was recorded before.
pub const DEFAULT_REVOCATION_REASON: &str = "Sin razón especificada";

/// Lifecycle status of a certificate.
///
/// `Vigente` is the initial state; `Revocado` is terminal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CertStatus {
    /// Certificate is valid
    #[default]
    Vigente,
    /// Certificate has been revoked
    Revocado,
}

impl CertStatus {
    /// Wire name of the status, as stored on the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            CertStatus::Vigente => "VIGENTE",
            CertStatus::Revocado => "REVOCADO",
        }
    }
}

impl std::fmt::Display for CertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An academic certificate as recorded on the ledger.
///
/// The JSON form uses the camelCase field names of the stored record
/// (`fechaEmision`, `hashDoc`, `revocationReason`).
///
/// # Fields
/// - `id`: Primary key, immutable once issued
/// - `alumno`: Student identifier (free text, e.g. national id + name)
/// - `carrera`: Program name
/// - `fecha_emision`: Issuance date, ISO-8601
/// - `issuer`: Issuing authority name
/// - `hash_doc`: SHA-256 of the certified document, 64 hex characters
/// - `estado`: Lifecycle status
/// - `revocation_reason`: Present only once revoked
///
/// # Deserialization
/// `estado` may be omitted from an issue payload; it defaults to `VIGENTE`
/// and is forced to `VIGENTE` on issue regardless.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// Unique certificate identifier
    /// Example: "CERT-2024-0001"
    pub id: String,

    /// Student identifier
    pub alumno: String,

    /// Program the certificate was awarded for
    pub carrera: String,

    /// Issuance date
    /// Example: "2024-01-15T00:00:00Z"
    pub fecha_emision: String,

    /// Issuing authority
    pub issuer: String,

    /// Hex-encoded SHA-256 digest of the certified document
    pub hash_doc: String,

    #[serde(default)]
    pub estado: CertStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
}

impl Certificate {
    pub fn is_revoked(&self) -> bool {
        self.estado == CertStatus::Revocado
    }
}

/// Issue payload as submitted by a client.
///
/// Every field defaults to an empty string, so a missing field reaches
/// validation and is reported with its own error kind instead of failing
/// to decode. Status and revocation reason are not accepted from clients.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificateRequest {
    pub id: String,
    pub alumno: String,
    pub carrera: String,
    pub fecha_emision: String,
    pub issuer: String,
    pub hash_doc: String,
}

impl From<CertificateRequest> for Certificate {
    fn from(req: CertificateRequest) -> Self {
        Certificate {
            id: req.id,
            alumno: req.alumno,
            carrera: req.carrera,
            fecha_emision: req.fecha_emision,
            issuer: req.issuer,
            hash_doc: req.hash_doc,
            estado: CertStatus::Vigente,
            revocation_reason: None,
        }
    }
}

/// Outcome of a verification request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub id: String,
    /// True when no hash was supplied or the supplied hash equals the stored one
    pub verified: bool,
    pub certificate: Certificate,
    /// Timestamp of the verifying transaction, RFC 3339
    pub verification_date: String,
}

/// One committed version of a certificate key, as reconstructed from the
/// ledger's history log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub tx_id: String,
    pub is_delete: bool,
    /// Commit time, RFC 3339 UTC with millisecond precision
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Certificate>,
}
