// src/contracts/validation.rs
//! Structural and format checks applied before a certificate is admitted.

use crate::contracts::errors::ContractError;
use crate::models::certificate::Certificate;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

/// ISO-8601 date-time forms carrying an offset (`Z`, `+03`, `+0300`, `+03:00`).
const OFFSET_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M%#z"];

/// ISO-8601 local date-time forms, seconds optional.
const LOCAL_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Checks a certificate submitted for issuance.
///
/// Rules, in order:
/// 1. `id`, `alumno`, `carrera`, `issuer` non-blank after trimming
/// 2. `fecha_emision` is a valid calendar date or date-time
/// 3. `hash_doc` is 64 hex characters
///
/// # Errors
/// The first failing rule's kind: `InvalidData`, `InvalidDateFormat`
/// or `InvalidHashFormat`.
pub fn validate_certificate(cert: &Certificate) -> Result<(), ContractError> {
    require_field("id", &cert.id)?;
    require_field("alumno", &cert.alumno)?;
    require_field("carrera", &cert.carrera)?;
    require_field("issuer", &cert.issuer)?;
    validate_issue_date(&cert.fecha_emision)?;
    validate_hash(&cert.hash_doc)
}

/// Checks that `hash` matches `^[a-fA-F0-9]{64}$`.
///
/// Used on issue and, on its own, whenever a hash is replaced.
pub fn validate_hash(hash: &str) -> Result<(), ContractError> {
    if hash.len() == SHA256_HEX_LEN && hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ContractError::InvalidHashFormat)
    }
}

/// Accepts ISO-8601 calendar dates and date-times, with or without seconds
/// and with or without an offset.
pub fn validate_issue_date(value: &str) -> Result<(), ContractError> {
    let value = value.trim();
    let parses = DateTime::parse_from_rfc3339(value).is_ok()
        || OFFSET_DATE_TIME_FORMATS
            .iter()
            .any(|fmt| DateTime::parse_from_str(value, fmt).is_ok())
        || LOCAL_DATE_TIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();

    if !value.is_empty() && parses {
        Ok(())
    } else {
        Err(ContractError::InvalidDateFormat(value.to_string()))
    }
}

fn require_field(name: &str, value: &str) -> Result<(), ContractError> {
    if value.trim().is_empty() {
        return Err(ContractError::InvalidData(format!("{} is required", name)));
    }
    Ok(())
}
