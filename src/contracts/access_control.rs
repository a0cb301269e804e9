// src/contracts/access_control.rs
//! Single-writer authorization for mutating operations.

use crate::contracts::errors::ContractError;
use crate::models::identity::ClientIdentity;
use log::warn;

/// MSP id of the university registrar on the reference network.
pub const DEFAULT_REGISTRAR_MSP: &str = "Org1MSP";

/// Admits only callers whose MSP id equals the configured registrar.
///
/// Applied to issue, revoke and hash-update. Reads are never guarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrarGuard {
    registrar_msp: String,
}

impl RegistrarGuard {
    pub fn new(registrar_msp: impl Into<String>) -> Self {
        Self {
            registrar_msp: registrar_msp.into(),
        }
    }

    pub fn registrar_msp(&self) -> &str {
        &self.registrar_msp
    }

    /// Fails with `Unauthorized` unless `caller` belongs to the registrar MSP.
    pub fn assert_registrar(&self, caller: &ClientIdentity) -> Result<(), ContractError> {
        if caller.msp_id != self.registrar_msp {
            warn!(
                "rejected mutation from {} ({}), registrar is {}",
                caller.id, caller.msp_id, self.registrar_msp
            );
            return Err(ContractError::Unauthorized {
                required: self.registrar_msp.clone(),
                actual: caller.msp_id.clone(),
            });
        }
        Ok(())
    }
}

impl Default for RegistrarGuard {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRAR_MSP)
    }
}
