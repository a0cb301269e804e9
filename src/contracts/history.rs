// src/contracts/history.rs
//! Reconstruction of a certificate's version history from the ledger log.

use crate::blockchain::ledger::{ChaincodeStub, KeyModification, ScopedIterator};
use crate::contracts::errors::ContractError;
use crate::models::certificate::HistoryEntry;
use crate::utils::serialization::from_ledger_bytes;
use chrono::SecondsFormat;
use log::debug;

/// Collects every committed version of `id`, oldest first as the platform
/// orders them. The order is passed through untouched.
///
/// An id with no history yields an empty list; this is not an existence check.
///
/// # Errors
/// Ledger failures, or `InvalidData` if a stored snapshot does not decode.
/// The history iterator is closed on every path.
pub fn assemble_history<S: ChaincodeStub>(
    stub: &mut S,
    id: &str,
) -> Result<Vec<HistoryEntry>, ContractError> {
    let mut iter = ScopedIterator::new(stub.get_history_for_key(id)?);
    let mut entries = Vec::new();

    for item in iter.by_ref() {
        entries.push(to_entry(item?)?);
    }
    iter.close()?;

    debug!("assembled {} history entries for {}", entries.len(), id);
    Ok(entries)
}

fn to_entry(modification: KeyModification) -> Result<HistoryEntry, ContractError> {
    let value = match modification.value.as_deref() {
        Some(bytes) if !bytes.is_empty() => Some(from_ledger_bytes(bytes)?),
        _ => None,
    };

    Ok(HistoryEntry {
        tx_id: modification.tx_id,
        is_delete: modification.is_delete,
        timestamp: modification.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        value,
    })
}
