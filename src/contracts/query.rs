// src/contracts/query.rs
//! Student lookup through the ledger's secondary index.

use crate::blockchain::ledger::{ChaincodeStub, IndexRef, RichQuery, ScopedIterator};
use crate::contracts::errors::ContractError;
use crate::models::certificate::Certificate;
use crate::utils::serialization::from_ledger_bytes;
use log::debug;

pub const DEFAULT_INDEX_DESIGN_DOC: &str = "_design/indexAlumnoDoc";
pub const DEFAULT_INDEX_NAME: &str = "indexAlumno";

/// Translates a student identifier into an equality query on `alumno`.
///
/// The index must be declared on the platform beforehand; its definition is
/// not managed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentQuery {
    index: IndexRef,
}

impl StudentQuery {
    pub fn new(index: IndexRef) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &IndexRef {
        &self.index
    }

    /// Exact match on `alumno`. No trimming, case folding or partial matching.
    pub fn selector_for(&self, alumno: &str) -> RichQuery {
        RichQuery::field_equals("alumno", alumno, self.index.clone())
    }

    /// Runs the lookup and materializes every match.
    ///
    /// Results are unbounded and unordered.
    ///
    /// # Errors
    /// Ledger failures, or `InvalidData` if a matched value does not decode.
    /// The query iterator is closed on every path.
    pub fn run<S: ChaincodeStub>(
        &self,
        stub: &mut S,
        alumno: &str,
    ) -> Result<Vec<Certificate>, ContractError> {
        let query = self.selector_for(alumno);
        let mut iter = ScopedIterator::new(stub.get_query_result(&query)?);
        let mut results = Vec::new();

        for row in iter.by_ref() {
            results.push(from_ledger_bytes::<Certificate>(&row?.value)?);
        }
        iter.close()?;

        debug!("query {} matched {} certificates", query.to_json(), results.len());
        Ok(results)
    }
}

impl Default for StudentQuery {
    fn default() -> Self {
        Self::new(IndexRef::new(DEFAULT_INDEX_DESIGN_DOC, DEFAULT_INDEX_NAME))
    }
}
