// src/blockchain/ledger.rs
//! Ledger access contract consumed by the certificate chaincode.
//!
//! The ledger platform (consensus, MVCC, persistence, rich-query engine) is an
//! external collaborator. This module pins down the narrow capability the
//! contract relies on:
//! - `get`/`put` by key within one invocation's read/write set
//! - ordered history iteration for a key
//! - equality queries through a pre-declared secondary index
//! - event emission
//!
//! Iteration results are finite, forward-only and must be closed. Wrap them in
//! [`ScopedIterator`] so they are closed exactly once on every exit path.

use chrono::{DateTime, Utc};
use log::warn;
use serde_json::{json, Map, Value};
use std::marker::PhantomData;
use thiserror::Error;

/// Failures reported by the ledger platform.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The platform could not serve the request.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// A key read by the transaction was committed by someone else first.
    #[error("MVCC read conflict on key '{key}'")]
    MvccReadConflict { key: String },

    /// The rich query names an index the platform does not know.
    #[error("index '{design_doc}/{name}' is not declared")]
    IndexNotDeclared { design_doc: String, name: String },

    /// An iterator was used after being closed.
    #[error("iterator already closed")]
    IteratorClosed,
}

/// One entry of a key's version log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyModification {
    pub tx_id: String,
    pub timestamp: DateTime<Utc>,
    pub is_delete: bool,
    pub value: Option<Vec<u8>>,
}

/// One row of a rich-query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// Reference to a secondary index declared on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexRef {
    /// Design document holding the index
    /// Example: "_design/indexAlumnoDoc"
    pub design_doc: String,
    /// Index name within the design document
    /// Example: "indexAlumno"
    pub name: String,
}

impl IndexRef {
    pub fn new(design_doc: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            design_doc: design_doc.into(),
            name: name.into(),
        }
    }
}

/// An equality-only selector bound to a secondary index.
#[derive(Debug, Clone, PartialEq)]
pub struct RichQuery {
    pub selector: Map<String, Value>,
    pub use_index: IndexRef,
}

impl RichQuery {
    /// Builds a selector matching documents whose `field` equals `value`.
    pub fn field_equals(field: &str, value: impl Into<Value>, use_index: IndexRef) -> Self {
        let mut selector = Map::new();
        selector.insert(field.to_string(), value.into());
        Self { selector, use_index }
    }

    /// Renders the query in the platform's JSON query language.
    ///
    /// # Example
    /// ```text
    /// {"selector":{"alumno":"Ana"},"use_index":["_design/indexAlumnoDoc","indexAlumno"]}
    /// ```
    pub fn to_json(&self) -> Value {
        json!({
            "selector": self.selector,
            "use_index": [self.use_index.design_doc, self.use_index.name],
        })
    }
}

/// A finite, forward-only sequence handed out by the ledger.
///
/// `close` releases the platform-side resource. It must be called exactly
/// once, whether or not the sequence was exhausted.
pub trait StateIterator<T>: Iterator<Item = Result<T, LedgerError>> {
    fn close(&mut self) -> Result<(), LedgerError>;
}

/// Per-invocation view of the ledger.
///
/// Reads and writes are scoped to one transaction; the platform commits the
/// write set atomically or discards it. Implementations must not let a
/// transaction observe its own uncommitted writes through `get_state`.
pub trait ChaincodeStub {
    type HistoryIter: StateIterator<KeyModification>;
    type QueryIter: StateIterator<KeyValue>;

    /// Identifier assigned to the current transaction.
    fn tx_id(&self) -> &str;

    /// Timestamp the client proposed for the current transaction.
    fn tx_timestamp(&self) -> DateTime<Utc>;

    /// Reads the committed value of `key`. `None` if the key was never written.
    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Adds `key = value` to the transaction's write set.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    /// Opens the version log of `key`, in the platform's native commit order.
    fn get_history_for_key(&mut self, key: &str) -> Result<Self::HistoryIter, LedgerError>;

    /// Runs an equality query through a declared secondary index.
    fn get_query_result(&mut self, query: &RichQuery) -> Result<Self::QueryIter, LedgerError>;

    /// Sets the event published when the transaction commits.
    fn set_event(&mut self, name: &str, payload: Vec<u8>) -> Result<(), LedgerError>;
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub tx_id: String,
    pub block_height: u64,
}

/// Entry point to a ledger network: opens transactions and commits them.
///
/// Gateways use this to run one contract invocation per transaction.
/// Dropping a stub without committing discards its write set.
pub trait LedgerNetwork: Send + Sync {
    type Stub: ChaincodeStub;

    fn begin(&self) -> Result<Self::Stub, LedgerError>;

    fn commit(&self, stub: Self::Stub) -> Result<CommitReceipt, LedgerError>;
}

/// Owns a [`StateIterator`] and guarantees it is closed exactly once.
///
/// Call [`ScopedIterator::close`] on the success path to surface close
/// failures. Any other exit (early return, `?`, panic unwinding) closes the
/// iterator on drop and logs a close failure instead of propagating it.
pub struct ScopedIterator<T, I: StateIterator<T>> {
    inner: I,
    closed: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T, I: StateIterator<T>> ScopedIterator<T, I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            closed: false,
            _item: PhantomData,
        }
    }

    pub fn close(mut self) -> Result<(), LedgerError> {
        self.closed = true;
        self.inner.close()
    }
}

impl<T, I: StateIterator<T>> Iterator for ScopedIterator<T, I> {
    type Item = Result<T, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.inner.next()
    }
}

impl<T, I: StateIterator<T>> Drop for ScopedIterator<T, I> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(err) = self.inner.close() {
                warn!("failed to close ledger iterator: {}", err);
            }
        }
    }
}
