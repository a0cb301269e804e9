// src/storage/memory_ledger.rs
//! In-memory ledger for local runs and tests.
//!
//! Simulates the slice of the ledger platform the certificate contract
//! consumes:
//! - world state with per-key versions
//! - an append-only version log per key
//! - equality queries through declared secondary indexes
//! - one committed event per transaction
//!
//! Transactions buffer their writes and record the version of every key they
//! read. `commit` re-checks those versions (MVCC) and either applies the whole
//! write set or rejects the transaction. A transaction that is dropped without
//! being committed leaves no trace.
//!
//! # Note
//! Nothing is persisted; state lives as long as the last `MemoryLedger` clone.

use crate::blockchain::ledger::{
    ChaincodeStub, CommitReceipt, IndexRef, KeyModification, KeyValue, LedgerError, LedgerNetwork,
    RichQuery, StateIterator,
};
use crate::contracts::query::StudentQuery;
use crate::utils::crypto::digest_document;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// An event published by a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChaincodeEvent {
    pub tx_id: String,
    pub name: String,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
struct VersionedValue {
    value: Vec<u8>,
    /// Block height of the commit that wrote the value
    version: u64,
}

#[derive(Debug, Default)]
struct WorldState {
    state: BTreeMap<String, VersionedValue>,
    history: HashMap<String, Vec<KeyModification>>,
    events: Vec<ChaincodeEvent>,
    indexes: HashSet<IndexRef>,
    block_height: u64,
    tx_counter: u64,
}

/// Shared handle to an in-memory ledger. Clones see the same state.
#[derive(Clone)]
pub struct MemoryLedger {
    world: Arc<Mutex<WorldState>>,
    open_iterators: Arc<AtomicUsize>,
}

impl MemoryLedger {
    /// Creates an empty ledger with the certificate contract's student index
    /// installed, as the platform does when the chaincode package is deployed.
    pub fn new() -> Self {
        Self::with_indexes([StudentQuery::default().index().clone()])
    }

    /// Creates an empty ledger with exactly the given indexes declared.
    pub fn with_indexes(indexes: impl IntoIterator<Item = IndexRef>) -> Self {
        let world = WorldState {
            indexes: indexes.into_iter().collect(),
            ..WorldState::default()
        };
        Self {
            world: Arc::new(Mutex::new(world)),
            open_iterators: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Declares an additional secondary index.
    ///
    /// Embedders call this at startup for indexes the deployment configures
    /// beyond the default one.
    pub fn declare_index(&self, index: IndexRef) -> Result<(), LedgerError> {
        debug!("declaring index {}/{}", index.design_doc, index.name);
        self.world()?.indexes.insert(index);
        Ok(())
    }

    /// Events published so far, in commit order.
    pub fn events(&self) -> Vec<ChaincodeEvent> {
        self.world().map(|w| w.events.clone()).unwrap_or_default()
    }

    /// Number of history/query iterators handed out and not yet closed.
    pub fn open_iterators(&self) -> usize {
        self.open_iterators.load(Ordering::SeqCst)
    }

    /// Number of committed transactions.
    pub fn block_height(&self) -> u64 {
        self.world().map(|w| w.block_height).unwrap_or_default()
    }

    fn world(&self) -> Result<MutexGuard<'_, WorldState>, LedgerError> {
        lock_world(&self.world)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_world(world: &Mutex<WorldState>) -> Result<MutexGuard<'_, WorldState>, LedgerError> {
    world
        .lock()
        .map_err(|_| LedgerError::Unavailable("world state lock poisoned".into()))
}

impl LedgerNetwork for MemoryLedger {
    type Stub = MemoryTransaction;

    fn begin(&self) -> Result<MemoryTransaction, LedgerError> {
        let timestamp = Utc::now();
        let counter = {
            let mut world = self.world()?;
            world.tx_counter += 1;
            world.tx_counter
        };
        let seed = format!("{}:{}", counter, timestamp.timestamp_nanos_opt().unwrap_or_default());

        Ok(MemoryTransaction {
            world: self.world.clone(),
            open_iterators: self.open_iterators.clone(),
            tx_id: digest_document(seed.as_bytes()),
            timestamp,
            read_set: BTreeMap::new(),
            write_set: BTreeMap::new(),
            event: None,
        })
    }

    fn commit(&self, tx: MemoryTransaction) -> Result<CommitReceipt, LedgerError> {
        if !Arc::ptr_eq(&self.world, &tx.world) {
            return Err(LedgerError::Unavailable(format!(
                "transaction {} belongs to another ledger",
                tx.tx_id
            )));
        }

        let mut world = self.world()?;
        for (key, seen) in &tx.read_set {
            let current = world.state.get(key).map(|v| v.version);
            if current != *seen {
                warn!("tx {} rejected: key {} changed since it was read", tx.tx_id, key);
                return Err(LedgerError::MvccReadConflict { key: key.clone() });
            }
        }

        world.block_height += 1;
        let height = world.block_height;
        let writes = tx.write_set.len();

        for (key, value) in tx.write_set {
            world.history.entry(key.clone()).or_default().push(KeyModification {
                tx_id: tx.tx_id.clone(),
                timestamp: tx.timestamp,
                is_delete: false,
                value: Some(value.clone()),
            });
            world.state.insert(key, VersionedValue { value, version: height });
        }

        if let Some((name, payload)) = tx.event {
            world.events.push(ChaincodeEvent {
                tx_id: tx.tx_id.clone(),
                name,
                payload,
            });
        }

        info!("committed tx {} at height {} ({} writes)", tx.tx_id, height, writes);
        Ok(CommitReceipt {
            tx_id: tx.tx_id,
            block_height: height,
        })
    }
}

/// One open transaction against a [`MemoryLedger`].
pub struct MemoryTransaction {
    world: Arc<Mutex<WorldState>>,
    open_iterators: Arc<AtomicUsize>,
    tx_id: String,
    timestamp: DateTime<Utc>,
    read_set: BTreeMap<String, Option<u64>>,
    write_set: BTreeMap<String, Vec<u8>>,
    event: Option<(String, Vec<u8>)>,
}

impl ChaincodeStub for MemoryTransaction {
    type HistoryIter = MemoryIterator<KeyModification>;
    type QueryIter = MemoryIterator<KeyValue>;

    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn tx_timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        let world = lock_world(&self.world)?;
        let entry = world.state.get(key);
        self.read_set
            .entry(key.to_string())
            .or_insert_with(|| entry.map(|v| v.version));
        Ok(entry.map(|v| v.value.clone()))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        self.write_set.insert(key.to_string(), value);
        Ok(())
    }

    fn get_history_for_key(&mut self, key: &str) -> Result<Self::HistoryIter, LedgerError> {
        let items = lock_world(&self.world)?
            .history
            .get(key)
            .cloned()
            .unwrap_or_default();
        Ok(MemoryIterator::open(items, &self.open_iterators))
    }

    fn get_query_result(&mut self, query: &RichQuery) -> Result<Self::QueryIter, LedgerError> {
        let world = lock_world(&self.world)?;
        if !world.indexes.contains(&query.use_index) {
            return Err(LedgerError::IndexNotDeclared {
                design_doc: query.use_index.design_doc.clone(),
                name: query.use_index.name.clone(),
            });
        }

        let rows: Vec<KeyValue> = world
            .state
            .iter()
            .filter(|(_, v)| selector_matches(query, &v.value))
            .map(|(key, v)| KeyValue {
                key: key.clone(),
                value: v.value.clone(),
            })
            .collect();
        drop(world);

        Ok(MemoryIterator::open(rows, &self.open_iterators))
    }

    fn set_event(&mut self, name: &str, payload: Vec<u8>) -> Result<(), LedgerError> {
        self.event = Some((name.to_string(), payload));
        Ok(())
    }
}

/// Equality match of every selector field against a stored JSON document.
/// Values that are not JSON objects never match.
fn selector_matches(query: &RichQuery, raw: &[u8]) -> bool {
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(doc)) => query
            .selector
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected)),
        _ => false,
    }
}

/// Snapshot iterator over history or query results.
pub struct MemoryIterator<T> {
    items: VecDeque<T>,
    open: Option<Arc<AtomicUsize>>,
}

impl<T> MemoryIterator<T> {
    fn open(items: Vec<T>, counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            items: items.into(),
            open: Some(counter.clone()),
        }
    }
}

impl<T> Iterator for MemoryIterator<T> {
    type Item = Result<T, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.open.is_none() {
            return Some(Err(LedgerError::IteratorClosed));
        }
        self.items.pop_front().map(Ok)
    }
}

impl<T> StateIterator<T> for MemoryIterator<T> {
    fn close(&mut self) -> Result<(), LedgerError> {
        match self.open.take() {
            Some(counter) => {
                counter.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(LedgerError::IteratorClosed),
        }
    }
}
