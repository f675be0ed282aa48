//! In-memory graph store.
//!
//! This is the reference implementation of `GraphStore`, an adapter over
//! an in-memory `oxigraph::store::Store`. SPARQL evaluation is oxigraph's.
//!
//! ## Transactions
//!
//! - A transaction buffers its appends. `commit_tx()` hands the buffer to
//!   `Store::extend`, which applies it atomically, so readers observe all
//!   of it or none of it.
//! - `rollback_tx()`, or dropping the transaction, discards the buffer.
//! - With [`StoreKind::File`] the whole graph is rewritten as N-Triples
//!   after every commit (write to a temporary file, then rename).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use oxigraph::model::{GraphName, Triple};
use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::{StorageError, Store};
use parking_lot::Mutex;

use crate::namespace::NamespaceResolver;
use crate::syntax::{self, GraphSyntax};
use crate::tx::{Transaction, TxId, TxMode};
use crate::{Error, Result};
use super::{GraphStore, QueryResult, ResultRow, StoreConfig, StoreKind, ensure_writable};

fn storage_error(e: StorageError) -> Error {
    Error::StoreError(e.to_string())
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory statement store. Clones share the same graph.
#[derive(Clone)]
pub struct MemoryStore {
    store: Store,
    config: StoreConfig,
    next_tx_id: Arc<AtomicU64>,
    /// Serializes snapshot rewrites.
    sync_lock: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Result<Self> {
        Self::with_config(StoreConfig::memory())
    }

    fn with_config(config: StoreConfig) -> Result<Self> {
        Ok(Self {
            store: Store::new().map_err(storage_error)?,
            config,
            next_tx_id: Arc::new(AtomicU64::new(1)),
            sync_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Open a store from configuration.
    ///
    /// A `File` store reads its snapshot unless `new` is set or the file
    /// does not exist yet.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let store = Self::with_config(config.clone())?;
        if config.kind == StoreKind::File {
            let path = store.snapshot_path()?;
            if !config.new && path.exists() {
                let bytes = fs::read(path).map_err(|e| {
                    Error::StoreError(format!("cannot read {}: {e}", path.display()))
                })?;
                let statements = syntax::parse(&bytes, GraphSyntax::NTriples, None)?;
                store.extend(statements)?;
            }
        }
        tracing::debug!(
            identifier = %config.identifier,
            kind = ?config.kind,
            statements = store.statement_count()?,
            "store opened"
        );
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The underlying oxigraph store.
    pub fn inner(&self) -> &Store {
        &self.store
    }

    /// Rewrite the snapshot file. No-op for memory stores.
    pub fn sync(&self) -> Result<()> {
        if self.config.kind != StoreKind::File {
            return Ok(());
        }
        let path = self.snapshot_path()?;
        let _guard = self.sync_lock.lock();
        let bytes = syntax::serialize(&self.statements()?, GraphSyntax::NTriples, &NamespaceResolver::empty())?;
        write_atomically(path, &bytes)
            .map_err(|e| Error::StoreError(format!("cannot write {}: {e}", path.display())))
    }

    fn extend(&self, statements: Vec<Triple>) -> Result<()> {
        self.store
            .extend(statements.into_iter().map(|t| t.in_graph(GraphName::DefaultGraph)))
            .map_err(storage_error)
    }

    fn snapshot_path(&self) -> Result<&Path> {
        self.config.location.as_deref().ok_or_else(|| {
            Error::ConfigurationError(format!(
                "file store '{}' has no location",
                self.config.identifier
            ))
        })
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = PathBuf::from(path);
    tmp.as_mut_os_string().push(".tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

// ============================================================================
// MemoryTx
// ============================================================================

/// In-memory transaction: a buffer of statements awaiting commit.
pub struct MemoryTx {
    id: TxId,
    mode: TxMode,
    pending: Vec<Triple>,
}

impl Transaction for MemoryTx {
    fn mode(&self) -> TxMode { self.mode }
    fn id(&self) -> TxId { self.id }
    fn pending(&self) -> usize { self.pending.len() }
}

// ============================================================================
// GraphStore impl
// ============================================================================

impl GraphStore for MemoryStore {
    type Tx = MemoryTx;

    fn begin_tx(&self, mode: TxMode) -> Result<MemoryTx> {
        let id = TxId(self.next_tx_id.fetch_add(1, Ordering::Relaxed));
        tracing::trace!(tx = %id, ?mode, "begin");
        Ok(MemoryTx { id, mode, pending: Vec::new() })
    }

    fn commit_tx(&self, tx: MemoryTx) -> Result<()> {
        let buffered = tx.pending.len();
        tracing::trace!(tx = %tx.id, buffered, "commit");
        if buffered == 0 {
            return Ok(());
        }
        self.extend(tx.pending)?;
        self.sync()
    }

    fn rollback_tx(&self, tx: MemoryTx) -> Result<()> {
        tracing::trace!(tx = %tx.id, discarded = tx.pending.len(), "rollback");
        Ok(())
    }

    fn append(&self, tx: &mut MemoryTx, statement: Triple) -> Result<()> {
        ensure_writable(tx)?;
        tx.pending.push(statement);
        Ok(())
    }

    fn query(&self, query: &str) -> Result<QueryResult> {
        let results = SparqlEvaluator::new()
            .parse_query(query)
            .map_err(|e| Error::QueryError(e.to_string()))?
            .on_store(&self.store)
            .execute()
            .map_err(|e| Error::ExecutionError(e.to_string()))?;

        match results {
            QueryResults::Solutions(solutions) => {
                let variables = solutions.variables().iter().map(|v| v.as_str().to_owned()).collect();
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| Error::ExecutionError(e.to_string()))?;
                    rows.push(ResultRow::from(solution));
                }
                Ok(QueryResult { variables, rows })
            }
            QueryResults::Boolean(_) => {
                Err(Error::ExecutionError("expected a SELECT query, got ASK".into()))
            }
            QueryResults::Graph(_) => {
                Err(Error::ExecutionError("expected a SELECT query, got CONSTRUCT".into()))
            }
        }
    }

    fn statements(&self) -> Result<Vec<Triple>> {
        self.store
            .iter()
            .map(|quad| quad.map(Triple::from).map_err(storage_error))
            .collect()
    }

    fn statement_count(&self) -> Result<usize> {
        self.store.len().map_err(storage_error)
    }
}
