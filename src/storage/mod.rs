//! # Graph Store Trait
//!
//! This is the contract between the tree mapper and any statement store.
//! The decomposer only appends; the reconstructor only queries.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | oxigraph in-memory store, optional N-Triples snapshot file |

pub mod memory;

use std::path::PathBuf;

use oxigraph::model::{Term, Triple};
use oxigraph::sparql::QuerySolution;
use serde::{Deserialize, Serialize};

use crate::namespace::NamespaceResolver;
use crate::syntax::{self, GraphSyntax};
use crate::tx::{Transaction, TxMode};
use crate::{Error, Result};

pub use memory::MemoryStore;

// ============================================================================
// Store Configuration
// ============================================================================

/// Where a store keeps its statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// In-memory (no persistence)
    #[default]
    Memory,
    /// In-memory with an N-Triples snapshot rewritten on every commit
    File,
}

/// Configuration for opening a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Name of the graph, used in log output.
    pub identifier: String,
    /// Snapshot path, required for [`StoreKind::File`].
    pub location: Option<PathBuf>,
    /// Start empty even if the snapshot already exists.
    pub new: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            identifier: "cdao".into(),
            location: None,
            new: true,
        }
    }
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn file(location: impl Into<PathBuf>) -> Self {
        Self {
            kind: StoreKind::File,
            location: Some(location.into()),
            new: false,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// GraphStore Trait
// ============================================================================

/// The statement store contract.
///
/// Writes go through a transaction and become visible on commit. Reads see
/// committed statements only.
pub trait GraphStore {
    /// The transaction type for this store.
    type Tx: Transaction;

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Begin a new transaction.
    fn begin_tx(&self, mode: TxMode) -> Result<Self::Tx>;

    /// Commit a transaction, publishing everything it appended at once.
    fn commit_tx(&self, tx: Self::Tx) -> Result<()>;

    /// Roll back a transaction, discarding everything it appended.
    fn rollback_tx(&self, tx: Self::Tx) -> Result<()>;

    // ========================================================================
    // Statements
    // ========================================================================

    /// Append a statement. Re-appending an existing statement is a no-op.
    fn append(&self, tx: &mut Self::Tx, statement: Triple) -> Result<()>;

    /// Evaluate a SPARQL SELECT query over committed statements.
    fn query(&self, query: &str) -> Result<QueryResult>;

    /// Every committed statement.
    fn statements(&self) -> Result<Vec<Triple>>;

    /// Number of committed statements.
    fn statement_count(&self) -> Result<usize>;

    // ========================================================================
    // Provided
    // ========================================================================

    /// Parse a serialized graph and append it in one transaction.
    ///
    /// Returns the number of statements read. Nothing is kept on failure.
    fn load(&self, bytes: &[u8], syntax: GraphSyntax, base: Option<&str>) -> Result<usize> {
        let statements = syntax::parse(bytes, syntax, base)?;
        let count = statements.len();
        let mut tx = self.begin_tx(TxMode::ReadWrite)?;
        for statement in statements {
            if let Err(e) = self.append(&mut tx, statement) {
                self.rollback_tx(tx)?;
                return Err(e);
            }
        }
        self.commit_tx(tx)?;
        tracing::debug!(statements = count, ?syntax, "graph loaded");
        Ok(count)
    }

    /// Serialize every committed statement.
    fn dump(&self, syntax: GraphSyntax, namespaces: &NamespaceResolver) -> Result<Vec<u8>> {
        let statements = self.statements()?;
        syntax::serialize(&statements, syntax, namespaces)
    }
}

// ============================================================================
// Query Results
// ============================================================================

/// Solutions of a SELECT query, in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub variables: Vec<String>,
    pub rows: Vec<ResultRow>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultRow> {
        self.rows.iter()
    }

    /// SPARQL 1.1 JSON results document.
    pub fn to_json(&self) -> serde_json::Value {
        let bindings: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut object = serde_json::Map::new();
                for var in &self.variables {
                    if let Some(term) = row.get(var) {
                        object.insert(var.clone(), term_to_json(term));
                    }
                }
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::json!({
            "head": { "vars": self.variables },
            "results": { "bindings": bindings },
        })
    }
}

impl IntoIterator for QueryResult {
    type Item = ResultRow;
    type IntoIter = std::vec::IntoIter<ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a ResultRow;
    type IntoIter = std::slice::Iter<'a, ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn term_to_json(term: &Term) -> serde_json::Value {
    match term {
        Term::NamedNode(n) => serde_json::json!({ "type": "uri", "value": n.as_str() }),
        Term::BlankNode(b) => serde_json::json!({ "type": "bnode", "value": b.as_str() }),
        Term::Literal(l) => {
            let mut value = serde_json::json!({ "type": "literal", "value": l.value() });
            if let Some(lang) = l.language() {
                value["xml:lang"] = lang.into();
            } else if l.datatype() != oxigraph::model::vocab::xsd::STRING {
                value["datatype"] = l.datatype().as_str().into();
            }
            value
        }
        #[allow(unreachable_patterns)]
        other => serde_json::json!({ "type": "triple", "value": other.to_string() }),
    }
}

/// One solution of a SELECT query.
#[derive(Debug)]
pub struct ResultRow(QuerySolution);

impl Clone for ResultRow {
    fn clone(&self) -> Self {
        Self(QuerySolution::from((
            self.0.variables().to_vec(),
            self.0.values().to_vec(),
        )))
    }
}

impl ResultRow {
    pub fn get(&self, var: &str) -> Option<&Term> {
        self.0.get(var)
    }

    /// A bound IRI, or a blank node as `_:id`.
    pub fn node(&self, var: &str) -> Option<String> {
        match self.get(var)? {
            Term::NamedNode(n) => Some(n.as_str().to_owned()),
            Term::BlankNode(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Lexical form of a bound literal.
    pub fn literal(&self, var: &str) -> Option<&str> {
        match self.get(var)? {
            Term::Literal(l) => Some(l.value()),
            _ => None,
        }
    }
}

impl From<QuerySolution> for ResultRow {
    fn from(solution: QuerySolution) -> Self {
        Self(solution)
    }
}

/// Reject writes through a read-only transaction.
pub(crate) fn ensure_writable<T: Transaction>(tx: &T) -> Result<()> {
    match tx.mode() {
        TxMode::ReadWrite => Ok(()),
        TxMode::ReadOnly => Err(Error::TxError(format!(
            "transaction {} is read-only",
            tx.id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = StoreConfig::from_json("{}").unwrap();
        assert_eq!(config, StoreConfig::memory());
        assert_eq!(config.identifier, "cdao");
    }

    #[test]
    fn test_config_file_from_json() {
        let config =
            StoreConfig::from_json(r#"{"kind": "file", "location": "/tmp/g.nt", "new": false}"#)
                .unwrap();
        assert_eq!(config.kind, StoreKind::File);
        assert_eq!(config.location, Some(PathBuf::from("/tmp/g.nt")));
        assert!(!config.new);
    }
}
