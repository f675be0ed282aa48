//! # cdao-rs: Phylogenetic Trees as CDAO Graphs
//!
//! Converts rooted, labeled trees with branch lengths into RDF statements
//! using the CDAO vocabulary, and rebuilds trees from any graph holding
//! those statements.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphStore` is the contract between the mapping and storage
//! 2. **Clean DTOs**: `Tree` and `Clade` on one side, oxigraph `Triple`s on the other
//! 3. **Store does the RDF**: SPARQL evaluation and Turtle I/O belong to oxigraph
//! 4. **No ambient state**: counters, namespaces and stores are passed explicitly
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cdao_rs::{Tree, WriteOptions, ReadOptions};
//!
//! # fn example() -> cdao_rs::Result<()> {
//! let tree: Tree = "((A:1.0,B:2.0)AB:0.5,C:3.0);".parse()?;
//!
//! let (bytes, written) = cdao_rs::to_graph([&tree], &WriteOptions::default())?;
//! assert_eq!(written, 1);
//!
//! for tree in cdao_rs::from_graph(&bytes, &ReadOptions::default())? {
//!     println!("{}", tree?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Backends
//!
//! | Backend | Config | Description |
//! |---------|--------|-------------|
//! | Memory | `StoreKind::Memory` | In-memory oxigraph store for parsing/serializing |
//! | File | `StoreKind::File` | In-memory oxigraph store mirrored to an N-Triples snapshot |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod namespace;
pub mod vocab;
pub mod storage;
pub mod syntax;
pub mod tx;
pub mod decompose;
pub mod reconstruct;
pub mod mapping;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{Clade, Tree};
pub use oxigraph::model::{Literal, NamedNode, Term, Triple};

// ============================================================================
// Re-exports: Namespaces and storage
// ============================================================================

pub use namespace::NamespaceResolver;
pub use storage::{GraphStore, MemoryStore, StoreConfig, StoreKind};
pub use syntax::GraphSyntax;
pub use tx::{Transaction, TxId, TxMode};

// ============================================================================
// Re-exports: Query results
// ============================================================================

pub use storage::{QueryResult, ResultRow};

// ============================================================================
// Re-exports: Mapping
// ============================================================================

pub use decompose::{IdCounters, TreeDecomposer};
pub use reconstruct::{GraphReconstructor, NodeInfo, Trees};
pub use mapping::{
    CdaoParser, CdaoWriter, DEFAULT_BASE_IRI, ReadOptions, WriteOptions, WriteSummary,
    base_iri_for_path, from_graph, from_path, parse, to_graph, write,
};

// ============================================================================
// Error Types
// ============================================================================

/// Reconstruction phase in which a consistency failure was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collecting labels, branch lengths and parent links for every node.
    NodeInfo,
    /// Building trees from their roots.
    TreeAssembly,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::NodeInfo => f.write_str("node info collection"),
            Phase::TreeAssembly => f.write_str("tree assembly"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Transaction error: {0}")]
    TxError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("RDF syntax error: {0}")]
    RdfSyntax(#[from] oxigraph::io::RdfParseError),

    #[error("Graph consistency error during {phase} at <{node}>: {message}")]
    GraphConsistency { phase: Phase, node: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
