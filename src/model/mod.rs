//! # Data Model
//!
//! The phylogeny side of the mapping: trees, clades and their Newick
//! rendering. The graph side uses oxigraph's RDF model directly.
//!
//! Design rule: this module is pure data: no I/O, no store access.

pub mod tree;
pub mod newick;

pub use tree::{Clade, CladeIter, Tree};
