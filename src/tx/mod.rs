//! Mutation scopes.
//!
//! Every append happens inside a transaction obtained from
//! [`GraphStore::begin_tx`](crate::storage::GraphStore::begin_tx); nothing
//! it appended is visible to readers until it is committed.

use serde::{Deserialize, Serialize};

/// Transaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// Opaque transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub u64);

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction trait that all stores must implement.
pub trait Transaction {
    fn mode(&self) -> TxMode;
    fn id(&self) -> TxId;

    /// Statements appended but not yet committed.
    fn pending(&self) -> usize;
}
