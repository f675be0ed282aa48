//! # Namespace Resolver
//!
//! Expands prefixed names (`cdao:TerminalNode`) into full IRIs and mints
//! document-local IRIs from a base identifier. The same table supplies the
//! `@prefix` bindings written into Turtle output. The prefix table is data,
//! not code: callers extend it with [`NamespaceResolver::with_prefix`] or
//! load it from JSON.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const CDAO: &str = "http://purl.obolibrary.org/obo/cdao.owl#";
pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const OWL: &str = "http://www.w3.org/2002/07/owl#";

/// One prefix binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub prefix: String,
    pub iri: String,
}

/// Ordered prefix table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceResolver {
    namespaces: Vec<Namespace>,
}

impl Default for NamespaceResolver {
    /// The `cdao`, `rdf` and `owl` namespaces.
    fn default() -> Self {
        Self::empty()
            .with_prefix("cdao", CDAO)
            .with_prefix("rdf", RDF)
            .with_prefix("owl", OWL)
    }
}

impl NamespaceResolver {
    pub fn empty() -> Self {
        Self { namespaces: Vec::new() }
    }

    /// Load a table from a JSON array of `{"prefix": .., "iri": ..}` objects.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add or replace a binding.
    pub fn with_prefix(mut self, prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        self.insert(prefix, iri);
        self
    }

    pub fn insert(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        let prefix = prefix.into();
        let iri = iri.into();
        match self.namespaces.iter_mut().find(|ns| ns.prefix == prefix) {
            Some(ns) => ns.iri = iri,
            None => self.namespaces.push(Namespace { prefix, iri }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// IRI bound to `prefix`.
    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.namespaces.iter().find(|ns| ns.prefix == prefix).map(|ns| ns.iri.as_str())
    }

    /// Like [`namespace`](Self::namespace) but a missing binding is a configuration error.
    pub fn require(&self, prefix: &str) -> Result<&str> {
        self.namespace(prefix).ok_or_else(|| {
            Error::ConfigurationError(format!("namespace prefix '{prefix}' is not registered"))
        })
    }

    /// Expand a prefixed name to a full IRI.
    ///
    /// Unknown prefixes are left as-is. Fails only when the table is empty.
    pub fn expand(&self, name: &str) -> Result<String> {
        if self.namespaces.is_empty() {
            return Err(Error::ConfigurationError("namespace table is empty".into()));
        }
        if let Some((prefix, local)) = name.split_once(':') {
            if let Some(iri) = self.namespace(prefix) {
                return Ok(format!("{iri}{local}"));
            }
        }
        Ok(name.to_string())
    }

    /// Mint a document-local IRI. No validation is performed.
    pub fn local(base: &str, name: &str) -> String {
        format!("{base}{name}")
    }
}
