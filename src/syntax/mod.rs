//! # Graph Syntaxes
//!
//! Concrete syntaxes for serialized graphs. Parsing and serialization are
//! oxigraph's `RdfParser` / `RdfSerializer`; this module picks the format,
//! applies the base IRI and writes the prefix table into Turtle output.

use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::Triple;
use serde::{Deserialize, Serialize};

use crate::namespace::NamespaceResolver;
use crate::{Error, Result};

/// A serialization format for statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphSyntax {
    #[default]
    Turtle,
    NTriples,
}

impl GraphSyntax {
    /// Select a syntax by mime type.
    pub fn from_mime(mime: &str) -> Result<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        match essence.to_ascii_lowercase().as_str() {
            "text/turtle" | "application/x-turtle" => Ok(Self::Turtle),
            "application/n-triples" | "text/plain" => Ok(Self::NTriples),
            other => Err(Error::ConfigurationError(format!("unsupported graph syntax '{other}'"))),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Turtle => "text/turtle",
            Self::NTriples => "application/n-triples",
        }
    }

    pub fn format(self) -> RdfFormat {
        match self {
            Self::Turtle => RdfFormat::Turtle,
            Self::NTriples => RdfFormat::NTriples,
        }
    }
}

/// Parse a serialized graph.
///
/// Relative IRIs resolve against `base`; without one they are a syntax
/// error. An empty base counts as no base.
pub fn parse(bytes: &[u8], syntax: GraphSyntax, base: Option<&str>) -> Result<Vec<Triple>> {
    let mut parser = RdfParser::from_format(syntax.format());
    if let Some(base) = base.filter(|b| !b.is_empty()) {
        parser = parser.with_base_iri(base).map_err(|e| {
            Error::ConfigurationError(format!("invalid base IRI <{base}>: {e}"))
        })?;
    }
    let mut triples = Vec::new();
    for quad in parser.for_reader(bytes) {
        triples.push(Triple::from(quad?));
    }
    tracing::trace!(statements = triples.len(), ?syntax, "graph parsed");
    Ok(triples)
}

/// Serialize statements. Turtle output declares every namespace in the table.
pub fn serialize(
    triples: &[Triple],
    syntax: GraphSyntax,
    namespaces: &NamespaceResolver,
) -> Result<Vec<u8>> {
    let mut serializer = RdfSerializer::from_format(syntax.format());
    if syntax == GraphSyntax::Turtle {
        for ns in namespaces.iter() {
            serializer = serializer
                .with_prefix(ns.prefix.as_str(), ns.iri.as_str())
                .map_err(|e| {
                    Error::ConfigurationError(format!(
                        "prefix '{}' has invalid IRI <{}>: {e}",
                        ns.prefix, ns.iri
                    ))
                })?;
        }
    }
    let mut writer = serializer.for_writer(Vec::new());
    for triple in triples {
        writer.serialize_triple(triple)?;
    }
    Ok(writer.finish()?)
}
