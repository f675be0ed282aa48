//! CDAO vocabulary surface.
//!
//! Concept and relation names as prefixed names, and [`Vocabulary`], the
//! same names expanded once through a [`NamespaceResolver`].

use oxigraph::model::NamedNode;

use crate::namespace::NamespaceResolver;
use crate::{Error, Result};

// Concepts
pub const ROOTED_TREE: &str = "cdao:RootedTree";
pub const ANCESTRAL_NODE: &str = "cdao:AncestralNode";
pub const TERMINAL_NODE: &str = "cdao:TerminalNode";
pub const TU: &str = "cdao:TU";
pub const DIRECTED_EDGE: &str = "cdao:Directed_Edge";
pub const EDGE_LENGTH: &str = "cdao:EdgeLength";

// Relations
pub const HAS_ROOT: &str = "cdao:has_root";
pub const HAS_PARENT: &str = "cdao:has_Parent";
pub const HAS_PARENT_NODE: &str = "cdao:has_Parent_Node";
pub const HAS_CHILD_NODE: &str = "cdao:has_Child_Node";
pub const BELONGS_TO_EDGE_AS_CHILD: &str = "cdao:belongs_to_Edge_as_Child";
pub const BELONGS_TO_EDGE_AS_PARENT: &str = "cdao:belongs_to_Edge_as_Parent";
pub const HAS_ANNOTATION: &str = "cdao:has_annotation";
pub const HAS_VALUE: &str = "cdao:has_value";
pub const REPRESENTS_TU: &str = "cdao:represents_TU";

// Generic
pub const TYPE: &str = "rdf:type";
pub const LABEL: &str = "rdf:label";
pub const ONTOLOGY: &str = "owl:Ontology";

/// Vocabulary terms expanded to full IRIs.
///
/// Resolution fails when a prefix is not registered or a name expands to
/// something that is not an absolute IRI.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub rooted_tree: NamedNode,
    pub ancestral_node: NamedNode,
    pub terminal_node: NamedNode,
    pub tu: NamedNode,
    pub directed_edge: NamedNode,
    pub edge_length: NamedNode,
    pub has_root: NamedNode,
    pub has_parent: NamedNode,
    pub has_parent_node: NamedNode,
    pub has_child_node: NamedNode,
    pub belongs_to_edge_as_child: NamedNode,
    pub belongs_to_edge_as_parent: NamedNode,
    pub has_annotation: NamedNode,
    pub has_value: NamedNode,
    pub represents_tu: NamedNode,
    pub rdf_type: NamedNode,
    pub label: NamedNode,
    pub ontology: NamedNode,
}

impl Vocabulary {
    pub fn resolve(ns: &NamespaceResolver) -> Result<Self> {
        let t = |name: &str| -> Result<NamedNode> {
            if let Some((prefix, _)) = name.split_once(':') {
                ns.require(prefix)?;
            }
            let iri = ns.expand(name)?;
            NamedNode::new(iri.as_str()).map_err(|e| {
                Error::ConfigurationError(format!("'{name}' expands to invalid IRI <{iri}>: {e}"))
            })
        };
        Ok(Self {
            rooted_tree: t(ROOTED_TREE)?,
            ancestral_node: t(ANCESTRAL_NODE)?,
            terminal_node: t(TERMINAL_NODE)?,
            tu: t(TU)?,
            directed_edge: t(DIRECTED_EDGE)?,
            edge_length: t(EDGE_LENGTH)?,
            has_root: t(HAS_ROOT)?,
            has_parent: t(HAS_PARENT)?,
            has_parent_node: t(HAS_PARENT_NODE)?,
            has_child_node: t(HAS_CHILD_NODE)?,
            belongs_to_edge_as_child: t(BELONGS_TO_EDGE_AS_CHILD)?,
            belongs_to_edge_as_parent: t(BELONGS_TO_EDGE_AS_PARENT)?,
            has_annotation: t(HAS_ANNOTATION)?,
            has_value: t(HAS_VALUE)?,
            represents_tu: t(REPRESENTS_TU)?,
            rdf_type: t(TYPE)?,
            label: t(LABEL)?,
            ontology: t(ONTOLOGY)?,
        })
    }
}
