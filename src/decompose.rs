//! # Tree Decomposer
//!
//! Walks a tree depth-first and yields the statements describing it in the
//! CDAO vocabulary. Each node's statements come before any of its
//! descendants'. Children follow in source order.
//!
//! The walk is lazy and iterative: an explicit stack replaces recursion,
//! so arbitrarily deep trees cannot overflow the call stack.

use std::collections::VecDeque;

use oxigraph::model::{Literal, NamedNode, Triple};

use crate::model::{Clade, Tree};
use crate::namespace::NamespaceResolver;
use crate::vocab::Vocabulary;
use crate::{Error, Result};

/// Monotonic per-kind identifier counters.
///
/// Shared by every tree decomposed through one [`TreeDecomposer`], so a
/// batch never mints the same identifier twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdCounters {
    pub node: u64,
    pub edge: u64,
    pub edge_annotation: u64,
    pub tree: u64,
    pub tu: u64,
}

/// Statement generator for one batch of trees.
pub struct TreeDecomposer {
    vocab: Vocabulary,
    base: String,
    counters: IdCounters,
}

impl TreeDecomposer {
    /// `base_iri` is prepended to every minted local name and must make
    /// them absolute IRIs.
    pub fn new(namespaces: &NamespaceResolver, base_iri: impl Into<String>) -> Result<Self> {
        let base = base_iri.into();
        let first = NamespaceResolver::local(&base, "node1");
        NamedNode::new(first.as_str()).map_err(|e| {
            Error::ConfigurationError(format!("base IRI <{base}> does not mint valid IRIs: {e}"))
        })?;
        Ok(Self {
            vocab: Vocabulary::resolve(namespaces)?,
            base,
            counters: IdCounters::default(),
        })
    }

    /// Statements for a whole tree, starting with its `RootedTree`.
    pub fn decompose<'a>(&'a mut self, tree: &'a Tree) -> Decomposition<'a> {
        self.decompose_clade(&tree.root, true)
    }

    /// Statements for the subtree under `clade`. With `root` set the clade
    /// also gets a `RootedTree` pointing at it.
    pub fn decompose_clade<'a>(&'a mut self, clade: &'a Clade, root: bool) -> Decomposition<'a> {
        Decomposition {
            decomposer: self,
            stack: vec![Frame { clade, parent: None, root }],
            pending: VecDeque::new(),
        }
    }

    pub fn counters(&self) -> IdCounters {
        self.counters
    }

    // The base was checked in `new`; a kind plus a number keeps it valid.
    fn mint(&self, kind: &str, n: u64) -> NamedNode {
        NamedNode::new_unchecked(NamespaceResolver::local(&self.base, &format!("{kind}{n}")))
    }

    /// Emit the statements of one node; returns the node's identifier.
    fn emit(&mut self, frame: &Frame<'_>, out: &mut VecDeque<Triple>) -> NamedNode {
        let v = &self.vocab;
        let st = |s: &NamedNode, p: &NamedNode, o: Literal| Triple::new(s.clone(), p.clone(), o);
        let link = |s: &NamedNode, p: &NamedNode, o: NamedNode| Triple::new(s.clone(), p.clone(), o);

        self.counters.node += 1;
        let node = self.mint("node", self.counters.node);

        if frame.root {
            self.counters.tree += 1;
            let tree = self.mint("tree", self.counters.tree);
            out.push_back(link(&tree, &v.rdf_type, v.rooted_tree.clone()));
            out.push_back(link(&tree, &v.has_root, node.clone()));
            tracing::trace!(tree = %tree, root = %node, "rooted tree");
        }

        if let Some(name) = frame.clade.label() {
            self.counters.tu += 1;
            let tu = self.mint("tu", self.counters.tu);
            out.push_back(link(&tu, &v.rdf_type, v.tu.clone()));
            out.push_back(link(&node, &v.represents_tu, tu.clone()));
            out.push_back(st(&tu, &v.label, Literal::new_simple_literal(name)));
        }

        let kind = if frame.clade.is_terminal() { &v.terminal_node } else { &v.ancestral_node };
        out.push_back(link(&node, &v.rdf_type, kind.clone()));

        if let Some(parent) = &frame.parent {
            self.counters.edge += 1;
            let edge = self.mint("edge", self.counters.edge);
            out.push_back(link(&edge, &v.rdf_type, v.directed_edge.clone()));
            out.push_back(link(&edge, &v.has_parent_node, parent.clone()));
            out.push_back(link(&edge, &v.has_child_node, node.clone()));
            out.push_back(link(&node, &v.belongs_to_edge_as_child, edge.clone()));
            out.push_back(link(&node, &v.has_parent, parent.clone()));
            out.push_back(link(parent, &v.belongs_to_edge_as_parent, edge.clone()));

            if let Some(length) = frame.clade.branch_length {
                self.counters.edge_annotation += 1;
                let ann = self.mint("edge_annotation", self.counters.edge_annotation);
                out.push_back(link(&ann, &v.rdf_type, v.edge_length.clone()));
                out.push_back(link(&edge, &v.has_annotation, ann.clone()));
                out.push_back(st(&ann, &v.has_value, Literal::new_simple_literal(format!("{length:?}"))));
            }
        }

        node
    }
}

/// Lazy statement sequence produced by [`TreeDecomposer::decompose`].
pub struct Decomposition<'a> {
    decomposer: &'a mut TreeDecomposer,
    stack: Vec<Frame<'a>>,
    pending: VecDeque<Triple>,
}

struct Frame<'a> {
    clade: &'a Clade,
    parent: Option<NamedNode>,
    root: bool,
}

impl Iterator for Decomposition<'_> {
    type Item = Triple;

    fn next(&mut self) -> Option<Triple> {
        loop {
            if let Some(statement) = self.pending.pop_front() {
                return Some(statement);
            }
            let frame = self.stack.pop()?;
            let node = self.decomposer.emit(&frame, &mut self.pending);
            for child in frame.clade.clades.iter().rev() {
                self.stack.push(Frame { clade: child, parent: Some(node.clone()), root: false });
            }
        }
    }
}
