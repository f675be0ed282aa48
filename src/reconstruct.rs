//! # Graph Reconstructor
//!
//! Rebuilds trees from a graph in two phases:
//!
//! 1. **Node info**: one query collects every `AncestralNode` and
//!    `TerminalNode` with its optional parent, branch length and TU label.
//!    Results are materialized into a [`NodeTable`] right away.
//! 2. **Tree assembly**: a second query lists `(tree, root)` pairs; each
//!    tree is then built from the table alone as the [`Trees`] iterator is
//!    consumed. The store is not touched again.
//!
//! The graph carries no child order, so reconstructed children follow the
//! order in which the store returned them.

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::model::{Clade, Tree};
use crate::namespace::NamespaceResolver;
use crate::storage::{GraphStore, ResultRow};
use crate::vocab;
use crate::{Error, Phase, Result};

/// Attributes of one node found in phase 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeInfo {
    pub label: Option<String>,
    pub branch_length: Option<f64>,
}

/// Phase 1 output: node records plus parent → children adjacency.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: HashMap<String, NodeInfo>,
    children: HashMap<String, SmallVec<[String; 2]>>,
    parents: HashMap<String, String>,
}

impl NodeTable {
    pub fn get(&self, node: &str) -> Option<&NodeInfo> {
        self.nodes.get(node)
    }

    /// Children discovered for `node`; empty for terminals.
    pub fn children(&self, node: &str) -> &[String] {
        self.children.get(node).map_or(&[], |c| c.as_slice())
    }

    pub fn parent(&self, node: &str) -> Option<&str> {
        self.parents.get(node).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn record(&mut self, row: &ResultRow) -> Result<()> {
        let Some(node) = row.node("node") else { return Ok(()) };

        let branch_length = match row.literal("branch_length") {
            Some(text) => Some(text.trim().parse::<f64>().map_err(|_| Error::GraphConsistency {
                phase: Phase::NodeInfo,
                node: node.clone(),
                message: format!("branch length '{text}' is not a number"),
            })?),
            None => None,
        };
        let label = row.literal("label");

        let info = self.nodes.entry(node.clone()).or_default();
        if let Some(l) = label {
            match info.label.as_deref() {
                None => info.label = Some(l.to_string()),
                Some(old) if old != l => {
                    tracing::warn!(node = %node, kept = %old, ignored = %l, "node has several labels");
                }
                Some(_) => {}
            }
        }
        match (info.branch_length, branch_length) {
            (None, Some(b)) => info.branch_length = Some(b),
            (Some(old), Some(b)) if old != b => {
                tracing::warn!(node = %node, kept = old, ignored = b, "node has several branch lengths");
            }
            _ => {}
        }

        if let Some(parent) = row.node("parent_node") {
            match self.parents.get(&node) {
                Some(existing) if *existing != parent => {
                    return Err(Error::GraphConsistency {
                        phase: Phase::NodeInfo,
                        node,
                        message: format!("has two parents, {existing} and {parent}"),
                    });
                }
                Some(_) => {}
                None => {
                    self.parents.insert(node.clone(), parent.clone());
                    self.children.entry(parent).or_default().push(node);
                }
            }
        }
        Ok(())
    }
}

/// Runs both reconstruction phases against a store.
#[derive(Debug, Clone)]
pub struct GraphReconstructor {
    node_query: String,
    root_query: String,
    rooted: bool,
}

impl GraphReconstructor {
    /// Fails if `cdao` or `rdf` is not registered.
    pub fn new(namespaces: &NamespaceResolver) -> Result<Self> {
        let prologue = format!(
            "PREFIX cdao: <{}>\nPREFIX rdf: <{}>\n",
            namespaces.require("cdao")?,
            namespaces.require("rdf")?
        );
        let node_query = format!(
            "{prologue}SELECT ?node ?parent_node ?branch_length ?label WHERE {{
    {{ ?node a {ancestral} . }} UNION {{ ?node a {terminal} . }}
    OPTIONAL {{ ?node {has_parent} ?parent_node . }}
    OPTIONAL {{
        ?node {as_child} [
            {annotation} [ a {edge_length} ; {value} ?branch_length ]
        ] .
    }}
    OPTIONAL {{ ?node {represents} [ {label} ?label ] . }}
}}",
            ancestral = vocab::ANCESTRAL_NODE,
            terminal = vocab::TERMINAL_NODE,
            has_parent = vocab::HAS_PARENT,
            as_child = vocab::BELONGS_TO_EDGE_AS_CHILD,
            annotation = vocab::HAS_ANNOTATION,
            edge_length = vocab::EDGE_LENGTH,
            value = vocab::HAS_VALUE,
            represents = vocab::REPRESENTS_TU,
            label = vocab::LABEL,
        );
        let root_query = format!(
            "{prologue}SELECT ?tree ?root_node WHERE {{
    ?tree a {rooted_tree} ;
          {has_root} ?root_node .
}}",
            rooted_tree = vocab::ROOTED_TREE,
            has_root = vocab::HAS_ROOT,
        );
        Ok(Self { node_query, root_query, rooted: false })
    }

    /// Value of [`Tree::rooted`] on every reconstructed tree.
    pub fn with_rooted(mut self, rooted: bool) -> Self {
        self.rooted = rooted;
        self
    }

    /// Phase 1.
    pub fn collect_node_info<S: GraphStore + ?Sized>(&self, store: &S) -> Result<NodeTable> {
        let mut table = NodeTable::default();
        let result = store.query(&self.node_query)?;
        let rows = result.len();
        for row in result {
            table.record(&row)?;
        }
        tracing::debug!(rows, nodes = table.len(), "node info collected");
        Ok(table)
    }

    /// Run phase 1 and the root query now; assemble trees lazily.
    pub fn trees<S: GraphStore + ?Sized>(&self, store: &S) -> Result<Trees> {
        let table = self.collect_node_info(store)?;
        let roots: Vec<String> = store
            .query(&self.root_query)?
            .into_iter()
            .filter_map(|row| row.node("root_node"))
            .collect();
        tracing::debug!(trees = roots.len(), "tree roots found");
        Ok(Trees { table, roots: roots.into_iter(), rooted: self.rooted })
    }
}

/// Lazy, single-pass sequence of reconstructed trees.
pub struct Trees {
    table: NodeTable,
    roots: std::vec::IntoIter<String>,
    rooted: bool,
}

impl Trees {
    pub fn node_table(&self) -> &NodeTable {
        &self.table
    }

    /// Build the clade under `root` without recursion.
    fn assemble(&self, root: &str) -> Result<Clade> {
        let table = &self.table;
        let mut on_path: HashSet<&str> = HashSet::new();
        on_path.insert(root);
        let mut stack = vec![Pending::open(table, root, true)?];

        while let Some(top) = stack.last_mut() {
            let children = top.children;
            if let Some(child) = children.get(top.next) {
                top.next += 1;
                if !on_path.insert(child.as_str()) {
                    return Err(Error::GraphConsistency {
                        phase: Phase::TreeAssembly,
                        node: child.clone(),
                        message: format!("cycle reached from root {root}"),
                    });
                }
                stack.push(Pending::open(table, child, false)?);
                continue;
            }
            let Some(done) = stack.pop() else { break };
            on_path.remove(done.key);
            match stack.last_mut() {
                Some(parent) => parent.clade.clades.push(done.clade),
                None => return Ok(done.clade),
            }
        }
        Err(Error::GraphConsistency {
            phase: Phase::TreeAssembly,
            node: root.to_string(),
            message: "tree was never completed".into(),
        })
    }
}

/// A clade under construction and the cursor over its child identifiers.
struct Pending<'t> {
    key: &'t str,
    clade: Clade,
    children: &'t [String],
    next: usize,
}

impl<'t> Pending<'t> {
    fn open(table: &'t NodeTable, key: &'t str, is_root: bool) -> Result<Self> {
        let info = table.get(key).ok_or_else(|| Error::GraphConsistency {
            phase: Phase::TreeAssembly,
            node: key.to_string(),
            message: if is_root {
                "tree root has no node record".into()
            } else {
                "child has no node record".into()
            },
        })?;
        Ok(Self {
            key,
            clade: Clade {
                name: info.label.clone(),
                // Branch length is only meaningful below the root.
                branch_length: if is_root { None } else { info.branch_length },
                clades: Vec::new(),
            },
            children: table.children(key),
            next: 0,
        })
    }
}

impl Iterator for Trees {
    type Item = Result<Tree>;

    fn next(&mut self) -> Option<Result<Tree>> {
        let root = self.roots.next()?;
        let rooted = self.rooted;
        Some(self.assemble(&root).map(|clade| {
            tracing::trace!(root = %root, nodes = clade.count(), "tree assembled");
            Tree::new(clade).with_rooted(rooted)
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.roots.size_hint()
    }
}
