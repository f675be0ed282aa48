//! Phylogenetic tree and clade.
//!
//! Trees reconstructed from a graph can be arbitrarily deep, so every
//! operation that walks a whole clade (`Drop`, `Clone`, `PartialEq`,
//! preorder iteration, [`Clade::canonicalize`] and Newick rendering) uses
//! an explicit stack. `Debug` and the serde impls are derived and recurse.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// One node of a phylogenetic tree.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Clade {
    pub name: Option<String>,
    /// Length of the branch to the parent. Meaningless at the root.
    pub branch_length: Option<f64>,
    /// Ordered children; empty means terminal.
    pub clades: Vec<Clade>,
}

impl Clade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), branch_length: None, clades: Vec::new() }
    }

    pub fn with_branch_length(mut self, length: f64) -> Self {
        self.branch_length = Some(length);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Clade>) -> Self {
        self.clades = children.into_iter().collect();
        self
    }

    pub fn push(&mut self, child: Clade) {
        self.clades.push(child);
    }

    pub fn is_terminal(&self) -> bool {
        self.clades.is_empty()
    }

    /// The label, if present and non-empty.
    pub fn label(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Depth-first preorder over this clade and its descendants.
    pub fn iter(&self) -> CladeIter<'_> {
        CladeIter { stack: vec![self] }
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Clade> {
        self.iter().filter(|c| c.is_terminal())
    }

    /// Find the first clade (preorder) with the given label.
    pub fn find(&self, name: &str) -> Option<&Clade> {
        self.iter().find(|c| c.label() == Some(name))
    }

    /// Sort every child list by the Newick rendering of the sorted child.
    ///
    /// Two trees equal up to child order become equal after this.
    pub fn canonicalize(&mut self) {
        // Detach the whole tree into preorder slots; children always sit
        // after their parent, so a reverse sweep sees children first.
        let mut slots: Vec<Option<Clade>> = Vec::new();
        let mut parents: Vec<Option<usize>> = Vec::new();
        let mut work = vec![(std::mem::take(self), None)];
        while let Some((mut clade, parent)) = work.pop() {
            let index = slots.len();
            let children = std::mem::take(&mut clade.clades);
            work.extend(children.into_iter().rev().map(|child| (child, Some(index))));
            slots.push(Some(clade));
            parents.push(parent);
        }

        let mut children: HashMap<usize, Vec<(String, Clade)>> = HashMap::new();
        for index in (0..slots.len()).rev() {
            let Some(mut clade) = slots[index].take() else { continue };
            let mut sorted = children.remove(&index).unwrap_or_default();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));

            let mut key = String::new();
            if !sorted.is_empty() {
                key.push('(');
                for (i, (child_key, _)) in sorted.iter().enumerate() {
                    if i > 0 {
                        key.push(',');
                    }
                    key.push_str(child_key);
                }
                key.push(')');
            }
            let _ = clade.write_tail(&mut key);
            clade.clades = sorted.into_iter().map(|(_, child)| child).collect();

            match parents[index] {
                Some(parent) => children.entry(parent).or_default().push((key, clade)),
                None => *self = clade,
            }
        }
    }

    /// Copy of this clade without its children.
    fn shallow(&self) -> Clade {
        Clade {
            name: self.name.clone(),
            branch_length: self.branch_length,
            clades: Vec::with_capacity(self.clades.len()),
        }
    }

    /// Newick text that follows the child list: label and branch length.
    pub(crate) fn write_tail(&self, out: &mut impl std::fmt::Write) -> std::fmt::Result {
        if let Some(name) = self.label() {
            if name.chars().any(|c| c.is_whitespace() || super::newick::is_reserved(c)) {
                write!(out, "'{}'", name.replace('\'', "''"))?;
            } else {
                out.write_str(name)?;
            }
        }
        if let Some(length) = self.branch_length {
            write!(out, ":{length:?}")?;
        }
        Ok(())
    }
}

impl Drop for Clade {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.clades);
        while let Some(mut clade) = stack.pop() {
            stack.append(&mut clade.clades);
        }
    }
}

impl Clone for Clade {
    fn clone(&self) -> Self {
        // (source, copy under construction, next child to visit)
        let mut stack = vec![(self, self.shallow(), 0usize)];
        while let Some((source, _, next)) = stack.last_mut() {
            let source: &Clade = *source;
            if let Some(child) = source.clades.get(*next) {
                *next += 1;
                stack.push((child, child.shallow(), 0));
                continue;
            }
            let Some((_, done, _)) = stack.pop() else { break };
            match stack.last_mut() {
                Some((_, parent, _)) => parent.clades.push(done),
                None => return done,
            }
        }
        self.shallow()
    }
}

impl PartialEq for Clade {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            if a.name != b.name
                || a.branch_length != b.branch_length
                || a.clades.len() != b.clades.len()
            {
                return false;
            }
            stack.extend(a.clades.iter().zip(&b.clades));
        }
        true
    }
}

/// Preorder clade iterator.
pub struct CladeIter<'a> {
    stack: Vec<&'a Clade>,
}

impl<'a> Iterator for CladeIter<'a> {
    type Item = &'a Clade;

    fn next(&mut self) -> Option<&'a Clade> {
        let clade = self.stack.pop()?;
        self.stack.extend(clade.clades.iter().rev());
        Some(clade)
    }
}

/// A rooted hierarchy of clades.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub root: Clade,
    pub rooted: bool,
}

impl Tree {
    pub fn new(root: Clade) -> Self {
        Self { root, rooted: false }
    }

    pub fn with_rooted(mut self, rooted: bool) -> Self {
        self.rooted = rooted;
        self
    }

    pub fn clades(&self) -> CladeIter<'_> {
        self.root.iter()
    }

    pub fn count_terminals(&self) -> usize {
        self.root.terminals().count()
    }

    pub fn find(&self, name: &str) -> Option<&Clade> {
        self.root.find(name)
    }

    /// Copy with children sorted, for comparisons that ignore child order.
    pub fn canonical(&self) -> Tree {
        let mut tree = self.clone();
        tree.root.canonicalize();
        tree
    }
}

impl From<Clade> for Tree {
    fn from(root: Clade) -> Self {
        Tree::new(root)
    }
}
