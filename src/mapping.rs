//! # Mapping Facade
//!
//! Trees → serialized graph and serialized graph → trees.
//!
//! [`to_graph`] and [`from_graph`] each own a private store for one call.
//! [`CdaoWriter`] and [`CdaoParser`] work against a caller-owned store
//! instead, so several batches can share one graph.

use std::io::{Read, Write};
use std::path::Path;

use oxigraph::model::{NamedNode, Triple};
use serde::{Deserialize, Serialize};

use crate::decompose::{IdCounters, TreeDecomposer};
use crate::model::Tree;
use crate::namespace::{Namespace, NamespaceResolver};
use crate::reconstruct::{GraphReconstructor, Trees};
use crate::storage::{GraphStore, MemoryStore, StoreConfig};
use crate::syntax::GraphSyntax;
use crate::tx::TxMode;
use crate::vocab::Vocabulary;
use crate::{Error, Result};

/// Base for minted identifiers when the caller sets none.
pub const DEFAULT_BASE_IRI: &str = "http://localhost/";

// ============================================================================
// Options
// ============================================================================

/// Options for the write path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    pub syntax: GraphSyntax,
    /// Prepended to every minted identifier; must yield absolute IRIs.
    pub base_iri: String,
    /// Bindings added to (or overriding) `cdao`, `rdf` and `owl`.
    pub prefixes: Vec<Namespace>,
    /// Emit `<cdao> rdf:type owl:Ontology` ahead of the trees.
    pub declare_ontology: bool,
    pub store: StoreConfig,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            syntax: GraphSyntax::Turtle,
            base_iri: DEFAULT_BASE_IRI.into(),
            prefixes: Vec::new(),
            declare_ontology: true,
            store: StoreConfig::memory(),
        }
    }
}

impl WriteOptions {
    pub fn with_syntax(mut self, syntax: GraphSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Self {
        self.base_iri = base_iri.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        self.prefixes.push(Namespace { prefix: prefix.into(), iri: iri.into() });
        self
    }

    /// Default table plus `prefixes`.
    pub fn namespaces(&self) -> NamespaceResolver {
        with_overrides(&self.prefixes)
    }
}

fn with_overrides(prefixes: &[Namespace]) -> NamespaceResolver {
    prefixes.iter().fold(NamespaceResolver::default(), |ns, extra| {
        ns.with_prefix(extra.prefix.clone(), extra.iri.clone())
    })
}

/// Options for the read path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    pub syntax: GraphSyntax,
    /// Base for relative IRIs in the input. Without one, relative IRIs
    /// are a syntax error.
    pub base_iri: Option<String>,
    /// Bindings added to (or overriding) `cdao`, `rdf` and `owl`; must
    /// match the ones the graph was written with.
    pub prefixes: Vec<Namespace>,
    /// Value of [`Tree::rooted`] on the reconstructed trees.
    pub rooted: bool,
    pub store: StoreConfig,
}

impl ReadOptions {
    pub fn with_syntax(mut self, syntax: GraphSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Self {
        self.base_iri = Some(base_iri.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        self.prefixes.push(Namespace { prefix: prefix.into(), iri: iri.into() });
        self
    }

    pub fn with_rooted(mut self, rooted: bool) -> Self {
        self.rooted = rooted;
        self
    }

    /// Default table plus `prefixes`.
    pub fn namespaces(&self) -> NamespaceResolver {
        with_overrides(&self.prefixes)
    }
}

/// Default base identifier for a graph read from `path`.
pub fn base_iri_for_path(path: impl AsRef<Path>) -> Result<String> {
    let absolute = std::path::absolute(path.as_ref())?;
    Ok(format!("file://{}", absolute.display()))
}

// ============================================================================
// Writer
// ============================================================================

/// What one [`CdaoWriter::add_trees`] call committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub trees: usize,
    /// Statements appended, including the ontology declaration.
    pub statements: usize,
}

/// Appends trees to a store, one transaction per batch.
pub struct CdaoWriter<'s, S: GraphStore + ?Sized> {
    store: &'s S,
    decomposer: TreeDecomposer,
    ontology: Option<Triple>,
}

impl<'s, S: GraphStore + ?Sized> CdaoWriter<'s, S> {
    pub fn new(store: &'s S, options: &WriteOptions) -> Result<Self> {
        let namespaces = options.namespaces();
        let ontology = if options.declare_ontology {
            let vocab = Vocabulary::resolve(&namespaces)?;
            let cdao = namespaces.require("cdao")?;
            let subject = NamedNode::new(cdao).map_err(|e| {
                Error::ConfigurationError(format!("cdao namespace <{cdao}> is not an IRI: {e}"))
            })?;
            Some(Triple::new(subject, vocab.rdf_type, vocab.ontology))
        } else {
            None
        };
        Ok(Self {
            store,
            decomposer: TreeDecomposer::new(&namespaces, options.base_iri.clone())?,
            ontology,
        })
    }

    /// Decompose every tree and commit them together.
    ///
    /// On failure the transaction is rolled back and nothing from the batch
    /// is visible. Identifier counters keep running across calls.
    pub fn add_trees<'t, I>(&mut self, trees: I) -> Result<WriteSummary>
    where
        I: IntoIterator<Item = &'t Tree>,
    {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite)?;
        match self.append_all(&mut tx, trees) {
            Ok(summary) => {
                self.store.commit_tx(tx)?;
                tracing::info!(trees = summary.trees, statements = summary.statements, "trees written");
                Ok(summary)
            }
            Err(e) => {
                tracing::warn!(error = %e, "tree batch rolled back");
                self.store.rollback_tx(tx)?;
                Err(e)
            }
        }
    }

    fn append_all<'t, I>(&mut self, tx: &mut S::Tx, trees: I) -> Result<WriteSummary>
    where
        I: IntoIterator<Item = &'t Tree>,
    {
        let mut summary = WriteSummary::default();
        if let Some(ontology) = &self.ontology {
            self.store.append(tx, ontology.clone())?;
            summary.statements += 1;
        }
        for tree in trees {
            for statement in self.decomposer.decompose(tree) {
                self.store.append(tx, statement)?;
                summary.statements += 1;
            }
            summary.trees += 1;
        }
        Ok(summary)
    }

    pub fn counters(&self) -> IdCounters {
        self.decomposer.counters()
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Loads graphs into a store and reconstructs the trees in it.
pub struct CdaoParser<'s, S: GraphStore + ?Sized> {
    store: &'s S,
    options: ReadOptions,
}

impl<'s, S: GraphStore + ?Sized> CdaoParser<'s, S> {
    pub fn new(store: &'s S, options: &ReadOptions) -> Self {
        Self { store, options: options.clone() }
    }

    /// Append a serialized graph; returns the number of statements read.
    pub fn load(&self, bytes: &[u8]) -> Result<usize> {
        self.store.load(bytes, self.options.syntax, self.options.base_iri.as_deref())
    }

    /// Reconstruct every tree currently in the store.
    pub fn trees(&self) -> Result<Trees> {
        GraphReconstructor::new(&self.options.namespaces())?
            .with_rooted(self.options.rooted)
            .trees(self.store)
    }

    pub fn parse(&self, bytes: &[u8]) -> Result<Trees> {
        self.load(bytes)?;
        self.trees()
    }
}

// ============================================================================
// One-shot entry points
// ============================================================================

/// Serialize trees; returns the bytes and the number of trees written.
pub fn to_graph<'t, I>(trees: I, options: &WriteOptions) -> Result<(Vec<u8>, usize)>
where
    I: IntoIterator<Item = &'t Tree>,
{
    let store = MemoryStore::open(&options.store)?;
    let summary = CdaoWriter::new(&store, options)?.add_trees(trees)?;
    let bytes = store.dump(options.syntax, &options.namespaces())?;
    Ok((bytes, summary.trees))
}

/// [`to_graph`] into a writer.
pub fn write<'t, I, W>(trees: I, mut out: W, options: &WriteOptions) -> Result<usize>
where
    I: IntoIterator<Item = &'t Tree>,
    W: Write,
{
    let (bytes, written) = to_graph(trees, options)?;
    out.write_all(&bytes)?;
    Ok(written)
}

/// Parse a serialized graph into a lazy sequence of trees.
pub fn from_graph(bytes: &[u8], options: &ReadOptions) -> Result<Trees> {
    let store = MemoryStore::open(&options.store)?;
    CdaoParser::new(&store, options).parse(bytes)
}

/// [`from_graph`] from a reader.
pub fn parse<R: Read>(mut input: R, options: &ReadOptions) -> Result<Trees> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    from_graph(&bytes, options)
}

/// [`from_graph`] from a file; the base defaults to the file's own IRI.
pub fn from_path(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Trees> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let mut options = options.clone();
    if options.base_iri.is_none() {
        options.base_iri = Some(base_iri_for_path(path)?);
    }
    tracing::info!(path = %path.display(), bytes = bytes.len(), "reading graph");
    from_graph(&bytes, &options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::{CDAO, OWL};
    use oxigraph::model::Term;

    const ALT_CDAO: &str = "http://example.org/cdao-mirror#";

    #[test]
    fn test_write_options_from_json() {
        let options: WriteOptions = serde_json::from_str(
            r#"{"syntax": "ntriples", "base_iri": "http://ex.org/", "prefixes": [{"prefix": "ex", "iri": "http://ex.org/"}]}"#,
        )
        .unwrap();
        assert_eq!(options.syntax, GraphSyntax::NTriples);
        assert!(options.declare_ontology);
        assert_eq!(options.namespaces().namespace("ex"), Some("http://ex.org/"));
        assert_eq!(options.namespaces().iter().count(), 4);
        assert_eq!(WriteOptions::default().base_iri, DEFAULT_BASE_IRI);
    }

    #[test]
    fn test_read_options_from_json() {
        let options: ReadOptions = serde_json::from_str(
            r#"{"rooted": true, "prefixes": [{"prefix": "cdao", "iri": "http://example.org/cdao-mirror#"}]}"#,
        )
        .unwrap();
        assert!(options.rooted);
        assert_eq!(options.base_iri, None);
        assert_eq!(options.namespaces().namespace("cdao"), Some(ALT_CDAO));
        assert_eq!(ReadOptions::default().namespaces().namespace("cdao"), Some(CDAO));
    }

    #[test]
    fn test_base_iri_for_path() {
        let base = base_iri_for_path("trees.ttl").unwrap();
        assert!(base.starts_with("file://"));
        assert!(base.ends_with("trees.ttl"));
    }

    #[test]
    fn test_writer_counts_and_ontology() {
        let store = MemoryStore::new().unwrap();
        let tree: Tree = "(A,B);".parse().unwrap();
        let mut writer = CdaoWriter::new(&store, &WriteOptions::default()).unwrap();
        let summary = writer.add_trees([&tree]).unwrap();
        assert_eq!(summary.trees, 1);
        assert_eq!(summary.statements, store.statement_count().unwrap());
        let ontology = Term::from(NamedNode::new_unchecked(format!("{OWL}Ontology")));
        let declared: Vec<_> = store
            .statements()
            .unwrap()
            .into_iter()
            .filter(|t| t.object == ontology)
            .collect();
        assert_eq!(declared.len(), 1);
        assert_eq!(declared[0].subject.to_string(), format!("<{CDAO}>"));
    }

    #[test]
    fn test_writer_rejects_relative_base() {
        let store = MemoryStore::new().unwrap();
        assert!(matches!(
            CdaoWriter::new(&store, &WriteOptions::default().with_base_iri("")),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_writer_counters_continue_across_batches() {
        let store = MemoryStore::new().unwrap();
        let tree: Tree = "(A,B);".parse().unwrap();
        let mut writer = CdaoWriter::new(&store, &WriteOptions::default()).unwrap();
        writer.add_trees([&tree]).unwrap();
        writer.add_trees([&tree]).unwrap();
        assert_eq!(writer.counters().tree, 2);
        assert_eq!(writer.counters().node, 6);
        let parser = CdaoParser::new(&store, &ReadOptions::default());
        assert_eq!(parser.trees().unwrap().count(), 2);
    }

    #[test]
    fn test_overridden_cdao_prefix_reads_back() {
        let tree: Tree = "(A:1.0,B:2.0)R;".parse().unwrap();
        let write = WriteOptions::default().with_prefix("cdao", ALT_CDAO);
        let (bytes, written) = to_graph([&tree], &write).unwrap();
        assert_eq!(written, 1);

        let read = ReadOptions::default().with_prefix("cdao", ALT_CDAO);
        let trees: Vec<Tree> = from_graph(&bytes, &read).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].canonical(), tree.canonical());

        // the default table looks for the standard CDAO namespace and finds nothing
        assert_eq!(from_graph(&bytes, &ReadOptions::default()).unwrap().count(), 0);
    }

    #[test]
    fn test_parser_reports_syntax_errors() {
        let err = from_graph(b"<http://ex.org/a> <http://ex.org/b>", &ReadOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::RdfSyntax(_)));
        // relative IRIs without a base
        let err = from_graph(b"<a> <b> <c> .", &ReadOptions::default()).err().unwrap();
        assert!(matches!(err, Error::RdfSyntax(_)));
    }

    #[test]
    fn test_from_path_resolves_against_file() {
        let path = std::env::temp_dir().join(format!("cdao-mapping-{}.ttl", std::process::id()));
        std::fs::write(
            &path,
            "@prefix cdao: <http://purl.obolibrary.org/obo/cdao.owl#> .\n\
             <t> a cdao:RootedTree ; cdao:has_root <r> .\n\
             <r> a cdao:AncestralNode .\n\
             <leaf> a cdao:TerminalNode ; cdao:has_Parent <r> .\n",
        )
        .unwrap();

        let trees = from_path(&path, &ReadOptions::default()).unwrap();
        let base = base_iri_for_path(&path).unwrap();
        let dir = &base[..base.rfind('/').unwrap() + 1];
        let root = format!("{dir}r");
        assert_eq!(trees.node_table().parent(&format!("{dir}leaf")), Some(root.as_str()));
        assert_eq!(trees.count(), 1);
        let _ = std::fs::remove_file(&path);
    }
}
