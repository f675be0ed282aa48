//! End-to-end round trips: trees → serialized graph → trees.
//!
//! Each test drives the public facade (`to_graph` / `from_graph`) and
//! compares topology up to child order via `Tree::canonical`.

use cdao_rs::{
    from_graph, parse, to_graph, write, Clade, GraphStore, GraphSyntax, MemoryStore,
    ReadOptions, Tree, WriteOptions,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Helpers
// ============================================================================

/// Unnamed, branch-length-less root over leaves A:1.0 and B:2.0.
fn two_leaf_tree() -> Tree {
    Tree::new(Clade::new().with_children([
        Clade::named("A").with_branch_length(1.0),
        Clade::named("B").with_branch_length(2.0),
    ]))
}

fn roundtrip(trees: &[Tree], write: &WriteOptions, read: &ReadOptions) -> Vec<Tree> {
    let (bytes, written) = to_graph(trees, write).unwrap();
    assert_eq!(written, trees.len());
    from_graph(&bytes, read)
        .unwrap()
        .collect::<cdao_rs::Result<Vec<_>>>()
        .unwrap()
}

fn count(store: &MemoryStore, class: &str) -> usize {
    store
        .query(&format!(
            "PREFIX cdao: <http://purl.obolibrary.org/obo/cdao.owl#>
             PREFIX owl: <http://www.w3.org/2002/07/owl#>
             SELECT ?x WHERE {{ ?x a {class} }}"
        ))
        .unwrap()
        .len()
}

fn reload(bytes: &[u8]) -> MemoryStore {
    let store = MemoryStore::new().unwrap();
    store.load(bytes, GraphSyntax::Turtle, None).unwrap();
    store
}

// ============================================================================
// 1. The two-leaf example
// ============================================================================

#[test]
fn test_two_leaf_example_entity_counts() {
    let (bytes, _) = to_graph([&two_leaf_tree()], &WriteOptions::default()).unwrap();

    let store = reload(&bytes);
    assert_eq!(count(&store, "cdao:RootedTree"), 1);
    assert_eq!(count(&store, "cdao:AncestralNode"), 1);
    assert_eq!(count(&store, "cdao:TerminalNode"), 2);
    assert_eq!(count(&store, "cdao:TU"), 2);
    assert_eq!(count(&store, "cdao:Directed_Edge"), 2);
    assert_eq!(count(&store, "cdao:EdgeLength"), 2);

    let labels = store
        .query(
            "PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
             SELECT ?l WHERE { ?tu rdf:label ?l }",
        )
        .unwrap();
    let mut labels: Vec<_> = labels.iter().filter_map(|r| r.literal("l")).collect();
    labels.sort();
    assert_eq!(labels, vec!["A", "B"]);
}

#[test]
fn test_two_leaf_example_reconstructs() {
    let trees = roundtrip(&[two_leaf_tree()], &WriteOptions::default(), &ReadOptions::default());
    assert_eq!(trees.len(), 1);
    let root = &trees[0].root;
    assert_eq!(root.name, None);
    assert_eq!(root.clades.len(), 2);
    assert_eq!(trees[0].find("A").unwrap().branch_length, Some(1.0));
    assert_eq!(trees[0].find("B").unwrap().branch_length, Some(2.0));
}

// ============================================================================
// 2. Topology, labels and lengths
// ============================================================================

#[test]
fn test_nested_tree_roundtrip() {
    let tree: Tree = "((A:1.0,B:2.0)AB:0.5,(C:0.125,'D e':3e-7)CD:1.5,F)Root;".parse().unwrap();
    let back = roundtrip(std::slice::from_ref(&tree), &WriteOptions::default(), &ReadOptions::default());
    assert_eq!(back[0].canonical(), tree.canonical());
}

#[test]
fn test_ntriples_roundtrip() {
    let tree: Tree = "((A:1.0,B:2.0)AB:0.5,C:3.0);".parse().unwrap();
    let write = WriteOptions::default().with_syntax(GraphSyntax::NTriples);
    let read = ReadOptions::default().with_syntax(GraphSyntax::NTriples);
    let back = roundtrip(std::slice::from_ref(&tree), &write, &read);
    assert_eq!(back[0].canonical(), tree.canonical());
}

#[test]
fn test_batch_of_trees() {
    let trees: Vec<Tree> = cdao_rs::model::newick::parse_trees("(A,B)X; ((C,D),E); F;").unwrap();
    let back = roundtrip(&trees, &WriteOptions::default(), &ReadOptions::default());
    assert_eq!(back.len(), 3);
    let mut expected: Vec<String> = trees.iter().map(|t| t.canonical().to_string()).collect();
    let mut actual: Vec<String> = back.iter().map(|t| t.canonical().to_string()).collect();
    expected.sort();
    actual.sort();
    assert_eq!(actual, expected);
}

#[test]
fn test_root_branch_length_is_dropped() {
    let tree = Tree::new(Clade::named("R").with_branch_length(4.0).with_children([Clade::named("A")]));
    let back = roundtrip(&[tree], &WriteOptions::default(), &ReadOptions::default());
    assert_eq!(back[0].root.branch_length, None);
    assert_eq!(back[0].root.name.as_deref(), Some("R"));
}

#[test]
fn test_rooted_flag_comes_from_read_options() {
    let read = ReadOptions::default().with_rooted(true);
    let back = roundtrip(&[two_leaf_tree()], &WriteOptions::default(), &read);
    assert!(back[0].rooted);
}

// ============================================================================
// 3. Output shape
// ============================================================================

#[test]
fn test_output_declares_prefixes_and_ontology() {
    let write = WriteOptions::default().with_prefix("ex", "http://example.org/trees/");
    let (bytes, _) = to_graph([&two_leaf_tree()], &write).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.contains("@prefix cdao: <http://purl.obolibrary.org/obo/cdao.owl#>"));
    assert!(text.contains("@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>"));
    assert!(text.contains("@prefix owl: <http://www.w3.org/2002/07/owl#>"));
    assert!(text.contains("@prefix ex: <http://example.org/trees/>"));

    let ontologies = reload(&bytes)
        .query(
            "PREFIX owl: <http://www.w3.org/2002/07/owl#>
             SELECT ?o WHERE { ?o a owl:Ontology }",
        )
        .unwrap();
    assert_eq!(ontologies.len(), 1);
    assert_eq!(
        ontologies.rows[0].node("o").as_deref(),
        Some("http://purl.obolibrary.org/obo/cdao.owl#")
    );
}

#[test]
fn test_ontology_declaration_can_be_disabled() {
    let write = WriteOptions { declare_ontology: false, ..WriteOptions::default() };
    let (bytes, _) = to_graph([&two_leaf_tree()], &write).unwrap();
    assert!(!String::from_utf8(bytes.clone()).unwrap().contains("Ontology"));
    assert_eq!(count(&reload(&bytes), "owl:Ontology"), 0);
}

#[test]
fn test_base_iri_prefixes_minted_identifiers() {
    let write = WriteOptions::default()
        .with_base_iri("http://example.org/trees/")
        .with_prefix("ex", "http://example.org/trees/");
    let (bytes, _) = to_graph([&two_leaf_tree()], &write).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.contains("ex:tree1"));
    assert!(!text.contains("http://localhost/"));

    let store = reload(&bytes);
    let roots = store
        .query(
            "PREFIX cdao: <http://purl.obolibrary.org/obo/cdao.owl#>
             SELECT ?t ?r WHERE { ?t a cdao:RootedTree ; cdao:has_root ?r . ?r a cdao:AncestralNode }",
        )
        .unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots.rows[0].node("t").as_deref(), Some("http://example.org/trees/tree1"));
    assert_eq!(roots.rows[0].node("r").as_deref(), Some("http://example.org/trees/node1"));
}

#[test]
fn test_default_base_iri() {
    let write = WriteOptions::default().with_syntax(GraphSyntax::NTriples);
    let (bytes, _) = to_graph([&two_leaf_tree()], &write).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains(&format!("<{}tree1>", cdao_rs::DEFAULT_BASE_IRI)));
}

#[test]
fn test_reader_and_writer_entry_points() {
    let mut buf = Vec::new();
    let written = write([&two_leaf_tree()], &mut buf, &WriteOptions::default()).unwrap();
    assert_eq!(written, 1);
    let trees: Vec<Tree> = parse(buf.as_slice(), &ReadOptions::default())
        .unwrap()
        .collect::<cdao_rs::Result<_>>()
        .unwrap();
    assert_eq!(trees[0].canonical(), two_leaf_tree().canonical());
}

#[test]
fn test_empty_batch() {
    let (bytes, written) = to_graph(std::iter::empty(), &WriteOptions::default()).unwrap();
    assert_eq!(written, 0);
    assert_eq!(from_graph(&bytes, &ReadOptions::default()).unwrap().count(), 0);
}
