//! DOT export of the node graph
//!
//! Every live node becomes a vertex named by its label (`#<id> [k1, k2]`).
//! Edges carry the relation they stand for, so the picture shows the parent,
//! child and sibling links exactly as the tree holds them.

use std::fmt;

use crate::btree::{BPlusTree, NodeId};

/// Kind of link an edge stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Child,
    Parent,
    Left,
    Right,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Child => "child",
            Relation::Parent => "parent",
            Relation::Left => "left",
            Relation::Right => "right",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub relation: Relation,
}

/// Labelled directed graph, rendered as DOT by `Display`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectedGraph {
    edges: Vec<Edge>,
    same_rank: Vec<(String, String)>,
}

impl DirectedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>, relation: Relation) {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            relation,
        });
    }

    /// Ask the renderer to keep two vertices on the same row
    pub fn add_same_rank(&mut self, a: impl Into<String>, b: impl Into<String>) {
        self.same_rank.push((a.into(), b.into()));
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn same_rank(&self) -> &[(String, String)] {
        &self.same_rank
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.same_rank.is_empty()
    }
}

/// Quote a vertex name for DOT
fn quote(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

impl fmt::Display for DirectedGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph {{")?;
        for edge in &self.edges {
            writeln!(
                f,
                "  {} -> {} [label=\"{}\"]",
                quote(&edge.from),
                quote(&edge.to),
                edge.relation
            )?;
        }
        for (a, b) in &self.same_rank {
            writeln!(f, "  {{ rank = same; {}; {}; }}", quote(a), quote(b))?;
        }
        write!(f, "}}")
    }
}

/// Build the graph of every live node of `tree`, level by level
pub fn export(tree: &BPlusTree) -> DirectedGraph {
    let mut graph = DirectedGraph::new();
    let name = |id: NodeId| tree.node(id).map(|n| n.describe()).unwrap_or_default();

    for level in tree.levels() {
        for &id in &level {
            let Some(node) = tree.node(id) else {
                continue;
            };
            let from = node.describe();

            for &child in node.kind.children() {
                graph.add_edge(from.clone(), name(child), Relation::Child);
            }
            if let Some(parent) = node.parent() {
                graph.add_edge(from.clone(), name(parent), Relation::Parent);
            }
            if let Some(left) = node.left() {
                graph.add_edge(from.clone(), name(left), Relation::Left);
            }
            if let Some(right) = node.right() {
                graph.add_edge(from.clone(), name(right), Relation::Right);
            }
        }

        for pair in level.windows(2) {
            graph.add_same_rank(name(pair[0]), name(pair[1]));
        }
    }

    graph
}
