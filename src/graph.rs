//! Reply graph construction
//!
//! The directed graph keeps every reply as its own edge so repeated replies
//! between two authors add up to a weighted degree. The undirected
//! projection collapses those multi-edges into one weighted edge per pair
//! and drops self-replies; it is what community detection runs on.

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::models::{ReplyEdge, VideoId};

/// Directed author-to-author reply graph
#[derive(Debug, Clone, Default)]
pub struct ReplyGraph {
    graph: DiGraph<String, VideoId>,
    nodes: HashMap<String, NodeIndex>,
}

impl ReplyGraph {
    /// Build the graph from reply edges; node order follows sorted author id
    #[must_use]
    pub fn build(edges: &[ReplyEdge]) -> Self {
        let authors: BTreeSet<&str> = edges
            .iter()
            .flat_map(|e| [e.from_author.as_str(), e.to_author.as_str()])
            .collect();

        let mut graph = DiGraph::with_capacity(authors.len(), edges.len());
        let mut nodes = HashMap::with_capacity(authors.len());
        for author in authors {
            let index = graph.add_node(author.to_string());
            nodes.insert(author.to_string(), index);
        }

        for edge in edges {
            if let (Some(&from), Some(&to)) = (nodes.get(&edge.from_author), nodes.get(&edge.to_author)) {
                graph.add_edge(from, to, edge.video_id.clone());
            }
        }

        tracing::debug!(
            authors = graph.node_count(),
            edges = graph.edge_count(),
            "Built reply graph"
        );

        Self { graph, nodes }
    }

    /// Authors appearing on either end of a reply
    #[must_use]
    pub fn author_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Reply edges, multi-edges included
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Replies received by `author`
    #[must_use]
    pub fn in_degree(&self, author: &str) -> usize {
        self.degree(author, Direction::Incoming)
    }

    /// Replies written by `author`
    #[must_use]
    pub fn out_degree(&self, author: &str) -> usize {
        self.degree(author, Direction::Outgoing)
    }

    fn degree(&self, author: &str, direction: Direction) -> usize {
        self.nodes
            .get(author)
            .map_or(0, |&n| self.graph.edges_directed(n, direction).count())
    }

    /// Collapse to an undirected weighted graph without self-loops.
    ///
    /// Every author keeps its node, even one whose only edges were
    /// self-replies.
    #[must_use]
    pub fn undirected_projection(&self) -> UnGraph<String, f64> {
        let mut projection =
            UnGraph::with_capacity(self.graph.node_count(), self.graph.edge_count());
        for index in self.graph.node_indices() {
            projection.add_node(self.graph[index].clone());
        }

        for edge in self.graph.edge_references() {
            let (a, b) = (edge.source(), edge.target());
            if a == b {
                continue;
            }
            // Node indices are shared between the two graphs
            match projection.find_edge(a, b) {
                Some(existing) => projection[existing] += 1.0,
                None => {
                    projection.add_edge(a, b, 1.0);
                }
            }
        }

        projection
    }
}
