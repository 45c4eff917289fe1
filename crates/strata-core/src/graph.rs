use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::DependencyEdge;

/// File node as written to the graph artifacts.
///
/// Fields are declared in key order so serialized objects come out sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub description: String,
    #[serde(rename = "fileSize")]
    pub file_size: u64,
    pub id: String,
    pub package: String,
    /// Owning component.
    pub user: String,
}

impl FileNode {
    pub fn new(id: impl Into<String>, component: impl Into<String>, file_size: u64) -> Self {
        let id = id.into();
        Self {
            description: String::new(),
            file_size,
            id,
            package: String::new(),
            user: component.into(),
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }
}

/// Component node of the root graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub description: String,
    #[serde(rename = "fileCount")]
    pub file_count: usize,
    #[serde(rename = "fileSize")]
    pub file_size: u64,
    pub id: String,
}

/// `{"links": [...], "nodes": [...]}` document for one graph view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDoc<N> {
    pub links: Vec<DependencyEdge>,
    pub nodes: Vec<N>,
}

pub type FileGraphDoc = GraphDoc<FileNode>;
pub type RootGraphDoc = GraphDoc<ComponentNode>;

/// Directed file-level dependency graph.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<FileNode, ()>,
    index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Build the graph from per-file sizes, components and declared
    /// package names plus resolved edges.
    pub fn build(
        file_sizes: &BTreeMap<String, u64>,
        component_of: &BTreeMap<String, String>,
        packages: &BTreeMap<String, String>,
        edges: &BTreeSet<DependencyEdge>,
    ) -> Self {
        let mut graph = Self::new();
        for (path, size) in file_sizes {
            let component = component_of
                .get(path)
                .cloned()
                .unwrap_or_else(|| crate::types::UNKNOWN_COMPONENT.to_string());
            let package = packages.get(path).cloned().unwrap_or_default();
            graph.add_file(FileNode::new(path.as_str(), component, *size).with_package(package));
        }
        for edge in edges {
            if !graph.add_edge(edge) {
                tracing::debug!(%edge, "edge endpoint missing from node set");
            }
        }
        graph
    }

    /// Add a file as a node. Returns the node index.
    pub fn add_file(&mut self, node: FileNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Add an edge between two known files. Self edges and unknown
    /// endpoints are rejected.
    pub fn add_edge(&mut self, edge: &DependencyEdge) -> bool {
        if edge.consumer == edge.provider {
            return false;
        }
        let (Some(&from), Some(&to)) = (
            self.index.get(&edge.consumer),
            self.index.get(&edge.provider),
        ) else {
            return false;
        };
        self.graph.update_edge(from, to, ());
        true
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All nodes, ordered by id.
    pub fn nodes(&self) -> Vec<&FileNode> {
        let mut nodes: Vec<&FileNode> = self.graph.node_weights().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// All edges, ordered by consumer then provider.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .graph
            .edge_references()
            .map(|e| {
                DependencyEdge::new(
                    self.graph[e.source()].id.as_str(),
                    self.graph[e.target()].id.as_str(),
                )
            })
            .collect();
        edges.sort();
        edges
    }

    /// Groups of files that depend on each other in a cycle.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let sccs = petgraph::algo::kosaraju_scc(&self.graph);
        let mut cycles: Vec<Vec<String>> = sccs
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut ids: Vec<String> =
                    scc.iter().map(|&idx| self.graph[idx].id.clone()).collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// The whole file graph.
    pub fn to_doc(&self) -> FileGraphDoc {
        GraphDoc {
            links: self.edges(),
            nodes: self.nodes().into_iter().cloned().collect(),
        }
    }

    /// One graph per component holding its files and the edges between them.
    /// Edges that cross components are dropped.
    pub fn component_graphs(&self) -> BTreeMap<String, FileGraphDoc> {
        let mut members: BTreeMap<&str, Vec<&FileNode>> = BTreeMap::new();
        for node in self.nodes() {
            members.entry(node.user.as_str()).or_default().push(node);
        }
        let edges = self.edges();
        let component_of: HashMap<&str, &str> = self
            .graph
            .node_weights()
            .map(|n| (n.id.as_str(), n.user.as_str()))
            .collect();

        members
            .into_par_iter()
            .map(|(component, nodes)| {
                let links = edges
                    .iter()
                    .filter(|e| {
                        component_of.get(e.consumer.as_str()) == Some(&component)
                            && component_of.get(e.provider.as_str()) == Some(&component)
                    })
                    .cloned()
                    .collect();
                let doc = GraphDoc {
                    links,
                    nodes: nodes.into_iter().cloned().collect(),
                };
                (component.to_string(), doc)
            })
            .collect()
    }

    /// Components collapsed to single nodes with summed sizes, linked
    /// wherever a file edge crosses from one component to another.
    pub fn root_graph(&self) -> RootGraphDoc {
        let mut totals: BTreeMap<&str, (usize, u64)> = BTreeMap::new();
        for node in self.graph.node_weights() {
            let entry = totals.entry(node.user.as_str()).or_default();
            entry.0 += 1;
            entry.1 += node.file_size;
        }

        let links: BTreeSet<DependencyEdge> = self
            .graph
            .edge_references()
            .filter_map(|e| {
                let from = &self.graph[e.source()].user;
                let to = &self.graph[e.target()].user;
                (from != to).then(|| DependencyEdge::new(from.as_str(), to.as_str()))
            })
            .collect();

        GraphDoc {
            links: links.into_iter().collect(),
            nodes: totals
                .into_iter()
                .map(|(component, (file_count, file_size))| ComponentNode {
                    description: component.to_string(),
                    file_count,
                    file_size,
                    id: component.to_string(),
                })
                .collect(),
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> DependencyGraph {
        let files = [
            ("repos/teamA/src/A.java", "teamA", 100),
            ("repos/teamA/src/B.java", "teamA", 50),
            ("repos/teamB/src/C.java", "teamB", 30),
            ("repos/tools/run.py", "Unknown", 7),
        ];
        let sizes = files
            .iter()
            .map(|(p, _, s)| (p.to_string(), *s as u64))
            .collect();
        let components = files
            .iter()
            .map(|(p, c, _)| (p.to_string(), c.to_string()))
            .collect();
        let edges = [
            ("repos/teamA/src/B.java", "repos/teamA/src/A.java"),
            ("repos/teamB/src/C.java", "repos/teamA/src/A.java"),
            ("repos/teamB/src/C.java", "repos/teamA/src/B.java"),
        ]
        .iter()
        .map(|(c, p)| DependencyEdge::new(*c, *p))
        .collect();
        let packages = [("repos/teamA/src/A.java".to_string(), "com.a".to_string())]
            .into_iter()
            .collect();
        DependencyGraph::build(&sizes, &components, &packages, &edges)
    }

    #[test]
    fn test_build_graph() {
        let graph = sample_graph();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        let node = graph.nodes()[0];
        assert_eq!(node.id, "repos/teamA/src/A.java");
        assert_eq!(node.package, "com.a");
        // No declared package
        assert_eq!(graph.nodes()[3].package, "");
        assert_eq!(node.description, "");
    }

    #[test]
    fn test_no_duplicate_nodes_or_edges() {
        let mut graph = DependencyGraph::new();
        graph.add_file(FileNode::new("a.go", "Unknown", 1));
        graph.add_file(FileNode::new("a.go", "Unknown", 1));
        graph.add_file(FileNode::new("b.go", "Unknown", 1));
        assert!(graph.add_edge(&DependencyEdge::new("b.go", "a.go")));
        assert!(graph.add_edge(&DependencyEdge::new("b.go", "a.go")));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_self_and_dangling_edges_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add_file(FileNode::new("a.go", "Unknown", 1));
        assert!(!graph.add_edge(&DependencyEdge::new("a.go", "a.go")));
        assert!(!graph.add_edge(&DependencyEdge::new("a.go", "missing.go")));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_component_graphs_keep_internal_edges_only() {
        let graph = sample_graph();
        let components = graph.component_graphs();
        assert_eq!(
            components.keys().collect::<Vec<_>>(),
            vec!["Unknown", "teamA", "teamB"]
        );

        let team_a = &components["teamA"];
        assert_eq!(team_a.nodes.len(), 2);
        assert_eq!(
            team_a.links,
            vec![DependencyEdge::new(
                "repos/teamA/src/B.java",
                "repos/teamA/src/A.java"
            )]
        );
        assert!(components["teamB"].links.is_empty());

        for doc in components.values() {
            let ids: BTreeSet<&str> = doc.nodes.iter().map(|n| n.id.as_str()).collect();
            for link in &doc.links {
                assert!(ids.contains(link.consumer.as_str()));
                assert!(ids.contains(link.provider.as_str()));
            }
        }
    }

    #[test]
    fn test_root_graph_aggregates_components() {
        let graph = sample_graph();
        let root = graph.root_graph();

        let team_a = root.nodes.iter().find(|n| n.id == "teamA").unwrap();
        assert_eq!(team_a.file_count, 2);
        assert_eq!(team_a.file_size, 150);
        assert_eq!(team_a.description, "teamA");

        // Two file edges from teamB into teamA collapse to one link and
        // the intra-teamA edge produces no self link.
        assert_eq!(root.links, vec![DependencyEdge::new("teamB", "teamA")]);

        let file_nodes = graph.nodes();
        for node in &root.nodes {
            let members = file_nodes.iter().filter(|n| n.user == node.id).count();
            assert_eq!(node.file_count, members);
        }
    }

    #[test]
    fn test_find_cycles() {
        let mut graph = DependencyGraph::new();
        for id in ["a.go", "b.go", "c.go"] {
            graph.add_file(FileNode::new(id, "Unknown", 1));
        }
        graph.add_edge(&DependencyEdge::new("a.go", "b.go"));
        graph.add_edge(&DependencyEdge::new("b.go", "a.go"));
        graph.add_edge(&DependencyEdge::new("c.go", "a.go"));

        let cycles = graph.find_cycles();
        assert_eq!(cycles, vec![vec!["a.go".to_string(), "b.go".to_string()]]);
    }

    #[test]
    fn test_file_node_serializes_sorted_keys() {
        let json = serde_json::to_string(&FileNode::new("r/x/src/a.c", "x", 3)).unwrap();
        assert_eq!(
            json,
            r#"{"description":"","fileSize":3,"id":"r/x/src/a.c","package":"","user":"x"}"#
        );
    }
}
