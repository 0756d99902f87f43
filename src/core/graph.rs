//! Build-output reference graph.
//!
//! The build collaborator hands the engine a directed graph of projects:
//! each node carries the location of its build output, each edge says
//! whether the referenced output is folded into the package. Nodes live in
//! an arena and edges address them by index, so diamonds and cycles cannot
//! create ownership loops.

use std::path::PathBuf;

/// Index of a node inside a [`ReferenceGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A build artifact and the per-target subtree label it is packaged under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// The produced artifact on disk.
    pub file: PathBuf,
    /// Subtree label; the artifact lands at `lib/<subtree>/<file name>`.
    pub subtree: String,
}

#[derive(Debug)]
struct Edge {
    target: NodeId,
    include_in_output: bool,
}

/// One project in the reference graph.
#[derive(Debug)]
pub struct ReferenceNode {
    key: String,
    name: String,
    output: BuildOutput,
    edges: Vec<Edge>,
}

impl ReferenceNode {
    /// Stable node key (derived from the project's declared location).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Display name used in logs and duplicate reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node's build output.
    pub fn output(&self) -> &BuildOutput {
        &self.output
    }
}

/// A build output collected for packaging, tagged with the contributing
/// node's display name.
#[derive(Debug, Clone)]
pub struct CollectedOutput {
    /// Display name of the contributing node.
    pub node: String,
    /// The output to package.
    pub output: BuildOutput,
}

/// Arena-backed directed graph of build-output references.
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    nodes: Vec<ReferenceNode>,
}

impl ReferenceGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its id.
    pub fn add_node(
        &mut self,
        key: impl Into<String>,
        name: impl Into<String>,
        output: BuildOutput,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ReferenceNode {
            key: key.into(),
            name: name.into(),
            output,
            edges: Vec::new(),
        });
        id
    }

    /// Add a reference edge from `from` to `to`.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, include_in_output: bool) {
        self.nodes[from.0].edges.push(Edge {
            target: to,
            include_in_output,
        });
    }

    /// Look up a node by its key.
    pub fn find(&self, key: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.key == key).map(NodeId)
    }

    /// Access a node.
    pub fn node(&self, id: NodeId) -> &ReferenceNode {
        &self.nodes[id.0]
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Collect the transitive set of outputs to include, rooted at `root`.
    ///
    /// The root's own output is always included. A node's output is
    /// included iff at least one root-reachable path reaches it through
    /// include-tagged edges only; exclusion on one path does not veto
    /// inclusion via another. The visited set guarantees each node
    /// contributes at most once and that cycles terminate.
    pub fn collect_outputs(&self, root: NodeId) -> Vec<CollectedOutput> {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        let mut collected = Vec::new();
        visited[root.0] = true;

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            tracing::trace!("including build output of '{}'", node.name);
            collected.push(CollectedOutput {
                node: node.name.clone(),
                output: node.output.clone(),
            });

            for edge in &node.edges {
                if !edge.include_in_output {
                    tracing::trace!(
                        "'{}' excludes the output of '{}'",
                        node.name,
                        self.nodes[edge.target.0].name
                    );
                    continue;
                }
                if !visited[edge.target.0] {
                    visited[edge.target.0] = true;
                    stack.push(edge.target);
                }
            }
        }

        tracing::debug!(
            "collected {} build outputs from {} nodes",
            collected.len(),
            self.nodes.len()
        );
        collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(name: &str) -> BuildOutput {
        BuildOutput {
            file: PathBuf::from(format!("target/{name}.rlib")),
            subtree: "any".to_string(),
        }
    }

    fn names(collected: &[CollectedOutput]) -> Vec<&str> {
        let mut names: Vec<&str> = collected.iter().map(|c| c.node.as_str()).collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn test_direct_include_and_exclude() {
        // Link -> A (include), Link -> B (exclude)
        let mut g = ReferenceGraph::new();
        let link = g.add_node("link", "Link", output("link"));
        let a = g.add_node("a", "A", output("a"));
        let b = g.add_node("b", "B", output("b"));
        g.add_edge(link, a, true);
        g.add_edge(link, b, false);

        assert_eq!(names(&g.collect_outputs(link)), vec!["A", "Link"]);
    }

    #[test]
    fn test_exclusion_cuts_the_subtree() {
        // Link -> A(inc) -> C(inc) -> D(exc); Link -> B(inc) -> E(inc)
        let mut g = ReferenceGraph::new();
        let link = g.add_node("link", "Link", output("link"));
        let a = g.add_node("a", "A", output("a"));
        let b = g.add_node("b", "B", output("b"));
        let c = g.add_node("c", "C", output("c"));
        let d = g.add_node("d", "D", output("d"));
        let e = g.add_node("e", "E", output("e"));
        g.add_edge(link, a, true);
        g.add_edge(a, c, true);
        g.add_edge(c, d, false);
        g.add_edge(link, b, true);
        g.add_edge(b, e, true);

        assert_eq!(names(&g.collect_outputs(link)), vec!["A", "B", "C", "E", "Link"]);
    }

    #[test]
    fn test_inclusion_is_path_existential() {
        // D is excluded via A but included via B; one include path wins.
        let mut g = ReferenceGraph::new();
        let link = g.add_node("link", "Link", output("link"));
        let a = g.add_node("a", "A", output("a"));
        let b = g.add_node("b", "B", output("b"));
        let d = g.add_node("d", "D", output("d"));
        g.add_edge(link, a, true);
        g.add_edge(link, b, true);
        g.add_edge(a, d, false);
        g.add_edge(b, d, true);

        assert_eq!(names(&g.collect_outputs(link)), vec!["A", "B", "D", "Link"]);
    }

    #[test]
    fn test_diamond_contributes_once() {
        // Link -> A -> D and Link -> B -> D, all included: D appears once.
        let mut g = ReferenceGraph::new();
        let link = g.add_node("link", "Link", output("link"));
        let a = g.add_node("a", "A", output("a"));
        let b = g.add_node("b", "B", output("b"));
        let d = g.add_node("d", "D", output("d"));
        g.add_edge(link, a, true);
        g.add_edge(link, b, true);
        g.add_edge(a, d, true);
        g.add_edge(b, d, true);

        let collected = g.collect_outputs(link);
        assert_eq!(collected.len(), 4);
        assert_eq!(names(&collected), vec!["A", "B", "D", "Link"]);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut g = ReferenceGraph::new();
        let link = g.add_node("link", "Link", output("link"));
        let a = g.add_node("a", "A", output("a"));
        g.add_edge(link, a, true);
        g.add_edge(a, link, true);

        assert_eq!(names(&g.collect_outputs(link)), vec!["A", "Link"]);
    }

    #[test]
    fn test_find_by_key() {
        let mut g = ReferenceGraph::new();
        let link = g.add_node("proj/link", "Link", output("link"));
        assert_eq!(g.find("proj/link"), Some(link));
        assert_eq!(g.find("missing"), None);
    }
}
