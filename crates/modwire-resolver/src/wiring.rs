//! Module-level dependency graph construction and traversal.
//!
//! Built on demand from resolution state (wires) or from candidate lists;
//! nodes are module IDs, so cycles in the module graph never become
//! ownership cycles.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use modwire_core::descriptor::ModuleId;
use modwire_core::version::Version;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// A node in the wiring graph.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ModuleNode {
    pub id: ModuleId,
    pub symbolic_name: String,
    pub version: Version,
}

impl fmt::Display for ModuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.symbolic_name, self.version, self.id)
    }
}

/// Edge label: why the source depends on the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireKind {
    /// The source imports `package` from the target.
    Package(String),
    /// The source requires the target module.
    Module,
    /// The source is a fragment attached to the target.
    Host,
    /// The target is a fragment whose exports the source offers.
    Fragment,
    /// The target appears in one of the source's candidate lists.
    Candidate,
}

/// A directed module dependency graph backed by petgraph.
pub struct DependencyGraph {
    graph: DiGraph<ModuleNode, WireKind>,
    index: HashMap<ModuleId, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Add or retrieve a node. If the module already exists, returns the existing index.
    pub fn add_node(&mut self, node: ModuleNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            return idx;
        }
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Add an edge from `from` to `to`. Self loops and duplicates are dropped.
    pub fn add_edge(&mut self, from: ModuleId, to: ModuleId, kind: WireKind) {
        if from == to {
            return;
        }
        let (Some(&a), Some(&b)) = (self.index.get(&from), self.index.get(&to)) else {
            return;
        };
        if !self
            .graph
            .edges(a)
            .any(|e| e.target() == b && *e.weight() == kind)
        {
            self.graph.add_edge(a, b, kind);
        }
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn node(&self, id: ModuleId) -> Option<&ModuleNode> {
        self.index.get(&id).map(|&idx| &self.graph[idx])
    }

    /// Direct dependencies of a module.
    pub fn dependencies_of(&self, id: ModuleId) -> Vec<(ModuleId, &WireKind)> {
        self.neighbours(id, Direction::Outgoing)
    }

    /// Reverse dependencies (who depends on this module).
    pub fn dependents_of(&self, id: ModuleId) -> Vec<(ModuleId, &WireKind)> {
        self.neighbours(id, Direction::Incoming)
    }

    fn neighbours(&self, id: ModuleId, direction: Direction) -> Vec<(ModuleId, &WireKind)> {
        let Some(&idx) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut out: Vec<(ModuleId, &WireKind)> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (self.graph[other].id, e.weight())
            })
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    /// Every module that transitively depends on one of `roots`, in
    /// breadth-first discovery order. The roots themselves are excluded.
    pub fn transitive_dependents(&self, roots: &[ModuleId]) -> Vec<ModuleId> {
        let mut seen: HashSet<ModuleId> = roots.iter().copied().collect();
        let mut queue: VecDeque<ModuleId> = roots.iter().copied().collect();
        let mut out = Vec::new();
        while let Some(id) = queue.pop_front() {
            for (dep, _) in self.dependents_of(id) {
                if seen.insert(dep) {
                    out.push(dep);
                    queue.push_back(dep);
                }
            }
        }
        out
    }

    /// Strongly connected components, suppliers before their dependents.
    /// Members of each component are sorted by module ID.
    pub fn components(&self) -> Vec<Vec<ModuleId>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .map(|scc| {
                let mut ids: Vec<ModuleId> =
                    scc.into_iter().map(|idx| self.graph[idx].id).collect();
                ids.sort();
                ids
            })
            .collect()
    }

    /// Print the wiring below `root`, grouping direct dependencies by kind.
    pub fn print_tree(&self, root: ModuleId, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let Some(node) = self.node(root) else {
            return output;
        };
        output.push_str(&format!("{node}\n"));

        let deps = self.dependencies_of(root);
        let mut imports = Vec::new();
        let mut requires = Vec::new();
        let mut attached = Vec::new();
        for (id, kind) in &deps {
            match kind {
                WireKind::Package(_) => imports.push((*id, *kind)),
                WireKind::Module => requires.push((*id, *kind)),
                WireKind::Host | WireKind::Fragment => attached.push((*id, *kind)),
                WireKind::Candidate => {}
            }
        }

        let sections: Vec<(&str, &Vec<(ModuleId, &WireKind)>)> =
            [("[imports]", &imports), ("[requires]", &requires), ("[attached]", &attached)]
                .into_iter()
                .filter(|(_, list)| !list.is_empty())
                .collect();
        let show_headers = sections.len() > 1;
        let mut visited = HashSet::new();
        visited.insert(root);

        let total = sections.len();
        for (n, (label, list)) in sections.iter().enumerate() {
            if show_headers {
                output.push_str(&format!("{label}\n"));
            }
            let is_last_section = n + 1 == total;
            for (i, (id, kind)) in list.iter().enumerate() {
                let is_last = i + 1 == list.len() && is_last_section;
                self.print_subtree(&mut output, *id, kind, "", is_last, 1, max_depth, &mut visited);
            }
        }

        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        id: ModuleId,
        kind: &WireKind,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<ModuleId>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let Some(node) = self.node(id) else {
            return;
        };
        match kind {
            WireKind::Package(package) => {
                output.push_str(&format!("{prefix}{connector}{package} <- {node}\n"))
            }
            _ => output.push_str(&format!("{prefix}{connector}{node}\n")),
        }

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        if !visited.insert(id) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps: Vec<_> = self
            .dependencies_of(id)
            .into_iter()
            .filter(|(_, k)| !matches!(k, WireKind::Candidate | WireKind::Fragment))
            .collect();
        let count = deps.len();
        for (i, (child, child_kind)) in deps.iter().enumerate() {
            self.print_subtree(
                output,
                *child,
                child_kind,
                &child_prefix,
                i + 1 == count,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&id);
    }

    /// Number of modules in the graph.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
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

    fn graph_of(ids: &[u64]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for &id in ids {
            g.add_node(ModuleNode {
                id: ModuleId(id),
                symbolic_name: format!("m{id}"),
                version: Version::new(1, 0, 0),
            });
        }
        g
    }

    #[test]
    fn duplicate_add_returns_same_index() {
        let mut g = graph_of(&[1]);
        let idx = g.add_node(ModuleNode {
            id: ModuleId(1),
            symbolic_name: "m1".into(),
            version: Version::new(1, 0, 0),
        });
        assert_eq!(g.len(), 1);
        assert_eq!(g.node(ModuleId(1)).map(|n| n.symbolic_name.as_str()), Some("m1"));
        assert_eq!(idx.index(), 0);
    }

    #[test]
    fn self_loops_are_ignored() {
        let mut g = graph_of(&[1]);
        g.add_edge(ModuleId(1), ModuleId(1), WireKind::Module);
        assert!(g.dependencies_of(ModuleId(1)).is_empty());
    }

    #[test]
    fn transitive_dependents_in_discovery_order() {
        let mut g = graph_of(&[1, 2, 3, 4]);
        g.add_edge(ModuleId(2), ModuleId(1), WireKind::Module);
        g.add_edge(ModuleId(3), ModuleId(2), WireKind::Package("p".into()));
        g.add_edge(ModuleId(4), ModuleId(3), WireKind::Module);
        assert_eq!(
            g.transitive_dependents(&[ModuleId(1)]),
            [ModuleId(2), ModuleId(3), ModuleId(4)]
        );
        assert!(g.transitive_dependents(&[ModuleId(4)]).is_empty());
    }

    #[test]
    fn components_put_suppliers_first() {
        let mut g = graph_of(&[1, 2, 3, 4]);
        // 1 <-> 2 form a cycle, 3 depends on it, 4 is independent
        g.add_edge(ModuleId(1), ModuleId(2), WireKind::Candidate);
        g.add_edge(ModuleId(2), ModuleId(1), WireKind::Candidate);
        g.add_edge(ModuleId(3), ModuleId(1), WireKind::Candidate);
        let comps = g.components();
        assert_eq!(comps.len(), 3);
        let cycle = comps.iter().position(|c| c == &[ModuleId(1), ModuleId(2)]).unwrap();
        let dependent = comps.iter().position(|c| c == &[ModuleId(3)]).unwrap();
        assert!(cycle < dependent);
    }

    #[test]
    fn tree_printing_groups_by_kind() {
        let mut g = graph_of(&[1, 2, 3]);
        g.add_edge(ModuleId(1), ModuleId(2), WireKind::Package("p".into()));
        g.add_edge(ModuleId(1), ModuleId(3), WireKind::Module);
        let tree = g.print_tree(ModuleId(1), None);
        assert!(tree.starts_with("m1 1.0.0 (#1)"));
        assert!(tree.contains("[imports]"));
        assert!(tree.contains("p <- m2 1.0.0 (#2)"));
        assert!(tree.contains("[requires]"));
        let imports = tree.find("[imports]").unwrap();
        let requires = tree.find("[requires]").unwrap();
        assert!(imports < requires);
    }

    #[test]
    fn tree_printing_unknown_root_is_empty() {
        let g = graph_of(&[1]);
        assert!(g.print_tree(ModuleId(9), None).is_empty());
    }
}
