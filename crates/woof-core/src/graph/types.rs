//! Types for the graph engine.

use std::collections::BTreeSet;

use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::notebook::{Cell, ExecutionOrder};

/// DFS visitation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// Not visited yet.
    White,
    /// On the current DFS path.
    Gray,
    /// Finished.
    Black,
}

/// The cell dependency graph.
///
/// Nodes are cell ids in file order; an edge `a -> b` means `a` declares
/// `b` in its `deps=` list. Building never fails: declared dependencies on
/// ids that are not in the notebook are remembered instead of added as edges.
pub struct DependencyGraph {
    /// The directed graph: edges go from dependent to dependency
    graph: DiGraph<String, ()>,
    /// Cell id to node index mapping
    node_indices: FxHashMap<String, NodeIndex>,
    /// (cell, dependency) pairs whose dependency is not a node
    missing: Vec<(String, String)>,
}

impl DependencyGraph {
    /// Build the graph from cells in file order.
    ///
    /// When an id occurs twice, the first occurrence owns the node.
    pub fn build(cells: &[Cell]) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = FxHashMap::default();

        for cell in cells {
            if !node_indices.contains_key(&cell.id) {
                let idx = graph.add_node(cell.id.clone());
                node_indices.insert(cell.id.clone(), idx);
            }
        }

        let mut missing = Vec::new();
        for cell in cells {
            let from = node_indices[&cell.id];
            for dep in cell.deps() {
                match node_indices.get(&dep) {
                    Some(&to) => {
                        graph.update_edge(from, to, ());
                    }
                    None => missing.push((cell.id.clone(), dep)),
                }
            }
        }

        Self {
            graph,
            node_indices,
            missing,
        }
    }

    /// File order verbatim.
    pub fn linear_order(cells: &[Cell]) -> Vec<String> {
        cells.iter().map(|c| c.id.clone()).collect()
    }

    /// Declared dependencies that do not name a cell, as `(cell, dependency)`.
    pub fn missing_dependencies(&self) -> &[(String, String)] {
        &self.missing
    }

    /// Fail with the first missing dependency, if any.
    pub fn check_dependencies(&self) -> Result<()> {
        match self.missing.first() {
            Some((cell, dependency)) => Err(Error::MissingDependency {
                cell: cell.clone(),
                dependency: dependency.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Detect a cycle with a white/gray/black depth-first traversal.
    ///
    /// Reaching a gray node means the current path loops back on itself.
    pub fn detect_cycle(&self) -> Result<()> {
        self.finish_order().map(|_| ())
    }

    /// Dependencies-first ordering from the DFS finish order.
    ///
    /// Roots are visited in file order and dependencies in declaration order,
    /// so the result is deterministic.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        Ok(self
            .finish_order()?
            .into_iter()
            .map(|idx| self.graph[idx].clone())
            .collect())
    }

    /// Order used by `execution.order`.
    ///
    /// Graph mode runs the topological sort (and so fails on cycles) but then
    /// stabilizes the result by file position: file order is the
    /// authoritative tie-break and wins over dependency order.
    pub fn execution_order(&self, order: ExecutionOrder) -> Result<Vec<String>> {
        match order {
            ExecutionOrder::Linear => Ok(self.node_ids().collect()),
            ExecutionOrder::Graph => {
                let mut ids = self.finish_order()?;
                ids.sort_by_key(|idx| idx.index());
                Ok(ids.into_iter().map(|idx| self.graph[idx].clone()).collect())
            }
        }
    }

    /// The root plus every id reachable through dependency edges.
    pub fn dependency_closure(&self, root: &str) -> BTreeSet<String> {
        let mut closure = BTreeSet::from([root.to_string()]);
        let Some(&start) = self.node_indices.get(root) else {
            return closure;
        };

        let mut stack = vec![start];
        let mut visited = BTreeSet::from([start]);
        while let Some(idx) = stack.pop() {
            for dep in self.graph.neighbors(idx) {
                if visited.insert(dep) {
                    closure.insert(self.graph[dep].clone());
                    stack.push(dep);
                }
            }
        }

        closure
    }

    /// Direct dependencies of a cell, in declaration order.
    pub fn dependencies(&self, id: &str) -> Vec<String> {
        self.node_indices
            .get(id)
            .map(|&idx| {
                self.ordered_neighbors(idx)
                    .into_iter()
                    .map(|dep| self.graph[dep].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Position of a cell id in file order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.node_indices.get(id).map(|idx| idx.index())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_indices.contains_key(id)
    }

    /// Get the number of cells.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn node_ids(&self) -> impl Iterator<Item = String> + '_ {
        self.graph.node_indices().map(|idx| self.graph[idx].clone())
    }

    /// petgraph yields neighbors newest-edge first; flip to declaration order.
    fn ordered_neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        next.reverse();
        next
    }

    /// Iterative three-color DFS returning nodes in finish order.
    fn finish_order(&self) -> Result<Vec<NodeIndex>> {
        let mut marks = vec![Mark::White; self.graph.node_count()];
        let mut finished = Vec::with_capacity(self.graph.node_count());

        for root in self.graph.node_indices() {
            if marks[root.index()] != Mark::White {
                continue;
            }

            marks[root.index()] = Mark::Gray;
            let mut stack = vec![(root, self.ordered_neighbors(root), 0usize)];

            while let Some((node, next, cursor)) = stack.last_mut() {
                if let Some(&dep) = next.get(*cursor) {
                    *cursor += 1;
                    match marks[dep.index()] {
                        Mark::White => {
                            marks[dep.index()] = Mark::Gray;
                            let deps = self.ordered_neighbors(dep);
                            stack.push((dep, deps, 0));
                        }
                        Mark::Gray => {
                            return Err(Error::Cycle {
                                cell: Some(self.graph[dep].clone()),
                            });
                        }
                        Mark::Black => {}
                    }
                } else {
                    let node = *node;
                    marks[node.index()] = Mark::Black;
                    finished.push(node);
                    stack.pop();
                }
            }
        }

        Ok(finished)
    }
}
