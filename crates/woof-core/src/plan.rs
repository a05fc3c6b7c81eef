//! Execution planning: which cells run, and in what order.
//!
//! Planning validates the whole notebook first (ids, dependencies, cycles),
//! so a broken notebook fails before anything is executed or logged.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use crate::notebook::{CellType, Notebook};

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Every cell.
    All,
    /// Test cells plus their dependency closures.
    Tests,
    /// Explicitly selected ids, optionally with their dependency closures.
    Selection { ids: Vec<String>, include_deps: bool },
}

impl RunMode {
    pub fn select(ids: impl IntoIterator<Item = impl Into<String>>, include_deps: bool) -> Self {
        RunMode::Selection {
            ids: ids.into_iter().map(Into::into).collect(),
            include_deps,
        }
    }

    /// Short label recorded in the run result.
    pub fn label(&self) -> &'static str {
        match self {
            RunMode::All => "all",
            RunMode::Tests => "tests",
            RunMode::Selection { .. } => "selection",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered set of cells to run, plus the graph used to derive it.
pub struct Plan {
    pub mode: RunMode,
    pub order: Vec<String>,
    graph: DependencyGraph,
}

impl Plan {
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Transitive dependencies of `id`, excluding `id` itself.
    pub fn transitive_dependencies(&self, id: &str) -> BTreeSet<String> {
        let mut closure = self.graph.dependency_closure(id);
        closure.remove(id);
        closure
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Check ids, dependencies and acyclicity.
///
/// Returns every problem found; an empty list means the notebook can be
/// planned.
pub fn validate(notebook: &Notebook) -> Vec<Error> {
    let mut problems = Vec::new();

    let mut seen = HashSet::new();
    for (position, cell) in notebook.cells.iter().enumerate() {
        if cell.id.is_empty() {
            problems.push(Error::EmptyId(position));
        } else if !seen.insert(cell.id.as_str()) {
            problems.push(Error::DuplicateId(cell.id.clone()));
        }
    }

    let graph = DependencyGraph::build(&notebook.cells);
    for (cell, dependency) in graph.missing_dependencies() {
        problems.push(Error::MissingDependency {
            cell: cell.clone(),
            dependency: dependency.clone(),
        });
    }
    if let Err(cycle) = graph.detect_cycle() {
        problems.push(cycle);
    }

    problems
}

/// Compute the ordered execution set for `mode`.
///
/// Result order is always execution order (file order under both
/// `execution.order` settings), never selection order. Selected ids that do
/// not exist are dropped silently.
pub fn plan(notebook: &Notebook, mode: &RunMode) -> Result<Plan> {
    if let Some(problem) = validate(notebook).into_iter().next() {
        return Err(problem);
    }

    let graph = DependencyGraph::build(&notebook.cells);
    let order = graph.execution_order(notebook.config.execution.order)?;

    let order = match mode {
        RunMode::All => order,
        RunMode::Tests => {
            let roots = notebook
                .cells
                .iter()
                .filter(|c| c.kind == CellType::Test)
                .map(|c| c.id.as_str());
            restrict(order, closures(&graph, roots))
        }
        RunMode::Selection { ids, include_deps } => {
            let wanted = if *include_deps {
                closures(&graph, ids.iter().map(String::as_str))
            } else {
                ids.iter().cloned().collect()
            };
            restrict(order, wanted)
        }
    };

    tracing::debug!("Planned {} cells for mode '{}'", order.len(), mode);

    Ok(Plan {
        mode: mode.clone(),
        order,
        graph,
    })
}

fn closures<'a>(graph: &DependencyGraph, roots: impl Iterator<Item = &'a str>) -> HashSet<String> {
    roots
        .filter(|root| graph.contains(root))
        .flat_map(|root| graph.dependency_closure(root))
        .collect()
}

fn restrict(order: Vec<String>, wanted: HashSet<String>) -> Vec<String> {
    order.into_iter().filter(|id| wanted.contains(id)).collect()
}
