//! Graph command: dependency-first cell order, one id per line.

use std::path::Path;
use std::process::ExitCode;

use woof_core::{DependencyGraph, read_file, validate};

pub fn execute(notebook_path: &Path) -> anyhow::Result<ExitCode> {
    let notebook = read_file(notebook_path)?;
    if let Some(problem) = validate(&notebook).into_iter().next() {
        return Err(problem.into());
    }

    let graph = DependencyGraph::build(&notebook.cells);
    for id in graph.topological_order()? {
        println!("{}", id);
    }

    Ok(ExitCode::SUCCESS)
}
