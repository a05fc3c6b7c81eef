//! Lint command: report every structural problem, not just the first.

use std::path::Path;
use std::process::ExitCode;

use woof_core::{read_file, validate};

use crate::colors;

pub fn execute(notebook_path: &Path) -> anyhow::Result<ExitCode> {
    let notebook = read_file(notebook_path)?;
    let problems = validate(&notebook);

    if problems.is_empty() {
        println!(
            "{}OK{} {} cells, no problems found",
            colors::GREEN,
            colors::RESET,
            notebook.cells.len()
        );
        return Ok(ExitCode::SUCCESS);
    }

    for problem in &problems {
        println!("{}error:{} {}", colors::RED, colors::RESET, problem);
    }
    println!("{} problem(s) in {}", problems.len(), notebook_path.display());
    Ok(ExitCode::FAILURE)
}
