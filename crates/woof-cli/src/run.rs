//! Run and test commands.
//!
//! Both drive one `Runner` pass; they differ only in the run mode.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use woof_core::{RunMode, RunOptions, Runner};

use crate::colors;
use crate::progress::ProgressCallback;

/// Run `notebook_path` in `mode` and report the outcome.
pub fn execute(notebook_path: &Path, mode: RunMode, log: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let start = Instant::now();

    println!(
        "{}Running{} {} {}({}){}",
        colors::BOLD,
        colors::RESET,
        notebook_path.display(),
        colors::DIM,
        mode,
        colors::RESET
    );

    let mut options = RunOptions::new(mode);
    if let Some(path) = log {
        options = options.with_log(path);
    }

    let runner = Runner::new().with_callback(Box::new(ProgressCallback::new()));
    let result = runner.run_file(notebook_path, &options)?;

    println!("{}", "─".repeat(50));
    if result.success() {
        println!(
            "{}Completed{} {} cells in {:.2}s",
            colors::GREEN,
            colors::RESET,
            result.total,
            start.elapsed().as_secs_f64()
        );
    } else {
        println!(
            "{}Failed{} {} of {} cells: {}",
            colors::RED,
            colors::RESET,
            result.failed.len(),
            result.total,
            result.failed.join(", ")
        );
    }
    println!(
        "{}Log written to {}{}",
        colors::DIM,
        result.log_path.display(),
        colors::RESET
    );

    Ok(ExitCode::from(result.exit_code() as u8))
}
