//! Per-cell progress lines printed during a run.

use woof_core::ExecutionCallback;
use woof_core::Output;

use crate::colors;
use crate::output::print_outputs;

/// Prints one status line per cell followed by its outputs.
#[derive(Default)]
pub struct ProgressCallback;

impl ProgressCallback {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionCallback for ProgressCallback {
    fn on_cell_started(&self, cell_id: &str) {
        print!(
            "{}  ▶ Running{} {}{}{}... ",
            colors::CYAN,
            colors::RESET,
            colors::BOLD,
            cell_id,
            colors::RESET
        );
        colors::flush_stdout();
    }

    fn on_cell_cached(&self, cell_id: &str, outputs: &[Output]) {
        println!(
            "{}  ● Cached{}  {}{}{}",
            colors::DIM,
            colors::RESET,
            colors::BOLD,
            cell_id,
            colors::RESET
        );
        print_outputs(outputs);
    }

    fn on_cell_completed(&self, _cell_id: &str, outputs: &[Output]) {
        println!("{}✓{}", colors::GREEN, colors::RESET);
        print_outputs(outputs);
    }

    fn on_cell_failed(&self, _cell_id: &str, outputs: &[Output]) {
        println!("{}✗{}", colors::RED, colors::RESET);
        print_outputs(outputs);
    }

    fn on_cell_skipped(&self, cell_id: &str) {
        println!("{}  ○ Skipped {}{}", colors::DIM, cell_id, colors::RESET);
    }
}
