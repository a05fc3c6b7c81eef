//! Terminal rendering of cell output records.

use woof_core::Output;
use woof_core::state::StreamName;

use crate::colors;

/// Print `outputs` indented under the cell's status line.
pub fn print_outputs(outputs: &[Output]) {
    for output in outputs {
        match output {
            Output::Stream {
                name: StreamName::Stdout,
                text,
            } => print_indented(text, "", ""),
            Output::Stream {
                name: StreamName::Stderr,
                text,
            } => print_indented(text, colors::YELLOW, colors::RESET),
            Output::ExecuteResult { repr } => {
                println!("    {}= {}{}", colors::DIM, repr, colors::RESET);
            }
            Output::Error { ename, evalue, .. } => {
                println!("    {}{}:{} {}", colors::RED, ename, colors::RESET, evalue);
            }
        }
    }
}

fn print_indented(text: &str, start: &str, end: &str) {
    for line in text.lines() {
        println!("    {}{}{}", start, line, end);
    }
}
