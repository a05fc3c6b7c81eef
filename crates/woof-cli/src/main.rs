//! woof CLI - runs WOOF notebooks from the terminal.

mod colors;
mod graph;
mod lint;
mod output;
mod progress;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use woof_core::RunMode;
use woof_core::paths::DEFAULT_NOTEBOOK;

#[derive(Parser)]
#[command(name = "woof")]
#[command(about = "Execution engine for WOOF notebooks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every cell, or only the selected ones
    Run {
        /// Path to the notebook (.woofnb file)
        #[arg(default_value = DEFAULT_NOTEBOOK)]
        notebook: PathBuf,

        /// Run only this cell (repeatable)
        #[arg(long = "cell", value_name = "ID")]
        cells: Vec<String>,

        /// Do not pull in dependencies of selected cells
        #[arg(long, requires = "cells")]
        no_deps: bool,

        /// Write the sidecar log here instead of <notebook>.out
        #[arg(long, value_name = "PATH")]
        log: Option<PathBuf>,
    },

    /// Run test cells and everything they depend on
    Test {
        /// Path to the notebook (.woofnb file)
        #[arg(default_value = DEFAULT_NOTEBOOK)]
        notebook: PathBuf,

        /// Write the sidecar log here instead of <notebook>.out
        #[arg(long, value_name = "PATH")]
        log: Option<PathBuf>,
    },

    /// Print cell ids in dependency-first order, one per line
    Graph {
        /// Path to the notebook (.woofnb file)
        #[arg(default_value = DEFAULT_NOTEBOOK)]
        notebook: PathBuf,
    },

    /// Report every structural problem in a notebook
    Lint {
        /// Path to the notebook (.woofnb file)
        #[arg(default_value = DEFAULT_NOTEBOOK)]
        notebook: PathBuf,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Helper to format woof-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(woof_err) = err.downcast_ref::<woof_core::Error>() {
            anyhow::anyhow!("{}", woof_err.with_hint())
        } else {
            err
        }
    };

    let code = match cli.command {
        Commands::Run {
            notebook,
            cells,
            no_deps,
            log,
        } => {
            let mode = if cells.is_empty() {
                RunMode::All
            } else {
                RunMode::select(cells, !no_deps)
            };
            run::execute(&notebook, mode, log).map_err(format_error)?
        }

        Commands::Test { notebook, log } => {
            run::execute(&notebook, RunMode::Tests, log).map_err(format_error)?
        }

        Commands::Graph { notebook } => graph::execute(&notebook).map_err(format_error)?,

        Commands::Lint { notebook } => lint::execute(&notebook).map_err(format_error)?,
    };

    Ok(code)
}
