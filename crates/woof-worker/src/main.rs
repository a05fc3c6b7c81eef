//! woof worker - runs one isolated cell.
//!
//! The cell body arrives on stdin and is evaluated by the script interpreter
//! in a fresh namespace. Captured output goes to stdout/stderr; a failing
//! body prints its error on stderr and exits with status 1. Timeouts are the
//! parent's job: it kills this process when the cell overruns.

use std::io::{self, Read, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use woof_core::execute::{Capabilities, CancelToken};
use woof_core::interp::{Interpreter, Namespace, ScriptInterpreter, Session};

#[derive(Parser)]
#[command(name = "woof-worker")]
#[command(about = "Run one woof cell body read from stdin")]
#[command(version)]
struct Args {
    /// Grant file-system access
    #[arg(long)]
    allow_files: bool,

    /// Grant network access
    #[arg(long)]
    allow_network: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let mut body = String::new();
    io::stdin()
        .read_to_string(&mut body)
        .context("Failed to read cell body from stdin")?;

    let mut namespace = Namespace::new();
    let capabilities = Capabilities::from_flags(args.allow_files, args.allow_network);
    tracing::debug!(
        "Running {} bytes (files: {}, network: {})",
        body.len(),
        args.allow_files,
        args.allow_network
    );

    let mut session = Session::new(&mut namespace, capabilities, CancelToken::new());
    let result = ScriptInterpreter.run(&body, &mut session);
    let (stdout, stderr) = session.into_streams();

    io::stdout().write_all(stdout.as_bytes())?;
    io::stdout().flush()?;
    io::stderr().write_all(stderr.as_bytes())?;

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{}: {}", e.ename(), e);
            Ok(ExitCode::FAILURE)
        }
    }
}
