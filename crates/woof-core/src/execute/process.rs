//! External process runner for isolated cells.
//!
//! The cell body is written to the child's stdin while stdout and stderr are
//! drained on their own threads, so a chatty child never blocks on a full
//! pipe. The timeout is enforced with `wait-timeout`; an overrunning child is
//! killed and reaped.

use std::env;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::error::{Error, Result};
use crate::execute::Capabilities;

/// Environment variable overriding the worker binary location.
pub const WORKER_ENV: &str = "WOOF_WORKER_PATH";

const WORKER_BIN: &str = "woof-worker";

/// What an external process produced.
#[derive(Debug)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed for exceeding its timeout.
    pub status: Option<ExitStatus>,
}

impl ProcessOutput {
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }
}

/// A program that reads a cell body on stdin.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// POSIX shell reading the script from stdin.
    pub fn shell() -> Self {
        Self::new("sh").arg("-s")
    }

    /// The `woof-worker` interpreter, passing on the granted capabilities.
    pub fn worker(override_path: Option<&Path>, capabilities: &Capabilities) -> Result<Self> {
        let program = match override_path {
            Some(path) => path.to_path_buf(),
            None => find_worker()?,
        };
        let mut runner = Self::new(program);
        if capabilities.allows_files() {
            runner = runner.arg("--allow-files");
        }
        if capabilities.allows_network() {
            runner = runner.arg("--allow-network");
        }
        Ok(runner)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Run the program with `input` on stdin.
    ///
    /// Only a failure to start the process is an `Err`; everything the
    /// process does afterwards is reported in [`ProcessOutput`].
    pub fn run(&self, input: &str, timeout: Option<Duration>) -> Result<ProcessOutput> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::Interpreter(format!("failed to start {}: {}", self.program.display(), e))
            })?;

        let feeder = child.stdin.take().map(|mut stdin| {
            let input = input.to_string();
            thread::spawn(move || {
                // The child may exit without reading its input.
                let _ = stdin.write_all(input.as_bytes());
            })
        });
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = wait(&mut child, timeout)?;

        if status.is_none() {
            // Grandchildren may still hold the pipes open; leave the I/O
            // threads behind rather than wait on them.
            tracing::debug!("Killed {} after {:?}", self.program.display(), timeout);
            return Ok(ProcessOutput {
                stdout: String::new(),
                stderr: String::new(),
                status,
            });
        }

        if let Some(feeder) = feeder {
            let _ = feeder.join();
        }
        Ok(ProcessOutput {
            stdout: collect(stdout),
            stderr: collect(stderr),
            status,
        })
    }
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return Ok(Some(child.wait()?));
    };
    match child.wait_timeout(timeout)? {
        Some(status) => Ok(Some(status)),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Ok(None)
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Locate `woof-worker`: the environment override, next to the running
/// executable (or one level up, for test harness binaries), then `PATH`.
pub fn find_worker() -> Result<PathBuf> {
    if let Some(path) = env::var_os(WORKER_ENV) {
        return Ok(PathBuf::from(path));
    }

    let name = format!("{}{}", WORKER_BIN, env::consts::EXE_SUFFIX);
    if let Ok(exe) = env::current_exe() {
        let dirs = exe.parent().into_iter().chain(exe.parent().and_then(Path::parent));
        for dir in dirs {
            let candidate = dir.join(&name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    which::which(WORKER_BIN)
        .map_err(|_| Error::Interpreter(format!("{} not found", WORKER_BIN)))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_shell_captures_streams_and_status() {
        let out = ProcessRunner::shell()
            .run("echo out\necho err 1>&2\nexit 3\n", None)
            .unwrap();
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
        assert_eq!(out.status.and_then(|s| s.code()), Some(3));
    }

    #[test]
    fn test_timeout_kills_process() {
        let start = Instant::now();
        let out = ProcessRunner::shell()
            .run("exec sleep 10\n", Some(Duration::from_millis(200)))
            .unwrap();
        assert!(out.timed_out());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let err = ProcessRunner::new("/nonexistent/woof-worker").run("", None).unwrap_err();
        assert!(matches!(err, Error::Interpreter(_)));
    }

    #[test]
    fn test_worker_flags_follow_capabilities() {
        let path = Path::new("/bin/true");
        let none = ProcessRunner::worker(Some(path), &Capabilities::none()).unwrap();
        assert!(none.args().is_empty());

        let both = ProcessRunner::worker(Some(path), &Capabilities::from_flags(true, true)).unwrap();
        assert_eq!(both.args(), ["--allow-files", "--allow-network"]);
    }
}
