//! Capability tokens for cell I/O.
//!
//! An interpreter can only touch the file system or the network through
//! [`FileAccess`] and [`NetAccess`]. Those handles exist only inside a
//! [`Capabilities`] value granted for a single attempt, so a cell that was
//! not granted a capability has no way to exercise it, and nothing global
//! has to be restored afterwards.

use std::fs;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use crate::interp::ExecError;
use crate::notebook::{Cell, CellType, IoPolicy, SideEffect};

/// File-system access handle.
#[derive(Debug)]
pub struct FileAccess {
    _private: (),
}

impl FileAccess {
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Result<String, ExecError> {
        Ok(fs::read_to_string(path)?)
    }

    pub fn write(&self, path: impl AsRef<Path>, contents: &str) -> Result<(), ExecError> {
        Ok(fs::write(path, contents)?)
    }
}

/// Network access handle.
#[derive(Debug)]
pub struct NetAccess {
    _private: (),
}

impl NetAccess {
    /// Open a TCP connection to the first address `addr` resolves to.
    pub fn connect(&self, addr: &str, timeout: Duration) -> Result<TcpStream, ExecError> {
        let target = addr.to_socket_addrs()?.next().ok_or_else(|| {
            ExecError::Execution(format!("address '{}' did not resolve", addr))
        })?;
        Ok(TcpStream::connect_timeout(&target, timeout)?)
    }
}

/// The capabilities granted to one attempt.
#[derive(Debug, Default)]
pub struct Capabilities {
    files: Option<FileAccess>,
    network: Option<NetAccess>,
}

impl Capabilities {
    /// Nothing granted.
    pub fn none() -> Self {
        Self::default()
    }

    /// Each capability needs both the document policy switch and the cell's
    /// `sidefx` request.
    pub fn grant(policy: &IoPolicy, sidefx: SideEffect) -> Self {
        Self::from_flags(
            policy.allow_files && sidefx.wants_files(),
            policy.allow_network && sidefx.wants_network(),
        )
    }

    /// Grant from already-resolved switches, e.g. worker command-line flags.
    pub fn from_flags(files: bool, network: bool) -> Self {
        Self {
            files: files.then_some(FileAccess { _private: () }),
            network: network.then_some(NetAccess { _private: () }),
        }
    }

    pub fn files(&self) -> Result<&FileAccess, ExecError> {
        self.files
            .as_ref()
            .ok_or_else(|| ExecError::Policy("File access not allowed".to_string()))
    }

    pub fn network(&self) -> Result<&NetAccess, ExecError> {
        self.network
            .as_ref()
            .ok_or_else(|| ExecError::Policy("Network access not allowed".to_string()))
    }

    pub fn allows_files(&self) -> bool {
        self.files.is_some()
    }

    pub fn allows_network(&self) -> bool {
        self.network.is_some()
    }
}

/// Whether a shell cell may run.
///
/// A `bash` cell requests the shell by its type alone; any other cell needs
/// `sidefx=shell`. The document must allow the shell in both cases.
pub fn shell_granted(policy: &IoPolicy, cell: &Cell) -> bool {
    policy.allow_shell && (cell.kind == CellType::Bash || cell.header.sidefx().wants_shell())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn policy(files: bool, network: bool, shell: bool) -> IoPolicy {
        IoPolicy {
            allow_files: files,
            allow_network: network,
            allow_shell: shell,
        }
    }

    #[test]
    fn test_both_conditions_required() {
        assert!(!Capabilities::grant(&policy(false, false, false), SideEffect::Fs).allows_files());
        assert!(!Capabilities::grant(&policy(true, false, false), SideEffect::None).allows_files());
        assert!(Capabilities::grant(&policy(true, false, false), SideEffect::Fs).allows_files());
        assert!(!Capabilities::grant(&policy(true, false, false), SideEffect::Net).allows_files());
    }

    #[test]
    fn test_shell_sidefx_implies_files_and_network() {
        let caps = Capabilities::grant(&policy(true, true, false), SideEffect::Shell);
        assert!(caps.allows_files());
        assert!(caps.allows_network());
    }

    #[test]
    fn test_denied_access_is_a_policy_error() {
        let caps = Capabilities::none();
        assert_eq!(caps.files().unwrap_err().ename(), "PolicyError");
        assert_eq!(caps.network().unwrap_err().ename(), "PolicyError");
    }

    #[test]
    fn test_granted_file_access() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.txt");
        let caps = Capabilities::from_flags(true, false);

        caps.files().unwrap().write(&path, "hello").unwrap();
        assert_eq!(caps.files().unwrap().read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn test_shell_granted() {
        let bash = Cell::new("sh", CellType::Bash, "echo hi");
        assert!(shell_granted(&policy(false, false, true), &bash));
        assert!(!shell_granted(&policy(false, false, false), &bash));

        let code = Cell::new("c", CellType::Code, "");
        assert!(!shell_granted(&policy(false, false, true), &code));
        assert!(shell_granted(&policy(false, false, true), &code.with("sidefx", "shell")));
    }
}
