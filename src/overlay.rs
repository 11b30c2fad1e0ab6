use std::fs;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ProcessError;

const SOCKET_PREFIX: &str = "/tmp/ueberzugpp-";

/// A resident image-overlay subprocess (ueberzug `layer` mode).
///
/// The session only exists in its spawned state: [`OverlaySession::spawn`] is
/// the constructor, so a connection id can never be read before the process
/// is up. `exit()` is terminal; there is no respawn. Dropping a session that
/// was never exited fires a best-effort exit command so the overlay cannot
/// outlive the program on panic or early-return paths.
#[derive(Debug)]
pub struct OverlaySession {
    program: String,
    pid: String,
    exited: bool,
}

impl OverlaySession {
    /// Probes whether the overlay program is usable at all. Any launch
    /// failure or non-zero exit means "not available"; this never errors.
    pub async fn is_available(program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Launches the overlay in its silent, non-interactive layer mode. The
    /// launch command daemonizes and writes the resident process id to
    /// `pid_file`; we wait for the launcher to finish, then read the id back.
    pub async fn spawn(program: &str, pid_file: &Path) -> Result<Self, ProcessError> {
        let status = Command::new(program)
            .args(["layer", "--no-stdin", "--silent", "--use-escape-codes", "--pid-file"])
            .arg(pid_file)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| ProcessError::Launch {
                name: program.to_string(),
                source,
            })?;
        if !status.success() {
            return Err(ProcessError::UnexpectedExit {
                name: program.to_string(),
                status,
            });
        }

        let pid = fs::read_to_string(pid_file)
            .map_err(|source| ProcessError::PidFile {
                path: pid_file.to_path_buf(),
                source,
            })?
            .trim()
            .to_string();
        debug!(pid, "overlay spawned");

        Ok(Self {
            program: program.to_string(),
            pid,
            exited: false,
        })
    }

    /// The socket address other invocations use to talk to this instance,
    /// derived purely from the recorded pid.
    pub fn socket(&self) -> String {
        socket_path(&self.pid)
    }

    /// Asks the resident instance to close. Failures are reported, never
    /// propagated: shutdown continues regardless. Idempotent.
    pub async fn exit(&mut self) {
        if self.exited {
            return;
        }
        self.exited = true;

        let socket = self.socket();
        let result = Command::new(&self.program)
            .args(["cmd", "-s", &socket, "-a", "exit"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match result {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("overlay exit command returned {status}"),
            Err(err) => warn!("overlay exit command failed: {err}"),
        }
    }
}

impl Drop for OverlaySession {
    fn drop(&mut self) {
        if self.exited {
            return;
        }
        let socket = self.socket();
        let _ = std::process::Command::new(&self.program)
            .args(["cmd", "-s", &socket, "-a", "exit"])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn();
    }
}

fn socket_path(pid: &str) -> String {
    format!("{SOCKET_PREFIX}{pid}.socket")
}
