//! Overlay subprocess lifecycle tests.
//!
//! A shell script stands in for the real overlay binary so the pid-file
//! handshake and the socket derivation can be exercised end to end.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anipick::ProcessError;
use anipick::overlay::OverlaySession;

fn fake_overlay(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-overlay");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

const WELL_BEHAVED: &str = r#"
case "$1" in
  --version) exit 0 ;;
  layer)
    shift
    while [ $# -gt 0 ]; do
      if [ "$1" = "--pid-file" ]; then printf '4242\n' > "$2"; fi
      shift
    done
    exit 0 ;;
  cmd) exit 0 ;;
esac
exit 1
"#;

// =============================================================================
// Spawn and socket derivation
// =============================================================================

#[tokio::test]
async fn spawn_reads_the_pid_file_and_derives_the_socket() {
    let dir = tempfile::tempdir().unwrap();
    let program = fake_overlay(dir.path(), WELL_BEHAVED);
    let pid_file = dir.path().join("overlay.pid");

    let mut session = OverlaySession::spawn(program.to_str().unwrap(), &pid_file)
        .await
        .unwrap();
    assert_eq!(session.socket(), "/tmp/ueberzugpp-4242.socket");

    session.exit().await;
    // A second exit is a no-op, not an error.
    session.exit().await;
}

#[tokio::test]
async fn availability_probe_runs_the_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    let program = fake_overlay(dir.path(), WELL_BEHAVED);

    assert!(OverlaySession::is_available(program.to_str().unwrap()).await);
    assert!(!OverlaySession::is_available("anipick-overlay-that-does-not-exist").await);
}

// =============================================================================
// Failure modes
// =============================================================================

#[tokio::test]
async fn a_failing_layer_command_is_an_unexpected_exit() {
    let dir = tempfile::tempdir().unwrap();
    let program = fake_overlay(dir.path(), "case \"$1\" in --version) exit 0 ;; esac\nexit 3");
    let pid_file = dir.path().join("overlay.pid");

    let err = OverlaySession::spawn(program.to_str().unwrap(), &pid_file)
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::UnexpectedExit { .. }));
    assert!(err.to_string().contains("exited with status"));
}

#[tokio::test]
async fn a_missing_pid_file_is_reported_with_its_path() {
    let dir = tempfile::tempdir().unwrap();
    // Exits cleanly but never writes the pid file.
    let program = fake_overlay(dir.path(), "exit 0");
    let pid_file = dir.path().join("overlay.pid");

    let err = OverlaySession::spawn(program.to_str().unwrap(), &pid_file)
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::PidFile { .. }));
    assert!(err.to_string().contains("overlay.pid"));
}

#[tokio::test]
async fn spawning_a_missing_program_is_a_launch_error() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("overlay.pid");

    let err = OverlaySession::spawn("anipick-overlay-that-does-not-exist", &pid_file)
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::Launch { .. }));
}
