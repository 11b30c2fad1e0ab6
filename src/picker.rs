use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::ProcessError;
use crate::overlay::OverlaySession;
use crate::thumbs::{THUMB_EXTENSION, ThumbnailStore};
use crate::workspace::Workspace;

/// Anything that can appear as one selectable line in a picker round.
pub trait PickEntry {
    fn label(&self) -> &str;
    fn thumbnail(&self) -> Option<&str>;
}

/// The label→entity table of exactly one round, produced by
/// [`PickerSession::write_entries`] and queried after the selection comes
/// back. Each round gets a fresh table; resolving a label from another round
/// yields `None`, never an error.
#[derive(Debug)]
pub struct RoundTable<T> {
    entries: Vec<T>,
}

impl<T: PickEntry> RoundTable<T> {
    fn new(entries: Vec<T>) -> Self {
        Self { entries }
    }

    pub fn resolve(&self, label: &str) -> Option<&T> {
        self.entries.iter().find(|entry| entry.label() == label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Drives the interactive fuzzy-picker subprocess.
///
/// One session lives for the whole program run, but the underlying process is
/// respawned for every selection round because the label set changes. When
/// preview is on, the spawn command wires the overlay's socket and the
/// thumbnail path scheme into the picker's `--preview` fragment; the overlay
/// itself is spawned once and stays resident across rounds until `exit()`.
pub struct PickerSession {
    picker_cmd: String,
    overlay_program: String,
    pid_file: PathBuf,
    thumbs: ThumbnailStore,
    preview: bool,
    overlay: Option<OverlaySession>,
    child: Option<Child>,
}

impl PickerSession {
    pub async fn new(
        picker_cmd: &str,
        overlay_program: &str,
        workspace: &Workspace,
        thumbs: ThumbnailStore,
        no_preview: bool,
    ) -> Self {
        let preview = !no_preview && OverlaySession::is_available(overlay_program).await;
        Self {
            picker_cmd: picker_cmd.to_string(),
            overlay_program: overlay_program.to_string(),
            pid_file: workspace.overlay_pid_file(),
            thumbs,
            preview,
            overlay: None,
            child: None,
        }
    }

    pub fn preview_enabled(&self) -> bool {
        self.preview
    }

    /// Starts a fresh round. A previous round's process, if any, is killed
    /// first. A failure to bring up the overlay downgrades the session to
    /// no-preview instead of failing the round; a failure to start the picker
    /// itself is fatal to the round.
    pub async fn spawn(&mut self) -> Result<(), ProcessError> {
        if let Some(mut previous) = self.child.take() {
            if let Err(err) = previous.kill().await {
                debug!("previous picker round already gone: {err}");
            }
        }

        let socket = if self.preview {
            match self.ensure_overlay().await {
                Ok(socket) => Some(socket),
                Err(err) => {
                    warn!("previews unavailable, continuing without them: {err}");
                    self.preview = false;
                    None
                }
            }
        } else {
            None
        };

        let command_line = self.command_line(socket.as_deref());
        let child = Command::new("sh")
            .arg("-c")
            .arg(&command_line)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Launch {
                name: String::from("picker"),
                source,
            })?;
        self.child = Some(child);
        Ok(())
    }

    /// Prefetches missing thumbnails (best-effort), writes one label per line
    /// to the round's stdin and closes it, which is what lets the picker
    /// produce output. Returns the round's lookup table.
    pub async fn write_entries<T: PickEntry>(
        &mut self,
        entries: Vec<T>,
    ) -> Result<RoundTable<T>, ProcessError> {
        let mut stdin = self
            .child
            .as_mut()
            .and_then(|child| child.stdin.take())
            .ok_or(ProcessError::NotRunning("the picker"))?;

        for entry in &entries {
            if let Some(url) = entry.thumbnail() {
                if !entry.label().is_empty() && !self.thumbs.exists(entry.label()) {
                    if let Err(err) = self.thumbs.fetch(url, entry.label()).await {
                        debug!("thumbnail fetch for {:?} failed: {err}", entry.label());
                    }
                }
            }

            let mut line = entry.label().to_string();
            line.push('\n');
            match stdin.write_all(line.as_bytes()).await {
                Ok(()) => {}
                // The user can accept or abort while labels are still being
                // written; the round's outcome is settled by read_selection.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => break,
                Err(err) => return Err(ProcessError::Pipe(err)),
            }
        }

        if let Err(err) = stdin.shutdown().await {
            if err.kind() != io::ErrorKind::BrokenPipe {
                return Err(ProcessError::Pipe(err));
            }
        }
        Ok(RoundTable::new(entries))
    }

    /// Waits for the round's process to finish. Exit 0 means an accepted
    /// selection whose label is the single line on stdout; any other exit
    /// (user abort, picker missing from PATH inside the shell) yields `None`.
    pub async fn read_selection(&mut self) -> Result<Option<String>, ProcessError> {
        let mut child = self
            .child
            .take()
            .ok_or(ProcessError::NotRunning("the picker"))?;
        let stdout = child.stdout.take();
        let status = child.wait().await?;
        if !status.success() {
            return Ok(None);
        }
        let Some(stdout) = stdout else {
            return Ok(None);
        };

        let mut line = String::new();
        BufReader::new(stdout).read_line(&mut line).await?;
        let label = line.trim_end_matches(['\r', '\n']);
        if label.is_empty() {
            return Ok(None);
        }
        Ok(Some(label.to_string()))
    }

    /// Tears the session down: overlay first, then the picker process itself,
    /// force-killed and reaped. Never fails, and calling it again (shutdown
    /// paths do so defensively) is a no-op.
    pub async fn exit(&mut self) {
        if let Some(mut overlay) = self.overlay.take() {
            overlay.exit().await;
        }
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill().await {
                debug!("picker already gone on exit: {err}");
            }
        }
    }

    async fn ensure_overlay(&mut self) -> Result<String, ProcessError> {
        if let Some(session) = &self.overlay {
            return Ok(session.socket());
        }
        let session = OverlaySession::spawn(&self.overlay_program, &self.pid_file).await?;
        let socket = session.socket();
        self.overlay = Some(session);
        Ok(socket)
    }

    /// The `sh -c` line for one round. With a socket, the picker's
    /// `--preview` fragment tells the overlay to draw `<dir>/{}<ext>` at the
    /// geometry fzf reports through its `FZF_PREVIEW_*` variables; the `\$`
    /// escapes keep those for the picker instead of the outer shell.
    fn command_line(&self, socket: Option<&str>) -> String {
        match socket {
            Some(socket) => format!(
                "({picker} --preview=\"{overlay} cmd -s {socket} -i anipick -a add -x \\$FZF_PREVIEW_LEFT -y \\$FZF_PREVIEW_TOP --max-width \"\\$FZF_PREVIEW_COLUMNS\" --max-height \"\\$FZF_PREVIEW_LINES\" -f {dir}/{{}}{ext}\")",
                picker = self.picker_cmd,
                overlay = self.overlay_program,
                dir = self.thumbs.dir().display(),
                ext = THUMB_EXTENSION,
            ),
            None => format!("({})", self.picker_cmd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Episode;

    fn episode(name: &str, url: &str) -> Episode {
        Episode {
            name: name.to_string(),
            url: url.to_string(),
            thumbnail: None,
        }
    }

    fn session(dir: &std::path::Path) -> PickerSession {
        PickerSession {
            picker_cmd: String::from("fzf --reverse"),
            overlay_program: String::from("ueberzug"),
            pid_file: dir.join(".anipick"),
            thumbs: ThumbnailStore::new(dir.to_path_buf()).unwrap(),
            preview: false,
            overlay: None,
            child: None,
        }
    }

    #[test]
    fn round_table_resolves_only_its_own_labels() {
        let table = RoundTable::new(vec![
            episode("One Piece 1", "https://example.org/e/1"),
            episode("One Piece 2", "https://example.org/e/2"),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.resolve("One Piece 2").map(|e| e.url.as_str()),
            Some("https://example.org/e/2")
        );
        assert!(table.resolve("One Piece 3").is_none());
        assert!(table.resolve("").is_none());
    }

    #[test]
    fn preview_line_references_socket_and_cache_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let line = session(dir.path()).command_line(Some("/tmp/ueberzugpp-77.socket"));
        assert!(line.starts_with("(fzf --reverse --preview="));
        assert!(line.contains("-s /tmp/ueberzugpp-77.socket"));
        assert!(line.contains("\\$FZF_PREVIEW_LEFT"));
        assert!(line.contains(&format!("{}/{{}}.jpg", dir.path().display())));
    }

    #[test]
    fn plain_line_has_no_preview_wiring() {
        let dir = tempfile::tempdir().unwrap();
        let line = session(dir.path()).command_line(None);
        assert_eq!(line, "(fzf --reverse)");
        assert!(!line.contains("--preview"));
        assert!(!line.contains(".socket"));
    }
}
