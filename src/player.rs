use std::io;
use std::process::Stdio;

use anyhow::{Result, anyhow, bail};
use tokio::process::Command;

/// Plays one stream to completion in the configured player. The referer
/// header is what lets the site's CDN serve the stream; player output is
/// discarded so it cannot scribble over the terminal.
pub async fn play(player_cmd: &str, referer: &str, stream_url: &str, title: &str) -> Result<()> {
    let mut argv = shlex::split(player_cmd).unwrap_or_default();
    if argv.is_empty() {
        bail!("player command {player_cmd:?} is empty or unparsable");
    }
    let program = argv.remove(0);

    let mut cmd = Command::new(&program);
    cmd.args(&argv);
    cmd.arg("--fs");
    cmd.arg(format!("--force-media-title={title}"));
    cmd.arg(format!("--http-header-fields=referer: {referer}"));
    cmd.arg(stream_url);
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());

    let status = match cmd.status().await {
        Ok(status) => status,
        Err(err) => {
            if err.kind() == io::ErrorKind::NotFound {
                return Err(anyhow!(
                    "Player '{program}' not found. Install mpv or set player in the config (or ANIPICK_PLAYER)."
                ));
            }
            return Err(anyhow!(err).context(format!("failed to launch player '{program}'")));
        }
    };

    if !status.success() {
        bail!("player exited with status {status}");
    }
    Ok(())
}
