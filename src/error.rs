use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use reqwest::StatusCode;
use thiserror::Error;

/// Network or payload failure while reaching a remote resource. Recoverable
/// at the round level: the current flow is abandoned, the program keeps going.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: StatusCode, url: String },

    #[error("unexpected payload from {url}: {reason}")]
    Payload { url: String, reason: String },

    #[error("could not write {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Stream-URL extraction hit page structure it did not expect. Surfaced as a
/// failed playback attempt; the queue continues with the next episode.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("page is missing {0}")]
    MissingElement(&'static str),

    #[error("{0}")]
    Payload(String),
}

/// A subprocess failed to start or behaved unexpectedly. Fatal to the overlay
/// only (preview falls back to off); fatal to the whole round for the picker.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to launch {name}: {source}")]
    Launch {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("{name} exited with status {status}")]
    UnexpectedExit { name: String, status: ExitStatus },

    #[error("could not read the overlay pid file {}: {source}", path.display())]
    PidFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("pipe to the picker failed: {0}")]
    Pipe(#[from] io::Error),

    #[error("{0} is not running")]
    NotRunning(&'static str),
}
