//! Browse and play anime episodes from the terminal.
//!
//! The interactive pipeline wires three kinds of subprocess together: a
//! fuzzy-picker (fzf) that receives one label per line on stdin and reports
//! the accepted label on stdout, an optional image overlay (ueberzug) that
//! renders thumbnail previews inside the terminal, and a media player that
//! receives the finally resolved stream URL. Site-specific scrapers normalize
//! heterogeneous HTML/JSON sources into the shared episode/page model.

pub mod error;
pub mod flow;
pub mod overlay;
pub mod picker;
pub mod player;
pub mod scrapers;
pub mod settings;
pub mod thumbs;
pub mod types;
pub mod workspace;

pub use error::{FetchError, ProcessError, ResolveError};
pub use types::{AnimePage, Episode};
