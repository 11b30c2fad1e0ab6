use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// User configuration, read from `<config-dir>/anipick/config.toml` and
/// `ANIPICK_*` environment variables (e.g. `ANIPICK_PLAYER=vlc`). Every field
/// has a working default so the tool runs with no configuration at all.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Registry key of the scraper to use when `--origin` is not given.
    pub origin: String,
    /// Player command line, split with shell-like rules before launch.
    pub player: String,
    /// Picker command line, spawned through `sh -c` with stdin/stdout piped.
    pub picker: String,
    /// Overlay program name used for thumbnail previews.
    pub overlay: String,
    /// Scratch directory for thumbnails and the overlay pid file.
    pub cache_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            origin: String::from("anroll"),
            player: String::from("mpv"),
            picker: String::from("fzf --reverse"),
            overlay: String::from("ueberzug"),
            cache_dir: None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = config_file_path() {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("ANIPICK"))
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("failed to parse configuration")?;
        Ok(settings)
    }
}

fn config_file_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join("anipick").join("config.toml"))
}
