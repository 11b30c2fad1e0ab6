use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::error::FetchError;

pub const THUMB_EXTENSION: &str = ".jpg";

const THUMB_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";
const THUMB_ACCEPT: &str = "image/avif,image/webp,image/*,*/*;q=0.8";
const THUMB_TIMEOUT: Duration = Duration::from_secs(60);

/// Maps a display label to a locally cached image file and fetches on miss.
///
/// The file name is the label verbatim plus a fixed extension: the picker's
/// preview fragment substitutes the highlighted line into that same
/// `<dir>/<label>.jpg` scheme, so both sides must derive identical paths.
pub struct ThumbnailStore {
    dir: PathBuf,
    http: Client,
}

impl ThumbnailStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        let http = Client::builder()
            .user_agent(THUMB_USER_AGENT)
            .timeout(THUMB_TIMEOUT)
            .build()
            .context("failed to create thumbnail HTTP client")?;
        Ok(Self { dir, http })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{label}{THUMB_EXTENSION}"))
    }

    pub fn exists(&self, label: &str) -> bool {
        self.path_for(label).exists()
    }

    /// Downloads the full image into memory, then writes the cache file in
    /// one go. The destination is only opened after the download succeeded,
    /// so a failed fetch never leaves a partial file behind for `exists`.
    pub async fn fetch(&self, url: &str, label: &str) -> Result<PathBuf, FetchError> {
        let response = self
            .http
            .get(url)
            .header("Accept", THUMB_ACCEPT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?;

        let path = self.path_for(label);
        fs::write(&path, &bytes).map_err(|source| FetchError::Store {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
