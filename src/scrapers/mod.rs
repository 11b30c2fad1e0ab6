use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::{FetchError, ResolveError};
use crate::types::{AnimePage, Episode};

pub mod anroll;
pub mod bakashi;

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

/// One streaming site. Implementations own their HTTP client and whatever
/// endpoint mix the site needs; callers only ever see site-absolute URLs and
/// the shared entity types.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Referer the player must send for the site's CDN to serve the stream.
    fn referer(&self) -> &str;

    async fn latest_episodes(&self) -> Result<Vec<Episode>, FetchError>;

    async fn find_pages(&self, query: &str) -> Result<Vec<AnimePage>, FetchError>;

    async fn episodes_of_page(&self, page: &AnimePage) -> Result<Vec<Episode>, FetchError>;

    /// Turns an episode's page URL into a directly playable stream URL.
    async fn resolve_stream_url(&self, episode_url: &str) -> Result<String, ResolveError>;
}

/// Site scrapers by name. Lookups are case-insensitive and total: an unknown
/// name falls back to the registry's default site rather than failing, so a
/// typo in the config degrades the run instead of aborting it.
pub struct ScraperRegistry {
    scrapers: HashMap<String, Arc<dyn Scraper>>,
    fallback: Arc<dyn Scraper>,
    fallback_key: String,
}

impl ScraperRegistry {
    pub fn new(default_key: &str, default_scraper: Arc<dyn Scraper>) -> Self {
        let fallback_key = default_key.to_lowercase();
        let mut scrapers: HashMap<String, Arc<dyn Scraper>> = HashMap::new();
        scrapers.insert(fallback_key.clone(), Arc::clone(&default_scraper));
        Self {
            scrapers,
            fallback: default_scraper,
            fallback_key,
        }
    }

    /// The built-in site set, with anroll as the default.
    pub fn with_builtin() -> anyhow::Result<Self> {
        let mut registry = Self::new("anroll", Arc::new(anroll::Anroll::new()?));
        registry.register("bakashi", Arc::new(bakashi::Bakashi::new()?));
        Ok(registry)
    }

    pub fn register(&mut self, key: &str, scraper: Arc<dyn Scraper>) {
        self.scrapers.insert(key.to_lowercase(), scraper);
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn Scraper>> {
        self.scrapers.get(&key.to_lowercase()).map(Arc::clone)
    }

    pub fn get_or_default(&self, key: &str) -> Arc<dyn Scraper> {
        self.get(key).unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    pub fn default_key(&self) -> &str {
        &self.fallback_key
    }
}

/// Site-absolute form of an in-page href. Empty and unjoinable hrefs yield
/// `None` so callers can skip the element instead of carrying a bad URL.
pub(crate) fn join_url(base: &Url, href: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(String::from)
}

/// Text content with whitespace collapsed, the way a browser renders it.
/// Picker labels come from here, so runs of markup whitespace must not
/// survive into them.
pub(crate) fn element_text(element: scraper::ElementRef<'_>) -> String {
    let raw = element.text().collect::<String>();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
