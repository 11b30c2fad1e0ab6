use crate::picker::PickEntry;

/// One playable episode as listed by a scraper. The display name doubles as
/// the picker label and the thumbnail cache key, so it must be unique within
/// a listing.
#[derive(Debug, Clone)]
pub struct Episode {
    pub name: String,
    /// Site-specific episode page; resolved lazily into a stream URL.
    pub url: String,
    pub thumbnail: Option<String>,
}

/// A series result from a text search, expandable into its episode list.
#[derive(Debug, Clone)]
pub struct AnimePage {
    /// Listing identifier for sites with an episodes API; absent elsewhere.
    pub id: Option<String>,
    pub title: String,
    pub slug: Option<String>,
    pub synopsis: String,
    pub total_episodes: Option<u32>,
    /// Where the episode listing lives (absolute URL or API path).
    pub path: String,
    pub thumbnail: Option<String>,
}

impl PickEntry for Episode {
    fn label(&self) -> &str {
        &self.name
    }

    fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }
}

impl PickEntry for AnimePage {
    fn label(&self) -> &str {
        &self.title
    }

    fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }
}
