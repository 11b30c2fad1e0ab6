use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::{Scraper, USER_AGENT, element_text, join_url};
use crate::error::{FetchError, ResolveError};
use crate::types::{AnimePage, Episode};

const ANROLL_SITE: &str = "https://anroll.net";
const ANROLL_SEARCH_API: &str = "https://api-search.anroll.net";
const ANROLL_EPISODES_API: &str = "https://apiv3-prd.anroll.net";
const ANROLL_COVER_BASE: &str = "https://static.anroll.net/images/animes/capas";
const ANROLL_SCREEN_PROXY: &str = "https://www.anroll.net/_next/image?url=https%3A%2F%2Fstatic.anroll.net%2Fimages%2Fanimes%2Fscreens%2F";
const CDN_ENDPOINT: &str = "https://cdn-zenitsu-2-gamabunta.b-cdn.net/cf/hls/animes";
const STREAM_SUFFIX: &str = ".mp4/media-1/stream.m3u8";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Anroll mixes two JSON APIs (search, episode listings) with scraping of the
/// Next.js site itself (front page, per-episode `__NEXT_DATA__` payload).
pub struct Anroll {
    client: Client,
    site: String,
    base: Url,
    search_api: String,
    episodes_api: String,
}

impl Anroll {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_endpoints(ANROLL_SITE, ANROLL_SEARCH_API, ANROLL_EPISODES_API)
    }

    /// All three endpoints are injectable so tests can point the scraper at
    /// a local server.
    pub fn with_endpoints(
        site: &str,
        search_api: &str,
        episodes_api: &str,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let site = site.trim_end_matches('/').to_string();
        let base = Url::parse(&site)?;
        Ok(Self {
            client,
            site,
            base,
            search_api: search_api.trim_end_matches('/').to_string(),
            episodes_api: episodes_api.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|err| FetchError::Payload {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl Scraper for Anroll {
    fn referer(&self) -> &str {
        &self.site
    }

    async fn latest_episodes(&self) -> Result<Vec<Episode>, FetchError> {
        let html = self.fetch_text(&format!("{}/", self.site)).await?;
        parse_latest(&html, &self.base)
    }

    async fn find_pages(&self, query: &str) -> Result<Vec<AnimePage>, FetchError> {
        let url = format!("{}/data", self.search_api);
        let envelope: SearchEnvelope = self.fetch_json(&url, &[("q", query)]).await?;
        Ok(envelope
            .data
            .into_iter()
            .map(|hit| {
                let thumbnail = format!("{ANROLL_COVER_BASE}/{}.jpg", hit.slug);
                AnimePage {
                    id: Some(hit.id.into_text()),
                    title: hit.title,
                    slug: Some(hit.slug),
                    synopsis: hit.synopsis,
                    total_episodes: hit.total_episodes,
                    path: hit.path,
                    thumbnail: Some(thumbnail),
                }
            })
            .collect())
    }

    async fn episodes_of_page(&self, page: &AnimePage) -> Result<Vec<Episode>, FetchError> {
        let Some(id) = page.id.as_deref() else {
            return Err(FetchError::Payload {
                url: self.episodes_api.clone(),
                reason: String::from("page has no listing id"),
            });
        };
        let url = format!("{}/animes/{id}/episodes", self.episodes_api);
        let envelope: EpisodesEnvelope = self
            .fetch_json(&url, &[("page", "1"), ("order", "desc")])
            .await?;

        let slug = page.slug.as_deref().unwrap_or_default();
        Ok(envelope
            .data
            .into_iter()
            .map(|hit| {
                let number = hit.number.into_text();
                let listing_id = hit.listing_id.into_text();
                Episode {
                    name: format!("{} {}", page.title, number),
                    url: format!("{}/e/{}", self.site, listing_id),
                    thumbnail: Some(format!(
                        "{ANROLL_SCREEN_PROXY}{slug}%2F{number}.jpg&w=256&q=75"
                    )),
                }
            })
            .collect())
    }

    async fn resolve_stream_url(&self, episode_url: &str) -> Result<String, ResolveError> {
        let html = self.fetch_text(episode_url).await?;
        resolve_from_next_data(&html)
    }
}

// --- Helper Functions ---

fn parse_latest(html: &str, base: &Url) -> Result<Vec<Episode>, FetchError> {
    let document = Html::parse_document(html);
    let list_selector =
        Selector::parse("#__next > main > div.sc-b2878e96-1.dburWc > ul").expect("valid CSS selector");
    let item_selector = Selector::parse("li").expect("valid CSS selector");
    let anchor_selector = Selector::parse("a").expect("valid CSS selector");
    let details_selector = Selector::parse(".release-item-details").expect("valid CSS selector");
    let image_selector = Selector::parse("img").expect("valid CSS selector");

    let Some(list) = document.select(&list_selector).next() else {
        return Err(FetchError::Payload {
            url: base.to_string(),
            reason: String::from("release list not found on the front page"),
        });
    };

    let mut episodes = Vec::new();
    for entry in list.select(&item_selector) {
        let Some(href) = entry
            .select(&anchor_selector)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
        else {
            continue;
        };
        let Some(url) = join_url(base, href) else {
            continue;
        };
        let name = entry
            .select(&details_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let thumbnail = entry
            .select(&image_selector)
            .next()
            .and_then(|image| image.value().attr("src"))
            .and_then(|src| join_url(base, src));
        episodes.push(Episode {
            name,
            url,
            thumbnail,
        });
    }
    Ok(episodes)
}

/// The episode page embeds everything needed to address the CDN in its
/// `__NEXT_DATA__` script: the series slug and the episode number.
fn resolve_from_next_data(html: &str) -> Result<String, ResolveError> {
    let document = Html::parse_document(html);
    let payload_selector = Selector::parse("#__NEXT_DATA__").expect("valid CSS selector");
    let Some(script) = document.select(&payload_selector).next() else {
        return Err(ResolveError::MissingElement("the #__NEXT_DATA__ payload"));
    };

    let raw = script.text().collect::<String>();
    let value: serde_json::Value = serde_json::from_str(raw.trim()).map_err(|err| {
        ResolveError::Payload(format!("#__NEXT_DATA__ is not valid JSON: {err}"))
    })?;
    let data = value
        .pointer("/props/pageProps/data")
        .ok_or(ResolveError::MissingElement("episode data in the page payload"))?;
    let slug = data
        .pointer("/anime/slug_serie")
        .and_then(json_text)
        .ok_or(ResolveError::MissingElement("the series slug in the page payload"))?;
    let number = data
        .get("n_episodio")
        .and_then(json_text)
        .ok_or(ResolveError::MissingElement("the episode number in the page payload"))?;
    Ok(format!("{CDN_ENDPOINT}/{slug}/{number}{STREAM_SUFFIX}"))
}

fn json_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

// --- Payload Structs ---

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: NumberOrText,
    title: String,
    slug: String,
    #[serde(default)]
    synopsis: String,
    #[serde(rename = "total_eps")]
    #[serde(default)]
    total_episodes: Option<u32>,
    #[serde(rename = "generic_path")]
    path: String,
}

#[derive(Debug, Deserialize)]
struct EpisodesEnvelope {
    #[serde(default)]
    data: Vec<EpisodeHit>,
}

#[derive(Debug, Deserialize)]
struct EpisodeHit {
    #[serde(rename = "n_episodio")]
    number: NumberOrText,
    #[serde(rename = "generate_id")]
    listing_id: NumberOrText,
}

/// The APIs serve ids and episode numbers as strings in some payloads and as
/// bare numbers in others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Text(String),
    Number(serde_json::Number),
}

impl NumberOrText {
    fn into_text(self) -> String {
        match self {
            NumberOrText::Text(text) => text,
            NumberOrText::Number(number) => number.to_string(),
        }
    }
}
