use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use super::{Scraper, USER_AGENT, element_text, join_url};
use crate::error::{FetchError, ResolveError};
use crate::types::{AnimePage, Episode};

const BAKASHI_SITE: &str = "https://bakashi.tv";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Bakashi is plain server-rendered HTML throughout. Stream resolution goes
/// through the embedded player: episode page, then the player iframe, then
/// the JSON-LD blob inside the embed page's head.
pub struct Bakashi {
    client: Client,
    site: String,
    base: Url,
}

impl Bakashi {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_site(BAKASHI_SITE)
    }

    /// The site root is injectable so tests can point the scraper at a local
    /// server.
    pub fn with_site(site: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let site = site.trim_end_matches('/').to_string();
        let base = Url::parse(&site)?;
        Ok(Self { client, site, base })
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
}

#[async_trait]
impl Scraper for Bakashi {
    fn referer(&self) -> &str {
        &self.site
    }

    async fn latest_episodes(&self) -> Result<Vec<Episode>, FetchError> {
        let html = self.fetch_text(&format!("{}/", self.site)).await?;
        parse_latest(&html, &self.base)
    }

    async fn find_pages(&self, query: &str) -> Result<Vec<AnimePage>, FetchError> {
        let url = format!("{}/", self.site);
        let response = self.client.get(&url).query(&[("s", query)]).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status, url });
        }
        let html = response.text().await?;
        Ok(parse_search(&html, &self.base))
    }

    async fn episodes_of_page(&self, page: &AnimePage) -> Result<Vec<Episode>, FetchError> {
        let html = self.fetch_text(&page.path).await?;
        parse_episodes(&html, &self.base, &page.path)
    }

    async fn resolve_stream_url(&self, episode_url: &str) -> Result<String, ResolveError> {
        let episode_html = self.fetch_text(episode_url).await?;
        let iframe_src = extract_iframe_src(&episode_html)?;
        let embed_url = join_url(&self.base, &iframe_src).ok_or_else(|| {
            ResolveError::Payload(format!(
                "player iframe src {iframe_src:?} is not a usable URL"
            ))
        })?;
        let embed_html = self.fetch_text(&embed_url).await?;
        let script = extract_player_script(&embed_html)?;
        parse_content_url(&script)
    }
}

// --- Helper Functions ---

fn parse_latest(html: &str, base: &Url) -> Result<Vec<Episode>, FetchError> {
    let document = Html::parse_document(html);
    let list_selector = Selector::parse("#contenedor > div.module > div > div.animation-2.items.full")
        .expect("valid CSS selector");
    let item_selector = Selector::parse("article").expect("valid CSS selector");
    let anchor_selector = Selector::parse(".data a").expect("valid CSS selector");
    let image_selector = Selector::parse(".poster picture img").expect("valid CSS selector");

    let Some(list) = document.select(&list_selector).next() else {
        return Err(FetchError::Payload {
            url: base.to_string(),
            reason: String::from("release list not found on the front page"),
        });
    };

    let mut episodes = Vec::new();
    for entry in list.select(&item_selector) {
        let Some(anchor) = entry.select(&anchor_selector).next() else {
            continue;
        };
        let Some(url) = anchor
            .value()
            .attr("href")
            .and_then(|href| join_url(base, href))
        else {
            continue;
        };
        let name = element_text(anchor);
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

fn parse_search(html: &str, base: &Url) -> Vec<AnimePage> {
    let document = Html::parse_document(html);
    let result_selector = Selector::parse(".result-item").expect("valid CSS selector");
    let title_selector = Selector::parse(".title a").expect("valid CSS selector");
    let image_selector = Selector::parse("img").expect("valid CSS selector");
    let synopsis_selector = Selector::parse(".contenido").expect("valid CSS selector");

    let mut pages = Vec::new();
    for result in document.select(&result_selector) {
        let Some(anchor) = result.select(&title_selector).next() else {
            continue;
        };
        let Some(path) = anchor
            .value()
            .attr("href")
            .and_then(|href| join_url(base, href))
        else {
            continue;
        };
        let title = element_text(anchor);
        if title.is_empty() {
            continue;
        }
        let thumbnail = result
            .select(&image_selector)
            .next()
            .and_then(|image| image.value().attr("src"))
            .and_then(|src| join_url(base, src));
        let synopsis = result
            .select(&synopsis_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();
        pages.push(AnimePage {
            id: None,
            title,
            slug: None,
            synopsis,
            total_episodes: None,
            path,
            thumbnail,
        });
    }
    pages
}

fn parse_episodes(html: &str, base: &Url, page_url: &str) -> Result<Vec<Episode>, FetchError> {
    let document = Html::parse_document(html);
    let list_selector = Selector::parse(".episodios").expect("valid CSS selector");
    let item_selector = Selector::parse("li").expect("valid CSS selector");
    let anchor_selector = Selector::parse("a").expect("valid CSS selector");
    let image_selector = Selector::parse("img").expect("valid CSS selector");

    let Some(list) = document.select(&list_selector).next() else {
        return Err(FetchError::Payload {
            url: page_url.to_string(),
            reason: String::from("episode list not found on the page"),
        });
    };

    let mut episodes = Vec::new();
    for entry in list.select(&item_selector) {
        let Some(anchor) = entry.select(&anchor_selector).next() else {
            continue;
        };
        let Some(url) = anchor
            .value()
            .attr("href")
            .and_then(|href| join_url(base, href))
        else {
            continue;
        };
        let name = element_text(anchor);
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

fn extract_iframe_src(html: &str) -> Result<String, ResolveError> {
    let document = Html::parse_document(html);
    let iframe_selector =
        Selector::parse("#source-player-1 > div > iframe").expect("valid CSS selector");
    let src = document
        .select(&iframe_selector)
        .next()
        .and_then(|iframe| iframe.value().attr("src"))
        .ok_or(ResolveError::MissingElement("the player iframe"))?;
    // The poster image path is appended right after the embed URL; the
    // usable part ends where the first "img" begins.
    let truncated = match src.find("img") {
        Some(position) => &src[..position],
        None => src,
    };
    Ok(truncated.to_string())
}

fn extract_player_script(html: &str) -> Result<String, ResolveError> {
    let document = Html::parse_document(html);
    let head_selector = Selector::parse("head").expect("valid CSS selector");
    let script_selector = Selector::parse("script").expect("valid CSS selector");
    let head = document
        .select(&head_selector)
        .next()
        .ok_or(ResolveError::MissingElement("the embed page head"))?;
    // The player config is the last script in the head; earlier ones are
    // library includes.
    let script = head
        .select(&script_selector)
        .last()
        .ok_or(ResolveError::MissingElement("a player script in the embed page head"))?;
    Ok(script.text().collect::<String>().trim().to_string())
}

fn parse_content_url(script: &str) -> Result<String, ResolveError> {
    let value: serde_json::Value = serde_json::from_str(script)
        .map_err(|err| ResolveError::Payload(format!("player script is not valid JSON: {err}")))?;
    value
        .get("contentUrl")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or(ResolveError::MissingElement("contentUrl in the player payload"))
}
