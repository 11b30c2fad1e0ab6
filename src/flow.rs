use tracing::debug;

use crate::picker::{PickEntry, PickerSession};
use crate::scrapers::Scraper;
use crate::types::Episode;

pub const PLAY_ALL_LABEL: &str = "CMD: Play All";

/// One line of the episode round: a real episode, or the play-all pseudo
/// entry appended after them. Selections are told apart by variant, so an
/// episode is never confused with the pseudo entry by its name alone.
#[derive(Debug, Clone)]
pub enum EpisodePick {
    Episode(Episode),
    PlayAll,
}

impl PickEntry for EpisodePick {
    fn label(&self) -> &str {
        match self {
            EpisodePick::Episode(episode) => &episode.name,
            EpisodePick::PlayAll => PLAY_ALL_LABEL,
        }
    }

    fn thumbnail(&self) -> Option<&str> {
        match self {
            EpisodePick::Episode(episode) => episode.thumbnail.as_deref(),
            EpisodePick::PlayAll => None,
        }
    }
}

/// One round over the site's front-page releases. Yields at most one episode;
/// an aborted round or an empty listing yields none.
pub async fn latest_flow(
    scraper: &dyn Scraper,
    picker: &mut PickerSession,
) -> anyhow::Result<Vec<Episode>> {
    let episodes = scraper.latest_episodes().await?;
    if episodes.is_empty() {
        println!("No recent episodes listed right now.");
        return Ok(Vec::new());
    }

    picker.spawn().await?;
    let table = picker.write_entries(episodes).await?;
    let Some(label) = picker.read_selection().await? else {
        return Ok(Vec::new());
    };
    match table.resolve(&label) {
        Some(episode) => Ok(vec![episode.clone()]),
        None => {
            debug!("selection {label:?} is not part of this round");
            Ok(Vec::new())
        }
    }
}

/// Two rounds: pick a series from the search results, then pick one of its
/// episodes or the play-all entry. Play-all yields every listed episode in
/// listing order.
pub async fn search_flow(
    scraper: &dyn Scraper,
    picker: &mut PickerSession,
    query: &str,
) -> anyhow::Result<Vec<Episode>> {
    let pages = scraper.find_pages(query).await?;
    if pages.is_empty() {
        println!("No results for \"{query}\".");
        return Ok(Vec::new());
    }

    picker.spawn().await?;
    let table = picker.write_entries(pages).await?;
    let Some(label) = picker.read_selection().await? else {
        return Ok(Vec::new());
    };
    let Some(page) = table.resolve(&label).cloned() else {
        debug!("selection {label:?} is not part of this round");
        return Ok(Vec::new());
    };

    let episodes = scraper.episodes_of_page(&page).await?;
    if episodes.is_empty() {
        println!("\"{}\" has no listed episodes.", page.title);
        return Ok(Vec::new());
    }

    // The episode list is a new round with a new label set.
    picker.spawn().await?;
    let picks: Vec<EpisodePick> = episodes
        .iter()
        .cloned()
        .map(EpisodePick::Episode)
        .chain(std::iter::once(EpisodePick::PlayAll))
        .collect();
    let table = picker.write_entries(picks).await?;
    let Some(label) = picker.read_selection().await? else {
        return Ok(Vec::new());
    };
    match table.resolve(&label) {
        Some(EpisodePick::PlayAll) => Ok(episodes),
        Some(EpisodePick::Episode(episode)) => Ok(vec![episode.clone()]),
        None => {
            debug!("selection {label:?} is not part of this round");
            Ok(Vec::new())
        }
    }
}
