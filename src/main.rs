use std::env;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::warn;

use anipick::flow::{latest_flow, search_flow};
use anipick::picker::PickerSession;
use anipick::player;
use anipick::scrapers::ScraperRegistry;
use anipick::settings::Settings;
use anipick::thumbs::ThumbnailStore;
use anipick::workspace::Workspace;

#[derive(Debug, Parser)]
#[command(
    name = "anipick",
    about = "Browse anime episodes in a fuzzy picker and stream them in mpv.",
    version
)]
struct Cli {
    /// Pick from the latest released episodes.
    #[arg(long, short = 'l')]
    latest: bool,

    /// Search for a series and pick episodes from it.
    #[arg(long, short = 's', value_name = "QUERY")]
    search: Option<String>,

    /// Site to browse, by registry name.
    #[arg(long, short = 'o', value_name = "NAME")]
    origin: Option<String>,

    /// Never wire thumbnail previews, even when the overlay is installed.
    #[arg(long)]
    no_preview: bool,

    /// Scratch directory for thumbnails and the overlay pid file.
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let filter = env::var("ANIPICK_LOG").unwrap_or_else(|_| String::from("anipick=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if !cli.latest && cli.search.is_none() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let settings = Settings::load().unwrap_or_else(|err| {
        warn!("config unusable, running on defaults: {err:#}");
        Settings::default()
    });

    let root = cli
        .cache_dir
        .clone()
        .or_else(|| settings.cache_dir.clone())
        .unwrap_or_else(|| env::temp_dir().join("anipick"));
    let workspace = Workspace::create(root)?;

    let registry = ScraperRegistry::with_builtin()?;
    let origin = cli.origin.as_deref().unwrap_or(&settings.origin);
    let scraper = match registry.get(origin) {
        Some(scraper) => scraper,
        None => {
            println!(
                "Unknown origin '{origin}', using '{}'.",
                registry.default_key()
            );
            registry.get_or_default(origin)
        }
    };

    let thumbs = ThumbnailStore::new(workspace.thumbs_dir())?;
    let mut picker = PickerSession::new(
        &settings.picker,
        &settings.overlay,
        &workspace,
        thumbs,
        cli.no_preview,
    )
    .await;

    let mut queue = Vec::new();
    if cli.latest {
        match latest_flow(scraper.as_ref(), &mut picker).await {
            Ok(episodes) => queue.extend(episodes),
            Err(err) => eprintln!("Latest listing failed: {err:#}"),
        }
    }
    if let Some(query) = &cli.search {
        match search_flow(scraper.as_ref(), &mut picker, query).await {
            Ok(episodes) => queue.extend(episodes),
            Err(err) => eprintln!("Search failed: {err:#}"),
        }
    }
    picker.exit().await;

    if queue.is_empty() {
        println!("Nothing selected.");
        return Ok(());
    }

    for episode in queue {
        println!("Resolving stream for {}...", episode.name);
        let stream_url = match scraper.resolve_stream_url(&episode.url).await {
            Ok(url) => url,
            Err(err) => {
                eprintln!("Could not resolve {}: {err:#}", episode.name);
                continue;
            }
        };
        if let Err(err) = player::play(
            &settings.player,
            scraper.referer(),
            &stream_url,
            &episode.name,
        )
        .await
        {
            eprintln!("Playback of {} failed: {err:#}", episode.name);
        }
    }
    Ok(())
}
