//! Bakashi scraper tests against a local HTTP server.

use mockito::{Matcher, Server};

use anipick::ResolveError;
use anipick::scrapers::Scraper;
use anipick::scrapers::bakashi::Bakashi;
use anipick::types::AnimePage;

fn scraper(server: &Server) -> Bakashi {
    Bakashi::with_site(&server.url()).unwrap()
}

// =============================================================================
// Listings
// =============================================================================

#[tokio::test]
async fn latest_episodes_walk_the_release_grid() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .with_status(200)
        .with_body(
            r#"<div id="contenedor"><div class="module"><div><div class="animation-2 items full">
                 <article>
                   <div class="poster"><picture><img src="/thumbs/dandadan-1.png"></picture></div>
                   <div class="data"><h3><a href="/episodio/dandadan-1">Dandadan: Episodio 1</a></h3></div>
                 </article>
               </div></div></div></div>"#,
        )
        .create_async()
        .await;

    let episodes = scraper(&server).latest_episodes().await.unwrap();

    mock.assert_async().await;
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].name, "Dandadan: Episodio 1");
    assert_eq!(episodes[0].url, format!("{}/episodio/dandadan-1", server.url()));
    assert_eq!(
        episodes[0].thumbnail.as_deref(),
        Some(format!("{}/thumbs/dandadan-1.png", server.url()).as_str())
    );
}

#[tokio::test]
async fn search_hits_the_site_root_with_the_query() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded("s".into(), "dandadan".into()))
        .with_status(200)
        .with_body(
            r#"<div class="result-item"><article>
                 <div class="image"><a href="/animes/dandadan"><img src="/covers/dandadan.jpg"></a></div>
                 <div class="details">
                   <div class="title"><a href="/animes/dandadan">Dandadan</a></div>
                   <div class="contenido"><p>Aliens contra espiritos.</p></div>
                 </div>
               </article></div>"#,
        )
        .create_async()
        .await;

    let pages = scraper(&server).find_pages("dandadan").await.unwrap();

    mock.assert_async().await;
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].title, "Dandadan");
    assert_eq!(pages[0].path, format!("{}/animes/dandadan", server.url()));
    assert_eq!(pages[0].synopsis, "Aliens contra espiritos.");
    assert!(pages[0].id.is_none());
    assert!(pages[0].total_episodes.is_none());
}

#[tokio::test]
async fn episode_listings_come_from_the_page_itself() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/animes/dandadan")
        .with_status(200)
        .with_body(
            r#"<ul class="episodios">
                 <li><div class="imagen"><img src="/thumbs/e1.jpg"></div>
                     <div class="episodiotitle"><a href="/episodio/dandadan-1">Episodio 1</a></div></li>
                 <li><div class="episodiotitle"><a href="/episodio/dandadan-2">Episodio 2</a></div></li>
               </ul>"#,
        )
        .create_async()
        .await;

    let page = AnimePage {
        id: None,
        title: String::from("Dandadan"),
        slug: None,
        synopsis: String::new(),
        total_episodes: None,
        path: format!("{}/animes/dandadan", server.url()),
        thumbnail: None,
    };
    let episodes = scraper(&server).episodes_of_page(&page).await.unwrap();

    mock.assert_async().await;
    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0].name, "Episodio 1");
    assert_eq!(episodes[1].name, "Episodio 2");
    assert!(episodes[1].thumbnail.is_none());
}

// =============================================================================
// Stream resolution
// =============================================================================

#[tokio::test]
async fn stream_resolution_follows_iframe_then_player_script() {
    let mut server = Server::new_async().await;
    let url = server.url();

    // The iframe src carries the poster path appended after "img"; only the
    // part before it is the embed URL.
    let episode_mock = server
        .mock("GET", "/episodio/dandadan-1")
        .with_status(200)
        .with_body(format!(
            r#"<div id="source-player-1"><div class="player">
                 <iframe src="{url}/embed/xyzimghttps://bakashi.tv/poster.jpg"></iframe>
               </div></div>"#
        ))
        .create_async()
        .await;

    let embed_mock = server
        .mock("GET", "/embed/xyz")
        .with_status(200)
        .with_body(
            r#"<html><head>
                 <script src="/jwplayer.js"></script>
                 <script type="application/ld+json">{"contentUrl":"https://cdn.example/dandadan-1.m3u8"}</script>
               </head><body></body></html>"#,
        )
        .create_async()
        .await;

    let stream = scraper(&server)
        .resolve_stream_url(&format!("{url}/episodio/dandadan-1"))
        .await
        .unwrap();

    episode_mock.assert_async().await;
    embed_mock.assert_async().await;
    assert_eq!(stream, "https://cdn.example/dandadan-1.m3u8");
}

#[tokio::test]
async fn a_page_without_the_player_iframe_fails_loudly() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/episodio/quebrado")
        .with_status(200)
        .with_body("<html><body><p>em manutencao</p></body></html>")
        .create_async()
        .await;

    let err = scraper(&server)
        .resolve_stream_url(&format!("{}/episodio/quebrado", server.url()))
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, ResolveError::MissingElement(_)));
    assert!(err.to_string().contains("player iframe"));
}
