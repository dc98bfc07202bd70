//! Sitemap discovery and parsing against a mock HTTP server.

use docsi::sitemap::{SitemapConfig, SitemapProcessor};
use url::Url;

fn processor() -> SitemapProcessor {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("client");
    SitemapProcessor::new(client, SitemapConfig::default())
}

#[tokio::test]
async fn discovery_prefers_robots_directives() {
    let mut server = mockito::Server::new_async().await;
    let robots = server
        .mock("GET", "/robots.txt")
        .with_status(200)
        .with_body(format!(
            "User-agent: *\nAllow: /\nSitemap: {}/custom-sitemap.xml\n",
            server.url()
        ))
        .create_async()
        .await;

    let base = Url::parse(&server.url()).expect("valid");
    let sitemaps = processor().discover(&base).await;

    robots.assert_async().await;
    assert_eq!(sitemaps, vec![format!("{}/custom-sitemap.xml", server.url())]);
}

#[tokio::test]
async fn discovery_falls_back_to_well_known_paths() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/robots.txt")
        .with_status(404)
        .create_async()
        .await;
    let head = server
        .mock("HEAD", "/sitemap.xml")
        .with_status(200)
        .create_async()
        .await;
    server
        .mock("HEAD", "/sitemap_index.xml")
        .with_status(404)
        .create_async()
        .await;

    let base = Url::parse(&server.url()).expect("valid");
    let sitemaps = processor().discover(&base).await;

    head.assert_async().await;
    assert_eq!(sitemaps, vec![format!("{}/sitemap.xml", server.url())]);
}

#[tokio::test]
async fn sitemap_index_is_followed_with_entries_deduplicated() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();

    server
        .mock("GET", "/robots.txt")
        .with_status(200)
        .with_body(format!("Sitemap: {origin}/sitemap_index.xml\n"))
        .create_async()
        .await;
    server
        .mock("GET", "/sitemap_index.xml")
        .with_status(200)
        .with_body(format!(
            r#"<?xml version="1.0"?>
<sitemapindex><sitemap><loc>{origin}/sitemap-a.xml</loc></sitemap>
<sitemap><loc>{origin}/sitemap-b.xml</loc></sitemap></sitemapindex>"#
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/sitemap-a.xml")
        .with_status(200)
        .with_body(format!(
            r#"<urlset><url><loc>{origin}/docs</loc></url>
<url><loc>{origin}/docs/api</loc></url></urlset>"#
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/sitemap-b.xml")
        .with_status(200)
        .with_body(format!(
            r#"<urlset><url><loc>{origin}/docs/api</loc></url>
<url><loc>{origin}/guide</loc></url></urlset>"#
        ))
        .create_async()
        .await;

    let base = Url::parse(&origin).expect("valid");
    let entries = processor().discover_and_parse(&base).await;

    let mut urls: Vec<String> = entries.iter().map(|e| e.url.clone()).collect();
    urls.sort();
    assert_eq!(
        urls,
        vec![
            format!("{origin}/docs"),
            format!("{origin}/docs/api"),
            format!("{origin}/guide"),
        ]
    );
}

#[tokio::test]
async fn broken_sitemap_is_localized_not_fatal() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();

    server
        .mock("GET", "/robots.txt")
        .with_status(200)
        .with_body(format!(
            "Sitemap: {origin}/bad.xml\nSitemap: {origin}/good.xml\n"
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/bad.xml")
        .with_status(500)
        .create_async()
        .await;
    server
        .mock("GET", "/good.xml")
        .with_status(200)
        .with_body(format!(
            "<urlset><url><loc>{origin}/docs</loc></url></urlset>"
        ))
        .create_async()
        .await;

    let base = Url::parse(&origin).expect("valid");
    let entries = processor().discover_and_parse(&base).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].url, format!("{origin}/docs"));
}

#[tokio::test]
async fn total_discovery_failure_yields_no_entries() {
    // An origin with nothing listening behind mockito's unmatched
    // routes: discovery just comes back empty.
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/robots.txt")
        .with_status(500)
        .create_async()
        .await;
    server
        .mock("HEAD", "/sitemap.xml")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("HEAD", "/sitemap_index.xml")
        .with_status(404)
        .create_async()
        .await;

    let base = Url::parse(&server.url()).expect("valid");
    assert!(processor().discover_and_parse(&base).await.is_empty());
}
