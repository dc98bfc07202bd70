//! End-to-end crawl scenarios against a mock HTTP server.

use docsi::registry::CrawlPolicy;
use docsi::{
    AddSourceRequest, CrawlOverrides, DocsiError, DocsiEvent, JobStatus, StartCrawlRequest,
};

mod common;
use common::{assert_completed, open_index, page, wait_for_job};

async fn add_source(
    index: &docsi::DocIndex,
    name: &str,
    base_url: &str,
) -> docsi::DocumentSource {
    index
        .add_source(AddSourceRequest {
            url: base_url.to_string(),
            name: name.to_string(),
            tags: Vec::new(),
            max_depth: None,
            max_pages: None,
        })
        .await
        .expect("add source")
}

fn overrides(max_depth: u32, max_pages: usize) -> CrawlOverrides {
    CrawlOverrides {
        max_depth: Some(max_depth),
        max_pages: Some(max_pages),
        use_sitemaps: Some(false),
        ..CrawlOverrides::default()
    }
}

#[tokio::test]
async fn depth_zero_crawls_exactly_the_base_page() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(page(
            "Docs Home",
            "Welcome to the documentation portal.",
            &["/docs/a", "/docs/b"],
        ))
        .create_async()
        .await;

    let (_dir, index) = open_index().await;
    let source = add_source(&index, "Example", &format!("{origin}/docs")).await;

    let job_id = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: overrides(0, 10),
        })
        .await
        .expect("start");
    let job = wait_for_job(&index, &job_id).await;

    assert_completed(&job);
    assert_eq!(job.progress.pages_crawled, 1);
    assert_eq!(job.progress.pages_discovered, 3);
    assert_eq!(job.progress.max_depth_reached, 0);

    let doc = index
        .get_document(&format!("{origin}/docs"))
        .await
        .expect("lookup")
        .expect("stored");
    assert_eq!(doc.title, "Docs Home");
    assert_eq!(doc.outbound_links.len(), 2);
}

#[tokio::test]
async fn bfs_respects_depth_limit() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Home", "Top level documentation page.", &["/docs/a", "/docs/b"]))
        .create_async()
        .await;
    server
        .mock("GET", "/docs/a")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Page A", "Contents of page A here.", &["/docs/c", "/docs/d"]))
        .create_async()
        .await;
    server
        .mock("GET", "/docs/b")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Page B", "Contents of page B here.", &["/docs/e", "/docs/f"]))
        .create_async()
        .await;

    let (_dir, index) = open_index().await;
    let source = add_source(&index, "Example", &format!("{origin}/docs")).await;
    let job_id = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: overrides(1, 100),
        })
        .await
        .expect("start");
    let job = wait_for_job(&index, &job_id).await;

    assert_completed(&job);
    assert_eq!(job.progress.pages_crawled, 3);
    assert_eq!(job.progress.max_depth_reached, 1);
    // base + 2 first-level + 4 leaves observed but never fetched
    assert_eq!(job.progress.pages_discovered, 7);

    let listing = index.list_pages("Example").await.expect("listing");
    assert_eq!(listing.page_count, 3);
}

#[tokio::test]
async fn exclude_patterns_block_matching_urls() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page(
            "Home",
            "Links to internal and public areas.",
            &["/internal/secret", "/public/ok"],
        ))
        .create_async()
        .await;
    let secret = server
        .mock("GET", "/internal/secret")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Secret", "Should never be fetched.", &[]))
        .expect(0)
        .create_async()
        .await;
    server
        .mock("GET", "/public/ok")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Public", "Public page content here.", &[]))
        .create_async()
        .await;

    let (_dir, index) = open_index().await;
    let source = index
        .registry()
        .add(
            "Example",
            &format!("{origin}/docs"),
            Vec::new(),
            CrawlPolicy {
                exclude_patterns: vec!["/internal/".into()],
                ..CrawlPolicy::default()
            },
        )
        .await
        .expect("add");

    let job_id = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: overrides(2, 100),
        })
        .await
        .expect("start");
    let job = wait_for_job(&index, &job_id).await;

    assert_completed(&job);
    secret.assert_async().await;
    assert_eq!(job.progress.pages_crawled, 2);

    assert!(index
        .get_document(&format!("{origin}/public/ok"))
        .await
        .expect("lookup")
        .is_some());
    assert!(index
        .get_document(&format!("{origin}/internal/secret"))
        .await
        .expect("lookup")
        .is_none());
}

#[tokio::test]
async fn non_html_responses_are_visited_but_not_stored() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Home", "Has a data link and a real page.", &["/docs/data", "/docs/real"]))
        .create_async()
        .await;
    server
        .mock("GET", "/docs/data")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"not": "html"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/docs/real")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Real", "A real documentation page.", &[]))
        .create_async()
        .await;

    let (_dir, index) = open_index().await;
    let source = add_source(&index, "Example", &format!("{origin}/docs")).await;
    let job_id = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: overrides(1, 100),
        })
        .await
        .expect("start");
    let job = wait_for_job(&index, &job_id).await;

    assert_completed(&job);
    // Stored: /docs and /docs/real. The JSON response counts as
    // visited (no re-fetch) but is never persisted.
    assert_eq!(job.progress.pages_crawled, 2);
    assert!(index
        .get_document(&format!("{origin}/docs/data"))
        .await
        .expect("lookup")
        .is_none());
}

#[tokio::test]
async fn thin_pages_are_not_persisted() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Home", "Front page with enough words.", &["/docs/thin"]))
        .create_async()
        .await;
    server
        .mock("GET", "/docs/thin")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html><body><p>short</p></body></html>")
        .create_async()
        .await;

    let (_dir, index) = open_index().await;
    let source = add_source(&index, "Example", &format!("{origin}/docs")).await;
    let job_id = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: overrides(1, 100),
        })
        .await
        .expect("start");
    let job = wait_for_job(&index, &job_id).await;

    assert_completed(&job);
    assert_eq!(job.progress.pages_crawled, 1);
    assert!(index
        .get_document(&format!("{origin}/docs/thin"))
        .await
        .expect("lookup")
        .is_none());
}

#[tokio::test]
async fn client_errors_fail_the_url_not_the_job() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Home", "One good link, one dead link.", &["/docs/missing", "/docs/ok"]))
        .create_async()
        .await;
    let missing = server
        .mock("GET", "/docs/missing")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/docs/ok")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Ok", "This page exists and has text.", &[]))
        .create_async()
        .await;

    let (_dir, index) = open_index().await;
    let mut events = index.subscribe();
    let source = add_source(&index, "Example", &format!("{origin}/docs")).await;
    let job_id = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: overrides(1, 100),
        })
        .await
        .expect("start");
    let job = wait_for_job(&index, &job_id).await;

    assert_completed(&job);
    // 404 is not retried.
    missing.assert_async().await;
    assert_eq!(job.progress.pages_crawled, 2);

    // The failure surfaced as an event, not in the job status.
    let mut saw_failure = false;
    while let Ok(event) = events.try_recv() {
        if let DocsiEvent::PageFailed { url, .. } = event {
            assert!(url.ends_with("/docs/missing"));
            saw_failure = true;
        }
    }
    assert!(saw_failure);
    assert!(job.error.is_none());
}

#[tokio::test]
async fn max_pages_is_respected_exactly() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();
    let links: Vec<String> = (0..10).map(|i| format!("/docs/p{i}")).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Home", "Front page linking everywhere.", &link_refs))
        .create_async()
        .await;
    for i in 0..10 {
        server
            .mock("GET", format!("/docs/p{i}").as_str())
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(page(&format!("P{i}"), "Enough body text to store.", &[]))
            .create_async()
            .await;
    }

    let (_dir, index) = open_index().await;
    let source = add_source(&index, "Example", &format!("{origin}/docs")).await;
    let job_id = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: overrides(1, 3),
        })
        .await
        .expect("start");
    let job = wait_for_job(&index, &job_id).await;

    assert_completed(&job);
    assert_eq!(job.progress.pages_crawled, 3);
    let listing = index.list_pages("Example").await.expect("listing");
    assert_eq!(listing.page_count, 3);
}

#[tokio::test]
async fn max_pages_zero_completes_storing_nothing() {
    let server = mockito::Server::new_async().await;
    let origin = server.url();

    let (_dir, index) = open_index().await;
    let source = add_source(&index, "Example", &format!("{origin}/docs")).await;
    let job_id = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: overrides(3, 0),
        })
        .await
        .expect("start");
    let job = wait_for_job(&index, &job_id).await;

    assert_completed(&job);
    assert_eq!(job.progress.pages_crawled, 0);
    let listing = index.list_pages("Example").await.expect("listing");
    assert_eq!(listing.page_count, 0);
}

#[tokio::test]
async fn concurrent_crawls_of_one_source_are_rejected() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();
    let links: Vec<String> = (0..20).map(|i| format!("/docs/p{i}")).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Home", "Front page linking everywhere.", &link_refs))
        .create_async()
        .await;
    for i in 0..20 {
        server
            .mock("GET", format!("/docs/p{i}").as_str())
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(page(&format!("P{i}"), "Enough body text to store.", &[]))
            .create_async()
            .await;
    }

    let (_dir, index) = open_index().await;
    let source = index
        .registry()
        .add(
            "Example",
            &format!("{origin}/docs"),
            Vec::new(),
            CrawlPolicy {
                crawl_delay_ms: 100,
                ..CrawlPolicy::default()
            },
        )
        .await
        .expect("add");

    let first = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: overrides(1, 20),
        })
        .await
        .expect("start");

    let second = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: overrides(1, 20),
        })
        .await;
    assert!(matches!(second, Err(DocsiError::Validation(_))));

    assert!(index.cancel_job(&first));
    wait_for_job(&index, &first).await;
}

#[tokio::test]
async fn cancellation_stops_within_a_batch_cycle_and_keeps_pages() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();
    let links: Vec<String> = (0..30).map(|i| format!("/docs/p{i}")).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Home", "Front page linking everywhere.", &link_refs))
        .create_async()
        .await;
    for i in 0..30 {
        server
            .mock("GET", format!("/docs/p{i}").as_str())
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(page(&format!("P{i}"), "Enough body text to store.", &[]))
            .create_async()
            .await;
    }

    let (_dir, index) = open_index().await;
    let mut events = index.subscribe();
    let source = index
        .registry()
        .add(
            "Example",
            &format!("{origin}/docs"),
            Vec::new(),
            CrawlPolicy {
                crawl_delay_ms: 100,
                ..CrawlPolicy::default()
            },
        )
        .await
        .expect("add");

    let job_id = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: overrides(1, 31),
        })
        .await
        .expect("start");

    // Wait until at least one page landed, then cancel.
    loop {
        match events.recv().await.expect("event stream open") {
            DocsiEvent::PageCrawled { stored: true, .. } => break,
            _ => continue,
        }
    }
    assert!(index.cancel_job(&job_id));

    let job = wait_for_job(&index, &job_id).await;
    assert_eq!(job.status, JobStatus::Canceled);
    assert!(job.progress.pages_crawled < 31);
    assert!(job.progress.pages_crawled >= 1);

    // Already-persisted pages remain and the index reflects them.
    let listing = index.list_pages("Example").await.expect("listing");
    assert!(listing.page_count >= 1);
    assert!(listing.page_count < 31);
    for page_ref in &listing.pages {
        assert!(index
            .get_document(&page_ref.url)
            .await
            .expect("lookup")
            .is_some());
    }
}

#[tokio::test]
async fn sitemap_seeds_are_crawled_first() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();
    server
        .mock("GET", "/robots.txt")
        .with_status(200)
        .with_body(format!("User-agent: *\nAllow: /\nSitemap: {origin}/sitemap.xml\n"))
        .create_async()
        .await;
    server
        .mock("GET", "/sitemap.xml")
        .with_status(200)
        .with_body(format!(
            "<urlset><url><loc>{origin}/docs/guide</loc><priority>0.9</priority></url>\
             <url><loc>{origin}/docs/api</loc></url></urlset>"
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Home", "The front documentation page.", &[]))
        .create_async()
        .await;
    server
        .mock("GET", "/docs/guide")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Guide", "A guide with helpful content.", &[]))
        .create_async()
        .await;
    server
        .mock("GET", "/docs/api")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("API", "API reference documentation.", &[]))
        .create_async()
        .await;

    let (_dir, index) = open_index().await;
    let mut events = index.subscribe();
    let source = add_source(&index, "Example", &format!("{origin}/docs")).await;
    let job_id = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: CrawlOverrides {
                max_depth: Some(1),
                max_pages: Some(10),
                ..CrawlOverrides::default()
            },
        })
        .await
        .expect("start");
    let job = wait_for_job(&index, &job_id).await;

    assert_completed(&job);
    assert_eq!(job.progress.pages_crawled, 3);

    let mut saw_sitemap_event = false;
    while let Ok(event) = events.try_recv() {
        if let DocsiEvent::SitemapUrlsAdded { count, .. } = event {
            assert_eq!(count, 2);
            saw_sitemap_event = true;
        }
    }
    assert!(saw_sitemap_event);
}

#[tokio::test]
async fn robots_disallow_is_honored() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();
    server
        .mock("GET", "/robots.txt")
        .with_status(200)
        .with_body("User-agent: *\nDisallow: /docs/private/\n")
        .create_async()
        .await;
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page(
            "Home",
            "Links to public and private areas.",
            &["/docs/private/keys", "/docs/public"],
        ))
        .create_async()
        .await;
    let private = server
        .mock("GET", "/docs/private/keys")
        .with_status(200)
        .expect(0)
        .create_async()
        .await;
    server
        .mock("GET", "/docs/public")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("Public", "Public page with content.", &[]))
        .create_async()
        .await;

    let (_dir, index) = open_index().await;
    let source = add_source(&index, "Example", &format!("{origin}/docs")).await;
    let job_id = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: overrides(1, 100),
        })
        .await
        .expect("start");
    let job = wait_for_job(&index, &job_id).await;

    assert_completed(&job);
    private.assert_async().await;
    assert_eq!(job.progress.pages_crawled, 2);
}

#[tokio::test]
async fn search_works_end_to_end_after_a_crawl() {
    let mut server = mockito::Server::new_async().await;
    let origin = server.url();
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page(
            "Promises",
            "A Promise represents the eventual completion of an asynchronous operation.",
            &[],
        ))
        .create_async()
        .await;

    let (_dir, index) = open_index().await;
    let source = add_source(&index, "MDN JS", &format!("{origin}/docs")).await;
    let job_id = index
        .start_crawl(StartCrawlRequest {
            source_id: source.source_id.clone(),
            overrides: overrides(0, 10),
        })
        .await
        .expect("start");
    let job = wait_for_job(&index, &job_id).await;
    assert_completed(&job);

    let response = index.search("promise").await.expect("search");
    assert_eq!(response.grouped_results.len(), 1);
    let group = &response.grouped_results[0];
    assert_eq!(group.source, "MDN JS");
    assert!(group.results[0].snippet.contains("**Promise"));
    assert_eq!(
        group.results[0].breadcrumbs.first().map(String::as_str),
        Some("MDN JS")
    );
}
