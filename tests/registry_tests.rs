//! Source registry CRUD and persistence.

use docsi::registry::{CrawlPolicy, CustomLink};
use docsi::{AddSourceRequest, Config, DocIndex, DocsiError};

mod common;
use common::open_index;

fn request(name: &str, url: &str) -> AddSourceRequest {
    AddSourceRequest {
        url: url.to_string(),
        name: name.to_string(),
        tags: vec!["docs".into()],
        max_depth: Some(2),
        max_pages: Some(50),
    }
}

#[tokio::test]
async fn add_list_find_remove() {
    let (_dir, index) = open_index().await;

    let source = index
        .add_source(request("Example", "https://example.com/docs"))
        .await
        .expect("add");
    assert_eq!(source.crawl_policy.max_depth, 2);
    assert_eq!(source.crawl_policy.max_pages, 50);

    let listed = index.list_sources().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Example");

    let found = index
        .registry()
        .find_by_name("Example")
        .await
        .expect("found");
    assert_eq!(found.source_id, source.source_id);
    assert!(index.registry().find_by_id(&source.source_id).await.is_some());

    let removed = index.remove_source("Example").await.expect("remove");
    assert_eq!(removed.source_id, source.source_id);
    assert!(index.list_sources().await.is_empty());
}

#[tokio::test]
async fn names_are_unique() {
    let (_dir, index) = open_index().await;
    index
        .add_source(request("Example", "https://example.com/docs"))
        .await
        .expect("add");

    let duplicate = index
        .add_source(request("Example", "https://other.com/docs"))
        .await;
    assert!(matches!(duplicate, Err(DocsiError::Validation(_))));
}

#[tokio::test]
async fn base_url_must_be_http() {
    let (_dir, index) = open_index().await;
    for bad in ["ftp://example.com", "not a url", "file:///etc/passwd"] {
        let result = index.add_source(request("Bad", bad)).await;
        assert!(matches!(result, Err(DocsiError::Validation(_))), "{bad}");
    }
}

#[tokio::test]
async fn registry_persists_across_reopen() {
    let (dir, index) = open_index().await;
    index
        .add_source(request("Example", "https://example.com/docs"))
        .await
        .expect("add");
    index
        .registry()
        .add_custom_link(CustomLink {
            name: "Rust Book".into(),
            url: "https://doc.rust-lang.org/book".into(),
            tags: vec!["rust".into()],
        })
        .await
        .expect("custom link");
    drop(index);

    let config = Config::builder()
        .base_dir(dir.path())
        .build()
        .expect("config");
    let reopened = DocIndex::open(config).await.expect("reopen");
    let sources = reopened.list_sources().await;
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].name, "Example");
    assert_eq!(sources[0].crawl_policy.max_pages, 50);

    let links = reopened.registry().custom_links().await;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].name, "Rust Book");
}

#[tokio::test]
async fn zero_max_pages_policy_is_rejected() {
    let (_dir, index) = open_index().await;
    let result = index
        .registry()
        .add(
            "Zero",
            "https://example.com",
            Vec::new(),
            CrawlPolicy {
                max_pages: 0,
                ..CrawlPolicy::default()
            },
        )
        .await;
    assert!(matches!(result, Err(DocsiError::Validation(_))));
}
