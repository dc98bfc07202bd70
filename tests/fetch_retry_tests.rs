//! Retry semantics of the page fetcher.

use docsi::engine::fetch_with_retry;
use docsi::DocsiError;
use std::time::{Duration, Instant};

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("client")
}

#[tokio::test]
async fn server_errors_retry_until_success() {
    let mut server = mockito::Server::new_async().await;
    let url = format!("{}/docs", server.url());

    let failing = server
        .mock("GET", "/docs")
        .with_status(503)
        .expect_at_least(2)
        .create_async()
        .await;

    let fetch_client = client();
    let fetch_url = url.clone();
    let handle =
        tokio::spawn(async move { fetch_with_retry(&fetch_client, &fetch_url, 3).await });

    // Attempt 1 fires immediately, attempt 2 after ~1-2s of backoff.
    // Attempt 3 waits at least 2 more seconds, which leaves a safe
    // window to swap the mock for a success response.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    failing.assert_async().await;
    failing.remove_async().await;
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html><body><p>finally up</p></body></html>")
        .create_async()
        .await;

    let page = handle.await.expect("join").expect("eventual success");
    assert_eq!(page.status, 200);
    assert!(page.body.contains("finally up"));
}

#[tokio::test]
async fn backoff_grows_exponentially() {
    let mut server = mockito::Server::new_async().await;
    let url = format!("{}/docs", server.url());
    let failing = server
        .mock("GET", "/docs")
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let started = Instant::now();
    let result = fetch_with_retry(&client(), &url, 3).await;
    let elapsed = started.elapsed();

    failing.assert_async().await;
    assert!(matches!(result, Err(DocsiError::Network(_))));
    // Backoff floors: 1s before attempt 2, 2s before attempt 3.
    assert!(
        elapsed >= Duration::from_secs(3),
        "expected at least 3s of backoff, got {elapsed:?}"
    );
}

#[tokio::test]
async fn client_errors_never_retry() {
    let mut server = mockito::Server::new_async().await;
    let url = format!("{}/docs", server.url());
    let not_found = server
        .mock("GET", "/docs")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let started = Instant::now();
    let result = fetch_with_retry(&client(), &url, 3).await;

    not_found.assert_async().await;
    assert!(matches!(
        result,
        Err(DocsiError::HttpClient { status: 404, .. })
    ));
    // No backoff sleeps happened.
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn connection_failures_surface_as_network_errors() {
    // Nothing listens on this port.
    let result = fetch_with_retry(&client(), "http://127.0.0.1:1/docs", 1).await;
    assert!(matches!(result, Err(DocsiError::Network(_))));
}
