//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use docsi::{Config, DocIndex, Job, JobStatus};
use tempfile::TempDir;

/// A DocIndex rooted in a fresh temporary directory. The TempDir must
/// outlive the index.
pub async fn open_index() -> (TempDir, Arc<DocIndex>) {
    let dir = TempDir::new().expect("temp dir");
    let config = Config::builder()
        .base_dir(dir.path())
        .build()
        .expect("config");
    let index = DocIndex::open(config).await.expect("open index");
    (dir, index)
}

/// Poll a job until it reaches a terminal state.
pub async fn wait_for_job(index: &DocIndex, job_id: &str) -> Job {
    for _ in 0..600 {
        let job = index.get_job_status(job_id).expect("job exists");
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job {job_id} did not finish in time");
}

pub fn assert_completed(job: &Job) {
    assert_eq!(
        job.status,
        JobStatus::Completed,
        "job should complete, error: {:?}",
        job.error
    );
}

/// A minimal HTML page with a title, some body text, and links.
pub fn page(title: &str, body: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{href}\">{href}</a>"))
        .collect();
    format!(
        "<html><head><title>{title}</title></head><body>\
         <main><h1>{title}</h1><p>{body}</p></main>{anchors}</body></html>"
    )
}
