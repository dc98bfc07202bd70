//! docsi command line interface.
//!
//! A thin wrapper over [`docsi::DocIndex`]: register sources, run
//! crawls, and query the corpus. Exit codes: 0 success, 1 validation
//! error, 2 network failure, 3 storage failure, 4 cancelled, 5
//! internal error.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use docsi::{
    AddSourceRequest, Config, CrawlOverrides, DocIndex, DocsiError, JobStatus, StartCrawlRequest,
};

#[derive(Parser)]
#[command(name = "docsi", version, about = "Documentation crawler and search indexer")]
struct Cli {
    /// Root directory for all docsi data.
    #[arg(long, global = true, default_value = "docsi-data")]
    base_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a documentation source.
    AddSource {
        /// Base URL crawling starts from.
        url: String,
        /// Unique source name.
        #[arg(long)]
        name: String,
        /// Tags attached to the source (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        max_depth: Option<u32>,
        #[arg(long)]
        max_pages: Option<usize>,
    },
    /// Remove a source and its stored pages.
    RemoveSource { name: String },
    /// List registered sources.
    ListSources,
    /// Crawl a source and wait for the job to finish.
    Crawl {
        /// Source name (or id).
        source: String,
        #[arg(long)]
        max_depth: Option<u32>,
        #[arg(long)]
        max_pages: Option<usize>,
        /// Re-store pages that already exist.
        #[arg(long)]
        force: bool,
        /// Skip sitemap discovery.
        #[arg(long)]
        no_sitemaps: bool,
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// Show a job's status.
    Status { job_id: String },
    /// Cancel a running job.
    Cancel { job_id: String },
    /// Search the indexed corpus.
    Search { query: String },
    /// Print one stored document as JSON.
    Get { url_or_id: String },
    /// List a source's stored pages.
    Pages { source: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("docsi=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, DocsiError> {
    let config = Config::builder().base_dir(cli.base_dir).build()?;
    let index = DocIndex::open(config).await?;

    match cli.command {
        Command::AddSource {
            url,
            name,
            tags,
            max_depth,
            max_pages,
        } => {
            let source = index
                .add_source(AddSourceRequest {
                    url,
                    name,
                    tags,
                    max_depth,
                    max_pages,
                })
                .await?;
            println!("added {} ({})", source.name, source.source_id);
        }
        Command::RemoveSource { name } => {
            let removed = index.remove_source(&name).await?;
            println!("removed {} ({} pages)", removed.name, removed.page_count);
        }
        Command::ListSources => {
            for source in index.list_sources().await {
                println!(
                    "{}\t{}\t{} pages\t{}",
                    source.name, source.base_url, source.page_count, source.source_id
                );
            }
        }
        Command::Crawl {
            source,
            max_depth,
            max_pages,
            force,
            no_sitemaps,
            max_retries,
        } => {
            let record = match index.registry().find_by_name(&source).await {
                Some(record) => record,
                None => index.registry().find_by_id(&source).await.ok_or_else(|| {
                    DocsiError::Validation(format!("unknown source: {source}"))
                })?,
            };

            let job_id = index
                .start_crawl(StartCrawlRequest {
                    source_id: record.source_id.clone(),
                    overrides: CrawlOverrides {
                        max_depth,
                        max_pages,
                        force: Some(force),
                        use_sitemaps: Some(!no_sitemaps),
                        max_retries,
                        ..CrawlOverrides::default()
                    },
                })
                .await?;
            println!("job {job_id}");

            // Poll until the job reaches a terminal state.
            loop {
                tokio::time::sleep(Duration::from_millis(500)).await;
                let Some(job) = index.get_job_status(&job_id) else {
                    return Err(DocsiError::Internal(format!("job {job_id} disappeared")));
                };
                if job.status.is_terminal() {
                    println!(
                        "{:?}: {} pages crawled, {} discovered",
                        job.status, job.progress.pages_crawled, job.progress.pages_discovered
                    );
                    return Ok(match job.status {
                        JobStatus::Completed => ExitCode::SUCCESS,
                        JobStatus::Canceled => ExitCode::from(4),
                        _ => {
                            if let Some(error) = job.error {
                                eprintln!("error: {error}");
                            }
                            ExitCode::from(2)
                        }
                    });
                }
            }
        }
        Command::Status { job_id } => match index.get_job_status(&job_id) {
            Some(job) => println!("{}", serde_json::to_string_pretty(&job)?),
            None => {
                return Err(DocsiError::Validation(format!("unknown job {job_id}")));
            }
        },
        Command::Cancel { job_id } => {
            if index.cancel_job(&job_id) {
                println!("cancellation requested for {job_id}");
            } else {
                return Err(DocsiError::Validation(format!(
                    "job {job_id} is not running"
                )));
            }
        }
        Command::Search { query } => {
            let response = index.search(&query).await?;
            for group in &response.grouped_results {
                println!("# {}", group.source);
                for result in &group.results {
                    println!(
                        "  [{:.2}] {} — {}\n        {}",
                        result.score,
                        result.title,
                        result.url,
                        result.snippet
                    );
                }
            }
            for link in &response.custom_link_matches {
                println!("link: {} — {}", link.name, link.url);
            }
        }
        Command::Get { url_or_id } => match index.get_document(&url_or_id).await? {
            Some(document) => println!("{}", serde_json::to_string_pretty(&document)?),
            None => {
                return Err(DocsiError::Validation(format!(
                    "no document for {url_or_id}"
                )));
            }
        },
        Command::Pages { source } => {
            let listing = index.list_pages(&source).await?;
            for page in &listing.pages {
                println!("{}\t{}\t{}", page.id, page.title, page.url);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
