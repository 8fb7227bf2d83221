//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! discovery and extraction cycle over real HTTP.

use sitesweep::config::Config;
use sitesweep::crawler::{CrawlContext, DiscoveryEngine, HttpFetcher};
use sitesweep::jobs::JobRunner;
use sitesweep::output::{ArtifactWriter, ErrorLog, ExtractedPage};
use sitesweep::state::JobPhase;
use sitesweep::storage::ProgressSnapshot;
use sitesweep::url::canonicalize_seed;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted in a temporary directory
fn create_test_config(dir: &TempDir) -> Config {
    let path = |p: &str| dir.path().join(p).to_string_lossy().into_owned();
    let mut config = Config::default();
    config.crawler.batch_size = 4;
    config.crawler.fetch_timeout_secs = 5;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.output.output_dir = path("output");
    config.output.progress_dir = path("progress");
    config.output.hash_index_path = path("hashes.json");
    config.output.error_log_path = path("output/logs/errors.log");
    config
}

async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
        .mount(server)
        .await;
}

/// Seed linking to two internal pages, an external page and a document
async fn mount_example_site(server: &MockServer) {
    let base = server.uri();
    mount_html(
        server,
        "/",
        &format!(
            r#"<html><body><main>
                <p>Welcome to the test site.</p>
                <a href="/a">Page A</a>
                <a href="{base}/b#team">Page B</a>
                <a href="https://external.test/x">Elsewhere</a>
                <a href="/doc.pdf">Brochure</a>
            </main></body></html>"#
        ),
    )
    .await;
    mount_html(
        server,
        "/a",
        r#"<html><body>
            <div class="cookie">We use cookies.</div>
            <main><h1>About us</h1><p>We build bridges. We also repair them.</p></main>
        </body></html>"#,
    )
    .await;
    mount_html(
        server,
        "/b",
        r#"<html><body><main><p>Our team is small. It is growing.</p><a href="/">Home</a></main></body></html>"#,
    )
    .await;
}

fn read_single_artifact(config: &Config) -> Vec<ExtractedPage> {
    let writer = ArtifactWriter::new(&config.output.output_dir);
    let runs = writer.list_runs().expect("list runs");
    assert_eq!(runs.len(), 1, "expected exactly one run directory");

    let entries = writer.list_run_entries(runs[0]).expect("list entries");
    assert_eq!(entries.len(), 1, "expected exactly one host artifact");

    let content = std::fs::read_to_string(writer.run_dir(runs[0]).join(&entries[0]))
        .expect("read artifact");
    serde_json::from_str(&content).expect("parse artifact")
}

async fn crawl(runner: &JobRunner, url: &str) -> ProgressSnapshot {
    let job_id = runner.submit(url, None).await.expect("submit");
    runner.wait(&job_id).await.expect("wait")
}

#[tokio::test]
async fn test_discovery_over_http() {
    let server = MockServer::start().await;
    mount_example_site(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let context = CrawlContext::from_config(&config).unwrap();
    let error_log = ErrorLog::disabled();

    let seed = canonicalize_seed(&server.uri()).unwrap();
    let discovered = DiscoveryEngine::new(
        context.fetcher.as_ref(),
        &context.scheduler,
        &context.filter,
        &error_log,
    )
    .discover(&seed, config.crawler.batch_size, |_| {})
    .await
    .unwrap();

    let urls: Vec<&str> = discovered.iter().map(|u| u.as_str()).collect();
    let base = server.uri();
    assert_eq!(urls, vec![format!("{base}/a"), format!("{base}/b")]);
}

#[tokio::test]
async fn test_full_crawl_writes_done_record_and_artifact() {
    let server = MockServer::start().await;
    mount_example_site(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let runner = JobRunner::from_config(&config).unwrap();

    let record = crawl(&runner, &server.uri()).await;

    assert_eq!(record.status, JobPhase::Done);
    assert_eq!(record.progress, 100);
    assert_eq!(record.counters.total, 2);
    assert_eq!(record.counters.success, 2);
    assert_eq!(record.counters.failed, 0);
    assert!(record.error.is_none());

    let pages = read_single_artifact(&config);
    assert_eq!(pages.len(), 2);

    let about = pages
        .iter()
        .find(|p| p.url.ends_with("/a"))
        .expect("page /a in artifact");
    assert!(about.summary.contains("We build bridges."));
    assert!(!about.summary.contains("cookies"));
    assert!(!about.summary.contains('#'));
    assert_eq!(about.hash.len(), 64);

    let stored = runner.activity().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].1.status, JobPhase::Done);
}

#[tokio::test]
async fn test_second_run_skips_unchanged_pages() {
    let server = MockServer::start().await;
    mount_example_site(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let runner = JobRunner::from_config(&config).unwrap();

    let first = crawl(&runner, &server.uri()).await;
    assert_eq!(first.counters.success, 2);

    let second = crawl(&runner, &server.uri()).await;
    assert_eq!(second.status, JobPhase::Done);
    assert_eq!(second.counters.total, 2);
    assert_eq!(second.counters.success, 0);
    assert_eq!(second.counters.skipped, 2);

    // Nothing new, so the first run's artifact is left untouched
    assert_eq!(read_single_artifact(&config).len(), 2);
}

#[tokio::test]
async fn test_missing_page_counts_as_failed() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<main><a href="/present">here</a><a href="/missing">gone</a></main>"#,
    )
    .await;
    mount_html(&server, "/present", "<main><p>Still here.</p></main>").await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let runner = JobRunner::from_config(&config).unwrap();

    let record = crawl(&runner, &server.uri()).await;

    assert_eq!(record.status, JobPhase::Done);
    assert_eq!(record.counters.total, 2);
    assert_eq!(record.counters.success, 1);
    assert_eq!(record.counters.failed, 1);

    let log = std::fs::read_to_string(&config.output.error_log_path).unwrap();
    assert!(log.contains("/missing"));
    assert!(log.contains("404"));
}

#[tokio::test]
async fn test_non_html_response_is_not_followed() {
    let server = MockServer::start().await;
    mount_html(&server, "/", r#"<main><a href="/data">data</a></main>"#).await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"a": "<a href=\"/hidden\">"}"#, "application/json"),
        )
        .mount(&server)
        .await;
    mount_html(&server, "/hidden", "<main><p>Hidden.</p></main>").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let runner = JobRunner::from_config(&config).unwrap();

    let record = crawl(&runner, &server.uri()).await;

    assert_eq!(record.status, JobPhase::Done);
    assert_eq!(record.counters.total, 1);
    assert_eq!(record.counters.failed, 1);
    assert_eq!(record.counters.success, 0);
}

#[tokio::test]
async fn test_unreachable_seed_finishes_empty() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let runner = JobRunner::from_config(&config).unwrap();

    // Nothing listens on port 9 on loopback
    let record = crawl(&runner, "http://127.0.0.1:9/").await;

    assert_eq!(record.status, JobPhase::Done);
    assert_eq!(record.counters.total, 0);
    assert!(ArtifactWriter::new(&config.output.output_dir)
        .list_runs()
        .unwrap()
        .is_empty());
}

#[test]
fn test_http_fetcher_builds_from_defaults() {
    let config = Config::default();
    assert!(HttpFetcher::new(&config.user_agent, &config.crawler).is_ok());
}
