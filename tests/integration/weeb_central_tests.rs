//! WeebCentral source against a mock site

use crate::common::png_bytes;
use std::sync::Arc;
use std::time::Duration;
use tankobon::config::Config;
use tankobon::download::{ChapterSelection, FetchPolicy, ImageFetcher, Runner};
use tankobon::output::RunStatus;
use tankobon::progress::Progress;
use tankobon::source::{ContentSource, ListingRetryPolicy, SourceError, WeebCentral};
use tankobon::JobStatus;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> ListingRetryPolicy {
    ListingRetryPolicy {
        max_attempts: 4,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        multiplier: 2.0,
    }
}

async fn live_source(server: &MockServer) -> WeebCentral {
    let source = WeebCentral::with_base_url(&server.uri())
        .unwrap()
        .with_retry_policy(fast_retry());
    source.initialize().await.unwrap();
    source
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_string(body.to_string())
}

async fn mount_site(server: &MockServer) {
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/search/data"))
        .and(query_param("text", "berserk"))
        .respond_with(html(&format!(
            r#"<section>
                <a class="line-clamp-1" href="{base}/series/01ABC/Berserk">Berserk</a>
                <a class="line-clamp-1" href="{base}/series/01DEF/Berserk-Colored">Berserk (Colored)</a>
            </section>"#
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/series/01ABC/full-chapter-list"))
        .respond_with(html(&format!(
            r#"<div>
                <a href="{base}/chapters/C3"><span class="grow">x</span><span>Chapter 3</span></a>
                <a href="{base}/chapters/C1"><span>Chapter 1</span></a>
                <a href="{base}/chapters/C2"><span>Chapter 2</span></a>
            </div>"#
        )))
        .mount(server)
        .await;

    for chapter in ["C1", "C2", "C3"] {
        Mock::given(method("GET"))
            .and(path(format!("/chapters/{}/images", chapter)))
            .and(query_param("reading_style", "long_strip"))
            .respond_with(html(&format!(
                r#"<section>
                    <img src="{base}/img/{chapter}/1.png" alt="Berserk Page 1">
                    <img src="{base}/img/{chapter}/2.png" alt="Berserk Page 2">
                    <img src="{base}/static/banner.png" alt="banner">
                </section>"#
            )))
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(wiremock::matchers::path_regex("^/img/.+"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(30, 40)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_search_chapters_and_pages() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let source = live_source(&server).await;

    let titles = source.find_titles("berserk").await.unwrap();
    assert_eq!(titles.len(), 2);
    let (name, locator) = titles.get_index(0).unwrap();
    assert_eq!(name, "Berserk");
    assert!(locator.ends_with("/series/01ABC/Berserk"));

    let chapters = source.list_chapters(locator).await.unwrap();
    let labels: Vec<_> = chapters.names().collect();
    assert_eq!(labels, vec!["Chapter 1", "Chapter 2", "Chapter 3"]);

    let (_, chapter) = chapters.get_index(0).unwrap();
    let pages = source.resolve_chapter_pages(chapter).await.unwrap();
    let names: Vec<_> = pages.names().collect();
    assert_eq!(names, vec!["Berserk Page 1", "Berserk Page 2"]);
}

#[tokio::test]
async fn test_no_titles_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/data"))
        .respond_with(html("<section></section>"))
        .mount(&server)
        .await;
    let source = live_source(&server).await;

    assert!(matches!(
        source.find_titles("nothing").await,
        Err(SourceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_listing_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/series/01ABC/full-chapter-list"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/series/01ABC/full-chapter-list"))
        .respond_with(html(r#"<a href="/chapters/C1"><span>Chapter 1</span></a>"#))
        .expect(1)
        .with_priority(2)
        .mount(&server)
        .await;
    let source = live_source(&server).await;

    let chapters = source
        .list_chapters(&format!("{}/series/01ABC/Berserk", server.uri()))
        .await
        .unwrap();
    assert_eq!(chapters.len(), 1);
}

#[tokio::test]
async fn test_listing_gives_up_after_four_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(4)
        .mount(&server)
        .await;
    let source = live_source(&server).await;

    let result = source.find_titles("berserk").await;
    assert!(matches!(
        result,
        Err(SourceError::RetriesExhausted { attempts: 4, .. })
    ));
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let source = live_source(&server).await;

    let result = source
        .resolve_chapter_pages(&format!("{}/chapters/C1", server.uri()))
        .await;
    assert!(matches!(result, Err(SourceError::Status { status: 404, .. })));
}

#[tokio::test]
async fn test_released_source_rejects_calls() {
    let server = MockServer::start().await;
    let source = live_source(&server).await;

    source.release().await.unwrap();
    source.release().await.unwrap();

    assert!(matches!(
        source.find_titles("berserk").await,
        Err(SourceError::NotInitialized)
    ));
}

#[tokio::test]
async fn test_install_end_to_end() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = TempDir::new().unwrap();

    let config = Config {
        output_dir: dir.path().join("out"),
        staging_dir: dir.path().join("staging"),
        concurrency: 2,
        ..Config::default()
    };
    let source: Arc<dyn ContentSource> = Arc::new(
        WeebCentral::with_base_url(&server.uri())
            .unwrap()
            .with_retry_policy(fast_retry()),
    );
    let fetcher = ImageFetcher::new(FetchPolicy::default()).unwrap();
    let mut runner = Runner::new(
        config,
        source,
        CancellationToken::new(),
        fetcher,
        Progress::hidden(),
    );

    let titles = runner.search("berserk").await.unwrap();
    let (title, locator) = titles.get_index(0).unwrap();
    let (title, locator) = (title.to_string(), locator.to_string());
    let chapters = runner.chapters(&locator).await.unwrap();

    let summary = runner
        .install(&title, &chapters, ChapterSelection::Range(2, 3))
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    let labels: Vec<_> = summary.outcomes.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["Chapter 2", "Chapter 3"]);
    assert!(summary
        .outcomes
        .iter()
        .all(|o| o.status == JobStatus::Archived && o.pages_written == 2));
    assert!(dir
        .path()
        .join("out/Berserk/Berserk-Chapter 3.cbz")
        .exists());

    let report = runner.close().await.unwrap();
    assert!(report.is_clean());
}
