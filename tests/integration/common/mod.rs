//! Shared fixtures for integration tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tankobon::config::{Config, ImageConfig};
use tankobon::download::{FetchPolicy, ImageFetcher, Runner};
use tankobon::progress::Progress;
use tankobon::source::{ContentSource, Listing, SourceError};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TITLE: &str = "Berserk";

/// In-memory content source with call accounting
#[derive(Default)]
pub struct MockSource {
    chapters: Listing,
    pages: HashMap<String, Listing>,
    resolve_delay: Duration,
    release_delay: Duration,
    panic_on: Option<String>,
    pub initializations: AtomicUsize,
    pub releases_started: AtomicUsize,
    pub releases_completed: AtomicUsize,
    resolved: Mutex<Vec<String>>,
    active: Arc<AtomicUsize>,
    peak: AtomicUsize,
}

/// Decrements the active resolve counter even when the call is cancelled
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a chapter whose pages are served by `server` under `/img/<locator>/`
    pub fn with_chapter(mut self, label: &str, locator: &str, pages: Listing) -> Self {
        self.chapters.insert(label, locator);
        self.pages.insert(locator.to_string(), pages);
        self
    }

    pub fn with_resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = delay;
        self
    }

    pub fn with_release_delay(mut self, delay: Duration) -> Self {
        self.release_delay = delay;
        self
    }

    /// Makes page resolution of `locator` panic
    pub fn with_panic_on(mut self, locator: &str) -> Self {
        self.panic_on = Some(locator.to_string());
        self
    }

    pub fn chapters(&self) -> Listing {
        self.chapters.clone()
    }

    /// Chapter locators in the order their pages were requested
    pub fn resolved(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }

    pub fn peak_resolving(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases_completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&self) -> Result<(), SourceError> {
        self.initializations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn release(&self) -> Result<(), SourceError> {
        self.releases_started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.release_delay).await;
        self.releases_completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_titles(&self, query: &str) -> Result<Listing, SourceError> {
        if query.eq_ignore_ascii_case(TITLE) {
            Ok([(TITLE, "https://mock.test/series/1/berserk")].into_iter().collect())
        } else {
            Err(SourceError::NotFound(query.to_string()))
        }
    }

    async fn list_chapters(&self, _title_locator: &str) -> Result<Listing, SourceError> {
        Ok(self.chapters.clone())
    }

    async fn resolve_chapter_pages(&self, chapter_locator: &str) -> Result<Listing, SourceError> {
        if self.panic_on.as_deref() == Some(chapter_locator) {
            panic!("page resolution of {} blew up", chapter_locator);
        }
        self.resolved.lock().unwrap().push(chapter_locator.to_string());

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = ActiveGuard(Arc::clone(&self.active));

        tokio::time::sleep(self.resolve_delay).await;

        self.pages
            .get(chapter_locator)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(chapter_locator.to_string()))
    }
}

/// Encodes a solid dark PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([20, 40, 60]));
    let mut bytes = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut bytes, image::ImageOutputFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// Starts a server answering every `/img/...` request with a PNG
pub async fn image_server(width: u32, height: u32) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/img/.+"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png_bytes(width, height)),
        )
        .mount(&server)
        .await;
    server
}

/// `Page 1 .. Page n` pointing at `server`
pub fn pages(server: &MockServer, chapter: &str, count: usize) -> Listing {
    (1..=count)
        .map(|n| {
            (
                format!("Page {}", n),
                format!("{}/img/{}/{}.png", server.uri(), chapter, n),
            )
        })
        .collect()
}

/// Configuration rooted in a temporary directory
pub fn test_config(root: &Path, concurrency: u32) -> Config {
    Config {
        output_dir: root.join("out"),
        staging_dir: root.join("staging"),
        concurrency,
        image: ImageConfig {
            color: false,
            ..ImageConfig::default()
        },
        ..Config::default()
    }
}

pub fn fast_fetcher() -> ImageFetcher {
    ImageFetcher::new(FetchPolicy {
        max_attempts: 2,
        attempt_timeout: Duration::from_secs(2),
    })
    .unwrap()
}

pub fn runner(config: Config, source: &Arc<MockSource>, token: CancellationToken) -> Runner {
    let source: Arc<dyn ContentSource> = source.clone();
    Runner::new(config, source, token, fast_fetcher(), Progress::hidden())
}

/// Names of the entries of a zip file, in archive order
pub fn archive_entries(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Sorted names of the entries of a directory; empty when it does not exist
pub fn dir_entries(path: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(path) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
