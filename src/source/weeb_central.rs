//! WeebCentral content source
//!
//! Talks to weebcentral.com over plain HTTP. The site serves its search
//! results, full chapter lists and reader images as HTML fragments, so no
//! browser session is needed: every call is one GET plus HTML parsing.

use crate::source::parser::{parse_chapter_list, parse_chapter_pages, parse_search_results};
use crate::source::{ContentSource, Listing, ListingRetryPolicy, SourceError};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;

const BASE_URL: &str = "https://weebcentral.com/";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// WeebCentral scraper
pub struct WeebCentral {
    client: Client,
    base_url: Url,
    retry: ListingRetryPolicy,
    live: AtomicBool,
}

impl WeebCentral {
    /// Creates a source pointed at weebcentral.com
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(BASE_URL)
    }

    /// Creates a source pointed at another host (used against mock servers)
    pub fn with_base_url(base_url: &str) -> Result<Self, SourceError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SourceError::InvalidLocator(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| SourceError::Http {
                url: base_url.to_string(),
                source: e,
            })?;

        Ok(Self {
            client,
            base_url,
            retry: ListingRetryPolicy::default(),
            live: AtomicBool::new(false),
        })
    }

    /// Replaces the retry policy used for listing calls
    pub fn with_retry_policy(mut self, retry: ListingRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn ensure_live(&self) -> Result<(), SourceError> {
        if self.live.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SourceError::NotInitialized)
        }
    }

    /// Builds the search endpoint URL for a query
    fn search_url(&self, query: &str) -> Result<Url, SourceError> {
        let mut url = self.join("search/data")?;
        url.query_pairs_mut()
            .append_pair("text", query.trim())
            .append_pair("sort", "Best Match")
            .append_pair("order", "Descending")
            .append_pair("official", "Any")
            .append_pair("anime", "Any")
            .append_pair("adult", "Any")
            .append_pair("display_mode", "Full Display");
        Ok(url)
    }

    /// Maps `…/series/<id>/<slug>` to the endpoint listing every chapter
    fn chapter_list_url(&self, title_locator: &str) -> Result<Url, SourceError> {
        let id = locator_id(title_locator, "series", &self.base_url)?;
        self.join(&format!("series/{}/full-chapter-list", id))
    }

    /// Maps `…/chapters/<id>` to the endpoint rendering every page image
    fn chapter_images_url(&self, chapter_locator: &str) -> Result<Url, SourceError> {
        let id = locator_id(chapter_locator, "chapters", &self.base_url)?;
        let mut url = self.join(&format!("chapters/{}/images", id))?;
        url.query_pairs_mut()
            .append_pair("is_prev", "False")
            .append_pair("current_page", "1")
            .append_pair("reading_style", "long_strip");
        Ok(url)
    }

    fn join(&self, path: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(path)
            .map_err(|e| SourceError::InvalidLocator(format!("{}: {}", path, e)))
    }

    /// GETs a page and returns its body, treating non-2xx as an error
    async fn get_html(&self, url: &Url) -> Result<String, SourceError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SourceError::Http {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| SourceError::Http {
            url: url.to_string(),
            source: e,
        })
    }
}

#[async_trait]
impl ContentSource for WeebCentral {
    fn name(&self) -> &str {
        "weeb_central"
    }

    async fn initialize(&self) -> Result<(), SourceError> {
        self.live.store(true, Ordering::SeqCst);
        tracing::info!("WeebCentral session opened ({})", self.base_url);
        Ok(())
    }

    async fn release(&self) -> Result<(), SourceError> {
        if self.live.swap(false, Ordering::SeqCst) {
            tracing::info!("WeebCentral session released");
        }
        Ok(())
    }

    async fn find_titles(&self, query: &str) -> Result<Listing, SourceError> {
        self.ensure_live()?;
        let url = &self.search_url(query)?;

        let titles = self
            .retry
            .run("title search", || async move {
                let html = self.get_html(url).await?;
                parse_search_results(&html, url).map_err(|message| SourceError::Parse {
                    url: url.to_string(),
                    message,
                })
            })
            .await?;

        if titles.is_empty() {
            return Err(SourceError::NotFound(format!("titles matching '{}'", query)));
        }

        tracing::info!("Found {} titles matching '{}'", titles.len(), query);
        Ok(titles)
    }

    async fn list_chapters(&self, title_locator: &str) -> Result<Listing, SourceError> {
        self.ensure_live()?;
        let url = &self.chapter_list_url(title_locator)?;

        let mut chapters = self
            .retry
            .run("chapter listing", || async move {
                let html = self.get_html(url).await?;
                parse_chapter_list(&html, url).map_err(|message| SourceError::Parse {
                    url: url.to_string(),
                    message,
                })
            })
            .await?;

        chapters.sort_by_number();
        tracing::info!("Listed {} chapters for {}", chapters.len(), title_locator);
        Ok(chapters)
    }

    async fn resolve_chapter_pages(&self, chapter_locator: &str) -> Result<Listing, SourceError> {
        self.ensure_live()?;
        let url = &self.chapter_images_url(chapter_locator)?;

        let pages = self
            .retry
            .run("page resolution", || async move {
                let html = self.get_html(url).await?;
                parse_chapter_pages(&html, url).map_err(|message| SourceError::Parse {
                    url: url.to_string(),
                    message,
                })
            })
            .await?;

        tracing::debug!("Resolved {} pages for {}", pages.len(), chapter_locator);
        Ok(pages)
    }
}

/// Extracts the identifier that follows `segment` in a locator path
///
/// Accepts absolute URLs and paths relative to the site root.
fn locator_id(locator: &str, segment: &str, base_url: &Url) -> Result<String, SourceError> {
    let url = base_url
        .join(locator.trim())
        .map_err(|e| SourceError::InvalidLocator(format!("{}: {}", locator, e)))?;

    let mut segments = url
        .path_segments()
        .ok_or_else(|| SourceError::InvalidLocator(locator.to_string()))?
        .skip_while(|s| *s != segment);

    segments
        .nth(1)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            SourceError::InvalidLocator(format!("{} (expected a /{}/<id> path)", locator, segment))
        })
}
