//! HTML parsing for WeebCentral pages
//!
//! Each function turns one HTML fragment into a `Listing`. Relative links are
//! resolved against the page URL; elements without a link get the
//! `UNAVAILABLE_LOCATOR` sentinel so the download engine can reject them.

use crate::source::{Listing, UNAVAILABLE_LOCATOR};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Extracts `title → series URL` pairs from search results
pub fn parse_search_results(html: &str, base_url: &Url) -> Result<Listing, String> {
    let document = Html::parse_document(html);
    let selector = parse_selector("a.line-clamp-1")?;

    let mut titles = Listing::new();
    for element in document.select(&selector) {
        let name = element_text(&element);
        if name.is_empty() {
            continue;
        }
        titles.insert(name, resolve_locator(element.value().attr("href"), base_url));
    }

    Ok(titles)
}

/// Extracts `chapter label → chapter URL` pairs from a full chapter list
///
/// The label is the first `span` without a class inside the chapter link;
/// links without such a span fall back to their whole text. The result is in
/// document order, callers sort it.
pub fn parse_chapter_list(html: &str, base_url: &Url) -> Result<Listing, String> {
    let document = Html::parse_document(html);
    let link_selector = parse_selector("a[href*='/chapters/']")?;
    let span_selector = parse_selector("span")?;

    let mut chapters = Listing::new();
    for link in document.select(&link_selector) {
        let label = link
            .select(&span_selector)
            .find(|span| {
                span.value()
                    .attr("class")
                    .map_or(true, |class| class.trim().is_empty())
            })
            .map(|span| element_text(&span))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| element_text(&link));

        if label.is_empty() {
            continue;
        }
        chapters.insert(label, resolve_locator(link.value().attr("href"), base_url));
    }

    Ok(chapters)
}

/// Extracts `page name → image URL` pairs from a chapter reader
///
/// Only images whose `alt` mentions "Page" are pages; the rest are banners
/// and avatars.
pub fn parse_chapter_pages(html: &str, base_url: &Url) -> Result<Listing, String> {
    let document = Html::parse_document(html);
    let selector = parse_selector("img[alt]")?;

    let mut pages = Listing::new();
    for image in document.select(&selector) {
        let Some(alt) = image.value().attr("alt") else {
            continue;
        };
        if !alt.contains("Page") {
            continue;
        }
        pages.insert(
            alt.trim(),
            resolve_locator(image.value().attr("src"), base_url),
        );
    }

    Ok(pages)
}

fn parse_selector(selector: &str) -> Result<Selector, String> {
    Selector::parse(selector).map_err(|e| format!("invalid selector '{}': {:?}", selector, e))
}

fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves an attribute value to an absolute URL, or the sentinel when missing
fn resolve_locator(value: Option<&str>, base_url: &Url) -> String {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return UNAVAILABLE_LOCATOR.to_string();
    };

    match base_url.join(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url.to_string(),
        _ => value.to_string(),
    }
}
