//! Candidate extraction from article pages
//!
//! The extractor locates the fragments of a help-center page that may hold
//! the title, the body and the publication timestamps, and hands them to the
//! fetch worker in preference order. It never judges content quality; the
//! fetch worker picks and validates among the candidates.

use scraper::{ElementRef, Html, Selector};

/// Raw candidate values for each article field, in preference order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCandidates {
    /// Title candidates, best first
    pub titles: Vec<String>,

    /// Body HTML candidates, best first
    pub bodies: Vec<String>,

    /// Timestamp strings in document order
    pub timestamps: Vec<String>,
}

/// Page-structure extraction collaborator
pub trait Extractor: Send + Sync {
    /// Pulls candidate field values out of a fetched HTML document
    fn extract(&self, html: &str) -> PageCandidates;
}

/// Extractor for Zendesk-style help-center article pages
#[derive(Debug, Clone, Default)]
pub struct HtmlExtractor;

/// Primary title location; the heading also carries metadata lines
const HEADER_TITLE_SELECTOR: &str = "header.article-header h3";

/// Fallback title locations
const TITLE_SELECTORS: &str = "h1, .article-title, [data-testid='article-title']";

/// Primary body location
const BODY_SELECTOR: &str = ".article-body";

/// Fallback body locations
const FALLBACK_BODY_SELECTORS: &str =
    ".article-content, [data-testid='article-body'], .article__body, .article-body-container";

/// Timestamp locations (the `datetime` attribute is read)
const TIMESTAMP_SELECTORS: &str = "time[datetime], .article-created-at, .article-updated-at";

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for HtmlExtractor {
    fn extract(&self, html: &str) -> PageCandidates {
        let document = Html::parse_document(html);

        PageCandidates {
            titles: extract_titles(&document),
            bodies: extract_bodies(&document),
            timestamps: extract_timestamps(&document),
        }
    }
}

/// Runs `f` over every element matching `selector`
fn for_each_match<'a>(document: &'a Html, selector: &str, mut f: impl FnMut(ElementRef<'a>)) {
    if let Ok(selector) = Selector::parse(selector) {
        for element in document.select(&selector) {
            f(element);
        }
    }
}

/// Extracts title candidates from the header heading, then the fallbacks
fn extract_titles(document: &Html) -> Vec<String> {
    let mut titles = Vec::new();

    for_each_match(document, HEADER_TITLE_SELECTOR, |element| {
        let text = element.text().collect::<String>();
        titles.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !is_metadata_line(line))
                .map(str::to_string),
        );
    });

    for_each_match(document, TITLE_SELECTORS, |element| {
        let hidden = element
            .value()
            .attr("style")
            .is_some_and(|style| style.contains("display: none"));
        if hidden {
            return;
        }

        let text = element.text().collect::<String>().trim().to_string();
        if !text.is_empty() {
            titles.push(text);
        }
    });

    titles
}

/// Lines in the article header that describe the article rather than name it
fn is_metadata_line(line: &str) -> bool {
    line.contains("Published") || line.contains("Last Updated") || line.contains('•')
}

/// Extracts body HTML candidates, primary location first
fn extract_bodies(document: &Html) -> Vec<String> {
    let mut bodies = Vec::new();

    for selector in [BODY_SELECTOR, FALLBACK_BODY_SELECTORS] {
        for_each_match(document, selector, |element| {
            let cleaned = clean_html(&element.inner_html());
            if !cleaned.is_empty() {
                bodies.push(cleaned);
            }
        });
    }

    bodies
}

/// Extracts `datetime` attribute values in document order
fn extract_timestamps(document: &Html) -> Vec<String> {
    let mut timestamps = Vec::new();

    for_each_match(document, TIMESTAMP_SELECTORS, |element| {
        if let Some(datetime) = element.value().attr("datetime") {
            let datetime = datetime.trim();
            if !datetime.is_empty() {
                timestamps.push(datetime.to_string());
            }
        }
    });

    timestamps
}

/// Strips empty wrapper elements and collapses runs of blank lines and spaces
pub fn clean_html(html: &str) -> String {
    let mut html = html.to_string();

    for empty in [
        "<div></div>",
        "<div> </div>",
        "<p></p>",
        "<p> </p>",
        "<span></span>",
        "<span> </span>",
    ] {
        html = html.replace(empty, "");
    }

    while html.contains("\n\n\n") {
        html = html.replace("\n\n\n", "\n\n");
    }

    while html.contains("  ") {
        html = html.replace("  ", " ");
    }

    html.trim().to_string()
}
