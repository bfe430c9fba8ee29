//! Document link and title extraction from landing-page HTML.
//!
//! Mirrors embed the actual document behind wildly inconsistent markup,
//! so extraction is selector-driven: the element and attribute carrying
//! the link come from configuration, and the title falls back through a
//! chain of increasingly generic sources before being cleaned into a
//! filesystem-safe string.

mod error;

pub use error::ExtractError;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Default CSS selector for the element embedding the document link.
pub const DEFAULT_PDF_TAG_SELECTOR: &str = "embed#pdf";

/// Default attribute carrying the document link on the matched element.
pub const DEFAULT_PDF_TAG_ATTR: &str = "src";

/// Protocol prefixes accepted as already-absolute document URLs.
const PROTOCOL_PREFIXES: [&str; 2] = ["http://", "https://"];

/// Scheme applied to protocol-relative (`//...`) document URLs.
const DEFAULT_PROTOCOL: &str = "https:";

/// Maximum title length in characters after cleaning.
const MAX_TITLE_CHARS: usize = 200;

/// Compiles a regex at static init; panics on invalid pattern.
fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Parses a CSS selector at static init; panics on invalid pattern.
fn parse_static_selector(selector: &str) -> Selector {
    Selector::parse(selector)
        .unwrap_or_else(|e| panic!("invalid static selector '{selector}': {e}"))
}

/// Characters that cannot appear in filenames on common filesystems.
static HOSTILE_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"[/\\:*?"<>|]"#));

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_static_selector("title"));
static H1_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_static_selector("h1"));
static CITATION_TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| parse_static_selector(r#"meta[name="citation_title"]"#));
static OG_TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| parse_static_selector(r#"meta[property="og:title"]"#));

/// The document link and cleaned title recovered from a landing page.
///
/// `document_url` is always absolute and scheme-qualified. `title` may
/// be empty; consumers substitute a generated filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedInfo {
    /// Absolute URL of the downloadable document.
    pub document_url: String,
    /// Cleaned, length-capped title text.
    pub title: String,
}

impl fmt::Display for ExtractedInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "url={}, title={}", self.document_url, self.title)
    }
}

/// Selector-driven extractor for landing-page HTML.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    selector: Selector,
    selector_source: String,
    attr: String,
}

impl Default for LinkExtractor {
    fn default() -> Self {
        // The defaults are valid CSS, so this cannot fail.
        Self::new(DEFAULT_PDF_TAG_SELECTOR, DEFAULT_PDF_TAG_ATTR)
            .unwrap_or_else(|e| panic!("default extractor selector rejected: {e}"))
    }
}

impl LinkExtractor {
    /// Creates an extractor with the configured selector and attribute.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidSelector`] when the selector is not
    /// valid CSS.
    pub fn new(selector: &str, attr: &str) -> Result<Self> {
        let parsed =
            Selector::parse(selector).map_err(|_| ExtractError::invalid_selector(selector))?;

        Ok(Self {
            selector: parsed,
            selector_source: selector.to_string(),
            attr: attr.to_string(),
        })
    }

    /// Extracts the document URL and title from landing-page HTML.
    ///
    /// `referer` is the base URL of the mirror the page came from; root
    /// relative document links are resolved against it.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::PdfTagNotFound`] when nothing matches the
    /// configured selector, or [`ExtractError::PdfUrlNotFound`] when the
    /// matched element lacks the configured attribute.
    pub fn extract(&self, html: &str, referer: &str) -> Result<ExtractedInfo> {
        let document = Html::parse_document(html);

        let raw_url = self.extract_raw_url(&document)?;
        let document_url = resolve_document_url(&raw_url, referer);
        let title = extract_title(&document);

        let info = ExtractedInfo {
            document_url,
            title,
        };
        debug!(info = %info, "extracted document information");

        Ok(info)
    }

    fn extract_raw_url(&self, document: &Html) -> Result<String> {
        let element = document
            .select(&self.selector)
            .next()
            .ok_or_else(|| ExtractError::tag_not_found(&self.selector_source))?;

        let raw_url = element
            .value()
            .attr(&self.attr)
            .ok_or_else(|| ExtractError::url_not_found(&self.selector_source, &self.attr))?;

        Ok(raw_url.to_string())
    }
}

/// Resolves a raw attribute value into an absolute document URL.
///
/// A value carrying a recognized protocol prefix is used as-is. Anything
/// else has its fragment stripped, then: `//...` gets the default scheme,
/// `/...` is joined to the referer base, and a bare relative value is
/// joined with a separating slash so the result is absolute either way.
fn resolve_document_url(raw_url: &str, referer: &str) -> String {
    if PROTOCOL_PREFIXES.iter().any(|p| raw_url.contains(p)) {
        return raw_url.to_string();
    }

    let without_fragment = raw_url.split('#').next().unwrap_or_default();
    let base = referer.trim_end_matches('/');

    if let Some(rest) = without_fragment.strip_prefix("//") {
        format!("{DEFAULT_PROTOCOL}//{rest}")
    } else if without_fragment.starts_with('/') {
        format!("{base}{without_fragment}")
    } else {
        format!("{base}/{without_fragment}")
    }
}

/// Recovers a title through the fallback chain, then cleans it.
///
/// Methods, each tried only when the previous yielded empty text:
/// 1. `<title>` text; with a `|` delimiter, the segment right after the
///    first `|` (publisher-suffix convention).
/// 2. First `<h1>` text.
/// 3. `citation_title` meta content, then `og:title` meta content.
fn extract_title(document: &Html) -> String {
    let mut title = String::new();

    if let Some(element) = document.select(&TITLE_SELECTOR).next() {
        let text: String = element.text().collect();
        if !text.trim().is_empty() {
            title = match text.split('|').nth(1) {
                Some(after_pipe) => after_pipe.to_string(),
                None => text,
            };
        }
    }

    if title.trim().is_empty() {
        if let Some(element) = document.select(&H1_SELECTOR).next() {
            title = element.text().collect();
        }
    }

    if title.trim().is_empty() {
        let meta_content = document
            .select(&CITATION_TITLE_SELECTOR)
            .next()
            .and_then(|el| el.value().attr("content"))
            .or_else(|| {
                document
                    .select(&OG_TITLE_SELECTOR)
                    .next()
                    .and_then(|el| el.value().attr("content"))
            });
        if let Some(content) = meta_content {
            title = content.to_string();
        }
    }

    clean_title(&title)
}

/// Replaces filesystem-hostile characters with spaces, truncates to the
/// title cap, and trims surrounding whitespace.
fn clean_title(title: &str) -> String {
    let replaced = HOSTILE_CHARS_RE.replace_all(title, " ");
    let truncated: String = replaced.chars().take(MAX_TITLE_CHARS).collect();
    truncated.trim().to_string()
}
