//! Identifier parsing, validation, and landing-page query construction.
//!
//! An [`Identifier`] is the immutable input of one resolution task: a
//! DOI, a PMID, or a free-text title. DOIs are accepted in the common
//! written forms (bare, `doi:`-prefixed, `doi.org` URL) and normalized
//! to the bare form before use.

mod error;

pub use error::ParseError;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Result type for parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Bare DOI shape: `10.N/suffix`, with nested registrants allowed.
#[allow(clippy::expect_used)]
static DOI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^10\.\d+(?:\.\d+)*/\S+$").expect("DOI regex is valid") // Static pattern, safe to panic
});

/// `doi.org` URL prefix, with optional `dx.` host and either scheme.
#[allow(clippy::expect_used)]
static DOI_URL_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:dx\.)?doi\.org/").expect("DOI URL regex is valid") // Static pattern, safe to panic
});

/// The kind of lookup an identifier maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// Digital Object Identifier.
    Doi,
    /// PubMed numeric identifier.
    Pmid,
    /// Free-text document title.
    Title,
}

impl IdentifierKind {
    /// Returns the stable label used in logs and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Doi => "doi",
            Self::Pmid => "pmid",
            Self::Title => "title",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bibliographic identifier: the immutable input of one resolution task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// A normalized DOI, e.g. `10.1000/xyz123`.
    Doi(String),
    /// A PubMed ID.
    Pmid(u64),
    /// A free-text title.
    Title(String),
}

impl Identifier {
    /// Parses a DOI from any of its common written forms.
    ///
    /// Accepts bare DOIs, `doi:`-prefixed strings, and `doi.org` URLs
    /// (including `dx.doi.org`), normalizing all of them to the bare form.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidDoi`] when the normalized value does
    /// not have the `10.NNNN/suffix` shape.
    pub fn doi(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let without_url = DOI_URL_PREFIX_RE.replace(trimmed, "");
        let normalized = without_url
            .strip_prefix("doi:")
            .or_else(|| without_url.strip_prefix("DOI:"))
            .map_or_else(|| without_url.to_string(), |rest| rest.trim().to_string());

        if !DOI_RE.is_match(&normalized) {
            return Err(ParseError::InvalidDoi {
                input: input.to_string(),
            });
        }

        Ok(Self::Doi(normalized))
    }

    /// Creates a PMID identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidPmid`] when the value is zero.
    pub fn pmid(value: u64) -> Result<Self> {
        if value == 0 {
            return Err(ParseError::InvalidPmid {
                input: value.to_string(),
            });
        }
        Ok(Self::Pmid(value))
    }

    /// Creates a title identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::EmptyTitle`] when the title is empty after
    /// trimming.
    pub fn title(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseError::EmptyTitle);
        }
        Ok(Self::Title(trimmed.to_string()))
    }

    /// Returns this identifier's kind.
    #[must_use]
    pub fn kind(&self) -> IdentifierKind {
        match self {
            Self::Doi(_) => IdentifierKind::Doi,
            Self::Pmid(_) => IdentifierKind::Pmid,
            Self::Title(_) => IdentifierKind::Title,
        }
    }

    /// Returns the raw value as entered into reports and sidecar files.
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Self::Doi(doi) => doi.clone(),
            Self::Pmid(pmid) => pmid.to_string(),
            Self::Title(title) => title.clone(),
        }
    }

    /// Builds the landing-page query URL against a mirror base URL.
    ///
    /// Each kind maps to its own query template. DOIs keep their literal
    /// path form (slashes intact); titles are percent-encoded.
    #[must_use]
    pub fn query_url(&self, mirror_base: &str) -> String {
        let base = mirror_base.trim_end_matches('/');
        match self {
            Self::Doi(doi) => format!("{base}/{doi}"),
            Self::Pmid(pmid) => format!("{base}/pubmed/{pmid}"),
            Self::Title(title) => {
                format!("{base}/search?request={}", urlencoding::encode(title))
            }
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_doi_bare_form_accepted() {
        let id = Identifier::doi("10.1000/xyz123").unwrap();
        assert_eq!(id, Identifier::Doi("10.1000/xyz123".to_string()));
        assert_eq!(id.kind(), IdentifierKind::Doi);
    }

    #[test]
    fn test_doi_url_form_normalized() {
        let id = Identifier::doi("https://doi.org/10.1000/xyz123").unwrap();
        assert_eq!(id.value(), "10.1000/xyz123");

        let id = Identifier::doi("http://dx.doi.org/10.1000/xyz123").unwrap();
        assert_eq!(id.value(), "10.1000/xyz123");
    }

    #[test]
    fn test_doi_prefix_form_normalized() {
        let id = Identifier::doi("doi:10.1000/xyz123").unwrap();
        assert_eq!(id.value(), "10.1000/xyz123");

        let id = Identifier::doi("DOI: 10.1000/xyz123").unwrap();
        assert_eq!(id.value(), "10.1000/xyz123");
    }

    #[test]
    fn test_doi_surrounding_whitespace_trimmed() {
        let id = Identifier::doi("  10.1000/xyz123  ").unwrap();
        assert_eq!(id.value(), "10.1000/xyz123");
    }

    #[test]
    fn test_doi_without_suffix_rejected() {
        assert!(Identifier::doi("10.1000").is_err());
        assert!(Identifier::doi("not-a-doi").is_err());
        assert!(Identifier::doi("").is_err());
    }

    #[test]
    fn test_pmid_positive_accepted_zero_rejected() {
        assert_eq!(Identifier::pmid(31452104).unwrap().value(), "31452104");
        assert!(matches!(
            Identifier::pmid(0),
            Err(ParseError::InvalidPmid { .. })
        ));
    }

    #[test]
    fn test_title_trimmed_and_empty_rejected() {
        let id = Identifier::title("  Deep Learning  ").unwrap();
        assert_eq!(id.value(), "Deep Learning");
        assert!(matches!(
            Identifier::title("   "),
            Err(ParseError::EmptyTitle)
        ));
    }

    #[test]
    fn test_query_url_doi_keeps_literal_path() {
        let id = Identifier::doi("10.1/xyz").unwrap();
        assert_eq!(
            id.query_url("https://m1.test/"),
            "https://m1.test/10.1/xyz"
        );
    }

    #[test]
    fn test_query_url_pmid_uses_pubmed_path() {
        let id = Identifier::pmid(12345).unwrap();
        assert_eq!(id.query_url("https://m1.test"), "https://m1.test/pubmed/12345");
    }

    #[test]
    fn test_query_url_title_is_percent_encoded() {
        let id = Identifier::title("deep learning & memory").unwrap();
        assert_eq!(
            id.query_url("https://m1.test"),
            "https://m1.test/search?request=deep%20learning%20%26%20memory"
        );
    }

    #[test]
    fn test_display_includes_kind() {
        let id = Identifier::doi("10.1/xyz").unwrap();
        assert_eq!(id.to_string(), "doi:10.1/xyz");
    }
}
