//! Error types for document link extraction.

use thiserror::Error;

/// Errors that can occur while extracting a document link from a
/// landing page.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// No element in the page matched the configured selector.
    #[error("no document tag found with selector '{selector}'")]
    PdfTagNotFound {
        /// The CSS selector that matched nothing.
        selector: String,
    },

    /// The matched element lacks the configured link attribute.
    #[error("no document url found in tag matched by '{selector}': missing attribute '{attr}'")]
    PdfUrlNotFound {
        /// The CSS selector that produced the match.
        selector: String,
        /// The attribute expected to carry the link.
        attr: String,
    },

    /// The configured selector is not valid CSS.
    #[error("invalid document tag selector '{selector}'")]
    InvalidSelector {
        /// The rejected selector string.
        selector: String,
    },
}

impl ExtractError {
    /// Creates a tag-not-found error.
    #[must_use]
    pub fn tag_not_found(selector: &str) -> Self {
        Self::PdfTagNotFound {
            selector: selector.to_string(),
        }
    }

    /// Creates a url-not-found error.
    #[must_use]
    pub fn url_not_found(selector: &str, attr: &str) -> Self {
        Self::PdfUrlNotFound {
            selector: selector.to_string(),
            attr: attr.to_string(),
        }
    }

    /// Creates an invalid-selector error.
    #[must_use]
    pub fn invalid_selector(selector: &str) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
        }
    }
}
