//! Error types for identifier parsing.

use thiserror::Error;

/// Errors that can occur when constructing an identifier from raw input.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// The input does not look like a DOI after normalization.
    #[error("invalid DOI '{input}': expected the form 10.NNNN/suffix")]
    InvalidDoi {
        /// The rejected input.
        input: String,
    },

    /// The PMID is not a positive integer.
    #[error("invalid PMID '{input}': expected a positive integer")]
    InvalidPmid {
        /// The rejected input.
        input: String,
    },

    /// The title is empty after trimming.
    #[error("empty title")]
    EmptyTitle,
}
