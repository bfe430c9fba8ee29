//! Error types for resolution tasks.

use thiserror::Error;

use crate::extract::ExtractError;
use crate::fetch::FetchError;
use crate::mirror::MirrorError;
use crate::output::WriteError;

/// Terminal failure of a resolution task, tagged by the step that failed.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Mirror selection failed before any fetch was attempted.
    #[error("mirror selection failed: {0}")]
    Mirror(#[source] MirrorError),

    /// The landing page could not be fetched.
    #[error("crawling failed: {0}")]
    Crawl(#[source] FetchError),

    /// The landing page could not be parsed into a document link.
    #[error("extracting failed: {0}")]
    Extract(#[source] ExtractError),

    /// The document could not be fetched or streamed to disk.
    #[error("downloading failed: {0}")]
    Download(#[source] FetchError),

    /// The output location could not be prepared.
    #[error("downloading failed: {0}")]
    Write(#[source] WriteError),
}
