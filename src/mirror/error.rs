//! Error types for mirror selection and health recording.

use thiserror::Error;

/// Errors that can occur when choosing a mirror or updating its statistics.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The candidate set is empty or every candidate has been handed out.
    #[error("no mirror available: the candidate set is empty or exhausted")]
    NoMirrorAvailable,

    /// The backing store rejected a query.
    #[error("mirror store query failed: {0}")]
    Database(#[from] sqlx::Error),
}
