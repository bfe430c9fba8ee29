//! Mirror records and the persisted health store.
//!
//! Every candidate mirror domain carries success/failure counters that
//! survive across runs and feed the chooser's ranking. The store is the
//! single process-wide owner of mirror rows; tasks read a mirror at
//! selection time and report outcomes back through the increment
//! operations, never mutating rows directly.
//!
//! # Overview
//!
//! - [`Mirror`] - One candidate domain with health counters
//! - [`MirrorStore`] - SQLite-backed persistence for mirror rows
//! - [`MirrorChooser`] - Ranked hand-out of candidates per attempt
//! - [`ChooserStrategy`] - Fixed set of ranking strategies

mod chooser;
mod error;

pub use chooser::{ChooserStrategy, MirrorChooser};
pub use error::MirrorError;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::{instrument, warn};

use crate::db::Database;

/// Fallback mirror used when the store holds no candidates at all.
pub const DEFAULT_MIRROR_URL: &str = "https://sci-hub.se";

/// Result type for mirror store operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

/// A candidate mirror domain with its historical health counters.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Mirror {
    /// Base URL of the mirror, e.g. `https://mirror.example`. Identity key.
    pub url: String,
    /// Number of resolution tasks that completed through this mirror.
    pub success_times: i64,
    /// Number of resolution tasks that failed through this mirror.
    pub failed_times: i64,
}

impl Mirror {
    /// Creates a mirror with zeroed counters, as seeded by the refresh job.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success_times: 0,
            failed_times: 0,
        }
    }

    /// Availability score: `success_times / max(1, success_times + failed_times)`.
    ///
    /// An untried mirror scores 0.0 and ranks below any mirror with at
    /// least one success.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score(&self) -> f64 {
        let attempts = (self.success_times + self.failed_times).max(1);
        self.success_times as f64 / attempts as f64
    }
}

/// SQLite-backed store for mirror health statistics.
///
/// Counter updates are single-statement atomic read-modify-writes, so
/// concurrent tasks incrementing the same mirror never lose updates.
/// Writes are committed before the call returns.
#[derive(Debug, Clone)]
pub struct MirrorStore {
    db: Database,
}

impl MirrorStore {
    /// Creates a store over an opened database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns all known mirrors in insertion (rowid) order.
    ///
    /// Callers sort as needed; ranking is the chooser's concern and
    /// reporting order is the caller's.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Mirror>> {
        let mirrors = sqlx::query_as::<_, Mirror>(
            "SELECT url, success_times, failed_times FROM mirrors ORDER BY rowid",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(mirrors)
    }

    /// Inserts a candidate mirror with zeroed counters.
    ///
    /// Existing rows are left untouched so re-running the refresh job
    /// never resets accumulated statistics.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Database`] if the insert fails.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn upsert(&self, url: &str) -> Result<()> {
        sqlx::query("INSERT INTO mirrors (url) VALUES (?) ON CONFLICT(url) DO NOTHING")
            .bind(url)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// Increments the success counter for the named mirror.
    ///
    /// A URL with no matching row is a logged no-op: tasks may run
    /// against the hardcoded fallback mirror or a caller-pinned URL that
    /// was never persisted.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Database`] if the update fails.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn increment_success(&self, url: &str) -> Result<()> {
        let result = sqlx::query(
            r"UPDATE mirrors
              SET success_times = success_times + 1, updated_at = datetime('now')
              WHERE url = ?",
        )
        .bind(url)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            warn!(url = %url, "success recorded for unknown mirror; ignoring");
        }

        Ok(())
    }

    /// Increments the failure counter for the named mirror.
    ///
    /// Same unknown-URL semantics as [`increment_success`](Self::increment_success).
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Database`] if the update fails.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn increment_failed(&self, url: &str) -> Result<()> {
        let result = sqlx::query(
            r"UPDATE mirrors
              SET failed_times = failed_times + 1, updated_at = datetime('now')
              WHERE url = ?",
        )
        .bind(url)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            warn!(url = %url, "failure recorded for unknown mirror; ignoring");
        }

        Ok(())
    }
}
