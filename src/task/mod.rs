//! The resolution task state machine.
//!
//! One [`ResolutionTask`] drives one identifier through
//! crawl → extract → download against a chosen mirror, recording the
//! outcome into the shared health store. Tasks are independent: a task
//! never retries with a second mirror, and batch-level mirror diversity
//! comes from each task building a fresh chooser over evolving
//! statistics.
//!
//! Health attribution: extraction failures blame the mirror even though
//! the landing page itself was fetched, since a page the extractor cannot
//! parse usually means a broken or obstructed mirror layout. See
//! DESIGN.md for the trade-off against selector misconfiguration.

mod error;

pub use error::TaskError;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::extract::{ExtractedInfo, LinkExtractor};
use crate::fetch::ContentFetcher;
use crate::mirror::{ChooserStrategy, DEFAULT_MIRROR_URL, MirrorChooser, MirrorStore};
use crate::output::{OutputSpec, ensure_parent_dirs, resolve_document_path};
use crate::parser::Identifier;

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, TaskError>;

/// Lifecycle state of a resolution task.
///
/// Failure states are terminal; a context never leaves one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Constructed, not yet started.
    Created,
    /// Choosing a mirror to query.
    ResolvingMirror,
    /// Fetching the landing page.
    Crawling,
    /// Parsing the landing page for the document link.
    Extracting,
    /// Retrieving the document itself.
    Downloading,
    /// Document written to the output location.
    Done,
    /// Landing page fetch failed.
    CrawlingFailed,
    /// Document link extraction failed.
    ExtractingFailed,
    /// Document retrieval or write failed.
    DownloadingFailed,
}

impl TaskStatus {
    /// Returns the stable string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::ResolvingMirror => "resolving_mirror",
            Self::Crawling => "crawling",
            Self::Extracting => "extracting",
            Self::Downloading => "downloading",
            Self::Done => "done",
            Self::CrawlingFailed => "crawling_failed",
            Self::ExtractingFailed => "extracting_failed",
            Self::DownloadingFailed => "downloading_failed",
        }
    }

    /// Returns true for `done` and all failure states.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Done | Self::CrawlingFailed | Self::ExtractingFailed | Self::DownloadingFailed
        )
    }

    /// Returns true for the failure states.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::CrawlingFailed | Self::ExtractingFailed | Self::DownloadingFailed
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutable state bag owned by exactly one task for its lifetime.
///
/// The final status plus error, if any, are the task's externally
/// observable result.
#[derive(Debug)]
pub struct TaskContext {
    status: TaskStatus,
    /// Mirror base URL in use for this attempt.
    pub referer: Option<String>,
    /// Extraction result, set once on success.
    pub info: Option<ExtractedInfo>,
    /// Last error message, set on failure.
    pub error: Option<String>,
    /// Final document path, set when the download completes.
    pub output_path: Option<PathBuf>,
}

impl TaskContext {
    fn new() -> Self {
        Self {
            status: TaskStatus::Created,
            referer: None,
            info: None,
            error: None,
            output_path: None,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Advances the status. Transitions are append-only: once a terminal
    /// state is reached the context never leaves it.
    fn advance(&mut self, status: TaskStatus) {
        if self.status.is_terminal() {
            warn!(
                current = %self.status,
                requested = %status,
                "ignoring status transition out of a terminal state"
            );
            return;
        }
        self.status = status;
    }
}

impl Default for TaskContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared services injected into every task of a batch.
///
/// The store is the single process-wide owner of mirror statistics; the
/// fetcher and extractor are reused across tasks.
#[derive(Clone)]
pub struct TaskRuntime {
    /// Shared mirror health store.
    pub store: MirrorStore,
    /// Network boundary for landing pages and documents.
    pub fetcher: Arc<dyn ContentFetcher>,
    /// Configured landing-page extractor.
    pub extractor: LinkExtractor,
    /// Strategy for ranking mirror candidates.
    pub strategy: ChooserStrategy,
}

impl fmt::Debug for TaskRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRuntime")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// State machine resolving one identifier to a downloaded document.
#[derive(Debug)]
pub struct ResolutionTask {
    identifier: Identifier,
    pinned_mirror: Option<String>,
    output: OutputSpec,
    runtime: TaskRuntime,
    context: TaskContext,
}

impl ResolutionTask {
    /// Creates a task for one identifier.
    ///
    /// `pinned_mirror` bypasses the chooser when the caller wants a
    /// specific mirror.
    #[must_use]
    pub fn new(
        identifier: Identifier,
        pinned_mirror: Option<String>,
        output: OutputSpec,
        runtime: TaskRuntime,
    ) -> Self {
        Self {
            identifier,
            pinned_mirror,
            output,
            runtime,
            context: TaskContext::new(),
        }
    }

    /// The identifier this task resolves.
    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// The task's context: status, referer, extraction info, error,
    /// output path.
    #[must_use]
    pub fn context(&self) -> &TaskContext {
        &self.context
    }

    /// Runs the task to a terminal state.
    ///
    /// Re-running a task with identical inputs is safe: it performs the
    /// same network calls and produces the same health-store deltas.
    ///
    /// # Errors
    ///
    /// Returns the step-tagged [`TaskError`]; the same information is
    /// recorded in the context before returning.
    #[instrument(skip(self), fields(identifier = %self.identifier))]
    pub async fn run(&mut self) -> Result<()> {
        let referer = self.resolve_mirror().await?;
        let html = self.crawl(&referer).await?;
        let info = self.extract(&html, &referer).await?;
        self.download(&info, &referer).await?;

        info!(
            identifier = %self.identifier,
            path = %self.context.output_path.as_deref().unwrap_or_else(|| std::path::Path::new("?")).display(),
            "task done"
        );
        Ok(())
    }

    /// Picks the mirror for this attempt and records it as the referer.
    async fn resolve_mirror(&mut self) -> Result<String> {
        self.context.advance(TaskStatus::ResolvingMirror);

        if let Some(pinned) = &self.pinned_mirror {
            let referer = pinned.trim_end_matches('/').to_string();
            info!(mirror = %referer, "using caller-pinned mirror");
            self.context.referer = Some(referer.clone());
            return Ok(referer);
        }

        let snapshot = MirrorChooser::from_store(&self.runtime.store, self.runtime.strategy).await;
        let mut chooser = match snapshot {
            Ok(chooser) => chooser,
            Err(e) => {
                let error = TaskError::Mirror(e);
                self.fail(TaskStatus::CrawlingFailed, &error).await;
                return Err(error);
            }
        };

        // An empty store is expected on first run; fall back to the
        // hardcoded default mirror rather than failing every task.
        if chooser.is_empty() {
            info!(mirror = DEFAULT_MIRROR_URL, "no persisted mirrors; using default");
            self.context.referer = Some(DEFAULT_MIRROR_URL.to_string());
            return Ok(DEFAULT_MIRROR_URL.to_string());
        }

        match chooser.next() {
            Ok(mirror) => {
                let referer = mirror.url.trim_end_matches('/').to_string();
                info!(mirror = %referer, "chose mirror");
                self.context.referer = Some(referer.clone());
                Ok(referer)
            }
            Err(e) => {
                let error = TaskError::Mirror(e);
                self.fail(TaskStatus::CrawlingFailed, &error).await;
                Err(error)
            }
        }
    }

    /// Fetches the landing page for the identifier.
    async fn crawl(&mut self, referer: &str) -> Result<String> {
        self.context.advance(TaskStatus::Crawling);

        let query_url = self.identifier.query_url(referer);
        info!(url = %query_url, "crawling landing page");

        let fetched = self.runtime.fetcher.fetch(&query_url, Some(referer)).await;
        match fetched {
            Ok(content) => Ok(content.text()),
            Err(e) => {
                let error = TaskError::Crawl(e);
                self.fail(TaskStatus::CrawlingFailed, &error).await;
                Err(error)
            }
        }
    }

    /// Extracts the document link and title from the landing page.
    ///
    /// Success records no health-store outcome yet: a parseable landing
    /// page does not guarantee the document itself exists.
    async fn extract(&mut self, html: &str, referer: &str) -> Result<ExtractedInfo> {
        self.context.advance(TaskStatus::Extracting);

        match self.runtime.extractor.extract(html, referer) {
            Ok(info) => {
                info!(info = %info, "extracted document information");
                self.context.info = Some(info.clone());
                Ok(info)
            }
            Err(e) => {
                let error = TaskError::Extract(e);
                self.fail(TaskStatus::ExtractingFailed, &error).await;
                Err(error)
            }
        }
    }

    /// Streams the document to the resolved output path and records the
    /// mirror success.
    async fn download(&mut self, info: &ExtractedInfo, referer: &str) -> Result<()> {
        self.context.advance(TaskStatus::Downloading);

        let path = resolve_document_path(&self.output, &info.title, &info.document_url);

        if let Err(e) = ensure_parent_dirs(&path).await {
            let error = TaskError::Write(e);
            self.fail(TaskStatus::DownloadingFailed, &error).await;
            return Err(error);
        }

        let downloaded = self
            .runtime
            .fetcher
            .download(&info.document_url, Some(referer), &path)
            .await;
        match downloaded {
            Ok(bytes) => {
                info!(path = %path.display(), bytes, "document downloaded");
                self.context.output_path = Some(path);
                self.context.advance(TaskStatus::Done);
                self.record_success(referer).await;
                Ok(())
            }
            Err(e) => {
                let error = TaskError::Download(e);
                self.fail(TaskStatus::DownloadingFailed, &error).await;
                Err(error)
            }
        }
    }

    /// Marks the task failed and charges the failure to the mirror in use.
    ///
    /// Health recording happens here, before the error propagates, so it
    /// is never conditioned on the caller swallowing the error. A store
    /// failure is logged rather than masking the pipeline error.
    async fn fail(&mut self, status: TaskStatus, error: &TaskError) {
        self.context.advance(status);
        self.context.error = Some(error.to_string());

        if let Some(referer) = self.context.referer.clone() {
            if let Err(store_error) = self.runtime.store.increment_failed(&referer).await {
                warn!(error = %store_error, mirror = %referer, "could not record mirror failure");
            }
        }
    }

    async fn record_success(&self, referer: &str) {
        if let Err(store_error) = self.runtime.store.increment_success(referer).await {
            warn!(error = %store_error, mirror = %referer, "could not record mirror success");
        }
    }
}
