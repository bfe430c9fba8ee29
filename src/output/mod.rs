//! Output location resolution for downloaded documents.
//!
//! A task's output spec is either an explicit file path, a directory, or
//! the process working directory. Directory specs derive the filename
//! from the extracted title, falling back to the document URL's last
//! segment and finally a timestamped name, so an empty title never
//! produces an unusable path.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use url::Url;

/// Result type for output operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// File extension applied to title-derived document filenames.
const DOCUMENT_EXTENSION: &str = ".pdf";

/// Errors raised while preparing the output location.
#[derive(Debug, Error)]
pub enum WriteError {
    /// File system failure creating directories or writing the document.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl WriteError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Where a task writes its downloaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSpec {
    /// Current working directory, title-derived filename.
    DefaultDir,
    /// Named directory, title-derived filename.
    Dir(PathBuf),
    /// Explicit file path used as-is.
    File(PathBuf),
}

impl OutputSpec {
    /// Interprets a CLI `--out` value.
    ///
    /// With more than one identifier in the batch the value is always a
    /// directory; otherwise a trailing separator or an existing directory
    /// marks it as one, and anything else is an explicit file path.
    #[must_use]
    pub fn from_cli(out: Option<&str>, multiple: bool) -> Self {
        let Some(out) = out else {
            return Self::DefaultDir;
        };

        let path = PathBuf::from(out);
        if multiple || out.ends_with('/') || path.is_dir() {
            Self::Dir(path)
        } else {
            Self::File(path)
        }
    }
}

/// Resolves the document path for an output spec.
///
/// `title` is the cleaned extracted title (may be empty);
/// `document_url` feeds the fallback filename.
#[must_use]
pub fn resolve_document_path(spec: &OutputSpec, title: &str, document_url: &str) -> PathBuf {
    match spec {
        OutputSpec::File(path) => path.clone(),
        OutputSpec::Dir(dir) => dir.join(document_filename(title, document_url)),
        OutputSpec::DefaultDir => PathBuf::from(".").join(document_filename(title, document_url)),
    }
}

/// Creates the parent directories of `path` if missing.
///
/// # Errors
///
/// Returns [`WriteError::Io`] when directory creation fails.
pub async fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WriteError::io(parent, e))?;
        }
    }
    Ok(())
}

/// Derives a document filename from the title, with URL and timestamp
/// fallbacks for empty titles.
fn document_filename(title: &str, document_url: &str) -> String {
    let title = title.trim();
    if !title.is_empty() {
        return format!("{title}{DOCUMENT_EXTENSION}");
    }

    if let Some(name) = filename_from_url(document_url) {
        debug!(name = %name, "empty title; using URL-derived filename");
        return name;
    }

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("document_{timestamp}{DOCUMENT_EXTENSION}")
}

/// Extracts a usable filename from the URL's last path segment.
fn filename_from_url(document_url: &str) -> Option<String> {
    let parsed = Url::parse(document_url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() || !last.contains('.') {
        return None;
    }

    let decoded = urlencoding::decode(last)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| last.to_string());
    Some(decoded)
}
