//! Download command: the batch driver constructing one resolution task
//! per identifier.
//!
//! Tasks run sequentially; a failed identifier is recorded and the batch
//! continues. When identifiers came from an input file, failures are
//! written to a `_failed` sidecar next to it so the batch can be re-run
//! against a fresh mirror choice.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use paperdl_core::{
    ChooserStrategy, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_PDF_TAG_ATTR,
    DEFAULT_PDF_TAG_SELECTOR, DEFAULT_READ_TIMEOUT_SECS, Database, HttpFetcher, Identifier,
    LinkExtractor, MirrorStore, OutputSpec, ProxyMap, ResolutionTask, TaskRuntime,
};

use crate::app_config::FileConfig;
use crate::cli::DownloadArgs;

/// Runs the download batch. A single failed identifier never aborts the
/// remaining ones.
pub async fn run_download_command(
    args: &DownloadArgs,
    config: Option<&FileConfig>,
    db: Database,
) -> Result<()> {
    let mut failed_sources: Vec<String> = Vec::new();
    let identifiers = collect_identifiers(args, &mut failed_sources);
    let invalid_count = failed_sources.len();

    if identifiers.is_empty() && invalid_count == 0 {
        info!("nothing to download; pass --doi, --pmid, --title, or --input-file");
        return Ok(());
    }

    let output = OutputSpec::from_cli(args.out.as_deref(), identifiers.len() > 1);
    let runtime = build_runtime(args, config, db)?;

    info!(
        dois = args.doi.len(),
        pmids = args.pmid.len(),
        titles = args.title.len(),
        total = identifiers.len(),
        "running resolution tasks"
    );
    if let Some(mirror_url) = &args.mirror_url {
        info!(mirror = %mirror_url, "mirror pinned by caller");
    } else {
        info!(strategy = %runtime.strategy, "mirror chosen automatically");
    }

    let progress = batch_progress_bar(identifiers.len());
    let mut successful = 0usize;

    for identifier in identifiers {
        let source = identifier.value();
        let mut task = ResolutionTask::new(
            identifier,
            args.mirror_url.clone(),
            output.clone(),
            runtime.clone(),
        );

        match task.run().await {
            Ok(()) => successful += 1,
            Err(e) => {
                error!(
                    identifier = %source,
                    status = %task.context().status(),
                    error = %e,
                    "task failed"
                );
                failed_sources.push(source);
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if !failed_sources.is_empty() {
        if let Some(input_file) = &args.input_file {
            write_failed_sidecar(input_file, &failed_sources);
        }
    }

    report(successful, &failed_sources, invalid_count);
    Ok(())
}

/// Gathers identifiers from flags and the optional input file, recording
/// unparseable inputs as failures without aborting.
fn collect_identifiers(args: &DownloadArgs, failed_sources: &mut Vec<String>) -> Vec<Identifier> {
    let mut identifiers = Vec::new();

    let mut dois = args.doi.clone();
    if let Some(input_file) = &args.input_file {
        match fs::read_to_string(input_file) {
            Ok(contents) => {
                let file_dois: Vec<String> = contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(String::from)
                    .collect();
                info!(
                    count = file_dois.len(),
                    file = %input_file.display(),
                    "loaded DOIs from input file"
                );
                dois.extend(file_dois);
            }
            Err(e) => {
                error!(file = %input_file.display(), error = %e, "could not read input file");
            }
        }
    }

    for raw in &dois {
        match Identifier::doi(raw) {
            Ok(id) => identifiers.push(id),
            Err(e) => {
                error!(input = %raw, error = %e, "skipping invalid DOI");
                failed_sources.push(raw.clone());
            }
        }
    }
    for &pmid in &args.pmid {
        match Identifier::pmid(pmid) {
            Ok(id) => identifiers.push(id),
            Err(e) => {
                error!(input = pmid, error = %e, "skipping invalid PMID");
                failed_sources.push(pmid.to_string());
            }
        }
    }
    for raw in &args.title {
        match Identifier::title(raw) {
            Ok(id) => identifiers.push(id),
            Err(e) => {
                error!(input = %raw, error = %e, "skipping invalid title");
                failed_sources.push(raw.clone());
            }
        }
    }

    identifiers
}

/// Assembles the shared task services from config and CLI overrides.
fn build_runtime(
    args: &DownloadArgs,
    config: Option<&FileConfig>,
    db: Database,
) -> Result<TaskRuntime> {
    let proxies = build_proxy_map(config, args.proxy.as_deref());
    if !proxies.is_empty() {
        info!(?proxies, "using proxies");
    }

    let connect_timeout_secs = config
        .and_then(|c| c.connect_timeout_secs)
        .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);
    let read_timeout_secs = config
        .and_then(|c| c.read_timeout_secs)
        .unwrap_or(DEFAULT_READ_TIMEOUT_SECS);
    let fetcher = HttpFetcher::with_timeouts(&proxies, connect_timeout_secs, read_timeout_secs)?;

    let selector = config
        .and_then(|c| c.pdf_tag_selector.as_deref())
        .unwrap_or(DEFAULT_PDF_TAG_SELECTOR);
    let attr = config
        .and_then(|c| c.pdf_tag_attr.as_deref())
        .unwrap_or(DEFAULT_PDF_TAG_ATTR);
    let extractor = LinkExtractor::new(selector, attr)?;

    let strategy = config
        .and_then(|c| c.chooser_type.as_deref())
        .map_or_else(ChooserStrategy::default, ChooserStrategy::from_config);

    Ok(TaskRuntime {
        store: MirrorStore::new(db),
        fetcher: Arc::new(fetcher),
        extractor,
        strategy,
    })
}

/// Merges config-file proxies with the CLI `SCHEME=ADDRESS` override.
fn build_proxy_map(config: Option<&FileConfig>, cli_proxy: Option<&str>) -> ProxyMap {
    let mut proxies = ProxyMap::new();

    if let Some(config) = config {
        if let Some(http) = &config.proxy_http {
            proxies.insert("http".to_string(), http.clone());
        }
        if let Some(https) = &config.proxy_https {
            proxies.insert("https".to_string(), https.clone());
        }
    }

    if let Some(raw) = cli_proxy {
        match raw.split_once('=') {
            Some((scheme, address)) if !scheme.is_empty() && !address.is_empty() => {
                proxies.insert(scheme.to_string(), address.to_string());
            }
            _ => warn!(proxy = %raw, "ignoring malformed proxy; expected SCHEME=ADDRESS"),
        }
    }

    proxies
}

fn batch_progress_bar(total: usize) -> ProgressBar {
    if total <= 1 {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    progress
}

/// Writes failed identifiers to `<stem>_failed<ext>` next to the input file.
fn write_failed_sidecar(input_file: &Path, failed_sources: &[String]) {
    let failed_path = failed_sidecar_path(input_file);
    let contents = failed_sources.join("\n") + "\n";
    match fs::write(&failed_path, contents) {
        Ok(()) => info!(
            count = failed_sources.len(),
            path = %failed_path.display(),
            "saved failed identifiers"
        ),
        Err(e) => error!(
            path = %failed_path.display(),
            error = %e,
            "could not write failed identifiers"
        ),
    }
}

fn failed_sidecar_path(input_file: &Path) -> PathBuf {
    let stem = input_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("input");
    let name = match input_file.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_failed.{ext}"),
        None => format!("{stem}_failed"),
    };
    input_file.with_file_name(name)
}

fn report(successful: usize, failed_sources: &[String], invalid_count: usize) {
    let attempted = successful + failed_sources.len();
    #[allow(clippy::cast_precision_loss)]
    let success_rate = if attempted > 0 {
        successful as f64 / attempted as f64 * 100.0
    } else {
        0.0
    };

    info!(
        attempted,
        successful,
        failed = failed_sources.len(),
        invalid = invalid_count,
        success_rate = %format!("{success_rate:.1}%"),
        "download batch complete"
    );
}
