//! Config command: show config location and effective values.

use anyhow::Result;
use tracing::warn;

use paperdl_core::{
    ChooserStrategy, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_PDF_TAG_ATTR,
    DEFAULT_PDF_TAG_SELECTOR, DEFAULT_READ_TIMEOUT_SECS,
};

use crate::app_config::{FileConfig, load_default_file_config};
use crate::cli::ConfigArgs;

/// Handles `paperdl config [--location] [--get SECTION KEY]`.
pub fn run_config_command(args: &ConfigArgs) -> Result<()> {
    let loaded = load_default_file_config()?;

    let resolved_path = loaded.path.as_ref().map_or_else(
        || "<unresolved>".to_string(),
        |path| path.display().to_string(),
    );

    if args.location {
        println!("config_path = {resolved_path}");
        return Ok(());
    }

    if let Some(get) = &args.get {
        let (section, key) = (get[0].as_str(), get[1].as_str());
        match lookup(loaded.config.as_ref(), section, key) {
            Some(value) => println!("{value}"),
            None => warn!(
                section = %section,
                key = %key,
                "unknown config section/key"
            ),
        }
        return Ok(());
    }

    let config = loaded.config.clone().unwrap_or_default();
    println!("config_path = {resolved_path}");
    println!(
        "config_file = {}",
        if loaded.loaded_from_file {
            "loaded"
        } else {
            "not found (using defaults)"
        }
    );
    println!("mirror.chooser_type = {}", effective_chooser(&config));
    println!(
        "extractor.pdf_tag_selector = {}",
        config
            .pdf_tag_selector
            .as_deref()
            .unwrap_or(DEFAULT_PDF_TAG_SELECTOR)
    );
    println!(
        "extractor.pdf_tag_attr = {}",
        config.pdf_tag_attr.as_deref().unwrap_or(DEFAULT_PDF_TAG_ATTR)
    );
    println!(
        "proxy.http = {}",
        config.proxy_http.as_deref().unwrap_or("<unset>")
    );
    println!(
        "proxy.https = {}",
        config.proxy_https.as_deref().unwrap_or("<unset>")
    );
    println!(
        "http.connect_timeout_secs = {}",
        config
            .connect_timeout_secs
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS)
    );
    println!(
        "http.read_timeout_secs = {}",
        config.read_timeout_secs.unwrap_or(DEFAULT_READ_TIMEOUT_SECS)
    );

    Ok(())
}

fn effective_chooser(config: &FileConfig) -> String {
    config
        .chooser_type
        .as_deref()
        .map_or_else(ChooserStrategy::default, ChooserStrategy::from_config)
        .to_string()
}

/// Looks up one effective value by section and key. Unknown pairs return
/// None and leave everything unchanged.
fn lookup(config: Option<&FileConfig>, section: &str, key: &str) -> Option<String> {
    let defaults = FileConfig::default();
    let config = config.unwrap_or(&defaults);

    match (section, key) {
        ("mirror", "chooser_type") => Some(effective_chooser(config)),
        ("extractor", "pdf_tag_selector") => Some(
            config
                .pdf_tag_selector
                .clone()
                .unwrap_or_else(|| DEFAULT_PDF_TAG_SELECTOR.to_string()),
        ),
        ("extractor", "pdf_tag_attr") => Some(
            config
                .pdf_tag_attr
                .clone()
                .unwrap_or_else(|| DEFAULT_PDF_TAG_ATTR.to_string()),
        ),
        ("proxy", "http") => config.proxy_http.clone(),
        ("proxy", "https") => config.proxy_https.clone(),
        ("http", "connect_timeout_secs") => Some(
            config
                .connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS)
                .to_string(),
        ),
        ("http", "read_timeout_secs") => Some(
            config
                .read_timeout_secs
                .unwrap_or(DEFAULT_READ_TIMEOUT_SECS)
                .to_string(),
        ),
        _ => None,
    }
}
