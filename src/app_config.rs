//! Application configuration loading.
//!
//! The config file is a small sectioned `key = value` format:
//!
//! ```text
//! [mirror]
//! chooser_type = "availability_first"
//!
//! [extractor]
//! pdf_tag_selector = "embed#pdf"
//! pdf_tag_attr = "src"
//!
//! [proxy]
//! http = "http://127.0.0.1:7890"
//! https = "http://127.0.0.1:7890"
//!
//! [http]
//! connect_timeout_secs = 10
//! read_timeout_secs = 300
//! ```
//!
//! Unknown sections and keys are reported as warnings and skipped so an
//! old config file keeps working across versions; malformed syntax and
//! out-of-range values are hard errors.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::warn;

/// File configuration for resolution defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Mirror chooser strategy label.
    pub chooser_type: Option<String>,
    /// CSS selector for the element embedding the document link.
    pub pdf_tag_selector: Option<String>,
    /// Attribute carrying the document link on the matched element.
    pub pdf_tag_attr: Option<String>,
    /// Proxy address for plain HTTP traffic.
    pub proxy_http: Option<String>,
    /// Proxy address for HTTPS traffic.
    pub proxy_https: Option<String>,
    /// HTTP client connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP client read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/paperdl/config.toml`
/// 2. `$HOME/.config/paperdl/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("paperdl")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("paperdl")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
        loaded_from_file: true,
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    let mut section = String::new();

    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') {
            if !line.ends_with(']') || line.len() < 3 {
                bail!(
                    "Invalid section header on line {}: expected [name]",
                    line_index + 1
                );
            }
            section = line[1..line.len() - 1].trim().to_string();
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match (section.as_str(), key) {
            ("mirror", "chooser_type") => {
                cfg.chooser_type = Some(parse_string_literal(value).with_context(|| {
                    format!("Invalid `chooser_type` value on line {}", line_index + 1)
                })?);
            }
            ("extractor", "pdf_tag_selector") => {
                cfg.pdf_tag_selector = Some(parse_string_literal(value).with_context(|| {
                    format!("Invalid `pdf_tag_selector` value on line {}", line_index + 1)
                })?);
            }
            ("extractor", "pdf_tag_attr") => {
                cfg.pdf_tag_attr = Some(parse_string_literal(value).with_context(|| {
                    format!("Invalid `pdf_tag_attr` value on line {}", line_index + 1)
                })?);
            }
            ("proxy", "http") => {
                cfg.proxy_http = Some(parse_string_literal(value).with_context(|| {
                    format!("Invalid `http` proxy value on line {}", line_index + 1)
                })?);
            }
            ("proxy", "https") => {
                cfg.proxy_https = Some(parse_string_literal(value).with_context(|| {
                    format!("Invalid `https` proxy value on line {}", line_index + 1)
                })?);
            }
            ("http", "connect_timeout_secs") => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(|| {
                    format!(
                        "Invalid `connect_timeout_secs` value on line {}",
                        line_index + 1
                    )
                })?);
            }
            ("http", "read_timeout_secs") => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(|| {
                    format!(
                        "Invalid `read_timeout_secs` value on line {}",
                        line_index + 1
                    )
                })?);
            }
            (unknown_section, unknown_key) => {
                warn!(
                    section = %unknown_section,
                    key = %unknown_key,
                    line = line_index + 1,
                    "unknown configuration key; skipping"
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}
