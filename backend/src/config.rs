//! Run configuration.
//!
//! Built in layers: [`PipelineConfig::default`] points at the public sample
//! extracts, [`PipelineConfig::from_env`] applies `TXMART_*` variables
//! (after loading `.env`), and the CLI applies its flags last.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

use crate::export::OutputFormat;
use crate::transform::dates::KeyOrder;

/// Where the sample extracts are published.
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/IMARVI/sr_de_challenge/main/";

pub const USERS_FILE: &str = "user_id_sample_data.csv";
pub const DEPOSITS_FILE: &str = "deposit_sample_data.csv.zip";
pub const WITHDRAWALS_FILE: &str = "withdrawals_sample_data.csv";
pub const EVENTS_FILE: &str = "event_sample_data.csv";

/// Default HTTP request timeout, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

pub const ENV_BASE_URL: &str = "TXMART_BASE_URL";
pub const ENV_USERS: &str = "TXMART_USERS";
pub const ENV_DEPOSITS: &str = "TXMART_DEPOSITS";
pub const ENV_WITHDRAWALS: &str = "TXMART_WITHDRAWALS";
pub const ENV_EVENTS: &str = "TXMART_EVENTS";
pub const ENV_OUTPUT_DIR: &str = "TXMART_OUTPUT_DIR";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "TXMART_HTTP_TIMEOUT_SECS";
pub const ENV_DELIMITER: &str = "TXMART_DELIMITER";

// =============================================================================
// Source Locations
// =============================================================================

/// A raw extract: remote URL or local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLocation {
    Url(String),
    Path(PathBuf),
}

impl SourceLocation {
    /// `http://` and `https://` values are URLs, anything else a path.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            SourceLocation::Url(value.to_string())
        } else {
            SourceLocation::Path(PathBuf::from(value))
        }
    }

    /// A `.zip` suffix marks a single-file archive.
    pub fn is_archive(&self) -> bool {
        let name = match self {
            SourceLocation::Url(url) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
            SourceLocation::Path(path) => path.to_string_lossy().into_owned(),
        };
        name.to_ascii_lowercase().ends_with(".zip")
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Url(url) => f.write_str(url),
            SourceLocation::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The four extracts a run reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSet {
    pub users: SourceLocation,
    pub deposits: SourceLocation,
    pub withdrawals: SourceLocation,
    pub events: SourceLocation,
}

impl SourceSet {
    /// The standard file names under one base location.
    pub fn from_base(base: &str) -> Self {
        let join = |file: &str| {
            if base.ends_with('/') {
                SourceLocation::parse(&format!("{base}{file}"))
            } else {
                SourceLocation::parse(&format!("{base}/{file}"))
            }
        };
        Self {
            users: join(USERS_FILE),
            deposits: join(DEPOSITS_FILE),
            withdrawals: join(WITHDRAWALS_FILE),
            events: join(EVENTS_FILE),
        }
    }
}

impl Default for SourceSet {
    fn default() -> Self {
        Self::from_base(DEFAULT_BASE_URL)
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Everything a run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub sources: SourceSet,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub key_order: KeyOrder,
    /// Forced CSV delimiter for every source (auto-detected when `None`).
    pub delimiter: Option<char>,
    pub http_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: SourceSet::default(),
            output_dir: PathBuf::from("."),
            format: OutputFormat::default(),
            key_order: KeyOrder::default(),
            delimiter: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `TXMART_*` environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`. Blank values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(base) = get(ENV_BASE_URL) {
            config.sources = SourceSet::from_base(base.trim());
        }
        if let Some(users) = get(ENV_USERS) {
            config.sources.users = SourceLocation::parse(&users);
        }
        if let Some(deposits) = get(ENV_DEPOSITS) {
            config.sources.deposits = SourceLocation::parse(&deposits);
        }
        if let Some(withdrawals) = get(ENV_WITHDRAWALS) {
            config.sources.withdrawals = SourceLocation::parse(&withdrawals);
        }
        if let Some(events) = get(ENV_EVENTS) {
            config.sources.events = SourceLocation::parse(&events);
        }
        if let Some(dir) = get(ENV_OUTPUT_DIR) {
            config.output_dir = PathBuf::from(dir.trim());
        }
        if let Some(raw) = get(ENV_HTTP_TIMEOUT_SECS) {
            match raw.trim().parse() {
                Ok(secs) => config.http_timeout_secs = secs,
                Err(_) => warn!(
                    variable = ENV_HTTP_TIMEOUT_SECS,
                    value = %raw,
                    default = DEFAULT_HTTP_TIMEOUT_SECS,
                    "Ignoring invalid timeout"
                ),
            }
        }
        if let Some(raw) = lookup(ENV_DELIMITER).filter(|v| !v.is_empty()) {
            match parse_delimiter(&raw) {
                Some(delimiter) => config.delimiter = Some(delimiter),
                None => warn!(
                    variable = ENV_DELIMITER,
                    value = %raw,
                    "Ignoring delimiter that is not a single character"
                ),
            }
        }
        config
    }
}

/// A single character; `\t` and `tab` name the tab character.
pub fn parse_delimiter(raw: &str) -> Option<char> {
    if raw == "\\t" || raw == "tab" {
        return Some('\t');
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
