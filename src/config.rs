//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cropstats.toml` files.

use crate::cli::{OutputFormat, MAX_DECIMALS};
use crate::models::RowOrder;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".cropstats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dataset source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report output file. Printed to stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Where and how to fetch the dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URL or file path of the JSON dataset.
    #[serde(default = "default_location")]
    pub location: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Extra attempts after a retryable download failure.
    #[serde(default)]
    pub retries: u32,

    /// Pause between download attempts in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Honour HTTP(S)_PROXY settings from the environment.
    #[serde(default = "default_true")]
    pub use_proxy: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            timeout_seconds: default_timeout(),
            retries: 0,
            retry_delay_ms: default_retry_delay(),
            use_proxy: true,
        }
    }
}

fn default_location() -> String {
    "Manufac_IndiaAgroDataset.json".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Decimal places for averages.
    #[serde(default = "default_decimals")]
    pub decimals: usize,

    /// Row ordering for both tables.
    #[serde(default)]
    pub order: RowOrder,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            decimals: default_decimals(),
            order: RowOrder::default(),
        }
    }
}

fn default_decimals() -> usize {
    2
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.cropstats.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref source) = args.source {
            self.source.location = source.clone();
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }
        if let Some(retries) = args.retries {
            self.source.retries = retries;
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(decimals) = args.decimals {
            self.report.decimals = decimals;
        }
        if args.sort {
            self.report.order = RowOrder::Sorted;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check values that can arrive from the config file as well as the CLI.
    pub fn validate(&self) -> Result<()> {
        if self.source.location.trim().is_empty() {
            bail!("No dataset source configured; pass --source or set [source] location");
        }
        if self.source.timeout_seconds == 0 {
            bail!("[source] timeout_seconds must be at least 1");
        }
        if self.report.decimals > MAX_DECIMALS {
            bail!("[report] decimals must be at most {}", MAX_DECIMALS);
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
