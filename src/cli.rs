//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upper bound for `--decimals`.
pub const MAX_DECIMALS: usize = 10;

/// CropStats - production extremes and crop averages from agricultural data
///
/// Reads a JSON dataset of crop records (country, year, crop, production,
/// yield, cultivation area) and reports, for every year, the crops with the
/// largest and smallest production, and for every crop, its average yield
/// and cultivation area.
///
/// Examples:
///   cropstats --source Manufac_IndiaAgroDataset.json
///   cropstats --source https://example.com/agro.json --format text
///   cropstats --source data.json --sort --output report.md
///   cropstats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Dataset location: an http(s) URL or a local JSON file
    ///
    /// Overrides `[source] location` from .cropstats.toml.
    #[arg(short, long, value_name = "URL|PATH", env = "CROPSTATS_SOURCE")]
    pub source: Option<String>,

    /// Write the report to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, text, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Decimal places for average yield and area
    #[arg(long, value_name = "N")]
    pub decimals: Option<usize>,

    /// Sort rows by year and crop name instead of first appearance
    #[arg(long)]
    pub sort: bool,

    /// Download timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Extra download attempts on transient failures
    #[arg(long, value_name = "COUNT")]
    pub retries: Option<u32>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cropstats.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .cropstats.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown tables (default)
    #[default]
    Markdown,
    /// Aligned plain-text columns
    Text,
    /// JSON document
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref source) = self.source {
            let source = source.trim();
            if source.is_empty() {
                return Err("Source must not be empty".to_string());
            }
            if source.contains("://")
                && !source.starts_with("http://")
                && !source.starts_with("https://")
            {
                return Err("Source URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(decimals) = self.decimals {
            if decimals > MAX_DECIMALS {
                return Err(format!("Decimals must be at most {}", MAX_DECIMALS));
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_args() -> Args {
        Args {
            source: None,
            output: None,
            format: None,
            decimals: None,
            sort: false,
            timeout: None,
            retries: None,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "cropstats",
            "--source",
            "data.json",
            "--format",
            "json",
            "--decimals",
            "3",
            "--sort",
        ])
        .unwrap();

        assert_eq!(args.source.as_deref(), Some("data.json"));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.decimals, Some(3));
        assert!(args.sort);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.source = Some("ftp://example.com/data.json".to_string());
        assert!(args.validate().is_err());

        args.source = Some("https://example.com/data.json".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_source() {
        let mut args = make_args();
        args.source = Some("  ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_ranges() {
        let mut args = make_args();
        args.decimals = Some(MAX_DECIMALS + 1);
        assert!(args.validate().is_err());

        args.decimals = Some(0);
        args.timeout = Some(0);
        assert!(args.validate().is_err());

        args.timeout = Some(30);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.init_config = true;
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
