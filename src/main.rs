//! CropStats - production extremes and crop averages
//!
//! A CLI tool that loads an agricultural JSON dataset and reports, for
//! every year, the crops with the largest and smallest production, and for
//! every crop, its average yield and cultivation area.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (dataset retrieval, config, output writing, etc.)

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod source;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use source::{LoadOptions, RecordLoader, RecordSource, RetrievalError};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("CropStats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    if let Err(e) = run(&args, &config).await {
        error!("Run failed: {:#}", e);
        if e.downcast_ref::<RetrievalError>().is_some() {
            eprintln!("\n❌ Could not load the dataset, no report was generated: {:#}", e);
        } else {
            eprintln!("\n❌ Error: {:#}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .cropstats.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the dataset source, output format, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so a report printed to stdout stays clean. `RUST_LOG`
/// overrides the level chosen from the flags.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load, aggregate, render, and write the report.
async fn run(args: &Args, config: &Config) -> Result<()> {
    let start_time = Instant::now();

    config.validate()?;

    // Step 1: Load the dataset
    let source = RecordSource::parse(&config.source.location);
    if !args.quiet {
        eprintln!("📥 Loading dataset: {}", source);
    }

    let mut load_options = LoadOptions::from(&config.source);
    load_options.show_progress = !args.quiet;
    let loader = RecordLoader::new(load_options)?;
    let records = loader.load(&source).await?;

    // Step 2: Aggregate
    if !args.quiet {
        eprintln!("🔬 Aggregating {} records...", records.len());
    }
    let aggregation = analysis::aggregate(&records, config.report.order);

    // Step 3: Render and write the report
    let report = report::build_report(&source.to_string(), aggregation, config.report.order);
    let output = report::render(&report, config.report.format, config.report.decimals)?;

    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => print!("{}", output),
    }

    if !args.quiet {
        let metadata = &report.metadata;
        eprintln!("\n📊 Summary:");
        eprintln!(
            "   Records: {} | Countries: {} | Years: {} | Crops: {}",
            metadata.record_count, metadata.country_count, metadata.year_count, metadata.crop_count
        );
        if let Some(fallbacks) = report::fallback_summary(&metadata.parse_stats) {
            eprintln!("   Numeric fields read as 0: {}", fallbacks);
        }
        eprintln!("   Duration: {:.2}s", start_time.elapsed().as_secs_f64());
        if let Some(ref path) = config.general.output {
            eprintln!("\n✅ Report saved to: {}", path.display());
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    Ok(Config::load_default()?.unwrap_or_default())
}
