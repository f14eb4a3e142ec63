//! cellprobe
//!
//! Replays captured modem inspections through the feature extraction
//! pipeline.
//!
//! - `inspect` prints the feature snapshot of one capture
//! - `vendors` lists the registered vendor extractors and aliases
//! - `batch` extracts many captures on a worker pool, one JSON line each

mod config;

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use cellprobe_common::{Capture, PluginMetadata};
use cellprobe_features::{FeatureExtractor, Inspection, ModemFeatures, VendorRegistry};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::CliConfig;

/// Modem feature extraction from captured AT command responses.
#[derive(Parser, Debug)]
#[command(name = "cellprobe", version, about = "Modem feature extraction")]
struct Cli {
    /// Configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the feature snapshot of one capture.
    Inspect {
        capture: PathBuf,

        /// Vendor override.
        #[arg(long)]
        vendor: Option<String>,

        /// Model override.
        #[arg(long)]
        model: Option<String>,

        /// Plugin category override.
        #[arg(long)]
        category: Option<String>,

        /// Output format: json or summary.
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// High-confidence threshold for the summary.
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// List registered vendor extractors and aliases.
    Vendors,

    /// Extract many captures, one JSON line per capture in input order.
    Batch {
        #[arg(required = true)]
        captures: Vec<PathBuf>,

        /// Worker threads.
        #[arg(long)]
        workers: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Summary,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Summary => write!(f, "summary"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "summary" => Ok(OutputFormat::Summary),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let extractor = FeatureExtractor::with_registry(registry(&config));

    match cli.command {
        Command::Inspect {
            capture,
            vendor,
            model,
            category,
            format,
            threshold,
        } => {
            let overrides = PluginMetadata {
                vendor,
                model,
                category,
            };
            let threshold = threshold.unwrap_or(config.high_confidence_threshold);
            anyhow::ensure!(
                (0.0..=1.0).contains(&threshold),
                "threshold must be within [0, 1], got {threshold}"
            );
            let inspection = load_inspection(&capture, &overrides, &config)?;
            let features = extractor.extract_features(
                &inspection.responses,
                &inspection.plugin,
                inspection.pre_parsed.as_ref(),
            );
            match format {
                OutputFormat::Json => println!("{}", features.to_json()?),
                OutputFormat::Summary => print_summary(&features, threshold),
            }
        }
        Command::Vendors => {
            let registry = extractor.registry();
            for vendor in registry.vendors() {
                println!("{vendor}");
            }
            for (alias, target) in registry.aliases() {
                println!("  {alias} -> {target}");
            }
        }
        Command::Batch { captures, workers } => {
            let inspections = captures
                .iter()
                .map(|path| load_inspection(path, &PluginMetadata::default(), &config))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let workers = workers.unwrap_or(config.workers);
            tracing::info!(captures = inspections.len(), workers, "starting batch");
            for features in extractor.extract_batch(&inspections, workers) {
                println!("{}", serde_json::to_string(&features)?);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<CliConfig> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = CliConfig::from_toml_str(&text)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("parsing config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

fn registry(config: &CliConfig) -> VendorRegistry {
    let mut registry = VendorRegistry::with_builtin();
    for (alias, target) in &config.aliases {
        if registry.resolve(target).is_none() {
            tracing::warn!(alias = %alias, target = %target, "alias points at an unregistered vendor");
        }
        registry.alias(alias, target);
    }
    registry
}

/// Load a capture; plugin hints come from `overrides`, then the capture,
/// then the config file.
fn load_inspection(
    path: &Path,
    overrides: &PluginMetadata,
    config: &CliConfig,
) -> anyhow::Result<Inspection> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading capture {}", path.display()))?;
    let mut capture = Capture::from_json_str(&text)
        .with_context(|| format!("parsing capture {}", path.display()))?;
    capture.plugin = overrides.clone().or(&capture.plugin).or(&config.plugin);
    tracing::debug!(
        path = %path.display(),
        commands = capture.responses.len(),
        vendor = capture.plugin.vendor.as_deref().unwrap_or("-"),
        "loaded capture"
    );
    Ok(Inspection::from(capture))
}

fn print_summary(features: &ModemFeatures, threshold: f64) {
    println!("{}", features.summary());

    let high = features.high_confidence_features(threshold);
    if !high.is_empty() {
        println!();
        println!("Fields at confidence >= {threshold:.2}:");
        for (key, value) in &high {
            println!("  {key} = {value}");
        }
    }

    if !features.vendor_specific().is_empty() {
        println!();
        println!("Vendor-specific:");
        for (key, value) in features.vendor_specific() {
            println!("  {key} = {value}");
        }
    }

    if !features.parsing_errors().is_empty() {
        println!();
        println!("Parsing errors:");
        for error in features.parsing_errors() {
            println!("  - {error}");
        }
    }
}
