// SPDX-License-Identifier: PMPL-1.0-or-later
//! Accessgrade CLI - accessibility quality scoring for web pages

use accessgrade::config::{self, Config};
use accessgrade::report::{generate_batch_report, generate_report, generate_score_report, OutputFormat};
use accessgrade::scanner;
use accessgrade::scoring::SubMetrics;
use accessgrade::Evaluator;
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Accessibility quality scoring for web pages
#[derive(Parser)]
#[command(name = "accessgrade")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (YAML, or TOML with a .toml extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a saved HTML page
    Evaluate {
        /// HTML file to evaluate
        file: PathBuf,

        /// JSON object of externally measured sub-metrics, e.g. {"alt_text": 0.9}
        #[arg(long)]
        metrics: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: FormatArg,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Evaluate every HTML page under a directory
    Check {
        /// Directory to scan
        dir: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: FormatArg,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Aggregate a JSON object of sub-metrics into a final score
    Aggregate {
        /// JSON file of sub-metrics
        file: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: FormatArg,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Destination (defaults to .accessgrade/config.yml)
        path: Option<PathBuf>,
    },
}

/// Output format CLI argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn init_logging(verbose: bool, config: &Config) {
    let filter = if verbose {
        EnvFilter::new("accessgrade=debug")
    } else {
        EnvFilter::new(format!("accessgrade={}", config.log.level))
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if config.log.format == "compact" {
        builder.compact().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    init_logging(cli.verbose, &config);
    let evaluator = Evaluator::new(config);

    match cli.command {
        Commands::Evaluate { file, metrics, format, output } => {
            let external = match metrics {
                Some(path) => read_metrics(&path)?,
                None => SubMetrics::new(),
            };
            let evaluation = scanner::evaluate_file(&file, &evaluator, &external)
                .with_context(|| format!("Failed to evaluate {}", file.display()))?;
            let report = generate_report(&evaluation, format.into());
            write_output(&report, output.as_deref())?;
        }

        Commands::Check { dir, format, output } => {
            let pages = scanner::scan_directory(&dir, &evaluator)?;
            let report = generate_batch_report(&pages, format.into());
            write_output(&report, output.as_deref())?;
        }

        Commands::Aggregate { file, format, output } => {
            let metrics = read_metrics(&file)?;
            let score = evaluator.aggregate(&metrics);
            let report = generate_score_report(&score, format.into());
            write_output(&report, output.as_deref())?;
        }

        Commands::InitConfig { path } => {
            let path = path.unwrap_or_else(config::default_config_path);
            config::write_default_config(&path)?;
            eprintln!("Default configuration written to {}", path.display());
        }
    }

    Ok(())
}

/// Read a JSON object of named sub-metrics; `null` marks a metric as absent
fn read_metrics(path: &Path) -> anyhow::Result<SubMetrics> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read metrics from {}", path.display()))?;
    let values: HashMap<String, Option<f64>> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON object of sub-metrics", path.display()))?;
    Ok(SubMetrics::from_named(&values))
}

/// Write output to file or stdout
fn write_output(content: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            std::fs::write(p, content)?;
            eprintln!("Report written to {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
