use anyhow::Result;
use clap::{Parser, ValueEnum};
use deconflict_cli::config::{Config, ConfigFile};
use deconflict_cli::{check_files, summary, DEFAULT_LOG_DIRECTIVES};
use deconflict_core::{DetectionConfig, OverlapMode, SpatialMethod, TemporalStrategy};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Check a drone mission against scheduled traffic", long_about = None)]
struct Args {
    /// Primary mission file
    #[arg(long)]
    primary: PathBuf,

    /// Traffic file with the other missions
    #[arg(long)]
    traffic: PathBuf,

    /// Detection config JSON, layered over DECONFLICT_* variables; flags below take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Safety radius in meters
    #[arg(long)]
    radius: Option<f64>,

    /// Temporal near-miss threshold in seconds
    #[arg(long)]
    time_threshold: Option<f64>,

    /// Sampling step in seconds (sampled method only)
    #[arg(long)]
    sample_step: Option<f64>,

    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    #[arg(long, value_enum)]
    method: Option<MethodArg>,

    #[arg(long, value_enum)]
    overlap: Option<OverlapArg>,

    /// Report temporal overlaps that never breach the radius
    #[arg(long)]
    temporal_advisories: bool,

    /// Also flag paths that come within the radius at different times
    #[arg(long)]
    path_proximity: bool,

    /// Largest passage gap in seconds reported by the path check (with --path-proximity)
    #[arg(long)]
    path_window: Option<f64>,

    /// Print the report as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Split,
    Folded,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    Analytic,
    Sampled,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OverlapArg {
    Coverage,
    Window,
}

impl Args {
    fn detection_config(&self) -> Result<DetectionConfig> {
        let mut config = Config::from_env().detection_config();
        if let Some(path) = &self.config {
            config = ConfigFile::load(path)?.apply(config);
        }

        if let Some(radius) = self.radius {
            config.safety_radius_m = radius;
        }
        if let Some(threshold) = self.time_threshold {
            config.time_threshold_s = threshold;
        }
        if let Some(step) = self.sample_step {
            config.sample_step_s = step;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = match strategy {
                StrategyArg::Split => TemporalStrategy::Split,
                StrategyArg::Folded => TemporalStrategy::Folded,
            };
        }
        if let Some(method) = self.method {
            config.method = match method {
                MethodArg::Analytic => SpatialMethod::Analytic,
                MethodArg::Sampled => SpatialMethod::Sampled,
            };
        }
        if let Some(overlap) = self.overlap {
            config.overlap = match overlap {
                OverlapArg::Coverage => OverlapMode::Coverage,
                OverlapArg::Window => OverlapMode::Window,
            };
        }
        if self.temporal_advisories {
            config.temporal_advisories = true;
        }
        if self.path_proximity {
            config.path_proximity = true;
        }
        if self.path_window.is_some() {
            config.path_time_window_s = self.path_window;
        }
        Ok(config)
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Logs go to stderr so --json output stays parseable
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_DIRECTIVES));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            args.log_json
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(io::stderr)),
        )
        .with(
            (!args.log_json).then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr)),
        )
        .init();

    let config = args.detection_config()?;
    tracing::debug!(?config, "detection config");

    let report = check_files(&args.primary, &args.traffic, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", summary::render(&report, &config));
    }

    Ok(if report.is_clear() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
