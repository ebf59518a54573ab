//! geolqd - replay link-quality traces through the GPS-aware handlers

use anyhow::{Context, Result};
use clap::Parser;
use geolq_metric::LqAlgorithm;
use geolqd::{run_trace, Config, Trace};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "geolqd")]
#[command(about = "GPS-aware link-quality engine")]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "GEOLQD_CONFIG")]
    config: Option<PathBuf>,

    /// Write a default configuration and exit
    #[arg(long)]
    init: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Link-quality algorithm, overrides the configuration
    #[arg(short, long)]
    algorithm: Option<LqAlgorithm>,

    /// Event trace to replay
    trace: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.init {
        let config = Config::create_default(args.config)?;
        println!("Configuration written to {}", config.config_path().display());
        return Ok(());
    }

    let mut config = Config::load(args.config)?;
    if let Some(algorithm) = args.algorithm {
        config.lq.algorithm = algorithm;
        config.validate()?;
    }

    let level = if args.debug {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting {} with {} ({})",
        config.node.name, config.lq.algorithm, config.lq.main_address
    );

    let Some(trace_path) = args.trace else {
        anyhow::bail!("No trace given; pass the path of an event trace to replay");
    };
    let trace = Trace::load(&trace_path)?;

    let summary = run_trace(&config.lq, &trace)
        .with_context(|| format!("Replay of {} failed", trace_path.display()))?;
    for line in summary {
        println!("{}", line);
    }

    Ok(())
}
