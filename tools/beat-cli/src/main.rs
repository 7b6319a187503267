//! Beat CLI: estimate the tempo of a WAV file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;

use beat_broker::{BeatDetector, BrokerConfig, ChannelSelection};
use beat_cli::report::Report;
use beat_cli::{call_args, wav};
use beat_telemetry::{call_span, init_tracing, TelemetryConfig};

/// Tempo detection through a beat detector worker
#[derive(Parser, Debug)]
#[command(name = "beat-cli")]
#[command(about = "Estimate the tempo of a WAV file using a beat detector worker process")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate the tempo in BPM
    Analyze(CallOptions),
    /// Estimate the tempo and the offset of the first beat
    Guess(CallOptions),
}

#[derive(ClapArgs, Debug)]
struct CallOptions {
    /// WAV file to analyse
    input: PathBuf,

    /// Window start in seconds
    #[arg(long)]
    offset: Option<f64>,

    /// Window length in seconds (default: to the end of the file)
    #[arg(long)]
    duration: Option<f64>,

    /// Lower bound of the tempo search (BPM)
    #[arg(long)]
    min_tempo: Option<f64>,

    /// Upper bound of the tempo search (BPM)
    #[arg(long)]
    max_tempo: Option<f64>,

    /// Worker executable (default: BEAT_WORKER_PROGRAM)
    #[arg(long)]
    worker: Option<String>,

    /// Argument passed to the worker (repeatable)
    #[arg(long = "worker-arg", allow_hyphen_values = true)]
    worker_args: Vec<String>,

    /// Mix all channels down instead of using the first one
    #[arg(long)]
    mixdown: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if cli.verbose {
        telemetry = telemetry.verbose();
    }
    init_tracing(&telemetry).context("Failed to initialize logging")?;

    let (name, options) = match &cli.command {
        Command::Analyze(options) => ("analyze", options),
        Command::Guess(options) => ("guess", options),
    };
    let _span = call_span!("beat_cli", command = name, input = %options.input.display()).entered();

    let config = broker_config(options)?;
    let source = wav::read_wav(&options.input)?;
    let detector = BeatDetector::load(&config).context("Failed to start worker")?;

    let args = call_args(
        options.offset,
        options.duration,
        options.min_tempo,
        options.max_tempo,
    );

    let report = match cli.command {
        Command::Analyze(_) => Report::Analyze {
            bpm: detector.analyze(&source, args).await.context("analyze failed")?,
        },
        Command::Guess(_) => detector
            .guess(&source, args)
            .await
            .context("guess failed")?
            .into(),
    };

    info!(?report, "Detection finished");

    if options.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.to_text());
    }

    Ok(())
}

/// Environment configuration with command-line overrides applied.
fn broker_config(options: &CallOptions) -> Result<BrokerConfig> {
    let mut config = BrokerConfig::from_env();

    if let Some(worker) = &options.worker {
        config.worker.program = Some(worker.clone());
        config.worker.args = options.worker_args.clone();
    } else if !options.worker_args.is_empty() {
        config.worker.args = options.worker_args.clone();
    }

    if options.mixdown {
        config.render.channel = ChannelSelection::Mixdown;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
