//! Log Spike Analysis - streaming log rate spike explanation
//!
//! Entry point for the `lsa` binary:
//! - `lsa analyze`: run one analysis against a dataset file, streaming
//!   actions to stdout
//! - `lsa serve`: expose the analysis as a streaming HTTP endpoint
//! - `lsa version`: print version information

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

use lsa_common::Result;
use lsa_core::config::AnalysisConfig;
use lsa_core::dataset::{Dataset, InMemoryExecutor};
use lsa_core::engine::AnalysisEngine;
use lsa_core::exit_codes::ExitCode;
use lsa_core::logging::{init_logging, LogConfig};
use lsa_core::request::AnalysisRequest;
use lsa_core::stream::http::{serve, ServeConfig};
use lsa_core::stream::StreamEncoder;

/// Log Spike Analysis - explain log rate spikes from field statistics
#[derive(Parser)]
#[command(name = "lsa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one analysis and stream actions to stdout
    Analyze(AnalyzeArgs),

    /// Serve the analysis over HTTP
    Serve(ServeArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Dataset file: JSON object with a `docs` array
    #[arg(long)]
    dataset: PathBuf,

    /// Analysis request as a JSON file
    #[arg(long)]
    request: PathBuf,

    /// Optional analysis tuning as a JSON file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Dataset file: JSON object with a `docs` array
    #[arg(long)]
    dataset: PathBuf,

    /// Bind address
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port
    #[arg(long, default_value_t = 3580)]
    port: u16,

    /// Optional analysis tuning as a JSON file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    init_logging(&LogConfig::from_env());
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Analyze(args) => cmd_analyze(&args),
        Commands::Serve(args) => cmd_serve(&args),
        Commands::Version => {
            println!("lsa {}", env!("CARGO_PKG_VERSION"));
            ExitCode::Clean
        }
    };
    std::process::exit(code.as_i32());
}

fn cmd_analyze(args: &AnalyzeArgs) -> ExitCode {
    match run_analyze(args) {
        Ok(()) => ExitCode::Clean,
        Err(e) => {
            // A broken stdout pipe is the reader going away, not a bug.
            if !e.is_cancellation() {
                error!(error = %e, "analysis failed");
            }
            ExitCode::from(&e)
        }
    }
}

fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    let request: AnalysisRequest =
        serde_json::from_str(&std::fs::read_to_string(&args.request)?)?;
    let config = load_analysis_config(args.config.as_deref())?;

    let dataset = Dataset::from_path(&args.dataset)?;
    let executor = InMemoryExecutor::new(dataset);

    let stdout = std::io::stdout().lock();
    let mut sink = StreamEncoder::new(stdout, request.compress_response, request.flush_fix);
    let engine = AnalysisEngine::new(&executor, config);
    engine.run(&request, &mut sink)?;
    Ok(())
}

fn cmd_serve(args: &ServeArgs) -> ExitCode {
    match run_serve(args) {
        Ok(()) => ExitCode::Clean,
        Err(e) => {
            error!(error = %e, "server failed");
            ExitCode::from(&e)
        }
    }
}

fn run_serve(args: &ServeArgs) -> Result<()> {
    let config = load_analysis_config(args.config.as_deref())?;
    let dataset = Dataset::from_path(&args.dataset)?;
    let executor = Arc::new(InMemoryExecutor::new(dataset));

    let serve_config = ServeConfig {
        bind: args.bind.clone(),
        port: args.port,
    };
    serve(&serve_config, executor, config)
}

fn load_analysis_config(path: Option<&std::path::Path>) -> Result<AnalysisConfig> {
    let config = match path {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => AnalysisConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
