//! Iris Prediction Server
//!
//! HTTP API serving species predictions from a trained classifier. The model
//! is acquired once at startup; if that fails the server still starts and
//! reports itself unhealthy.

mod error;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use iris_lifecycle::inference::{select_source, PredictionService, DEFAULT_PORT};
use iris_lifecycle::training::DEFAULT_EXPERIMENT;
use iris_lifecycle::utils::logging::{init_logging, LogConfig, LogLevel};

use crate::state::AppState;

/// Iris Prediction Server
#[derive(Parser, Debug)]
#[command(name = "iris-server")]
#[command(version)]
#[command(about = "HTTP prediction service for the iris species classifier")]
struct Cli {
    /// Host to bind to
    #[arg(long, env = "IRIS_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "IRIS_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Run store directory
    #[arg(long, env = "IRIS_RUNS_DIR", default_value = "mlruns")]
    runs_dir: PathBuf,

    /// Experiment whose runs are served
    #[arg(short, long, env = "IRIS_EXPERIMENT", default_value = DEFAULT_EXPERIMENT)]
    experiment: String,

    /// Serve this run instead of the latest finished one
    #[arg(long, env = "IRIS_RUN_ID")]
    run_id: Option<String>,

    /// Serve this artifact file instead of using the run store
    #[arg(short, long, env = "IRIS_MODEL_PATH")]
    model_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Log level, overriding the one picked by --verbose (RUST_LOG still wins)
    #[arg(long, value_enum, env = "IRIS_LOG_LEVEL")]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::production()
    };
    init_logging(&log_config.with_level(cli.log_level))?;

    info!("Iris Prediction Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Runs dir:   {:?}", cli.runs_dir);
    info!("  Experiment: {}", cli.experiment);
    if let Some(run_id) = &cli.run_id {
        info!("  Run id:     {}", run_id);
    }
    if let Some(model_path) = &cli.model_path {
        info!("  Model path: {:?}", model_path);
    }

    let source = select_source(&cli.runs_dir, &cli.experiment, cli.run_id, cli.model_path);
    let service = PredictionService::from_source(source.as_ref());
    if service.is_ready() {
        info!("Model loaded from {}", source.describe());
    } else {
        warn!("Serving without a model; /health reports an error until restarted with a valid model");
    }

    let state = Arc::new(AppState::new(service));
    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
