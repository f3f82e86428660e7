//! Iris Lifecycle CLI
//!
//! Explore the dataset, train and track models, inspect past runs, predict
//! locally and smoke test a running prediction server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use iris_lifecycle::dataset::{DatasetSummary, FeatureVector, IrisDataset, CLASS_NAMES};
use iris_lifecycle::inference::{probe, select_source, PredictRequest, PredictionService};
use iris_lifecycle::training::{run_training, RunStatus, RunStore, TrainingConfig, DEFAULT_EXPERIMENT};
use iris_lifecycle::utils::format_percent;
use iris_lifecycle::utils::logging::{init_logging, LogConfig, LogLevel};

/// Iris species classification lifecycle
///
/// Trains a logistic regression on the iris flower measurements, records each
/// run on the local filesystem, and talks to the prediction server.
#[derive(Parser, Debug)]
#[command(name = "iris")]
#[command(version)]
#[command(about = "Train, track and probe an iris species classifier", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Log level, overriding the one picked by --verbose (RUST_LOG still wins)
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevel>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Describe the dataset and optionally export it as CSV
    Explore {
        /// CSV file to explore instead of the bundled data
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Write the dataset as CSV (defaults to data/iris_dataset.csv when given without a path)
        #[arg(short, long, num_args = 0..=1, default_missing_value = "data/iris_dataset.csv")]
        export: Option<PathBuf>,
    },

    /// Train a model and record the run
    Train {
        /// TOML training config; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// CSV file to train on instead of the bundled data
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Run store directory
        #[arg(long, env = "IRIS_RUNS_DIR", default_value = "mlruns")]
        runs_dir: PathBuf,

        /// Experiment name
        #[arg(short, long)]
        experiment: Option<String>,

        /// Inverse regularisation strength
        #[arg(short = 'C', long = "c")]
        c: Option<f64>,

        /// Maximum solver iterations
        #[arg(long)]
        max_iter: Option<usize>,

        /// Random seed for the split
        #[arg(long)]
        seed: Option<u64>,

        /// Fraction of samples held out for testing
        #[arg(long)]
        test_fraction: Option<f64>,
    },

    /// List recorded runs, newest first
    Runs {
        /// Run store directory
        #[arg(long, env = "IRIS_RUNS_DIR", default_value = "mlruns")]
        runs_dir: PathBuf,

        /// Experiment name
        #[arg(short, long, default_value = DEFAULT_EXPERIMENT)]
        experiment: String,
    },

    /// Predict species locally with a recorded model
    Predict {
        /// Four measurements: sepal length, sepal width, petal length, petal width (cm)
        #[arg(short, long, value_delimiter = ',', num_args = 1.., required = true)]
        features: Vec<f64>,

        /// Run store directory
        #[arg(long, env = "IRIS_RUNS_DIR", default_value = "mlruns")]
        runs_dir: PathBuf,

        /// Experiment name
        #[arg(short, long, default_value = DEFAULT_EXPERIMENT)]
        experiment: String,

        /// Serve this run instead of the latest one
        #[arg(long)]
        run_id: Option<String>,

        /// Load this artifact file instead of using the run store
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Send canonical samples to a running prediction server
    Probe {
        /// Server base URL
        #[arg(short, long, default_value = "http://localhost:1235")]
        url: String,

        /// Request timeout in seconds
        #[arg(long, default_value = "10")]
        timeout: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogConfig::from_verbose_flag(cli.verbose).with_level(cli.log_level))?;

    print_banner();

    match cli.command {
        Commands::Explore { data, export } => {
            cmd_explore(data.as_deref(), export.as_deref())?;
        }

        Commands::Train {
            config,
            data,
            runs_dir,
            experiment,
            c,
            max_iter,
            seed,
            test_fraction,
        } => {
            let mut training_config = match config {
                Some(path) => TrainingConfig::from_toml_file(&path)?,
                None => TrainingConfig::default(),
            };
            if let Some(experiment) = experiment {
                training_config.experiment = experiment;
            }
            if let Some(c) = c {
                training_config.model.c = c;
            }
            if let Some(max_iter) = max_iter {
                training_config.model.max_iter = max_iter;
            }
            if let Some(seed) = seed {
                training_config.split.seed = seed;
            }
            if let Some(test_fraction) = test_fraction {
                training_config.split.test_fraction = test_fraction;
            }

            cmd_train(data.as_deref(), &runs_dir, &training_config)?;
        }

        Commands::Runs {
            runs_dir,
            experiment,
        } => {
            cmd_runs(&runs_dir, &experiment)?;
        }

        Commands::Predict {
            features,
            runs_dir,
            experiment,
            run_id,
            model,
        } => {
            cmd_predict(&features, &runs_dir, &experiment, run_id, model)?;
        }

        Commands::Probe { url, timeout } => {
            cmd_probe(&url, Duration::from_secs(timeout))?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔════════════════════════════════════════════════════╗
 ║   Iris Lifecycle                                   ║
 ║   Species classification and serving               ║
 ╚════════════════════════════════════════════════════╝
  "#
        .green()
    );
}

fn load_dataset(data: Option<&Path>) -> Result<IrisDataset> {
    let dataset = match data {
        Some(path) => IrisDataset::from_csv(path)
            .with_context(|| format!("failed to load dataset from {}", path.display()))?,
        None => IrisDataset::builtin()?,
    };
    Ok(dataset)
}

fn cmd_explore(data: Option<&Path>, export: Option<&Path>) -> Result<()> {
    let dataset = load_dataset(data)?;
    let summary = DatasetSummary::from_dataset(&dataset);
    let (rows, columns) = summary.shape();

    println!("{}", "Dataset Overview:".cyan().bold());
    println!("  Shape:   {} rows x {} columns", rows, columns);
    println!("  Columns: {}", summary.columns.join(", "));
    println!(
        "  Missing or non-finite values: {}",
        summary.non_finite_values
    );
    println!();

    println!("{}", "Feature Statistics:".cyan().bold());
    print!("{}", summary.describe_table());
    println!();

    println!("{}", "Class Distribution:".cyan().bold());
    for class in &summary.class_distribution {
        let pct = 100.0 * class.count as f64 / summary.num_rows.max(1) as f64;
        println!("  {:12} {:>5} ({:>5.1}%)", class.name, class.count, pct);
    }
    if summary.is_balanced() {
        println!("  {}", "Classes are balanced".green());
    } else {
        println!("  {}", "Classes are imbalanced".yellow());
    }

    if let Some(path) = export {
        dataset.write_csv(path)?;
        println!();
        println!("{} {}", "Dataset exported to".green(), path.display());
    }

    Ok(())
}

fn cmd_train(data: Option<&Path>, runs_dir: &Path, config: &TrainingConfig) -> Result<()> {
    let dataset = load_dataset(data)?;
    let store = RunStore::new(runs_dir);

    println!("{}", "Training Configuration:".cyan().bold());
    println!("  Experiment:     {}", config.experiment);
    println!("  Run store:      {}", runs_dir.display());
    println!("  Samples:        {}", dataset.len());
    println!("  Test fraction:  {}", config.split.test_fraction);
    println!("  Seed:           {}", config.split.seed);
    println!("  C:              {}", config.model.c);
    println!("  Max iterations: {}", config.model.max_iter);
    println!();

    let report = run_training(&dataset, config, &store)?;

    println!("{}", "Test Set".cyan().bold());
    println!("{}", report.test_metrics);
    println!(
        "{}",
        report.test_metrics.confusion_matrix.display(Some(&CLASS_NAMES[..]))
    );

    println!("{}", "Run Summary:".cyan().bold());
    println!("  Run id:         {}", report.run_id.yellow());
    println!("  Iterations:     {}", report.n_iter);
    println!("  Train accuracy: {}", format_percent(report.train_metrics.accuracy));
    println!("  Test accuracy:  {}", format_percent(report.test_metrics.accuracy));
    println!("  Overfitting:    {:.4}", report.overfitting);
    println!("  Artifact:       {}", report.artifact_path.display());
    println!();
    println!("{}", "Training complete!".green().bold());

    Ok(())
}

fn cmd_runs(runs_dir: &Path, experiment: &str) -> Result<()> {
    let store = RunStore::new(runs_dir);
    let runs = store.list_runs(experiment)?;

    if runs.is_empty() {
        println!(
            "No runs found for experiment '{}' in {}",
            experiment,
            runs_dir.display()
        );
        println!("Train one first:");
        println!("  iris train --runs-dir {}", runs_dir.display());
        return Ok(());
    }

    println!(
        "{}",
        format!("Runs of '{}' ({})", experiment, runs.len()).cyan().bold()
    );
    println!(
        "  {:32}  {:9}  {:20}  {:>9}",
        "run id", "status", "started", "test acc"
    );
    for run in &runs {
        let status = match run.status {
            RunStatus::Finished => "finished".green(),
            RunStatus::Running => "running".yellow(),
            RunStatus::Failed => "failed".red(),
        };
        let accuracy = run
            .metric("test_accuracy")
            .map(format_percent)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:32}  {:9}  {:20}  {:>9}",
            run.run_id,
            status,
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            accuracy
        );
    }

    Ok(())
}

fn cmd_predict(
    features: &[f64],
    runs_dir: &Path,
    experiment: &str,
    run_id: Option<String>,
    model: Option<PathBuf>,
) -> Result<()> {
    let Ok(instance) = FeatureVector::try_from(features) else {
        bail!("expected 4 features, got {}", features.len());
    };

    let source = select_source(runs_dir, experiment, run_id, model);
    info!("Loading model from {}", source.describe());
    let model = source.load()?;
    let service = PredictionService::with_model(model);

    let request = PredictRequest::new(vec![instance])?;
    let response = service.predict_request(&request)?;

    for (features, id) in request.instances().iter().zip(&response.predictions) {
        let name = CLASS_NAMES.get(*id).copied().unwrap_or("unknown");
        println!("{}", "Prediction:".cyan().bold());
        println!("  Features: {:?}", features);
        println!("  Class id: {}", id);
        println!("  Species:  {}", name.green().bold());
    }

    Ok(())
}

fn cmd_probe(url: &str, timeout: Duration) -> Result<()> {
    let report = probe::probe_server(url, timeout)?;

    println!("{}", format!("Probe of {}", report.url).cyan().bold());
    for outcome in &report.outcomes {
        let predicted = outcome.predicted.unwrap_or("unknown");
        let mark = if outcome.is_correct() {
            "ok".green()
        } else {
            "MISMATCH".red()
        };
        println!(
            "  {:?} -> {} ({}), expected {}  [{}]",
            outcome.features, outcome.predicted_id, predicted, outcome.expected, mark
        );
    }
    println!();

    if !report.passed() {
        bail!(
            "{} of {} probe samples were misclassified",
            report.outcomes.len() - report.correct(),
            report.outcomes.len()
        );
    }

    println!("{}", "All probe samples classified correctly".green().bold());
    Ok(())
}
