use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use grove_forest::{Forest, ForestSummary, Predictions, predict, predict_probabilities};
use grove_io::{FeatureMatrixReader, PredictionWriter};

#[derive(Parser)]
#[command(name = "grove")]
#[command(about = "Apply trained decision-tree forests to annotated feature matrices")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel voting (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Predict every case of a feature matrix with a trained forest
    Predict {
        /// Path to the AFM feature matrix
        #[arg(long)]
        fm: PathBuf,

        /// Path to the forest (.bin for binary, anything else for text)
        #[arg(long)]
        model: PathBuf,

        /// Write a `label  prediction  actual` TSV report to this path
        #[arg(long)]
        preds: Option<PathBuf>,

        /// Report the positive-class vote share instead of the label
        #[arg(long, default_value_t = false)]
        probabilities: bool,
    },

    /// Print a JSON summary of a forest
    Inspect {
        /// Path to the forest (.bin for binary, anything else for text)
        #[arg(long)]
        model: PathBuf,
    },

    /// Re-encode a forest; the output extension picks the format
    Convert {
        /// Path to the input forest
        #[arg(long)]
        model: PathBuf,

        /// Path to write the converted forest to
        #[arg(long)]
        output: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct PredictOutput {
    forest_type: String,
    target: String,
    n_trees: usize,
    n_cases: usize,
    n_predicted: usize,
    probabilities: bool,
    preds: Option<PathBuf>,
}

#[derive(Serialize)]
struct ConvertOutput {
    model: PathBuf,
    output: PathBuf,
    n_trees: usize,
}

fn is_binary(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bin")
}

fn load_forest(path: &Path) -> Result<Forest> {
    let forest = if is_binary(path) {
        Forest::load(path)
    } else {
        Forest::load_text(path)
    }
    .with_context(|| format!("failed to load model {}", path.display()))?;
    info!(
        forest_type = %forest.forest_type(),
        n_trees = forest.n_trees(),
        "model loaded"
    );
    Ok(forest)
}

/// Count cases with a usable prediction.
fn n_predicted(preds: &Predictions) -> usize {
    match preds {
        Predictions::Categorical(labels) => labels
            .iter()
            .filter(|l| l.as_str() != grove_forest::MISSING_LABEL)
            .count(),
        Predictions::Real(values) => values.iter().filter(|v| !v.is_nan()).count(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Predict {
            fm,
            model,
            preds,
            probabilities,
        } => {
            let forest = load_forest(&model)?;

            let matrix = FeatureMatrixReader::new(&fm)
                .read()
                .context("failed to read feature matrix")?;
            info!(
                n_cases = matrix.n_cases(),
                n_features = matrix.n_features(),
                "feature matrix loaded"
            );

            let predictions = if probabilities {
                Predictions::Real(
                    predict_probabilities(&matrix, &forest)
                        .context("probability prediction failed")?,
                )
            } else {
                predict(&matrix, &forest).context("prediction failed")?
            };

            if let Some(path) = &preds {
                PredictionWriter::new(path)
                    .write(&matrix, &predictions, forest.target())
                    .context("failed to write predictions")?;
                info!(path = %path.display(), "label/predicted/actual report written");
            }

            let output = PredictOutput {
                forest_type: forest.forest_type().to_string(),
                target: forest.target().to_string(),
                n_trees: forest.n_trees(),
                n_cases: matrix.n_cases(),
                n_predicted: n_predicted(&predictions),
                probabilities,
                preds,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Inspect { model } => {
            let forest = load_forest(&model)?;
            let summary: ForestSummary = forest.summary();
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Convert { model, output } => {
            let forest = load_forest(&model)?;
            if is_binary(&output) {
                forest.save(&output)
            } else {
                forest.save_text(&output)
            }
            .with_context(|| format!("failed to write model {}", output.display()))?;

            let summary = ConvertOutput {
                model,
                output,
                n_trees: forest.n_trees(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
