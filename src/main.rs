use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use grove_comm::{Communicator, LocalGroup, Rank};
use grove_io::TableReader;
use grove_rf::{
    CrossValidation, GridPoint, HyperparameterSearch, RandomForestParams, SeedSource, Table,
    Verbosity,
};

/// Forest size used by `evaluate`.
const EVALUATE_TREES: usize = 20;

#[derive(Parser)]
#[command(name = "grove")]
#[command(about = "Random forest cross-validation across a group of cooperating workers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Number of data rows to read (skips dimension inference; needs --num-cols)
    #[arg(long, global = true, requires = "num_cols")]
    num_rows: Option<usize>,

    /// Number of columns per row, label included (needs --num-rows)
    #[arg(long, global = true, requires = "num_rows")]
    num_cols: Option<usize>,

    /// Diagnostic verbosity: 0 = summary only, higher = more detail
    #[arg(long, default_value_t = Verbosity::NORMAL.level(), global = true)]
    log_level: u8,

    /// RNG seed for reproducibility (defaults to the current time)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Number of workers in the process group
    #[arg(long, default_value_t = 1, global = true)]
    workers: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Cross-validate a 20-tree forest on a labelled CSV table
    Evaluate {
        /// Path to the input CSV file (last column is the 0/1 label)
        data: PathBuf,

        /// Number of contiguous cross-validation folds
        #[arg(long, default_value_t = 20)]
        k_folds: usize,
    },

    /// Grid-search tree count and depth, cross-validating each configuration
    Search {
        /// Path to the input CSV file (last column is the 0/1 label)
        data: PathBuf,
    },
}

impl Command {
    fn data(&self) -> &Path {
        match self {
            Command::Evaluate { data, .. } | Command::Search { data } => data,
        }
    }
}

/// Run settings rank 0 decides and broadcasts before any data moves.
#[derive(Debug, Clone, Copy)]
struct RunSetup {
    seed: u64,
    verbosity: Verbosity,
}

#[derive(Serialize)]
struct EvaluateOutput {
    data: String,
    rows: usize,
    cols: usize,
    seed: u64,
    workers: usize,
    k_folds: usize,
    n_estimators: usize,
    excluded_rows: usize,
    accuracy: f64,
    accuracy_percent: u64,
    std_accuracy: f64,
    fold_accuracies: Vec<f64>,
    elapsed_seconds: f64,
}

#[derive(Serialize)]
struct SearchOutput {
    data: String,
    rows: usize,
    cols: usize,
    seed: u64,
    workers: usize,
    best_accuracy: f64,
    best_accuracy_percent: u64,
    best_n_estimators: usize,
    best_max_depth: usize,
    evaluations: Vec<GridPoint>,
    elapsed_seconds: f64,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Summary {
    Evaluate(EvaluateOutput),
    Search(SearchOutput),
}

fn log_filter(level: u8) -> &'static str {
    match level {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

fn percent(accuracy: f64) -> u64 {
    (accuracy * 100.0) as u64
}

fn load_table(cli: &Cli) -> Result<Table> {
    let mut reader = TableReader::new(cli.command.data());
    if let (Some(rows), Some(cols)) = (cli.num_rows, cli.num_cols) {
        reader = reader.with_dimensions(rows, cols);
    }
    reader.read().context("failed to read input CSV")
}

/// Everything one member of the group does. Rank 0 owns configuration and
/// the dataset; the others receive both by broadcast.
fn run_member<C: Communicator>(comm: &C, cli: &Cli) -> Result<Summary> {
    let is_root = comm.rank().is_root();

    let setup = comm.broadcast(
        Rank::ROOT,
        is_root.then(|| RunSetup {
            seed: cli.seed.unwrap_or_else(time_seed),
            verbosity: Verbosity::new(cli.log_level),
        }),
    )?;

    let (payload, load_error) = if is_root {
        match load_table(cli) {
            Ok(table) => (Some(Some(table)), None),
            Err(e) => (Some(None), Some(e)),
        }
    } else {
        (None, None)
    };
    let Some(table) = comm.broadcast(Rank::ROOT, payload)? else {
        return Err(load_error.unwrap_or_else(|| anyhow!("rank 0 could not load the dataset")));
    };

    let data = cli.command.data().display().to_string();
    let dims = table.dims();
    if is_root {
        info!(
            seed = setup.seed,
            log_level = setup.verbosity.level(),
            %dims,
            path = %data,
            workers = comm.size(),
            "run configured"
        );
        if setup.verbosity.shows(1) {
            debug!(checksum = table.checksum(), "data checksum");
        }
    }

    let mut seeds = SeedSource::new(setup.seed);
    comm.barrier();
    let start = Instant::now();

    let summary = match &cli.command {
        Command::Evaluate { k_folds, .. } => {
            let params = RandomForestParams::new(EVALUATE_TREES)?;
            if is_root {
                info!(?params, k_folds, "cross-validating");
            }
            let cv = CrossValidation::new(*k_folds)?.with_verbosity(setup.verbosity);
            let result = cv
                .evaluate(comm, &table, &params, &mut seeds)
                .context("cross-validation failed")?;
            Summary::Evaluate(EvaluateOutput {
                data,
                rows: dims.rows,
                cols: dims.cols,
                seed: setup.seed,
                workers: comm.size(),
                k_folds: cv.k_folds(),
                n_estimators: result.trees_per_fold,
                excluded_rows: result.n_excluded_rows,
                accuracy: result.mean_accuracy,
                accuracy_percent: percent(result.mean_accuracy),
                std_accuracy: result.std_accuracy,
                fold_accuracies: result.fold_accuracies,
                elapsed_seconds: start.elapsed().as_secs_f64(),
            })
        }
        Command::Search { .. } => {
            let result = HyperparameterSearch::default()
                .with_verbosity(setup.verbosity)
                .run(comm, &table, &mut seeds)
                .context("hyperparameter search failed")?;
            Summary::Search(SearchOutput {
                data,
                rows: dims.rows,
                cols: dims.cols,
                seed: setup.seed,
                workers: comm.size(),
                best_accuracy: result.best.accuracy,
                best_accuracy_percent: percent(result.best.accuracy),
                best_n_estimators: result.best.n_estimators,
                best_max_depth: result.best.max_depth,
                evaluations: result.evaluations,
                elapsed_seconds: start.elapsed().as_secs_f64(),
            })
        }
    };

    Ok(summary)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    let group = LocalGroup::new(cli.workers).context("invalid worker count")?;
    let mut outcomes = group
        .run(|comm| run_member(&comm, &cli))
        .context("process group failed")?
        .into_iter();

    // Rank 0 carries the root cause when loading fails; report it first.
    let summary = outcomes
        .next()
        .context("process group returned no members")?
        .context("rank 0 failed")?;
    for (offset, outcome) in outcomes.enumerate() {
        outcome.with_context(|| format!("rank {} failed", offset + 1))?;
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
