//! GalBin CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod run;

#[derive(Parser)]
#[command(name = "galbin")]
#[command(about = "GalBin - 2D spatial binning of stellar kinematics")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate bins, fit each bin and bootstrap the weighted-mean error
    Fit {
        /// Run config (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file for the report (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto). Overrides the config.
        #[arg(long)]
        threads: Option<usize>,

        /// Bootstrap seed. Overrides the config.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Reduce one column to an (n_bins, n_bins) grid of per-bin means
    Values {
        /// Run config (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Column to reduce
        #[arg(short, long)]
        parameter: String,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the JSON output.
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fit { config, output, threads, seed } => {
            cmd_fit(&config, output.as_ref(), threads, seed)
        }
        Commands::Values { config, parameter, output } => {
            cmd_values(&config, &parameter, output.as_ref())
        }
        Commands::Version => {
            println!("galbin {}", gb_core::VERSION);
            Ok(())
        }
    }
}

fn setup_runtime(threads: usize) {
    if threads > 0 {
        // Best-effort: if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }
}

fn cmd_fit(
    config: &PathBuf,
    output: Option<&PathBuf>,
    threads: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let mut cfg = run::read_run_config(config)?;
    if let Some(t) = threads {
        cfg.threads = t;
    }
    if let Some(s) = seed {
        cfg.bootstrap.seed = s;
    }
    setup_runtime(cfg.threads);

    let mut collection = cfg.build_collection()?;
    let summary = gb_inference::estimate_collection(&mut collection, &cfg.estimator)?;
    let report = gb_inference::build_report(&collection, Some(&cfg.bootstrap))?;
    tracing::info!(
        n_bins = report.n_bins,
        n_empty = report.n_empty,
        total_log_likelihood = report.total_log_likelihood,
        "fit complete"
    );

    let mut value = serde_json::to_value(&report)?;
    value["estimation"] = serde_json::to_value(summary)?;
    write_json(output, value)
}

fn cmd_values(config: &PathBuf, parameter: &str, output: Option<&PathBuf>) -> Result<()> {
    let cfg = run::read_run_config(config)?;
    setup_runtime(cfg.threads);

    let collection = cfg.build_collection()?;
    let values = collection.calculate_values(parameter)?;
    // Outer index: x column; inner: y row. Empty bins serialize as null.
    let rows: Vec<Vec<f64>> = (0..values.nrows())
        .map(|j| (0..values.ncols()).map(|i| values[(j, i)]).collect())
        .collect();

    let value = serde_json::json!({
        "parameter": parameter,
        "n_bins": collection.n_bins(),
        "sign_flipped": parameter == collection.options().sign_flipped_column,
        "values": rows,
    });
    write_json(output, value)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
