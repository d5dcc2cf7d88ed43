//! Run configuration and table loading for `galbin fit` / `galbin values`.

use anyhow::{Context, Result};
use gb_binning::{BinCollection, BinningOptions, Grid, assign_bin_indices};
use gb_core::RowTable;
use gb_inference::{BootstrapConfig, EstimatorConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Grid extents: either uniform ranges or explicit edges.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GridSpec {
    /// Explicit, strictly increasing edges (`n_bins + 1` per axis).
    Edges { x_edges: Vec<f64>, y_edges: Vec<f64> },
    /// `n_bins` equal cells over each range.
    Uniform { x_range: (f64, f64), y_range: (f64, f64) },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Input table (JSON). Relative paths resolve against the config file's directory.
    pub input: PathBuf,

    /// Bins per axis.
    pub n_bins: usize,

    pub grid: GridSpec,

    /// Columns used to assign bin indices when the table carries none.
    #[serde(default = "default_x_column")]
    pub x_column: String,
    #[serde(default = "default_y_column")]
    pub y_column: String,

    #[serde(default)]
    pub binning: BinningOptions,
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    /// Threads (0 = auto).
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_x_column() -> String {
    "x".to_string()
}

fn default_y_column() -> String {
    "y".to_string()
}

fn default_threads() -> usize {
    1
}

pub fn read_run_config(path: &Path) -> Result<RunConfig> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let mut cfg: RunConfig = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        serde_yaml_ng::from_slice(&bytes)?
    };
    if cfg.input.is_relative()
        && let Some(dir) = path.parent()
    {
        cfg.input = dir.join(&cfg.input);
    }
    Ok(cfg)
}

/// Columnar table on disk.
///
/// `Bin_index` may be given either at the top level or as an ordinary column. Per-row errors
/// come from `cov_mat` (6x6 per row), `target_variance`, or the Gaia error/correlation
/// columns, in that order of preference.
#[derive(Debug, Clone, Deserialize)]
pub struct TableInput {
    pub columns: BTreeMap<String, Vec<f64>>,
    #[serde(default, rename = "Bin_index")]
    pub bin_index: Option<Vec<i64>>,
    #[serde(default)]
    pub cov_mat: Option<Vec<[[f64; 6]; 6]>>,
    #[serde(default)]
    pub target_variance: Option<Vec<f64>>,
}

impl TableInput {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading table {}", path.display()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn into_table(self) -> Result<RowTable> {
        let mut table = RowTable::from_columns(self.columns)?;
        if let Some(index) = self.bin_index {
            table = table.with_bin_index(index)?;
        }
        table = if let Some(cov) = self.cov_mat {
            table.with_covariances(cov.into_iter().map(gb_core::Covariance6::from_rows).collect())?
        } else if let Some(var) = self.target_variance {
            table.with_target_variances(var)?
        } else if table.has_column("ra_error") {
            table.with_covariances_from_columns()?
        } else {
            tracing::warn!("input table carries no per-row errors");
            table
        };
        Ok(table)
    }
}

impl RunConfig {
    pub fn grid(&self) -> Result<Grid> {
        let grid = match &self.grid {
            GridSpec::Edges { x_edges, y_edges } => Grid::from_edges(x_edges, y_edges)?,
            GridSpec::Uniform { x_range, y_range } => {
                Grid::uniform(*x_range, *y_range, self.n_bins)?
            }
        };
        Ok(grid)
    }

    /// Load the table, tag rows with bin indices if needed, and generate the bins.
    pub fn build_collection(&self) -> Result<BinCollection> {
        let grid = self.grid()?;
        let mut table = TableInput::read(&self.input)?.into_table()?;
        if table.bin_index().is_none() {
            let xs = table.require_column(&self.x_column)?;
            let ys = table.require_column(&self.y_column)?;
            let index = assign_bin_indices(xs, ys, &grid)?;
            tracing::debug!(
                x_column = %self.x_column,
                y_column = %self.y_column,
                "assigned bin indices from grid"
            );
            table = table.with_bin_index(index)?;
        }

        let mut collection =
            BinCollection::new(table, self.n_bins, grid)?.with_options(self.binning.clone())?;
        collection.generate_bins()?;
        Ok(collection)
    }
}
