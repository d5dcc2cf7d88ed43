//! Ordered collection of spatial bins over a square grid.

use std::collections::BTreeMap;

use gb_core::{Error, Result, RowTable};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::bin::Bin;
use crate::grid::Grid;
use crate::index::{BinSlot, bin_index_sequence};

/// Column conventions used by a [`BinCollection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningOptions {
    /// Column the per-bin likelihood is evaluated on.
    pub target_column: String,
    /// Column whose reduced values are sign-flipped by [`BinCollection::calculate_values`].
    pub sign_flipped_column: String,
}

impl Default for BinningOptions {
    fn default() -> Self {
        Self { target_column: "v_phi".to_string(), sign_flipped_column: "v_x".to_string() }
    }
}

/// Rows, grid and the `n_bins * n_bins` bins generated from them.
#[derive(Debug, Clone)]
pub struct BinCollection {
    data: RowTable,
    n_bins: usize,
    grid: Grid,
    options: BinningOptions,
    slots: Vec<BinSlot>,
    bins: Vec<Bin>,
}

impl BinCollection {
    /// Validate inputs and create an empty collection with default [`BinningOptions`].
    ///
    /// Fails with [`Error::InvalidConfiguration`] for `n_bins == 0` or a grid that does not
    /// have `n_bins` cells per axis, and with [`Error::MissingColumn`] if `data` has no
    /// bin-index column or no target column.
    pub fn new(data: RowTable, n_bins: usize, grid: Grid) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::InvalidConfiguration("n_bins must be > 0".into()));
        }
        data.require_bin_index()?;
        grid.ensure_square(n_bins)?;
        Self {
            data,
            n_bins,
            grid,
            options: BinningOptions::default(),
            slots: Vec::new(),
            bins: Vec::new(),
        }
        .with_options(BinningOptions::default())
    }

    /// Replace the column conventions.
    ///
    /// The new target column must exist in the data. Bins copy the target column when they
    /// are generated, so this fails with [`Error::AlreadyGenerated`] afterwards.
    pub fn with_options(mut self, options: BinningOptions) -> Result<Self> {
        if self.is_generated() {
            return Err(Error::AlreadyGenerated(self.bins.len()));
        }
        self.data.require_column(&options.target_column)?;
        self.options = options;
        Ok(self)
    }

    /// Build the bins in index order, then assign their boundaries.
    ///
    /// Indices with no rows get a placeholder bin so the result is always
    /// `n_bins * n_bins` long. Rows tagged with outlier or reserved indices are not
    /// assigned to any bin.
    pub fn generate_bins(&mut self) -> Result<()> {
        if !self.bins.is_empty() {
            return Err(Error::AlreadyGenerated(self.bins.len()));
        }
        let n = self.n_bins;
        let index = self.data.require_bin_index()?;

        let mut rows_by_index: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (row, &bin_index) in index.iter().enumerate() {
            rows_by_index.entry(bin_index).or_default().push(row);
        }

        let slots = bin_index_sequence(n);
        let mut bins = Vec::with_capacity(slots.len());
        let mut n_empty = 0usize;
        let mut n_binned = 0usize;

        for slot in &slots {
            let target = self.options.target_column.as_str();
            match rows_by_index.get(&slot.index) {
                Some(rows) => {
                    n_binned += rows.len();
                    bins.push(Bin::new(slot.index, self.data.select(rows), target));
                }
                None => {
                    tracing::debug!(bin_index = slot.index, "empty bin");
                    n_empty += 1;
                    bins.push(Bin::placeholder(slot.index, &self.data, target));
                }
            }
        }

        // Boundaries, bottom -> top within each column, in the same order as above.
        let mut count = 0;
        for j in 0..n {
            for i in 0..n {
                bins[count].set_boundaries(self.grid.x_boundaries(j), self.grid.y_boundaries(i));
                count += 1;
            }
        }

        let n_unbinned = self.data.n_rows() - n_binned;
        if n_unbinned > 0 {
            tracing::debug!(n_unbinned, "rows outside the interior grid cells");
        }
        tracing::info!(n_bins = n, n_empty, n_binned, "bins generated");

        self.slots = slots;
        self.bins = bins;
        Ok(())
    }

    /// Whether [`Self::generate_bins`] has run.
    pub fn is_generated(&self) -> bool {
        !self.bins.is_empty()
    }

    /// Bins per axis.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Full row table.
    pub fn data(&self) -> &RowTable {
        &self.data
    }

    /// Grid geometry.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Column conventions.
    pub fn options(&self) -> &BinningOptions {
        &self.options
    }

    /// Bins in generation order (empty before generation).
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Mutable bins, for writing estimates in place.
    pub fn bins_mut(&mut self) -> &mut [Bin] {
        &mut self.bins
    }

    /// Slots matching [`Self::bins`] one to one.
    pub fn slots(&self) -> &[BinSlot] {
        &self.slots
    }

    /// `(slot, bin)` pairs in generation order.
    pub fn iter(&self) -> impl Iterator<Item = (&BinSlot, &Bin)> {
        self.slots.iter().zip(self.bins.iter())
    }

    /// Bin at grid `(column, row)`.
    pub fn bin(&self, column: usize, row: usize) -> Option<&Bin> {
        self.position(column, row).and_then(|k| self.bins.get(k))
    }

    /// Mutable bin at grid `(column, row)`.
    pub fn bin_mut(&mut self, column: usize, row: usize) -> Option<&mut Bin> {
        self.position(column, row).and_then(move |k| self.bins.get_mut(k))
    }

    fn position(&self, column: usize, row: usize) -> Option<usize> {
        (column < self.n_bins && row < self.n_bins).then(|| column * self.n_bins + row)
    }

    /// Reduce every bin to one number; result `[(column, row)]`, shape `(n_bins, n_bins)`.
    pub fn calculate_with<F>(&self, mut f: F) -> Result<DMatrix<f64>>
    where
        F: FnMut(&Bin) -> Result<f64>,
    {
        if self.bins.is_empty() {
            return Err(Error::NotInitialized(
                "no bins in collection; call generate_bins() first".into(),
            ));
        }
        let n = self.n_bins;
        let mut values = DMatrix::from_element(n, n, f64::NAN);
        let mut count = 0;
        for j in 0..n {
            for i in 0..n {
                values[(j, i)] = f(&self.bins[count])?;
                count += 1;
            }
        }
        Ok(values)
    }

    /// Per-bin mean of `parameter`, `NaN` for empty bins.
    ///
    /// The sign-flipped column (default `v_x`) is negated after averaging.
    pub fn calculate_values(&self, parameter: &str) -> Result<DMatrix<f64>> {
        if self.bins.is_empty() {
            return Err(Error::NotInitialized(
                "no bins in collection; call generate_bins() first".into(),
            ));
        }
        self.data.require_column(parameter)?;
        let sign = if parameter == self.options.sign_flipped_column { -1.0 } else { 1.0 };
        self.calculate_with(|bin| Ok(sign * bin.data().mean(parameter)?))
    }
}
