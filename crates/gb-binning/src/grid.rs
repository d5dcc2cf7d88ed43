//! Vertex meshes of the rectangular grid.

use gb_core::{Error, Result};
use nalgebra::DMatrix;

/// Pair of vertex meshes in `meshgrid` layout.
///
/// `xx[(i, j)]` is the x-coordinate and `yy[(i, j)]` the y-coordinate of vertex
/// `(row i, column j)`. Both meshes have shape `(n_rows + 1, n_columns + 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    xx: DMatrix<f64>,
    yy: DMatrix<f64>,
}

impl Grid {
    /// Wrap meshes produced elsewhere. Shapes must match and span at least one cell.
    pub fn from_meshes(xx: DMatrix<f64>, yy: DMatrix<f64>) -> Result<Self> {
        if xx.shape() != yy.shape() {
            return Err(Error::InvalidConfiguration(format!(
                "mesh shape mismatch: XX is {:?}, YY is {:?}",
                xx.shape(),
                yy.shape()
            )));
        }
        if xx.nrows() < 2 || xx.ncols() < 2 {
            return Err(Error::InvalidConfiguration(format!(
                "mesh must be at least 2x2 vertices, got {:?}",
                xx.shape()
            )));
        }
        if xx.iter().chain(yy.iter()).any(|v| !v.is_finite()) {
            return Err(Error::InvalidConfiguration("mesh contains non-finite vertices".into()));
        }
        Ok(Self { xx, yy })
    }

    /// Build the meshes from per-axis edges (`XX[i][j] = x_edges[j]`, `YY[i][j] = y_edges[i]`).
    pub fn from_edges(x_edges: &[f64], y_edges: &[f64]) -> Result<Self> {
        check_edges("x", x_edges)?;
        check_edges("y", y_edges)?;
        let (nr, nc) = (y_edges.len(), x_edges.len());
        let xx = DMatrix::from_fn(nr, nc, |_, j| x_edges[j]);
        let yy = DMatrix::from_fn(nr, nc, |i, _| y_edges[i]);
        Ok(Self { xx, yy })
    }

    /// Evenly spaced `n_bins x n_bins` grid over the given ranges.
    pub fn uniform(x_range: (f64, f64), y_range: (f64, f64), n_bins: usize) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::InvalidConfiguration("n_bins must be > 0".into()));
        }
        let edges = |(lo, hi): (f64, f64)| -> Vec<f64> {
            let step = (hi - lo) / n_bins as f64;
            (0..=n_bins).map(|k| if k == n_bins { hi } else { lo + step * k as f64 }).collect()
        };
        Self::from_edges(&edges(x_range), &edges(y_range))
    }

    /// Vertex x-coordinates.
    pub fn xx(&self) -> &DMatrix<f64> {
        &self.xx
    }

    /// Vertex y-coordinates.
    pub fn yy(&self) -> &DMatrix<f64> {
        &self.yy
    }

    /// Number of cells along x.
    pub fn n_columns(&self) -> usize {
        self.xx.ncols() - 1
    }

    /// Number of cells along y.
    pub fn n_rows(&self) -> usize {
        self.yy.nrows() - 1
    }

    /// x edges, read along the first mesh row.
    pub fn x_edges(&self) -> Vec<f64> {
        self.xx.row(0).iter().copied().collect()
    }

    /// y edges, read along the first mesh column.
    pub fn y_edges(&self) -> Vec<f64> {
        self.yy.column(0).iter().copied().collect()
    }

    /// `(XX[0][j], XX[0][j+1])`.
    pub fn x_boundaries(&self, column: usize) -> (f64, f64) {
        (self.xx[(0, column)], self.xx[(0, column + 1)])
    }

    /// `(YY.T[0][i], YY.T[0][i+1])`.
    pub fn y_boundaries(&self, row: usize) -> (f64, f64) {
        (self.yy[(row, 0)], self.yy[(row + 1, 0)])
    }

    /// Full extent `((x_min, x_max), (y_min, y_max))` along the reference row/column.
    pub fn extent(&self) -> ((f64, f64), (f64, f64)) {
        let (nr, nc) = self.xx.shape();
        ((self.xx[(0, 0)], self.xx[(0, nc - 1)]), (self.yy[(0, 0)], self.yy[(nr - 1, 0)]))
    }

    /// Fail unless the grid has exactly `n_bins` cells along each axis.
    pub fn ensure_square(&self, n_bins: usize) -> Result<()> {
        let expected = (n_bins + 1, n_bins + 1);
        if self.xx.shape() != expected {
            return Err(Error::InvalidConfiguration(format!(
                "grid has {:?} vertices, expected {:?} for n_bins={n_bins}",
                self.xx.shape(),
                expected
            )));
        }
        Ok(())
    }
}

fn check_edges(axis: &str, edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(Error::InvalidConfiguration(format!(
            "{axis} edges need at least 2 values, got {}",
            edges.len()
        )));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(Error::InvalidConfiguration(format!("{axis} edges must be finite")));
    }
    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::InvalidConfiguration(format!(
            "{axis} edges must be strictly increasing"
        )));
    }
    Ok(())
}
