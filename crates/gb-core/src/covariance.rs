//! Per-row covariance of the six astrometric/kinematic parameters.
//!
//! Parameter order is `(ra, dec, parallax, pmra, pmdec, radial_velocity)`. After the
//! reference-frame transformation applied upstream the same slots hold the transformed
//! phase-space coordinates, and slot [`TARGET_VARIANCE_INDEX`] carries the variance of the
//! target velocity component (`v_phi`).

use nalgebra::Matrix6;
use serde::{Deserialize, Serialize};

use crate::table::RowTable;
use crate::{Error, Result};

/// Diagonal slot holding the variance of the target velocity component.
pub const TARGET_VARIANCE_INDEX: usize = 4;

/// Astrometric parameter names, in covariance order (radial velocity is slot 5).
pub const ASTROMETRIC_PARAMETERS: [&str; 5] = ["ra", "dec", "parallax", "pmra", "pmdec"];

/// `ra_error` / `dec_error` are in mas while positions are in degrees.
const MAS_PER_DEGREE: f64 = 3.6e6;

/// Symmetric positive-semidefinite 6x6 covariance of one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Covariance6(Matrix6<f64>);

impl Covariance6 {
    /// Wrap an existing matrix.
    pub fn new(matrix: Matrix6<f64>) -> Self {
        Self(matrix)
    }

    /// Build from row-major nested arrays.
    pub fn from_rows(rows: [[f64; 6]; 6]) -> Self {
        Self(Matrix6::from_fn(|i, j| rows[i][j]))
    }

    /// Diagonal covariance (uncorrelated parameters) from variances.
    pub fn from_variances(variances: [f64; 6]) -> Self {
        let mut m = Matrix6::zeros();
        for (i, v) in variances.into_iter().enumerate() {
            m[(i, i)] = v;
        }
        Self(m)
    }

    /// Element `(i, j)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.0[(i, j)]
    }

    /// Variance of parameter `i`.
    #[inline]
    pub fn variance(&self, i: usize) -> f64 {
        self.0[(i, i)]
    }

    /// Variance of the target velocity component.
    #[inline]
    pub fn target_variance(&self) -> f64 {
        self.variance(TARGET_VARIANCE_INDEX)
    }

    /// Underlying matrix.
    pub fn matrix(&self) -> &Matrix6<f64> {
        &self.0
    }

    /// Whether `|C_ij - C_ji| <= tol` for all pairs.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        (0..6).all(|i| (0..i).all(|j| (self.0[(i, j)] - self.0[(j, i)]).abs() <= tol))
    }
}

impl From<Matrix6<f64>> for Covariance6 {
    fn from(m: Matrix6<f64>) -> Self {
        Self(m)
    }
}

/// Catalogue errors and correlation coefficients for one source.
///
/// Position errors (`ra_error`, `dec_error`) are in mas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AstrometricErrors {
    /// Right ascension error (mas).
    pub ra_error: f64,
    /// Declination error (mas).
    pub dec_error: f64,
    /// Parallax error (mas).
    pub parallax_error: f64,
    /// Proper motion in right ascension error (mas/yr).
    pub pmra_error: f64,
    /// Proper motion in declination error (mas/yr).
    pub pmdec_error: f64,
    /// Radial velocity error (km/s).
    pub radial_velocity_error: f64,
    /// Correlation between `ra` and `dec`.
    pub ra_dec_corr: f64,
    /// Correlation between `ra` and `parallax`.
    pub ra_parallax_corr: f64,
    /// Correlation between `ra` and `pmra`.
    pub ra_pmra_corr: f64,
    /// Correlation between `ra` and `pmdec`.
    pub ra_pmdec_corr: f64,
    /// Correlation between `dec` and `parallax`.
    pub dec_parallax_corr: f64,
    /// Correlation between `dec` and `pmra`.
    pub dec_pmra_corr: f64,
    /// Correlation between `dec` and `pmdec`.
    pub dec_pmdec_corr: f64,
    /// Correlation between `parallax` and `pmra`.
    pub parallax_pmra_corr: f64,
    /// Correlation between `parallax` and `pmdec`.
    pub parallax_pmdec_corr: f64,
    /// Correlation between `pmra` and `pmdec`.
    pub pmra_pmdec_corr: f64,
}

impl AstrometricErrors {
    /// Read all error and correlation columns for `row` from a table.
    ///
    /// Columns are named `<param>_error` and `<a>_<b>_corr` (with `a` before `b` in
    /// [`ASTROMETRIC_PARAMETERS`] order).
    pub fn from_table_row(table: &RowTable, row: usize) -> Result<Self> {
        if row >= table.n_rows() {
            return Err(Error::Validation(format!(
                "row {row} out of range for table with {} rows",
                table.n_rows()
            )));
        }
        let get = |name: &str| -> Result<f64> { Ok(table.require_column(name)?[row]) };
        Ok(Self {
            ra_error: get("ra_error")?,
            dec_error: get("dec_error")?,
            parallax_error: get("parallax_error")?,
            pmra_error: get("pmra_error")?,
            pmdec_error: get("pmdec_error")?,
            radial_velocity_error: get("radial_velocity_error")?,
            ra_dec_corr: get("ra_dec_corr")?,
            ra_parallax_corr: get("ra_parallax_corr")?,
            ra_pmra_corr: get("ra_pmra_corr")?,
            ra_pmdec_corr: get("ra_pmdec_corr")?,
            dec_parallax_corr: get("dec_parallax_corr")?,
            dec_pmra_corr: get("dec_pmra_corr")?,
            dec_pmdec_corr: get("dec_pmdec_corr")?,
            parallax_pmra_corr: get("parallax_pmra_corr")?,
            parallax_pmdec_corr: get("parallax_pmdec_corr")?,
            pmra_pmdec_corr: get("pmra_pmdec_corr")?,
        })
    }

    fn error(&self, i: usize) -> f64 {
        match i {
            0 => self.ra_error / MAS_PER_DEGREE,
            1 => self.dec_error / MAS_PER_DEGREE,
            2 => self.parallax_error,
            3 => self.pmra_error,
            4 => self.pmdec_error,
            _ => self.radial_velocity_error,
        }
    }

    /// Correlation between astrometric parameters `i < j < 5`.
    fn correlation(&self, i: usize, j: usize) -> f64 {
        match (i, j) {
            (0, 1) => self.ra_dec_corr,
            (0, 2) => self.ra_parallax_corr,
            (0, 3) => self.ra_pmra_corr,
            (0, 4) => self.ra_pmdec_corr,
            (1, 2) => self.dec_parallax_corr,
            (1, 3) => self.dec_pmra_corr,
            (1, 4) => self.dec_pmdec_corr,
            (2, 3) => self.parallax_pmra_corr,
            (2, 4) => self.parallax_pmdec_corr,
            (3, 4) => self.pmra_pmdec_corr,
            _ => 0.0,
        }
    }

    /// Assemble the covariance matrix.
    ///
    /// Radial velocity is treated as uncorrelated with the astrometric parameters.
    pub fn covariance(&self) -> Covariance6 {
        let mut c = Matrix6::zeros();
        for i in 0..6 {
            let e = self.error(i);
            c[(i, i)] = e * e;
        }
        let n = ASTROMETRIC_PARAMETERS.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let v = self.correlation(i, j) * (c[(i, i)] * c[(j, j)]).sqrt();
                c[(i, j)] = v;
                c[(j, i)] = v;
            }
        }
        Covariance6(c)
    }
}

/// Build one covariance matrix per table row from the named error/correlation columns.
pub fn covariances_from_columns(table: &RowTable) -> Result<Vec<Covariance6>> {
    (0..table.n_rows())
        .map(|row| AstrometricErrors::from_table_row(table, row).map(|e| e.covariance()))
        .collect()
}
