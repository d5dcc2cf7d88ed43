//! Columnar storage for measurement rows.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::covariance::{Covariance6, covariances_from_columns};
use crate::{Error, Result};

/// Name of the integer bin-index column.
pub const BIN_INDEX_COLUMN: &str = "Bin_index";

/// Measurement error attached to a single row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RowError {
    /// Full 6x6 covariance; the target variance is read from its diagonal.
    Covariance(Covariance6),
    /// Precomputed variance of the target component.
    TargetVariance(f64),
}

impl RowError {
    /// Measurement variance of the target component.
    #[inline]
    pub fn target_variance(&self) -> f64 {
        match self {
            RowError::Covariance(c) => c.target_variance(),
            RowError::TargetVariance(v) => *v,
        }
    }
}

/// Columnar table of measurement rows (Structure-of-Arrays).
///
/// Numeric columns are `f64`; the bin index is a dedicated integer column and per-row
/// measurement errors a dedicated typed column. Both are optional at construction and
/// checked by the operations that need them.
#[derive(Debug, Clone, Default)]
pub struct RowTable {
    n_rows: usize,
    column_names: Vec<String>,
    columns: Vec<Vec<f64>>,
    name_to_index: HashMap<String, usize>,
    bin_index: Option<Vec<i64>>,
    errors: Option<Vec<RowError>>,
}

impl RowTable {
    /// Create a table from named numeric columns.
    ///
    /// All columns must have the same length and unique names. A column named
    /// [`BIN_INDEX_COLUMN`] is moved into the integer bin-index column; its values must be
    /// finite integers.
    pub fn from_columns(columns: impl IntoIterator<Item = (String, Vec<f64>)>) -> Result<Self> {
        let mut column_names = Vec::new();
        let mut cols = Vec::new();
        let mut name_to_index = HashMap::new();
        let mut bin_index = None;
        let mut n_rows: Option<usize> = None;

        for (name, col) in columns {
            if let Some(n) = n_rows {
                if col.len() != n {
                    return Err(Error::Validation(format!(
                        "column length mismatch for '{name}': expected {n}, got {}",
                        col.len()
                    )));
                }
            } else {
                n_rows = Some(col.len());
            }

            if name == BIN_INDEX_COLUMN {
                bin_index = Some(bin_index_from_floats(&col)?);
                continue;
            }
            if name_to_index.contains_key(&name) {
                return Err(Error::Validation(format!("duplicate column '{name}'")));
            }
            name_to_index.insert(name.clone(), cols.len());
            column_names.push(name);
            cols.push(col);
        }

        Ok(Self {
            n_rows: n_rows.unwrap_or(0),
            column_names,
            columns: cols,
            name_to_index,
            bin_index,
            errors: None,
        })
    }

    /// Attach (or replace) the bin-index column.
    pub fn with_bin_index(mut self, bin_index: Vec<i64>) -> Result<Self> {
        self.check_len(BIN_INDEX_COLUMN, bin_index.len())?;
        self.bin_index = Some(bin_index);
        Ok(self)
    }

    /// Attach per-row measurement errors.
    pub fn with_errors(mut self, errors: Vec<RowError>) -> Result<Self> {
        self.check_len("errors", errors.len())?;
        self.errors = Some(errors);
        Ok(self)
    }

    /// Attach per-row 6x6 covariance matrices.
    pub fn with_covariances(self, covariances: Vec<Covariance6>) -> Result<Self> {
        self.with_errors(covariances.into_iter().map(RowError::Covariance).collect())
    }

    /// Attach per-row target variances.
    pub fn with_target_variances(self, variances: Vec<f64>) -> Result<Self> {
        self.with_errors(variances.into_iter().map(RowError::TargetVariance).collect())
    }

    /// Build covariance matrices from the `<param>_error` / `<a>_<b>_corr` columns and attach
    /// them.
    pub fn with_covariances_from_columns(self) -> Result<Self> {
        let covs = covariances_from_columns(&self)?;
        self.with_covariances(covs)
    }

    fn check_len(&self, what: &str, len: usize) -> Result<()> {
        if len != self.n_rows {
            return Err(Error::Validation(format!(
                "{what} length mismatch: expected {}, got {len}",
                self.n_rows
            )));
        }
        Ok(())
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Numeric column names in insertion order (excludes the bin index).
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Whether a numeric column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Numeric column by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.name_to_index.get(name).map(|&i| self.columns[i].as_slice())
    }

    /// Numeric column by name, failing with [`Error::MissingColumn`].
    pub fn require_column(&self, name: &str) -> Result<&[f64]> {
        self.column(name).ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    /// Bin-index column, if present.
    pub fn bin_index(&self) -> Option<&[i64]> {
        self.bin_index.as_deref()
    }

    /// Bin-index column, failing with [`Error::MissingColumn`].
    pub fn require_bin_index(&self) -> Result<&[i64]> {
        self.bin_index().ok_or_else(|| Error::MissingColumn(BIN_INDEX_COLUMN.to_string()))
    }

    /// Per-row measurement errors, if attached.
    pub fn errors(&self) -> Option<&[RowError]> {
        self.errors.as_deref()
    }

    /// Mean of a column; `NaN` for an empty table or if any value is `NaN`.
    pub fn mean(&self, name: &str) -> Result<f64> {
        let col = self.require_column(name)?;
        if col.is_empty() {
            return Ok(f64::NAN);
        }
        Ok(col.iter().sum::<f64>() / col.len() as f64)
    }

    /// New table holding `rows` (in the given order) of every column.
    pub fn select(&self, rows: &[usize]) -> Self {
        let pick_f = |col: &Vec<f64>| rows.iter().map(|&r| col[r]).collect::<Vec<_>>();
        Self {
            n_rows: rows.len(),
            column_names: self.column_names.clone(),
            columns: self.columns.iter().map(pick_f).collect(),
            name_to_index: self.name_to_index.clone(),
            bin_index: self.bin_index.as_ref().map(|b| rows.iter().map(|&r| b[r]).collect()),
            errors: self.errors.as_ref().map(|e| rows.iter().map(|&r| e[r]).collect()),
        }
    }

    /// Single-row table with this table's schema: every numeric field `NaN`, no error data,
    /// bin index set to `bin_index`.
    pub fn placeholder(&self, bin_index: i64) -> Self {
        Self {
            n_rows: 1,
            column_names: self.column_names.clone(),
            columns: vec![vec![f64::NAN]; self.columns.len()],
            name_to_index: self.name_to_index.clone(),
            bin_index: Some(vec![bin_index]),
            errors: None,
        }
    }
}

fn bin_index_from_floats(col: &[f64]) -> Result<Vec<i64>> {
    col.iter()
        .enumerate()
        .map(|(row, &v)| {
            if v.is_finite() && v.fract() == 0.0 {
                Ok(v as i64)
            } else {
                Err(Error::Validation(format!(
                    "{BIN_INDEX_COLUMN} must hold integers, got {v} at row {row}"
                )))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RowTable {
        RowTable::from_columns(vec![
            ("x".to_string(), vec![1.0, 2.0, 3.0]),
            ("v_phi".to_string(), vec![200.0, 210.0, 220.0]),
            (BIN_INDEX_COLUMN.to_string(), vec![5.0, 6.0, 5.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_bin_index_column_is_split_out() {
        let t = table();
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.column_names(), &["x".to_string(), "v_phi".to_string()]);
        assert!(!t.has_column(BIN_INDEX_COLUMN));
        assert_eq!(t.bin_index(), Some(&[5, 6, 5][..]));
    }

    #[test]
    fn test_non_integral_bin_index_rejected() {
        let r = RowTable::from_columns(vec![(BIN_INDEX_COLUMN.to_string(), vec![1.5])]);
        assert!(matches!(r, Err(Error::Validation(_))));
    }

    #[test]
    fn test_length_mismatch() {
        let r = RowTable::from_columns(vec![
            ("a".to_string(), vec![1.0, 2.0]),
            ("b".to_string(), vec![1.0]),
        ]);
        assert!(r.is_err());
        assert!(table().with_target_variances(vec![1.0]).is_err());
    }

    #[test]
    fn test_select_preserves_order() {
        let t = table().with_target_variances(vec![1.0, 2.0, 3.0]).unwrap();
        let s = t.select(&[2, 0]);
        assert_eq!(s.column("v_phi").unwrap(), &[220.0, 200.0]);
        assert_eq!(s.bin_index().unwrap(), &[5, 5]);
        let errs: Vec<f64> = s.errors().unwrap().iter().map(|e| e.target_variance()).collect();
        assert_eq!(errs, vec![3.0, 1.0]);
    }

    #[test]
    fn test_placeholder_row() {
        let p = table().with_target_variances(vec![1.0, 2.0, 3.0]).unwrap().placeholder(42);
        assert_eq!(p.n_rows(), 1);
        assert!(p.column("x").unwrap()[0].is_nan());
        assert_eq!(p.bin_index().unwrap(), &[42]);
        assert!(p.errors().is_none());
        assert!(p.mean("v_phi").unwrap().is_nan());
    }

    #[test]
    fn test_missing_column() {
        let t = RowTable::from_columns(vec![("x".to_string(), vec![1.0])]).unwrap();
        assert!(matches!(t.require_column("y"), Err(Error::MissingColumn(_))));
        assert!(matches!(t.require_bin_index(), Err(Error::MissingColumn(ref c)) if c == "Bin_index"));
        assert!((t.mean("x").unwrap() - 1.0).abs() < 1e-15);
    }
}
