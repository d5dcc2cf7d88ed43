//! Linear bin-index convention of the rectangular 2D histogram.
//!
//! Each axis with `n` cells gets `n + 2` slots: slot `0` collects values below the first
//! edge, slots `1..=n` are the cells and slot `n + 1` collects values above the last edge.
//! The linear index of cell `(column, row)` (column along x, row along y) is
//! `ix * (n_y + 2) + iy` with 1-based `ix`/`iy`. For a square grid of `n` cells per axis the
//! interior therefore spans `[n + 3, (n + 3) * n]`, column-major, with two unused slots
//! between consecutive columns.

use gb_core::{Error, Result};

use crate::grid::Grid;

/// One interior cell in generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinSlot {
    /// Linear bin index.
    pub index: i64,
    /// Column (x cell, 0-based).
    pub column: usize,
    /// Row within the column (y cell, 0-based).
    pub row: usize,
}

/// Index of the first interior cell.
pub fn first_bin_index(n_bins: usize) -> i64 {
    n_bins as i64 + 3
}

/// Index of the last interior cell.
pub fn last_bin_index(n_bins: usize) -> i64 {
    (n_bins as i64 + 3) * n_bins as i64
}

/// Interior cells of an `n_bins x n_bins` grid in generation order.
///
/// Walks indices from [`first_bin_index`] to [`last_bin_index`] inclusive; after every
/// `n_bins` emitted indices the next two are skipped.
pub fn bin_index_sequence(n_bins: usize) -> Vec<BinSlot> {
    let max_index = last_bin_index(n_bins);
    let mut index = first_bin_index(n_bins);
    let mut row = 0usize;
    let mut column = 0usize;
    let mut out = Vec::with_capacity(n_bins * n_bins);

    while index <= max_index {
        if row == n_bins {
            row = 0;
            column += 1;
            index += 2;
            continue;
        }
        out.push(BinSlot { index, column, row });
        row += 1;
        index += 1;
    }
    out
}

/// Linear index of cell `(column, row)` in an `n_bins x n_bins` grid.
#[inline]
pub fn slot_index(n_bins: usize, column: usize, row: usize) -> i64 {
    ((column + 1) * (n_bins + 2) + row + 1) as i64
}

/// Inverse of [`slot_index`]; `None` for outlier or reserved slots.
pub fn slot_of_index(n_bins: usize, index: i64) -> Option<(usize, usize)> {
    if index < 0 {
        return None;
    }
    let stride = (n_bins + 2) as i64;
    let ix = index / stride;
    let iy = index % stride;
    let n = n_bins as i64;
    if (1..=n).contains(&ix) && (1..=n).contains(&iy) {
        Some(((ix - 1) as usize, (iy - 1) as usize))
    } else {
        None
    }
}

/// 1-based slot of `value` along an axis with sorted `edges`.
///
/// Cells are half-open `[e_k, e_{k+1})` except the last, which includes its right edge.
/// Values below the first edge (and `NaN`) map to `0`, values above the last edge to
/// `edges.len()`.
pub fn axis_slot(value: f64, edges: &[f64]) -> usize {
    let n_cells = edges.len().saturating_sub(1);
    if value.is_nan() {
        return 0;
    }
    if let Some(&last) = edges.last()
        && value == last
    {
        return n_cells;
    }
    edges.partition_point(|&e| e <= value)
}

/// Linear bin index of point `(x, y)` on `grid`.
pub fn assign_bin_index(x: f64, y: f64, grid: &Grid) -> i64 {
    let x_edges = grid.x_edges();
    let y_edges = grid.y_edges();
    let ix = axis_slot(x, &x_edges);
    let iy = axis_slot(y, &y_edges);
    (ix * (y_edges.len() + 1) + iy) as i64
}

/// Linear bin indices for paired coordinate columns.
pub fn assign_bin_indices(xs: &[f64], ys: &[f64], grid: &Grid) -> Result<Vec<i64>> {
    if xs.len() != ys.len() {
        return Err(Error::Validation(format!(
            "coordinate length mismatch: x has {}, y has {}",
            xs.len(),
            ys.len()
        )));
    }
    let x_edges = grid.x_edges();
    let y_edges = grid.y_edges();
    let stride = y_edges.len() + 1;
    Ok(xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| (axis_slot(x, &x_edges) * stride + axis_slot(y, &y_edges)) as i64)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_n2() {
        // 5, 6 | skip 7, 8 | 9, 10
        let seq = bin_index_sequence(2);
        let idx: Vec<i64> = seq.iter().map(|s| s.index).collect();
        assert_eq!(idx, vec![5, 6, 9, 10]);
        assert_eq!((seq[2].column, seq[2].row), (1, 0));
    }

    #[test]
    fn test_sequence_n3_skips() {
        let idx: Vec<i64> = bin_index_sequence(3).iter().map(|s| s.index).collect();
        assert_eq!(idx, vec![6, 7, 8, 11, 12, 13, 16, 17, 18]);
    }

    #[test]
    fn test_sequence_bounds_and_len() {
        for n in 1..20 {
            let seq = bin_index_sequence(n);
            assert_eq!(seq.len(), n * n, "n={n}");
            assert_eq!(seq.first().unwrap().index, first_bin_index(n));
            assert_eq!(seq.last().unwrap().index, last_bin_index(n));
            for s in &seq {
                assert_eq!(slot_index(n, s.column, s.row), s.index);
                assert_eq!(slot_of_index(n, s.index), Some((s.column, s.row)));
            }
        }
    }

    #[test]
    fn test_sequence_is_column_major() {
        let seq = bin_index_sequence(4);
        for (k, s) in seq.iter().enumerate() {
            assert_eq!(s.column, k / 4);
            assert_eq!(s.row, k % 4);
        }
    }

    #[test]
    fn test_sequence_empty_for_zero() {
        assert!(bin_index_sequence(0).is_empty());
    }

    #[test]
    fn test_reserved_slots_are_not_cells() {
        // n=3: 9 and 10 sit between the first and second column.
        assert_eq!(slot_of_index(3, 9), None);
        assert_eq!(slot_of_index(3, 10), None);
        assert_eq!(slot_of_index(3, 0), None);
        assert_eq!(slot_of_index(3, -1), None);
    }

    #[test]
    fn test_axis_slot_edges() {
        let edges = [0.0, 1.0, 2.0];
        assert_eq!(axis_slot(-0.1, &edges), 0);
        assert_eq!(axis_slot(0.0, &edges), 1);
        assert_eq!(axis_slot(0.999, &edges), 1);
        assert_eq!(axis_slot(1.0, &edges), 2);
        assert_eq!(axis_slot(2.0, &edges), 2);
        assert_eq!(axis_slot(2.1, &edges), 3);
        assert_eq!(axis_slot(f64::NAN, &edges), 0);
    }

    #[test]
    fn test_assign_matches_sequence() {
        let grid = Grid::uniform((0.0, 3.0), (0.0, 3.0), 3).unwrap();
        for s in bin_index_sequence(3) {
            let x = s.column as f64 + 0.5;
            let y = s.row as f64 + 0.5;
            assert_eq!(assign_bin_index(x, y, &grid), s.index);
        }
        // Outliers land outside the interior range.
        let out = assign_bin_index(-1.0, 0.5, &grid);
        assert_eq!(slot_of_index(3, out), None);
    }

    #[test]
    fn test_assign_length_mismatch() {
        let grid = Grid::uniform((0.0, 1.0), (0.0, 1.0), 1).unwrap();
        assert!(assign_bin_indices(&[0.5], &[], &grid).is_err());
        assert_eq!(assign_bin_indices(&[0.5], &[0.5], &grid).unwrap(), vec![4]);
    }
}
