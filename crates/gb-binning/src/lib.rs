//! # gb-binning
//!
//! Square 2D spatial binning compatible with the linear bin-index convention of a
//! rectangular histogram (`binned_statistic_2d`-style).
//!
//! ## Architecture
//!
//! Rows arrive pre-tagged with a bin index ([`gb_core::RowTable`]). A [`BinCollection`]
//! walks the interior cell indices in column-major order ([`bin_index_sequence`]), wraps
//! the matching rows of each index in a [`Bin`] (a placeholder when an index has no rows),
//! then assigns each bin its rectangle from the [`Grid`] meshes.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Single bin: rows, geometry, estimate and likelihood.
pub mod bin;
/// Bin generation and per-bin reductions.
pub mod collection;
/// Vertex meshes.
pub mod grid;
/// Bin-index convention, traversal order and index assignment.
pub mod index;
/// Heteroscedastic Gaussian likelihood.
pub mod likelihood;

pub use bin::{Bin, BinEstimate};
pub use collection::{BinCollection, BinningOptions};
pub use grid::Grid;
pub use index::{BinSlot, assign_bin_index, assign_bin_indices, bin_index_sequence};
pub use likelihood::{heteroscedastic_log_likelihood, profile_mean};
