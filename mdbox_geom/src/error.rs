// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry errors.

use crate::grid::MAX_GRID_CELLS;
use crate::types::MAX_DIMENSIONS;

/// Errors raised while building coordinates, extents, or grids.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum GeomError {
    /// The number of dimensions is zero or above [`MAX_DIMENSIONS`].
    #[error("{nd} dimensions requested, supported range is 1..={max}", max = MAX_DIMENSIONS)]
    DimensionCount {
        /// Requested dimension count.
        nd: usize,
    },
    /// Two values that must agree on their dimension count do not.
    #[error("expected {expected} dimensions, found {found}")]
    DimensionMismatch {
        /// Dimension count of the receiver.
        expected: usize,
        /// Dimension count of the argument.
        found: usize,
    },
    /// An interval bound is not finite or `min >= max`.
    #[error("interval for dimension {dim} is invalid: [{min}, {max})")]
    InvalidInterval {
        /// Offending dimension.
        dim: usize,
        /// Lower bound as given.
        min: f32,
        /// Upper bound as given.
        max: f32,
    },
    /// A split factor of zero was requested for a dimension.
    #[error("split factor for dimension {dim} is zero")]
    ZeroSplitFactor {
        /// Offending dimension.
        dim: usize,
    },
    /// Every split factor is one, so the grid would have a single cell.
    #[error("split factors yield a single cell")]
    DegenerateSplit,
    /// The product of split factors exceeds [`MAX_GRID_CELLS`].
    #[error("grid would exceed {max} cells", max = MAX_GRID_CELLS)]
    TooManyCells,
    /// An interval is too narrow in `f32` to hold the requested number of cells.
    #[error("dimension {dim} is too narrow for {cells} cells")]
    DegenerateGrid {
        /// Offending dimension.
        dim: usize,
        /// Requested cell count along that dimension.
        cells: usize,
    },
}
