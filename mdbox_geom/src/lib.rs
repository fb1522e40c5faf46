// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! MD Box Geom: dimension-capped geometry for N-dimensional box trees.
//!
//! - [`Coords`]: a point with up to [`MAX_DIMENSIONS`] coordinates stored inline, so
//!   one type serves every dimension count without per-point allocation.
//! - [`Interval`] and [`Extents`]: half-open `[min, max)` boxes with containment and
//!   overlap tests.
//! - [`GridShape`] and [`RegularGrid`]: regular subdivision of extents into cells,
//!   with O(nd) point-to-cell lookup and pruned enumeration of the cells that
//!   overlap a query region.
//!
//! # Example
//!
//! ```rust
//! use mdbox_geom::{Extents, GridShape, RegularGrid};
//!
//! let extents = Extents::new(&[(0.0, 4.0), (0.0, 4.0)]).unwrap();
//! let grid = RegularGrid::new(extents, GridShape::uniform(2, 2).unwrap()).unwrap();
//!
//! let cell = grid.cell_of(&[3.0, 0.5]).unwrap();
//! assert_eq!(cell, 1);
//! assert!(grid.cell_extents(cell).contains(&[3.0, 0.5]));
//!
//! let region = Extents::new(&[(1.5, 2.5), (0.0, 1.0)]).unwrap();
//! assert_eq!(grid.cells_overlapping(&region).count(), 2);
//! ```
//!
//! ### Float semantics
//!
//! Coordinates are `f32`. Intervals reject non-finite bounds; NaN coordinates are
//! never contained in anything. Aggregate quantities (volume) widen to `f64`.

#![no_std]

#[cfg(test)]
extern crate alloc;

pub mod error;
pub mod grid;
pub mod types;

pub use error::GeomError;
pub use grid::{CellRange, GridShape, MAX_GRID_CELLS, RegularGrid};
pub use types::{Coords, Extents, Interval, MAX_DIMENSIONS, UNBOUNDED_LIMIT};
