// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Regular grid subdivision of an [`Extents`] box.
//!
//! A [`GridShape`] fixes how many cells each dimension is cut into; a
//! [`RegularGrid`] lays that shape over concrete extents. Cells are numbered
//! with dimension 0 varying fastest.

use crate::error::GeomError;
use crate::types::{Extents, MAX_DIMENSIONS, check_nd};

/// Largest number of cells a single grid may have.
///
/// The cell count is the product of the per-dimension split factors, so it
/// grows exponentially with the dimension count: nine dimensions split in two
/// already give 512 cells.
pub const MAX_GRID_CELLS: usize = 1 << 24;

/// Per-dimension split factors plus the derived strides.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GridShape {
    split: [usize; MAX_DIMENSIONS],
    strides: [usize; MAX_DIMENSIONS],
    nd: usize,
    total: usize,
}

impl GridShape {
    /// Build a shape from one split factor per dimension.
    pub fn new(split: &[usize]) -> Result<Self, GeomError> {
        let nd = split.len();
        check_nd(nd)?;
        let mut out = [1; MAX_DIMENSIONS];
        let mut strides = [0; MAX_DIMENSIONS];
        let mut total = 1_usize;
        for (dim, &n) in split.iter().enumerate() {
            if n == 0 {
                return Err(GeomError::ZeroSplitFactor { dim });
            }
            out[dim] = n;
            strides[dim] = total;
            total = total
                .checked_mul(n)
                .filter(|&t| t <= MAX_GRID_CELLS)
                .ok_or(GeomError::TooManyCells)?;
        }
        if total == 1 {
            return Err(GeomError::DegenerateSplit);
        }
        Ok(Self {
            split: out,
            strides,
            nd,
            total,
        })
    }

    /// The same split factor along every one of `nd` dimensions.
    pub fn uniform(nd: usize, factor: usize) -> Result<Self, GeomError> {
        check_nd(nd)?;
        Self::new(&[factor; MAX_DIMENSIONS][..nd])
    }

    /// Number of dimensions.
    #[inline]
    pub const fn nd(&self) -> usize {
        self.nd
    }

    /// Split factors of the used dimensions.
    #[inline]
    pub fn split(&self) -> &[usize] {
        &self.split[..self.nd]
    }

    /// Total number of cells.
    #[inline]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Linear index of a per-dimension cell position.
    #[inline]
    pub fn linear_index(&self, cell: &[usize]) -> usize {
        debug_assert_eq!(cell.len(), self.nd, "cell position has wrong arity");
        cell.iter().zip(&self.strides).map(|(c, s)| c * s).sum()
    }

    /// Per-dimension cell position of a linear index.
    pub fn position(&self, mut index: usize) -> [usize; MAX_DIMENSIONS] {
        let mut out = [0; MAX_DIMENSIONS];
        for (dim, slot) in out.iter_mut().enumerate().take(self.nd) {
            *slot = index % self.split[dim];
            index /= self.split[dim];
        }
        out
    }
}

/// A [`GridShape`] laid over concrete extents.
///
/// Cell edges are computed the same way for lookups and for
/// [`cell_extents`](Self::cell_extents), so a point found in cell `i` is always
/// contained in `cell_extents(i)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RegularGrid {
    extents: Extents,
    shape: GridShape,
    widths: [f32; MAX_DIMENSIONS],
}

impl RegularGrid {
    /// Lay `shape` over `extents`.
    ///
    /// Fails when the dimension counts differ or when an interval is too narrow
    /// for `f32` to give every cell a non-empty width.
    pub fn new(extents: Extents, shape: GridShape) -> Result<Self, GeomError> {
        if extents.nd() != shape.nd() {
            return Err(GeomError::DimensionMismatch {
                expected: extents.nd(),
                found: shape.nd(),
            });
        }
        let mut widths = [0.0; MAX_DIMENSIONS];
        for (dim, iv) in extents.intervals().iter().enumerate() {
            widths[dim] = iv.width() / shape.split[dim] as f32;
        }
        let grid = Self {
            extents,
            shape,
            widths,
        };
        for dim in 0..shape.nd() {
            let cells = shape.split[dim];
            if (0..cells).any(|i| grid.edge(dim, i) >= grid.edge(dim, i + 1)) {
                return Err(GeomError::DegenerateGrid { dim, cells });
            }
        }
        Ok(grid)
    }

    /// The covered extents.
    #[inline]
    pub const fn extents(&self) -> &Extents {
        &self.extents
    }

    /// The grid shape.
    #[inline]
    pub const fn shape(&self) -> &GridShape {
        &self.shape
    }

    /// Number of cells.
    #[inline]
    pub const fn len(&self) -> usize {
        self.shape.total
    }

    /// Always false; a grid has at least two cells.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        false
    }

    #[inline]
    fn edge(&self, dim: usize, i: usize) -> f32 {
        let iv = self.extents.intervals()[dim];
        if i == 0 {
            iv.min()
        } else if i >= self.shape.split[dim] {
            iv.max()
        } else {
            iv.min() + self.widths[dim] * i as f32
        }
    }

    /// Cell index along `dim` for a coordinate already clamped into the extents.
    fn axis_cell(&self, dim: usize, x: f32) -> usize {
        let n = self.shape.split[dim];
        let t = (x - self.extents.intervals()[dim].min()) / self.widths[dim];
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Saturating float to index cast; the result is clamped and corrected below."
        )]
        let mut i = (t as usize).min(n - 1);
        while i > 0 && x < self.edge(dim, i) {
            i -= 1;
        }
        while i + 1 < n && x >= self.edge(dim, i + 1) {
            i += 1;
        }
        i
    }

    /// Extents of the cell with linear index `index`.
    pub fn cell_extents(&self, index: usize) -> Extents {
        debug_assert!(index < self.len(), "cell index out of range");
        let pos = self.shape.position(index);
        let mut bounds = [(0.0_f32, 0.0_f32); MAX_DIMENSIONS];
        for dim in 0..self.shape.nd {
            bounds[dim] = (self.edge(dim, pos[dim]), self.edge(dim, pos[dim] + 1));
        }
        // Edges are strictly increasing (checked in `new`), so this cannot fail.
        Extents::new(&bounds[..self.shape.nd]).unwrap_or(self.extents)
    }

    /// Linear index of the cell containing `point`, or `None` when the point is
    /// outside the grid. Costs O(nd).
    pub fn cell_of(&self, point: &[f32]) -> Option<usize> {
        if !self.extents.contains(point) {
            return None;
        }
        let mut index = 0;
        for (dim, &x) in point.iter().enumerate() {
            index += self.axis_cell(dim, x) * self.shape.strides[dim];
        }
        Some(index)
    }

    /// Linear indices of every cell overlapping `region`.
    ///
    /// Only the overlapping index range is walked; the cost is proportional to
    /// the number of yielded cells, not the grid size.
    pub fn cells_overlapping(&self, region: &Extents) -> CellRange {
        let mut range = CellRange {
            shape: self.shape,
            lo: [0; MAX_DIMENSIONS],
            hi: [0; MAX_DIMENSIONS],
            cur: [0; MAX_DIMENSIONS],
            done: !self.extents.intersects(region),
        };
        if range.done {
            return range;
        }
        for (dim, (own, query)) in self
            .extents
            .intervals()
            .iter()
            .zip(region.intervals())
            .enumerate()
        {
            let lo_x = own.min().max(query.min());
            let hi_x = own.max().min(query.max());
            let lo = self.axis_cell(dim, lo_x);
            let mut hi = self.axis_cell(dim, hi_x);
            if hi > lo && self.edge(dim, hi) >= hi_x {
                hi -= 1;
            }
            range.lo[dim] = lo;
            range.hi[dim] = hi;
        }
        range.cur = range.lo;
        range
    }
}

/// Iterator over the linear indices of a rectangular block of grid cells.
#[derive(Clone, Debug)]
pub struct CellRange {
    shape: GridShape,
    lo: [usize; MAX_DIMENSIONS],
    hi: [usize; MAX_DIMENSIONS],
    cur: [usize; MAX_DIMENSIONS],
    done: bool,
}

impl Iterator for CellRange {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        let nd = self.shape.nd;
        let out = self.shape.linear_index(&self.cur[..nd]);
        self.done = true;
        for dim in 0..nd {
            if self.cur[dim] < self.hi[dim] {
                self.cur[dim] += 1;
                self.done = false;
                break;
            }
            self.cur[dim] = self.lo[dim];
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn square(min: f32, max: f32) -> Extents {
        Extents::new(&[(min, max), (min, max)]).unwrap()
    }

    #[test]
    fn shape_validation() {
        assert_eq!(
            GridShape::new(&[2, 0, 2]),
            Err(GeomError::ZeroSplitFactor { dim: 1 })
        );
        assert_eq!(GridShape::new(&[1, 1]), Err(GeomError::DegenerateSplit));
        assert_eq!(GridShape::uniform(9, 100), Err(GeomError::TooManyCells));
        let s = GridShape::new(&[2, 3, 4]).unwrap();
        assert_eq!(s.total(), 24);
        assert_eq!(s.split(), &[2, 3, 4]);
        assert_eq!(GridShape::uniform(9, 2).unwrap().total(), 512);
    }

    #[test]
    fn position_round_trips_linear_index() {
        let s = GridShape::new(&[3, 2, 5]).unwrap();
        for i in 0..s.total() {
            let p = s.position(i);
            assert_eq!(s.linear_index(&p[..3]), i);
        }
    }

    #[test]
    fn cells_tile_the_extents() {
        let grid = RegularGrid::new(square(0.0, 4.0), GridShape::uniform(2, 2).unwrap()).unwrap();
        assert_eq!(grid.cell_extents(0), square(0.0, 2.0));
        assert_eq!(
            grid.cell_extents(3),
            Extents::new(&[(2.0, 4.0), (2.0, 4.0)]).unwrap()
        );
        let total: f64 = (0..grid.len()).map(|i| grid.cell_extents(i).volume()).sum();
        assert_eq!(total, grid.extents().volume());
    }

    #[test]
    fn cell_of_agrees_with_cell_extents() {
        let e = Extents::new(&[(-1.3, 2.9), (0.1, 0.7), (10.0, 1000.0)]).unwrap();
        let grid = RegularGrid::new(e, GridShape::new(&[7, 3, 11]).unwrap()).unwrap();
        let mut state = 0x1234_5678_9abc_def0_u64;
        for _ in 0..2000 {
            let mut p = [0.0_f32; 3];
            for (dim, v) in p.iter_mut().enumerate() {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let t = (state >> 40) as f32 / (1u64 << 24) as f32;
                let iv = e.interval(dim).unwrap();
                *v = iv.min() + t * iv.width();
            }
            if !e.contains(&p) {
                continue;
            }
            let cell = grid.cell_of(&p).expect("contained point has a cell");
            assert!(
                grid.cell_extents(cell).contains(&p),
                "lookup disagrees at {p:?}"
            );
        }
        // The lower corner is cell 0; the upper bound is excluded.
        let cell = grid.cell_of(&[e.interval(0).unwrap().min(), 0.1, 10.0]).unwrap();
        assert_eq!(cell, 0);
        assert_eq!(grid.cell_of(&[2.9, 0.2, 20.0]), None);
    }

    #[test]
    fn overlapping_cells_prune() {
        let grid = RegularGrid::new(square(0.0, 4.0), GridShape::uniform(2, 4).unwrap()).unwrap();
        // Region covering [0.5, 1.0) x [2.0, 3.5): x cell 0, y cells 2..=3.
        let region = Extents::new(&[(0.5, 1.0), (2.0, 3.5)]).unwrap();
        let hits: Vec<usize> = grid.cells_overlapping(&region).collect();
        assert_eq!(hits, [8, 12]);

        let outside = Extents::new(&[(5.0, 6.0), (0.0, 1.0)]).unwrap();
        assert_eq!(grid.cells_overlapping(&outside).count(), 0);

        let everything = square(-10.0, 10.0);
        assert_eq!(grid.cells_overlapping(&everything).count(), 16);
    }

    #[test]
    fn degenerate_grid_is_rejected() {
        let tiny = Extents::new(&[(1.0, 1.000_000_1)]).unwrap();
        let err = RegularGrid::new(tiny, GridShape::new(&[1000]).unwrap()).unwrap_err();
        assert_eq!(
            err,
            GeomError::DegenerateGrid {
                dim: 0,
                cells: 1000
            }
        );
    }
}
