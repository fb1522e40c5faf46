// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types: coordinates, intervals, and extents.

use core::ops::{Index, IndexMut};

use crate::error::GeomError;

/// Largest supported dimension count.
pub const MAX_DIMENSIONS: usize = 9;

/// Half-width used by [`Extents::unbounded`].
///
/// Kept well below `f32::MAX` so the full width of an interval stays finite.
pub const UNBOUNDED_LIMIT: f32 = 1e30;

pub(crate) fn check_nd(nd: usize) -> Result<(), GeomError> {
    if nd == 0 || nd > MAX_DIMENSIONS {
        return Err(GeomError::DimensionCount { nd });
    }
    Ok(())
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Callers validate nd against MAX_DIMENSIONS first."
)]
const fn nd_u8(nd: usize) -> u8 {
    nd as u8
}

/// A point with up to [`MAX_DIMENSIONS`] coordinates, stored inline.
///
/// Only the first [`nd`](Self::nd) slots are meaningful; the rest stay zero so
/// that equality compares the used slots only.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Coords {
    values: [f32; MAX_DIMENSIONS],
    nd: u8,
}

impl Coords {
    /// Build coordinates from a slice whose length is the dimension count.
    pub fn new(values: &[f32]) -> Result<Self, GeomError> {
        check_nd(values.len())?;
        let mut out = [0.0; MAX_DIMENSIONS];
        out[..values.len()].copy_from_slice(values);
        Ok(Self {
            values: out,
            nd: nd_u8(values.len()),
        })
    }

    /// The origin in `nd` dimensions.
    pub fn zeros(nd: usize) -> Result<Self, GeomError> {
        check_nd(nd)?;
        Ok(Self {
            values: [0.0; MAX_DIMENSIONS],
            nd: nd_u8(nd),
        })
    }

    /// Number of dimensions.
    #[inline]
    pub const fn nd(&self) -> usize {
        self.nd as usize
    }

    /// The used coordinates.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.values[..self.nd()]
    }

    /// The used coordinates, writable in place.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        let nd = self.nd();
        &mut self.values[..nd]
    }

    /// Coordinate along `dim`, if `dim < nd`.
    #[inline]
    pub fn get(&self, dim: usize) -> Option<f32> {
        self.as_slice().get(dim).copied()
    }
}

impl Index<usize> for Coords {
    type Output = f32;

    fn index(&self, dim: usize) -> &f32 {
        &self.as_slice()[dim]
    }
}

impl IndexMut<usize> for Coords {
    fn index_mut(&mut self, dim: usize) -> &mut f32 {
        &mut self.as_mut_slice()[dim]
    }
}

/// Half-open interval `[min, max)` with finite bounds and `min < max`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Interval {
    min: f32,
    max: f32,
}

impl Interval {
    const PLACEHOLDER: Self = Self { min: 0.0, max: 0.0 };

    /// Create an interval, or `None` if a bound is not finite or `min >= max`.
    pub fn new(min: f32, max: f32) -> Option<Self> {
        (min.is_finite() && max.is_finite() && min < max).then_some(Self { min, max })
    }

    fn checked(dim: usize, min: f32, max: f32) -> Result<Self, GeomError> {
        Self::new(min, max).ok_or(GeomError::InvalidInterval { dim, min, max })
    }

    /// Inclusive lower bound.
    #[inline]
    pub const fn min(&self) -> f32 {
        self.min
    }

    /// Exclusive upper bound.
    #[inline]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// `max - min`.
    #[inline]
    pub fn width(&self) -> f32 {
        self.max - self.min
    }

    /// Midpoint.
    #[inline]
    pub fn center(&self) -> f32 {
        0.5 * (self.min + self.max)
    }

    /// Whether `min <= x < max`. Always false for NaN.
    #[inline]
    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x < self.max
    }

    /// Whether the two half-open intervals share any value.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min < other.max && other.min < self.max
    }

    /// Whether `other` lies entirely inside `self`.
    #[inline]
    pub fn contains_interval(&self, other: &Self) -> bool {
        self.min <= other.min && other.max <= self.max
    }
}

/// Axis-aligned, half-open box in up to [`MAX_DIMENSIONS`] dimensions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extents {
    intervals: [Interval; MAX_DIMENSIONS],
    nd: u8,
}

impl Extents {
    /// Create extents from `(min, max)` pairs, one per dimension.
    pub fn new(bounds: &[(f32, f32)]) -> Result<Self, GeomError> {
        check_nd(bounds.len())?;
        let mut intervals = [Interval::PLACEHOLDER; MAX_DIMENSIONS];
        for (dim, &(min, max)) in bounds.iter().enumerate() {
            intervals[dim] = Interval::checked(dim, min, max)?;
        }
        Ok(Self {
            intervals,
            nd: nd_u8(bounds.len()),
        })
    }

    /// Create extents from already validated intervals.
    pub fn from_intervals(intervals: &[Interval]) -> Result<Self, GeomError> {
        check_nd(intervals.len())?;
        let mut out = [Interval::PLACEHOLDER; MAX_DIMENSIONS];
        out[..intervals.len()].copy_from_slice(intervals);
        Ok(Self {
            intervals: out,
            nd: nd_u8(intervals.len()),
        })
    }

    /// The same `[min, max)` along every one of `nd` dimensions.
    pub fn cube(nd: usize, min: f32, max: f32) -> Result<Self, GeomError> {
        check_nd(nd)?;
        let iv = Interval::checked(0, min, max)?;
        let mut intervals = [Interval::PLACEHOLDER; MAX_DIMENSIONS];
        intervals[..nd].fill(iv);
        Ok(Self {
            intervals,
            nd: nd_u8(nd),
        })
    }

    /// `[-UNBOUNDED_LIMIT, UNBOUNDED_LIMIT)` along every dimension.
    pub fn unbounded(nd: usize) -> Result<Self, GeomError> {
        Self::cube(nd, -UNBOUNDED_LIMIT, UNBOUNDED_LIMIT)
    }

    /// Number of dimensions.
    #[inline]
    pub const fn nd(&self) -> usize {
        self.nd as usize
    }

    /// The used intervals.
    #[inline]
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals[..self.nd()]
    }

    /// Interval along `dim`, if `dim < nd`.
    #[inline]
    pub fn interval(&self, dim: usize) -> Option<Interval> {
        self.intervals().get(dim).copied()
    }

    /// Whether every coordinate of `point` lies inside the matching interval.
    ///
    /// Returns false when `point` has a different dimension count.
    pub fn contains(&self, point: &[f32]) -> bool {
        point.len() == self.nd()
            && self
                .intervals()
                .iter()
                .zip(point)
                .all(|(iv, &x)| iv.contains(x))
    }

    /// Whether the two boxes overlap in every dimension.
    pub fn intersects(&self, other: &Self) -> bool {
        self.nd == other.nd
            && self
                .intervals()
                .iter()
                .zip(other.intervals())
                .all(|(a, b)| a.overlaps(b))
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains_extents(&self, other: &Self) -> bool {
        self.nd == other.nd
            && self
                .intervals()
                .iter()
                .zip(other.intervals())
                .all(|(a, b)| a.contains_interval(b))
    }

    /// Center point.
    pub fn center(&self) -> Coords {
        let mut values = [0.0; MAX_DIMENSIONS];
        for (v, iv) in values.iter_mut().zip(self.intervals()) {
            *v = iv.center();
        }
        Coords {
            values,
            nd: self.nd,
        }
    }

    /// Hypervolume, accumulated in `f64`.
    pub fn volume(&self) -> f64 {
        self.intervals()
            .iter()
            .map(|iv| f64::from(iv.width()))
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_is_half_open() {
        let iv = Interval::new(0.0, 2.0).unwrap();
        assert!(iv.contains(0.0));
        assert!(iv.contains(1.999));
        assert!(!iv.contains(2.0), "upper bound is exclusive");
        assert!(!iv.contains(f32::NAN));
        assert!(Interval::new(1.0, 1.0).is_none());
        assert!(Interval::new(0.0, f32::INFINITY).is_none());
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let a = Interval::new(0.0, 1.0).unwrap();
        let b = Interval::new(1.0, 2.0).unwrap();
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&Interval::new(0.5, 1.5).unwrap()));
    }

    #[test]
    fn coords_reject_bad_dimension_counts() {
        assert_eq!(Coords::new(&[]), Err(GeomError::DimensionCount { nd: 0 }));
        assert_eq!(
            Coords::new(&[0.0; MAX_DIMENSIONS + 1]),
            Err(GeomError::DimensionCount {
                nd: MAX_DIMENSIONS + 1
            })
        );
        let c = Coords::new(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(c.nd(), 3);
        assert_eq!(c.as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(c.get(3), None);
    }

    #[test]
    fn coords_overwrite_in_place() {
        let mut c = Coords::new(&[1.0, 2.0]).unwrap();
        c[1] = 5.0;
        c.as_mut_slice()[0] *= 2.0;
        assert_eq!(c.as_slice(), &[2.0, 5.0]);
    }

    #[test]
    fn extents_validate_each_dimension() {
        let err = Extents::new(&[(0.0, 1.0), (3.0, 2.0)]).unwrap_err();
        assert_eq!(
            err,
            GeomError::InvalidInterval {
                dim: 1,
                min: 3.0,
                max: 2.0
            }
        );
    }

    #[test]
    fn extents_contains_and_intersects() {
        let e = Extents::new(&[(0.0, 4.0), (0.0, 4.0)]).unwrap();
        assert!(e.contains(&[0.0, 3.5]));
        assert!(!e.contains(&[4.0, 1.0]));
        assert!(!e.contains(&[1.0]), "dimension mismatch is never contained");

        let inside = Extents::new(&[(1.0, 2.0), (1.0, 2.0)]).unwrap();
        let touching = Extents::new(&[(4.0, 5.0), (0.0, 4.0)]).unwrap();
        assert!(e.intersects(&inside));
        assert!(e.contains_extents(&inside));
        assert!(!e.intersects(&touching));
        assert!(!inside.contains_extents(&e));
    }

    #[test]
    fn extents_center_and_volume() {
        let e = Extents::new(&[(0.0, 4.0), (-1.0, 1.0), (2.0, 3.0)]).unwrap();
        assert_eq!(e.center().as_slice(), &[2.0, 0.0, 2.5]);
        assert_eq!(e.volume(), 8.0);
        let u = Extents::unbounded(2).unwrap();
        assert!(u.contains(&[-1e29, 1e29]));
    }
}
