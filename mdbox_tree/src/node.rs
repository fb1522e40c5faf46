// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node handle shared by leaf boxes and grid boxes.
//!
//! A parent owns its children as [`Node`] values. Splitting a leaf replaces the
//! `Node::Leaf` in place with a `Node::Grid`, so callers never hold a reference
//! that silently changes type underneath them.

use alloc::vec::Vec;
use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign};

use mdbox_geom::{Coords, Extents, MAX_DIMENSIONS};

use crate::controller::BoxController;
use crate::error::TreeError;
use crate::event::Event;
use crate::grid_box::MdGridBox;
use crate::iter::{BoxIter, TraversalFilter};
use crate::leaf::MdBox;

/// Unique identifier of a box within one tree.
///
/// IDs come from the tree's [`BoxController`] and increase monotonically. A grid
/// box created by splitting a leaf keeps the leaf's ID.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoxId(pub(crate) u64);

impl BoxId {
    /// Wrap a raw ID, for example one read back by a persistence layer.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw ID.
    pub const fn get(self) -> u64 {
        self.0
    }

    pub(crate) const fn offset(self, n: usize) -> Self {
        Self(self.0 + n as u64)
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags::bitflags! {
    /// Per-box state bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BoxFlags: u8 {
        /// Box is masked; traversals with `skip_masked` leave out its subtree.
        const MASKED        = 0b0000_0001;
        /// Leaf exceeded the split threshold below the maximum depth and is
        /// waiting for the next split pass.
        const SPLIT_PENDING = 0b0000_0010;
        /// Leaf is too narrow for `f32` to subdivide. It keeps its events and
        /// never splits, like a leaf at the maximum depth.
        const INDIVISIBLE   = 0b0000_0100;
    }
}

/// Sums over a set of events. Accumulated in `f64`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Aggregate {
    /// Total signal.
    pub signal: f64,
    /// Total squared error.
    pub error_squared: f64,
    /// Number of events.
    pub n_points: u64,
}

impl Aggregate {
    /// Add one event.
    #[inline]
    pub fn add_event<E: Event>(&mut self, event: &E) {
        self.signal += f64::from(event.signal());
        self.error_squared += f64::from(event.error_squared());
        self.n_points += 1;
    }

    /// Aggregate of a slice of events.
    pub fn of_events<E: Event>(events: &[E]) -> Self {
        let mut out = Self::default();
        for e in events {
            out.add_event(e);
        }
        out
    }
}

impl AddAssign for Aggregate {
    fn add_assign(&mut self, rhs: Self) {
        self.signal += rhs.signal;
        self.error_squared += rhs.error_squared;
        self.n_points += rhs.n_points;
    }
}

impl Add for Aggregate {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl Sum for Aggregate {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Result of [`Node::try_split`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SplitOutcome {
    /// Nothing changed: the node is a grid already, under threshold, or at max depth.
    Unchanged,
    /// The leaf was replaced by a grid box carrying the same ID.
    Split,
}

/// Running signal-weighted coordinate sums used for centroids.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct CentroidSums {
    pub(crate) weighted: [f64; MAX_DIMENSIONS],
    pub(crate) weight: f64,
}

impl CentroidSums {
    pub(crate) fn add_event<E: Event>(&mut self, event: &E) {
        let s = f64::from(event.signal());
        for (acc, &x) in self.weighted.iter_mut().zip(event.coords()) {
            *acc += f64::from(x) * s;
        }
        self.weight += s;
    }

    pub(crate) fn finish(&self, nd: usize) -> Option<Coords> {
        if self.weight == 0.0 {
            return None;
        }
        let mut values = [0.0_f32; MAX_DIMENSIONS];
        for (v, &w) in values.iter_mut().zip(&self.weighted).take(nd) {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Centroids are reported at coordinate precision."
            )]
            let mean = (w / self.weight) as f32;
            *v = mean;
        }
        Coords::new(&values[..nd]).ok()
    }
}

/// A box in the tree: either a leaf holding events or a grid of children.
pub enum Node<E: Event> {
    /// Leaf box owning events.
    Leaf(MdBox<E>),
    /// Internal box owning a regular grid of children.
    Grid(MdGridBox<E>),
}

impl<E: Event> fmt::Debug for Node<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(leaf) => leaf.fmt(f),
            Self::Grid(grid) => grid.fmt(f),
        }
    }
}

impl<E: Event> Node<E> {
    /// Box ID.
    pub fn id(&self) -> BoxId {
        match self {
            Self::Leaf(b) => b.id(),
            Self::Grid(g) => g.id(),
        }
    }

    /// Depth below the root (root is 0).
    pub fn depth(&self) -> u32 {
        match self {
            Self::Leaf(b) => b.depth(),
            Self::Grid(g) => g.depth(),
        }
    }

    /// Extents covered by this box.
    pub fn extents(&self) -> &Extents {
        match self {
            Self::Leaf(b) => b.extents(),
            Self::Grid(g) => g.extents(),
        }
    }

    /// Number of dimensions.
    pub fn nd(&self) -> usize {
        self.extents().nd()
    }

    /// State bits.
    pub fn flags(&self) -> BoxFlags {
        match self {
            Self::Leaf(b) => b.flags(),
            Self::Grid(g) => g.flags(),
        }
    }

    /// Whether this is a leaf box.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Whether the box is masked.
    pub fn is_masked(&self) -> bool {
        self.flags().contains(BoxFlags::MASKED)
    }

    /// The leaf box, if this is one.
    pub fn as_leaf(&self) -> Option<&MdBox<E>> {
        match self {
            Self::Leaf(b) => Some(b),
            Self::Grid(_) => None,
        }
    }

    /// The grid box, if this is one.
    pub fn as_grid(&self) -> Option<&MdGridBox<E>> {
        match self {
            Self::Leaf(_) => None,
            Self::Grid(g) => Some(g),
        }
    }

    /// Direct children; empty for a leaf.
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Leaf(_) => &[],
            Self::Grid(g) => g.children(),
        }
    }

    /// Mask or unmask this box and its whole subtree.
    pub fn set_masked(&mut self, masked: bool) {
        match self {
            Self::Leaf(b) => b.set_masked(masked),
            Self::Grid(g) => g.set_masked(masked),
        }
    }

    /// Insert an event, routing it down to the leaf that contains it.
    ///
    /// Never splits; see [`try_split`](Self::try_split) and
    /// [`split_all`](Self::split_all).
    pub fn insert(&mut self, event: E, controller: &BoxController) -> Result<(), TreeError> {
        match self {
            Self::Leaf(b) => b.insert(event, controller),
            Self::Grid(g) => g.insert(event, controller),
        }
    }

    /// Split this node if it is an overfull leaf below the maximum depth.
    ///
    /// On [`SplitOutcome::Split`] the handle now holds a grid box with the same
    /// ID whose children own the former events. On error the leaf is untouched.
    pub fn try_split(&mut self, controller: &BoxController) -> Result<SplitOutcome, TreeError> {
        let Self::Leaf(leaf) = self else {
            return Ok(SplitOutcome::Unchanged);
        };
        match leaf.split(controller)? {
            Some(grid) => {
                *self = Self::Grid(grid);
                Ok(SplitOutcome::Split)
            }
            None => Ok(SplitOutcome::Unchanged),
        }
    }

    /// Split recursively until every leaf is at or under the threshold or at
    /// the maximum depth. Returns the number of leaves that were split.
    ///
    /// With the `rayon` feature, sibling subtrees are processed in parallel.
    pub fn split_all(&mut self, controller: &BoxController) -> Result<usize, TreeError> {
        let mut splits = usize::from(self.try_split(controller)? == SplitOutcome::Split);
        if let Self::Grid(grid) = self {
            splits += grid.split_children(controller)?;
        }
        Ok(splits)
    }

    /// Signal, squared error, and event count of the subtree.
    pub fn aggregate(&self) -> Aggregate {
        match self {
            Self::Leaf(b) => b.aggregate(),
            Self::Grid(g) => g.aggregate(),
        }
    }

    /// Total signal of the subtree.
    pub fn signal(&self) -> f64 {
        self.aggregate().signal
    }

    /// Total squared error of the subtree.
    pub fn error_squared(&self) -> f64 {
        self.aggregate().error_squared
    }

    /// Number of events in the subtree.
    pub fn n_points(&self) -> u64 {
        self.aggregate().n_points
    }

    /// Recompute and store cached aggregates for the whole subtree.
    pub fn refresh_cache(&mut self) {
        match self {
            Self::Leaf(b) => b.refresh_cache(),
            Self::Grid(g) => g.refresh_cache(),
        }
    }

    /// Call `f` for every event whose coordinates lie inside `region`.
    ///
    /// Subtrees that do not overlap `region` are skipped without being visited.
    /// Masking is ignored.
    pub fn for_each_event_in_region<'a, F: FnMut(&'a E)>(&'a self, region: &Extents, f: &mut F) {
        match self {
            Self::Leaf(b) => b.for_each_event_in_region(region, f),
            Self::Grid(g) => g.for_each_event_in_region(region, f),
        }
    }

    /// Events whose coordinates lie inside `region`.
    pub fn events_in_region(&self, region: &Extents) -> Vec<&E> {
        let mut out = Vec::new();
        self.for_each_event_in_region(region, &mut |e| out.push(e));
        out
    }

    /// Aggregate of the events inside `region`.
    ///
    /// Boxes lying entirely inside `region` contribute their aggregate without
    /// visiting their events.
    pub fn integrate(&self, region: &Extents) -> Aggregate {
        if !self.extents().intersects(region) {
            return Aggregate::default();
        }
        if region.contains_extents(self.extents()) {
            return self.aggregate();
        }
        match self {
            Self::Leaf(b) => b.integrate(region),
            Self::Grid(g) => g.integrate(region),
        }
    }

    /// Signal-weighted mean coordinate of the subtree, or `None` when the total
    /// signal is zero.
    pub fn centroid(&self) -> Option<Coords> {
        let mut sums = CentroidSums::default();
        self.accumulate_centroid(&mut sums);
        sums.finish(self.nd())
    }

    pub(crate) fn accumulate_centroid(&self, sums: &mut CentroidSums) {
        match self {
            Self::Leaf(b) => b.events().iter().for_each(|e| sums.add_event(e)),
            Self::Grid(g) => g
                .children()
                .iter()
                .for_each(|c| c.accumulate_centroid(sums)),
        }
    }

    /// Depth-first traversal of this subtree.
    pub fn iter(&self, filter: TraversalFilter) -> BoxIter<'_, E> {
        BoxIter::new(self, filter)
    }

    /// Find the box with ID `id` in this subtree.
    pub fn find(&self, id: BoxId) -> Option<&Self> {
        if self.id() == id {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(id))
    }

    /// Find the box with ID `id`, dropping the cached aggregates of every grid
    /// box on the path so that changes made through the result stay visible.
    pub(crate) fn find_mut(&mut self, id: BoxId) -> Option<&mut Self> {
        if self.id() == id {
            return Some(self);
        }
        match self {
            Self::Leaf(_) => None,
            Self::Grid(g) => g.find_child_mut(id),
        }
    }
}
