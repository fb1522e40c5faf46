// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grid boxes: internal nodes whose children tile the box on a regular grid.

use alloc::vec::Vec;
use core::fmt;

use mdbox_geom::{Extents, RegularGrid};

use crate::controller::BoxController;
use crate::error::TreeError;
use crate::event::Event;
use crate::leaf::MdBox;
use crate::node::{Aggregate, BoxFlags, BoxId, Node};

/// An internal box with `∏ split_into[d]` children laid out on a [`RegularGrid`].
///
/// Child `i` covers `grid().cell_extents(i)`; the children tile the box without
/// gaps or overlap. Grid boxes hold no events of their own.
pub struct MdGridBox<E: Event> {
    id: BoxId,
    depth: u32,
    grid: RegularGrid,
    flags: BoxFlags,
    children: Vec<Node<E>>,
    cache: Option<Aggregate>,
}

impl<E: Event> fmt::Debug for MdGridBox<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MdGridBox")
            .field("id", &self.id)
            .field("depth", &self.depth)
            .field("extents", self.grid.extents())
            .field("split", &self.grid.shape().split())
            .field("flags", &self.flags)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

impl<E: Event> MdGridBox<E> {
    pub(crate) fn from_parts(
        id: BoxId,
        depth: u32,
        grid: RegularGrid,
        flags: BoxFlags,
        children: Vec<Node<E>>,
    ) -> Self {
        debug_assert_eq!(children.len(), grid.len(), "one child per cell");
        let cache = Some(children.iter().map(Node::aggregate).sum());
        Self {
            id,
            depth,
            grid,
            flags,
            children,
            cache,
        }
    }

    /// Create a grid box whose children are empty leaves.
    ///
    /// Children sit at `depth + 1` and receive fresh IDs from `controller`.
    pub fn with_empty_children(
        controller: &BoxController,
        extents: Extents,
        depth: u32,
        id: BoxId,
    ) -> Result<Self, TreeError> {
        if depth >= controller.max_depth() {
            return Err(TreeError::DepthExceeded {
                depth: depth + 1,
                max_depth: controller.max_depth(),
            });
        }
        let grid = RegularGrid::new(extents, controller.grid_shape(extents.nd())?)?;
        let first = controller.claim_ids(grid.len());
        let children = (0..grid.len())
            .map(|i| {
                let extents = grid.cell_extents(i);
                Node::Leaf(MdBox::new(extents, depth + 1, 0, first.offset(i)))
            })
            .collect();
        let flags = BoxFlags::empty();
        Ok(Self::from_parts(id, depth, grid, flags, children))
    }

    /// Box ID.
    #[inline]
    pub const fn id(&self) -> BoxId {
        self.id
    }

    /// Depth below the root.
    #[inline]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Extents of the box.
    #[inline]
    pub const fn extents(&self) -> &Extents {
        self.grid.extents()
    }

    /// The child grid.
    #[inline]
    pub const fn grid(&self) -> &RegularGrid {
        &self.grid
    }

    /// State bits.
    #[inline]
    pub const fn flags(&self) -> BoxFlags {
        self.flags
    }

    /// Children, indexed by linear grid cell.
    #[inline]
    pub fn children(&self) -> &[Node<E>] {
        &self.children
    }

    /// Child covering grid cell `index`.
    #[inline]
    pub fn child(&self, index: usize) -> Option<&Node<E>> {
        self.children.get(index)
    }

    pub(crate) fn set_masked(&mut self, masked: bool) {
        self.flags.set(BoxFlags::MASKED, masked);
        for c in &mut self.children {
            c.set_masked(masked);
        }
    }

    /// Route an event to the child whose cell contains it.
    pub fn insert(&mut self, event: E, controller: &BoxController) -> Result<(), TreeError> {
        if event.nd() != self.grid.extents().nd() {
            return Err(TreeError::DimensionMismatch {
                expected: self.grid.extents().nd(),
                found: event.nd(),
            });
        }
        let index = self
            .grid
            .cell_of(event.coords())
            .ok_or(TreeError::OutOfBounds { box_id: self.id })?;
        let child = self
            .children
            .get_mut(index)
            .ok_or(TreeError::UnreachablePoint { box_id: self.id })?;
        child.insert(event, controller)?;
        self.cache = None;
        Ok(())
    }

    /// Signal, squared error, and event count over all children.
    pub fn aggregate(&self) -> Aggregate {
        self.cache
            .unwrap_or_else(|| self.children.iter().map(Node::aggregate).sum())
    }

    /// Total signal.
    pub fn signal(&self) -> f64 {
        self.aggregate().signal
    }

    /// Total squared error.
    pub fn error_squared(&self) -> f64 {
        self.aggregate().error_squared
    }

    /// Recompute and store cached aggregates for this box and every descendant.
    pub fn refresh_cache(&mut self) {
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            self.children.par_iter_mut().for_each(Node::refresh_cache);
        }
        #[cfg(not(feature = "rayon"))]
        self.children.iter_mut().for_each(Node::refresh_cache);
        self.cache = Some(self.children.iter().map(Node::aggregate).sum());
    }

    /// Call `f` for every event inside `region`, visiting only overlapping cells.
    pub fn for_each_event_in_region<'a, F: FnMut(&'a E)>(&'a self, region: &Extents, f: &mut F) {
        for index in self.grid.cells_overlapping(region) {
            if let Some(child) = self.children.get(index) {
                child.for_each_event_in_region(region, f);
            }
        }
    }

    /// Events inside `region`.
    pub fn events_in_region(&self, region: &Extents) -> Vec<&E> {
        let mut out = Vec::new();
        self.for_each_event_in_region(region, &mut |e| out.push(e));
        out
    }

    /// Aggregate of the events inside `region`.
    ///
    /// Children lying fully inside `region` contribute their aggregate directly.
    pub fn integrate(&self, region: &Extents) -> Aggregate {
        self.grid
            .cells_overlapping(region)
            .filter_map(|index| self.children.get(index))
            .map(|child| child.integrate(region))
            .sum()
    }

    /// Run [`Node::split_all`] on every child and return the number of splits.
    pub(crate) fn split_children(
        &mut self,
        controller: &BoxController,
    ) -> Result<usize, TreeError> {
        #[cfg(feature = "rayon")]
        let splits = {
            use rayon::prelude::*;
            self.children
                .par_iter_mut()
                .map(|c| c.split_all(controller))
                .try_reduce(|| 0, |a, b| Ok(a + b))?
        };
        #[cfg(not(feature = "rayon"))]
        let splits = {
            let mut splits = 0;
            for c in &mut self.children {
                splits += c.split_all(controller)?;
            }
            splits
        };
        Ok(splits)
    }

    pub(crate) fn find_child_mut(&mut self, id: BoxId) -> Option<&mut Node<E>> {
        let found = self.children.iter_mut().find_map(|c| c.find_mut(id));
        if found.is_some() {
            self.cache = None;
        }
        found
    }
}
