// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leaf boxes: a flat list of events inside half-open extents.

use alloc::vec::Vec;
use core::fmt;
use core::mem;

use mdbox_geom::{Coords, Extents, GeomError, RegularGrid};

use crate::controller::BoxController;
use crate::error::TreeError;
use crate::event::Event;
use crate::grid_box::MdGridBox;
use crate::node::{Aggregate, BoxFlags, BoxId, CentroidSums, Node};

/// A leaf box owning its events.
///
/// Every stored event lies inside [`extents`](Self::extents). Aggregates are
/// cached lazily: inserts drop the cache and reads fall back to summing the
/// events until [`refresh_cache`](Self::refresh_cache) stores a value again.
pub struct MdBox<E: Event> {
    id: BoxId,
    depth: u32,
    extents: Extents,
    flags: BoxFlags,
    events: Vec<E>,
    cache: Option<Aggregate>,
}

impl<E: Event> fmt::Debug for MdBox<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MdBox")
            .field("id", &self.id)
            .field("depth", &self.depth)
            .field("extents", &self.extents)
            .field("flags", &self.flags)
            .field("n_events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl<E: Event> MdBox<E> {
    /// Create an empty leaf. `reserved_capacity` is a hint for the event list.
    pub fn new(extents: Extents, depth: u32, reserved_capacity: usize, id: BoxId) -> Self {
        Self {
            id,
            depth,
            extents,
            flags: BoxFlags::empty(),
            events: Vec::with_capacity(reserved_capacity),
            cache: Some(Aggregate::default()),
        }
    }

    pub(crate) fn with_events(
        extents: Extents,
        depth: u32,
        id: BoxId,
        flags: BoxFlags,
        events: Vec<E>,
    ) -> Self {
        let cache = Some(Aggregate::of_events(&events));
        Self {
            id,
            depth,
            extents,
            flags,
            events,
            cache,
        }
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
        &self.extents
    }

    /// State bits.
    #[inline]
    pub const fn flags(&self) -> BoxFlags {
        self.flags
    }

    /// Stored events, in insertion order.
    #[inline]
    pub fn events(&self) -> &[E] {
        &self.events
    }

    /// Number of stored events.
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the leaf holds no events.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether the leaf is waiting for a split pass.
    #[inline]
    pub const fn is_split_pending(&self) -> bool {
        self.flags.contains(BoxFlags::SPLIT_PENDING)
    }

    /// Whether the extents turned out too narrow to subdivide.
    #[inline]
    pub const fn is_indivisible(&self) -> bool {
        self.flags.contains(BoxFlags::INDIVISIBLE)
    }

    /// Whether the next split pass should split this leaf.
    pub fn wants_split(&self, controller: &BoxController) -> bool {
        !self.is_indivisible() && controller.should_split(self.events.len(), self.depth)
    }

    pub(crate) fn set_masked(&mut self, masked: bool) {
        self.flags.set(BoxFlags::MASKED, masked);
    }

    /// Append an event.
    ///
    /// Fails with [`TreeError::OutOfBounds`] when the event lies outside the
    /// extents; the leaf is unchanged in that case.
    pub fn insert(&mut self, event: E, controller: &BoxController) -> Result<(), TreeError> {
        if event.nd() != self.extents.nd() {
            return Err(TreeError::DimensionMismatch {
                expected: self.extents.nd(),
                found: event.nd(),
            });
        }
        if !self.extents.contains(event.coords()) {
            return Err(TreeError::OutOfBounds { box_id: self.id });
        }
        self.events.push(event);
        self.cache = None;
        if self.wants_split(controller) {
            self.flags.insert(BoxFlags::SPLIT_PENDING);
        }
        Ok(())
    }

    /// Remove and return every event, leaving the leaf empty.
    pub fn take_events(&mut self) -> Vec<E> {
        self.cache = Some(Aggregate::default());
        self.flags.remove(BoxFlags::SPLIT_PENDING);
        mem::take(&mut self.events)
    }

    /// Replace the event list, for example when loading a stored tree.
    ///
    /// Every event is checked against the extents first; on error the leaf
    /// keeps its previous events.
    pub fn set_events(
        &mut self,
        events: Vec<E>,
        controller: &BoxController,
    ) -> Result<(), TreeError> {
        if let Some(bad) = events.iter().find(|e| !self.extents.contains(e.coords())) {
            if bad.nd() != self.extents.nd() {
                return Err(TreeError::DimensionMismatch {
                    expected: self.extents.nd(),
                    found: bad.nd(),
                });
            }
            return Err(TreeError::OutOfBounds { box_id: self.id });
        }
        self.events = events;
        self.cache = None;
        let pending = self.wants_split(controller);
        self.flags.set(BoxFlags::SPLIT_PENDING, pending);
        Ok(())
    }

    /// Signal, squared error, and event count.
    pub fn aggregate(&self) -> Aggregate {
        self.cache
            .unwrap_or_else(|| Aggregate::of_events(&self.events))
    }

    /// Total signal.
    pub fn signal(&self) -> f64 {
        self.aggregate().signal
    }

    /// Total squared error.
    pub fn error_squared(&self) -> f64 {
        self.aggregate().error_squared
    }

    /// Recompute and store the cached aggregate.
    pub fn refresh_cache(&mut self) {
        self.cache = Some(Aggregate::of_events(&self.events));
    }

    /// Signal-weighted mean coordinate, or `None` when the total signal is zero.
    pub fn centroid(&self) -> Option<Coords> {
        let mut sums = CentroidSums::default();
        self.events.iter().for_each(|e| sums.add_event(e));
        sums.finish(self.extents.nd())
    }

    /// Call `f` for every event inside `region`.
    pub fn for_each_event_in_region<'a, F: FnMut(&'a E)>(&'a self, region: &Extents, f: &mut F) {
        if !self.extents.intersects(region) {
            return;
        }
        if region.contains_extents(&self.extents) {
            self.events.iter().for_each(f);
            return;
        }
        self.events
            .iter()
            .filter(|e| region.contains(e.coords()))
            .for_each(f);
    }

    /// Events inside `region`.
    pub fn events_in_region(&self, region: &Extents) -> Vec<&E> {
        let mut out = Vec::new();
        self.for_each_event_in_region(region, &mut |e| out.push(e));
        out
    }

    /// Aggregate of the events inside `region`.
    pub fn integrate(&self, region: &Extents) -> Aggregate {
        let mut out = Aggregate::default();
        self.for_each_event_in_region(region, &mut |e| out.add_event(e));
        out
    }

    /// Split into a grid box if the leaf is over threshold and below the
    /// maximum depth.
    ///
    /// Returns `Ok(None)` when no split is due. A leaf whose extents are too
    /// narrow for `f32` to subdivide is marked [`BoxFlags::INDIVISIBLE`] and
    /// also returns `Ok(None)`. The split is all-or-nothing: every event is
    /// routed and every buffer reserved before anything moves, so an error
    /// leaves the leaf exactly as it was. The returned grid keeps
    /// this leaf's ID; its children get fresh consecutive IDs, sit one level
    /// deeper, and together hold every former event.
    ///
    /// The caller must install the returned grid in place of this leaf;
    /// [`Node::try_split`] does that.
    pub(crate) fn split(
        &mut self,
        controller: &BoxController,
    ) -> Result<Option<MdGridBox<E>>, TreeError> {
        if !self.wants_split(controller) {
            return Ok(None);
        }
        let box_id = self.id;
        let shape = controller.grid_shape(self.extents.nd())?;
        let grid = match RegularGrid::new(self.extents, shape) {
            Ok(grid) => grid,
            Err(GeomError::DegenerateGrid { .. }) => {
                self.flags.remove(BoxFlags::SPLIT_PENDING);
                self.flags.insert(BoxFlags::INDIVISIBLE);
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    box_id = box_id.get(),
                    depth = self.depth,
                    n_events = self.events.len(),
                    "leaf box too narrow to split"
                );
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        let n_cells = grid.len();
        let alloc_failed = |source| TreeError::AllocationFailed { box_id, source };

        let mut cells: Vec<usize> = Vec::new();
        cells
            .try_reserve_exact(self.events.len())
            .map_err(alloc_failed)?;
        let mut counts: Vec<usize> = Vec::new();
        counts.try_reserve_exact(n_cells).map_err(alloc_failed)?;
        counts.resize(n_cells, 0);
        for e in &self.events {
            let cell = grid
                .cell_of(e.coords())
                .ok_or(TreeError::UnreachablePoint { box_id })?;
            counts[cell] += 1;
            cells.push(cell);
        }

        let mut buckets: Vec<Vec<E>> = Vec::new();
        buckets.try_reserve_exact(n_cells).map_err(alloc_failed)?;
        for &n in &counts {
            let mut bucket = Vec::new();
            bucket.try_reserve_exact(n).map_err(alloc_failed)?;
            buckets.push(bucket);
        }
        let mut children: Vec<Node<E>> = Vec::new();
        children.try_reserve_exact(n_cells).map_err(alloc_failed)?;

        // Nothing below can fail.
        #[cfg(feature = "tracing")]
        let n_events = self.events.len();
        for (event, cell) in mem::take(&mut self.events).into_iter().zip(cells) {
            buckets[cell].push(event);
        }
        let first = controller.claim_ids(n_cells);
        let depth = self.depth + 1;
        let inherited = self.flags & BoxFlags::MASKED;
        for (i, events) in buckets.into_iter().enumerate() {
            let mut flags = inherited;
            if controller.should_split(events.len(), depth) {
                flags.insert(BoxFlags::SPLIT_PENDING);
            }
            let extents = grid.cell_extents(i);
            let leaf = Self::with_events(extents, depth, first.offset(i), flags, events);
            children.push(Node::Leaf(leaf));
        }
        self.cache = Some(Aggregate::default());
        self.flags.remove(BoxFlags::SPLIT_PENDING);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            box_id = box_id.get(),
            depth = self.depth,
            n_events,
            n_children = n_cells,
            "split leaf box"
        );

        let replacement = MdGridBox::from_parts(box_id, self.depth, grid, inherited, children);
        Ok(Some(replacement))
    }
}
