// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The event tree: a root box plus the controller shared by all its boxes.

use alloc::sync::Arc;
use alloc::vec::Vec;

use mdbox_geom::{Coords, Extents};

use crate::controller::BoxController;
use crate::error::TreeError;
use crate::event::{Event, EventVariant};
use crate::iter::{BoxIter, TraversalFilter};
use crate::leaf::MdBox;
use crate::node::{Aggregate, BoxId, Node};

/// Shape summary of a tree, gathered in one traversal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of leaves at each depth.
    pub leaves_per_depth: Vec<usize>,
    /// Number of grid boxes at each depth.
    pub grids_per_depth: Vec<usize>,
    /// Total number of events.
    pub n_points: u64,
    /// Largest event count of any leaf.
    pub max_leaf_events: usize,
    /// Leaves holding more events than the split threshold, including those
    /// at the maximum depth.
    pub overfull_leaves: usize,
    /// Leaves too narrow for `f32` to subdivide.
    pub indivisible_leaves: usize,
    /// Leaves the next [`EventTree::split_all`] would split.
    pub pending_splits: usize,
}

/// An adaptive N-dimensional event tree.
///
/// Events are inserted into the leaf containing them. Leaves are not split
/// during insertion; call [`split_all`](Self::split_all) after a batch of
/// inserts to subdivide every overfull leaf.
///
/// ```
/// use std::sync::Arc;
/// use mdbox_geom::Extents;
/// use mdbox_tree::{BoxController, EventTree, LeanEvent, SplitPolicy};
///
/// let controller = Arc::new(BoxController::new(SplitPolicy::uniform(3, 2, 2)));
/// let extents = Extents::cube(2, 0.0, 4.0).unwrap();
/// let mut tree = EventTree::<LeanEvent>::new(controller, extents).unwrap();
/// for (x, y) in [(0.5, 0.5), (0.6, 0.5), (0.5, 0.6), (0.6, 0.6)] {
///     tree.insert(LeanEvent::from_slice(&[x, y], 1.0, 1.0).unwrap()).unwrap();
/// }
/// assert_eq!(tree.split_all().unwrap(), 2);
/// assert_eq!(tree.signal(), 4.0);
/// ```
#[derive(Debug)]
pub struct EventTree<E: Event> {
    controller: Arc<BoxController>,
    root: Node<E>,
}

impl<E: Event> EventTree<E> {
    /// Create a tree whose root is an empty leaf covering `extents`.
    ///
    /// Fails when the controller's split factors are invalid for this many
    /// dimensions.
    pub fn new(controller: Arc<BoxController>, extents: Extents) -> Result<Self, TreeError> {
        controller.grid_shape(extents.nd())?;
        let root = Node::Leaf(MdBox::new(extents, 0, 0, controller.next_id()));
        #[cfg(feature = "tracing")]
        tracing::trace!(
            nd = extents.nd(),
            variant = E::VARIANT.name(),
            "created event tree"
        );
        Ok(Self { controller, root })
    }

    /// Number of dimensions.
    pub fn nd(&self) -> usize {
        self.root.nd()
    }

    /// Event variant stored by this tree.
    pub const fn variant(&self) -> EventVariant {
        E::VARIANT
    }

    /// The shared controller.
    pub fn controller(&self) -> &Arc<BoxController> {
        &self.controller
    }

    /// The root box.
    pub fn root(&self) -> &Node<E> {
        &self.root
    }

    /// Extents of the root box.
    pub fn extents(&self) -> &Extents {
        self.root.extents()
    }

    /// Insert one event.
    pub fn insert(&mut self, event: E) -> Result<(), TreeError> {
        self.root.insert(event, &self.controller)
    }

    /// Insert events in order, stopping at the first error.
    ///
    /// Events before the failing one stay inserted. Returns the number of
    /// events inserted.
    pub fn insert_many<I: IntoIterator<Item = E>>(
        &mut self,
        events: I,
    ) -> Result<usize, TreeError> {
        let mut n = 0;
        for event in events {
            self.root.insert(event, &self.controller)?;
            n += 1;
        }
        Ok(n)
    }

    /// Split every overfull leaf, recursively, then refresh cached aggregates.
    ///
    /// Afterwards every leaf is at or under the split threshold or at the
    /// maximum depth. Returns the number of leaves that were split; a second
    /// call without new inserts returns 0.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, name = "mdbox::split_all", fields(nd = self.nd()))
    )]
    pub fn split_all(&mut self) -> Result<usize, TreeError> {
        let splits = self.root.split_all(&self.controller);
        self.root.refresh_cache();
        splits
    }

    /// Recompute every cached aggregate.
    pub fn refresh_cache(&mut self) {
        self.root.refresh_cache();
    }

    /// Signal, squared error, and event count of the whole tree.
    pub fn aggregate(&self) -> Aggregate {
        self.root.aggregate()
    }

    /// Total signal.
    pub fn signal(&self) -> f64 {
        self.root.signal()
    }

    /// Total squared error.
    pub fn error_squared(&self) -> f64 {
        self.root.error_squared()
    }

    /// Total number of events.
    pub fn n_points(&self) -> u64 {
        self.root.n_points()
    }

    /// Signal-weighted mean coordinate, or `None` when the total signal is zero.
    pub fn centroid(&self) -> Option<Coords> {
        self.root.centroid()
    }

    fn check_region(&self, region: &Extents) -> Result<(), TreeError> {
        if region.nd() != self.nd() {
            return Err(TreeError::DimensionMismatch {
                expected: self.nd(),
                found: region.nd(),
            });
        }
        Ok(())
    }

    /// Events whose coordinates lie inside `region`.
    pub fn events_in_region(&self, region: &Extents) -> Result<Vec<&E>, TreeError> {
        self.check_region(region)?;
        Ok(self.root.events_in_region(region))
    }

    /// Aggregate of the events inside `region`.
    pub fn integrate(&self, region: &Extents) -> Result<Aggregate, TreeError> {
        self.check_region(region)?;
        Ok(self.root.integrate(region))
    }

    /// Traverse the boxes of the tree.
    pub fn boxes(&self, filter: TraversalFilter) -> BoxIter<'_, E> {
        self.root.iter(filter)
    }

    /// The box with ID `id`.
    pub fn find_box(&self, id: BoxId) -> Option<&Node<E>> {
        self.root.find(id)
    }

    /// Mutable access to the leaf with ID `id`.
    ///
    /// Cached aggregates of its ancestors are dropped, so later reads see any
    /// change made through the returned leaf. Clone the [`controller`] first
    /// when the leaf operation needs it.
    ///
    /// Splitting goes through [`split_all`](Self::split_all), which installs the
    /// new grid box; a leaf reached here cannot split itself out of the tree:
    ///
    /// ```compile_fail
    /// use std::sync::Arc;
    /// use mdbox_geom::Extents;
    /// use mdbox_tree::{BoxController, BoxId, EventTree, LeanEvent, SplitPolicy};
    ///
    /// let controller = Arc::new(BoxController::new(SplitPolicy::uniform(1, 2, 2)));
    /// let extents = Extents::cube(1, 0.0, 1.0).unwrap();
    /// let mut tree = EventTree::<LeanEvent>::new(controller.clone(), extents).unwrap();
    /// let leaf = tree.leaf_mut(BoxId::new(0)).unwrap();
    /// let _ = leaf.split(&controller);
    /// ```
    ///
    /// [`controller`]: Self::controller
    pub fn leaf_mut(&mut self, id: BoxId) -> Option<&mut MdBox<E>> {
        match self.root.find_mut(id)? {
            Node::Leaf(leaf) => Some(leaf),
            Node::Grid(_) => None,
        }
    }

    /// Mask or unmask the box with ID `id` and its subtree. Returns whether the
    /// box was found.
    pub fn set_masked(&mut self, id: BoxId, masked: bool) -> bool {
        match self.root.find_mut(id) {
            Some(node) => {
                node.set_masked(masked);
                true
            }
            None => false,
        }
    }

    /// Gather shape statistics.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let threshold = self.controller.split_threshold();
        for node in self.boxes(TraversalFilter::ALL) {
            let depth = node.depth() as usize;
            let per_depth = match node {
                Node::Leaf(_) => &mut stats.leaves_per_depth,
                Node::Grid(_) => &mut stats.grids_per_depth,
            };
            if per_depth.len() <= depth {
                per_depth.resize(depth + 1, 0);
            }
            per_depth[depth] += 1;
            if let Node::Leaf(leaf) = node {
                stats.n_points += leaf.len() as u64;
                stats.max_leaf_events = stats.max_leaf_events.max(leaf.len());
                stats.overfull_leaves += usize::from(leaf.len() > threshold);
                stats.indivisible_leaves += usize::from(leaf.is_indivisible());
                stats.pending_splits += usize::from(leaf.wants_split(&self.controller));
            }
        }
        stats
    }
}
