// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Depth-first traversal with depth cutoff and mask filtering.

use alloc::vec::Vec;
use core::fmt;

use crate::event::Event;
use crate::node::Node;

/// Which boxes a traversal yields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraversalFilter {
    /// Do not descend below this depth. A grid box at the cutoff is yielded as
    /// if it were a leaf.
    pub max_depth: Option<u32>,
    /// Yield only leaves (and grid boxes at the cutoff).
    pub leaves_only: bool,
    /// Skip masked boxes together with their subtrees.
    pub skip_masked: bool,
}

impl TraversalFilter {
    /// Every box, parents before children.
    pub const ALL: Self = Self {
        max_depth: None,
        leaves_only: false,
        skip_masked: false,
    };

    /// Leaves only.
    pub const fn leaves() -> Self {
        Self {
            leaves_only: true,
            ..Self::ALL
        }
    }

    /// Limit the traversal depth.
    pub const fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Skip masked subtrees.
    pub const fn unmasked(mut self) -> Self {
        self.skip_masked = true;
        self
    }
}

/// Pre-order iterator over the boxes of a subtree.
///
/// Children are visited in linear cell order.
pub struct BoxIter<'a, E: Event> {
    stack: Vec<&'a Node<E>>,
    filter: TraversalFilter,
}

impl<E: Event> fmt::Debug for BoxIter<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxIter")
            .field("pending", &self.stack.len())
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl<'a, E: Event> BoxIter<'a, E> {
    pub(crate) fn new(root: &'a Node<E>, filter: TraversalFilter) -> Self {
        let mut stack = Vec::new();
        stack.push(root);
        Self { stack, filter }
    }
}

impl<'a, E: Event> Iterator for BoxIter<'a, E> {
    type Item = &'a Node<E>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            if self.filter.skip_masked && node.is_masked() {
                continue;
            }
            let Node::Grid(grid) = node else {
                return Some(node);
            };
            if self.filter.max_depth.is_some_and(|d| grid.depth() >= d) {
                return Some(node);
            }
            self.stack.extend(grid.children().iter().rev());
            if !self.filter.leaves_only {
                return Some(node);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{BoxController, SplitPolicy};
    use crate::event::LeanEvent;
    use crate::node::BoxId;
    use mdbox_geom::Extents;

    /// Root grid (depth 0) with one child split again (depth 1).
    fn two_level() -> (BoxController, Node<LeanEvent>) {
        let c = BoxController::new(SplitPolicy::uniform(2, 4, 2));
        let mut root = Node::Leaf(crate::leaf::MdBox::new(
            Extents::cube(2, 0.0, 1.0).unwrap(),
            0,
            0,
            c.next_id(),
        ));
        for (x, y) in [(0.1, 0.1), (0.4, 0.1), (0.1, 0.4), (0.9, 0.9)] {
            root.insert(LeanEvent::from_slice(&[x, y], 1.0, 1.0).unwrap(), &c)
                .unwrap();
        }
        root.split_all(&c).unwrap();
        (c, root)
    }

    #[test]
    fn full_traversal_is_preorder() {
        let (_, root) = two_level();
        let ids: Vec<u64> = root
            .iter(TraversalFilter::ALL)
            .map(|n| n.id().get())
            .collect();
        // Root 0 splits into 1..=4; child 1 splits into 5..=8.
        assert_eq!(ids, [0, 1, 5, 6, 7, 8, 2, 3, 4]);
    }

    #[test]
    fn cutoff_yields_grids_as_leaves() {
        let (_, root) = two_level();
        let leaves: Vec<u64> = root
            .iter(TraversalFilter::leaves().with_max_depth(1))
            .map(|n| n.id().get())
            .collect();
        assert_eq!(leaves, [1, 2, 3, 4]);
        let root_only: Vec<_> = root.iter(TraversalFilter::ALL.with_max_depth(0)).collect();
        assert_eq!(root_only.len(), 1);
        let all_leaves = root.iter(TraversalFilter::leaves()).count();
        assert_eq!(all_leaves, 7);
    }

    #[test]
    fn masked_subtrees_are_skipped() {
        let (_c, mut root) = two_level();
        root.find_mut(BoxId(1)).unwrap().set_masked(true);
        assert!(
            root.find(BoxId(6)).unwrap().is_masked(),
            "mask covers subtree"
        );
        let ids: Vec<u64> = root
            .iter(TraversalFilter::ALL.unmasked())
            .map(|n| n.id().get())
            .collect();
        assert_eq!(ids, [0, 2, 3, 4]);
        assert_eq!(root.iter(TraversalFilter::ALL).count(), 9);
    }
}
