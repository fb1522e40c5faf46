// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime construction: pick the event variant and dimension count from
//! values known only at run time.
//!
//! One generic implementation serves every dimension count, so dispatch only
//! has to select the event variant. Both lookups go through constant function
//! tables indexed by the variant (and, for boxes, the box kind).

use alloc::sync::Arc;

use mdbox_geom::{Extents, MAX_DIMENSIONS};

use crate::controller::BoxController;
use crate::error::TreeError;
use crate::event::{AnyEvent, Event, EventVariant, FullEvent, LeanEvent};
use crate::grid_box::MdGridBox;
use crate::leaf::MdBox;
use crate::node::{Aggregate, BoxId, Node};
use crate::tree::{EventTree, TreeStats};

/// Box type requested from [`create_box`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BoxKind {
    /// Leaf of lean events.
    LeanBox,
    /// Leaf of full events.
    FullBox,
    /// Grid box over lean events.
    LeanGridBox,
    /// Grid box over full events.
    FullGridBox,
}

impl BoxKind {
    /// Every kind, in dispatch-table order.
    pub const ALL: [Self; 4] = [
        Self::LeanBox,
        Self::FullBox,
        Self::LeanGridBox,
        Self::FullGridBox,
    ];

    /// Kind for a variant, leaf or grid.
    pub const fn new(variant: EventVariant, grid: bool) -> Self {
        match (variant, grid) {
            (EventVariant::Lean, false) => Self::LeanBox,
            (EventVariant::Full, false) => Self::FullBox,
            (EventVariant::Lean, true) => Self::LeanGridBox,
            (EventVariant::Full, true) => Self::FullGridBox,
        }
    }

    /// Event variant stored under boxes of this kind.
    pub const fn variant(self) -> EventVariant {
        match self {
            Self::LeanBox | Self::LeanGridBox => EventVariant::Lean,
            Self::FullBox | Self::FullGridBox => EventVariant::Full,
        }
    }

    /// Whether this is a grid kind.
    pub const fn is_grid(self) -> bool {
        matches!(self, Self::LeanGridBox | Self::FullGridBox)
    }

    const fn table_index(self) -> usize {
        match self {
            Self::LeanBox => 0,
            Self::FullBox => 1,
            Self::LeanGridBox => 2,
            Self::FullGridBox => 3,
        }
    }
}

/// A tree of either event variant.
#[derive(Debug)]
pub enum AnyTree {
    /// Tree of lean events.
    Lean(EventTree<LeanEvent>),
    /// Tree of full events.
    Full(EventTree<FullEvent>),
}

/// A single box of either event variant.
#[derive(Debug)]
pub enum AnyNode {
    /// Box over lean events.
    Lean(Node<LeanEvent>),
    /// Box over full events.
    Full(Node<FullEvent>),
}

/// Wrapping of typed trees and boxes into their runtime enums.
trait Dispatch: Event {
    fn wrap_tree(tree: EventTree<Self>) -> AnyTree;
    fn wrap_node(node: Node<Self>) -> AnyNode;
}

impl Dispatch for LeanEvent {
    fn wrap_tree(tree: EventTree<Self>) -> AnyTree {
        AnyTree::Lean(tree)
    }

    fn wrap_node(node: Node<Self>) -> AnyNode {
        AnyNode::Lean(node)
    }
}

impl Dispatch for FullEvent {
    fn wrap_tree(tree: EventTree<Self>) -> AnyTree {
        AnyTree::Full(tree)
    }

    fn wrap_node(node: Node<Self>) -> AnyNode {
        AnyNode::Full(node)
    }
}

type TreeCreator = fn(Arc<BoxController>, Extents) -> Result<AnyTree, TreeError>;
type BoxCreator = fn(&BoxController, Extents, u32, usize, BoxId) -> Result<AnyNode, TreeError>;

fn new_tree<E: Dispatch>(
    controller: Arc<BoxController>,
    extents: Extents,
) -> Result<AnyTree, TreeError> {
    EventTree::<E>::new(controller, extents).map(E::wrap_tree)
}

fn new_leaf<E: Dispatch>(
    _controller: &BoxController,
    extents: Extents,
    depth: u32,
    reserved_capacity: usize,
    id: BoxId,
) -> Result<AnyNode, TreeError> {
    let leaf = MdBox::new(extents, depth, reserved_capacity, id);
    Ok(E::wrap_node(Node::Leaf(leaf)))
}

fn new_grid<E: Dispatch>(
    controller: &BoxController,
    extents: Extents,
    depth: u32,
    _reserved_capacity: usize,
    id: BoxId,
) -> Result<AnyNode, TreeError> {
    let grid = MdGridBox::with_empty_children(controller, extents, depth, id)?;
    Ok(E::wrap_node(Node::Grid(grid)))
}

/// Indexed by [`EventVariant`].
const TREE_CREATORS: [TreeCreator; 2] = [new_tree::<LeanEvent>, new_tree::<FullEvent>];

/// Indexed by [`BoxKind`].
const BOX_CREATORS: [BoxCreator; 4] = [
    new_leaf::<LeanEvent>,
    new_leaf::<FullEvent>,
    new_grid::<LeanEvent>,
    new_grid::<FullEvent>,
];

fn check_nd(nd: usize) -> Result<(), TreeError> {
    if nd == 0 || nd > MAX_DIMENSIONS {
        return Err(TreeError::UnsupportedDimensions { nd });
    }
    Ok(())
}

/// Create an empty tree of `nd` dimensions storing events of the named variant.
///
/// `variant` is `"Lean"` or `"Full"` (the long names `"MDLeanEvent"` and
/// `"MDEvent"` are accepted too). `extents` must have `nd` dimensions.
///
/// ```
/// use std::sync::Arc;
/// use mdbox_geom::Extents;
/// use mdbox_tree::{create_tree, BoxController, EventVariant, TreeError};
///
/// let c = Arc::new(BoxController::default());
/// let tree = create_tree(3, "Full", c.clone(), Extents::cube(3, -1.0, 1.0).unwrap()).unwrap();
/// assert_eq!(tree.variant(), EventVariant::Full);
/// assert_eq!(tree.nd(), 3);
///
/// let err = create_tree(10, "Lean", c, Extents::cube(3, -1.0, 1.0).unwrap()).unwrap_err();
/// assert_eq!(err, TreeError::UnsupportedDimensions { nd: 10 });
/// ```
pub fn create_tree(
    nd: usize,
    variant: &str,
    controller: Arc<BoxController>,
    extents: Extents,
) -> Result<AnyTree, TreeError> {
    check_nd(nd)?;
    let variant: EventVariant = variant.parse()?;
    if extents.nd() != nd {
        return Err(TreeError::DimensionMismatch {
            expected: nd,
            found: extents.nd(),
        });
    }
    TREE_CREATORS[variant.table_index()](controller, extents)
}

/// Create a single box with an explicit ID, for example when rebuilding a
/// stored tree.
///
/// `None` extents give an unbounded box. Grid kinds come with empty leaf
/// children one level deeper. The controller's ID counter is moved past `id`
/// so later allocations cannot collide with it. `reserved_capacity` is a hint
/// for the leaf's event list and is ignored for grid kinds.
pub fn create_box(
    nd: usize,
    kind: BoxKind,
    controller: &BoxController,
    extents: Option<Extents>,
    depth: u32,
    reserved_capacity: usize,
    id: BoxId,
) -> Result<AnyNode, TreeError> {
    check_nd(nd)?;
    let extents = match extents {
        Some(e) if e.nd() != nd => {
            return Err(TreeError::DimensionMismatch {
                expected: nd,
                found: e.nd(),
            });
        }
        Some(e) => e,
        None => Extents::unbounded(nd)?,
    };
    if depth > controller.max_depth() {
        return Err(TreeError::DepthExceeded {
            depth,
            max_depth: controller.max_depth(),
        });
    }
    controller.ensure_id_above(id);
    BOX_CREATORS[kind.table_index()](controller, extents, depth, reserved_capacity, id)
}

impl AnyTree {
    /// Event variant of the tree.
    pub const fn variant(&self) -> EventVariant {
        match self {
            Self::Lean(_) => EventVariant::Lean,
            Self::Full(_) => EventVariant::Full,
        }
    }

    /// Number of dimensions.
    pub fn nd(&self) -> usize {
        match self {
            Self::Lean(t) => t.nd(),
            Self::Full(t) => t.nd(),
        }
    }

    /// The shared controller.
    pub fn controller(&self) -> &Arc<BoxController> {
        match self {
            Self::Lean(t) => t.controller(),
            Self::Full(t) => t.controller(),
        }
    }

    /// Insert an event of the tree's variant.
    ///
    /// A lean event offered to a full tree, or the reverse, fails with
    /// [`TreeError::VariantMismatch`].
    pub fn insert(&mut self, event: AnyEvent) -> Result<(), TreeError> {
        match (self, event) {
            (Self::Lean(t), AnyEvent::Lean(e)) => t.insert(e),
            (Self::Full(t), AnyEvent::Full(e)) => t.insert(e),
            (tree, event) => Err(TreeError::VariantMismatch {
                expected: tree.variant(),
                found: event.variant(),
            }),
        }
    }

    /// See [`EventTree::split_all`].
    pub fn split_all(&mut self) -> Result<usize, TreeError> {
        match self {
            Self::Lean(t) => t.split_all(),
            Self::Full(t) => t.split_all(),
        }
    }

    /// See [`EventTree::refresh_cache`].
    pub fn refresh_cache(&mut self) {
        match self {
            Self::Lean(t) => t.refresh_cache(),
            Self::Full(t) => t.refresh_cache(),
        }
    }

    /// Signal, squared error, and event count of the whole tree.
    pub fn aggregate(&self) -> Aggregate {
        match self {
            Self::Lean(t) => t.aggregate(),
            Self::Full(t) => t.aggregate(),
        }
    }

    /// Total signal.
    pub fn signal(&self) -> f64 {
        self.aggregate().signal
    }

    /// Total squared error.
    pub fn error_squared(&self) -> f64 {
        self.aggregate().error_squared
    }

    /// Total number of events.
    pub fn n_points(&self) -> u64 {
        self.aggregate().n_points
    }

    /// See [`EventTree::integrate`].
    pub fn integrate(&self, region: &Extents) -> Result<Aggregate, TreeError> {
        match self {
            Self::Lean(t) => t.integrate(region),
            Self::Full(t) => t.integrate(region),
        }
    }

    /// See [`EventTree::stats`].
    pub fn stats(&self) -> TreeStats {
        match self {
            Self::Lean(t) => t.stats(),
            Self::Full(t) => t.stats(),
        }
    }

    /// The lean tree, if this is one.
    pub fn as_lean(&self) -> Option<&EventTree<LeanEvent>> {
        match self {
            Self::Lean(t) => Some(t),
            Self::Full(_) => None,
        }
    }

    /// The full tree, if this is one.
    pub fn as_full(&self) -> Option<&EventTree<FullEvent>> {
        match self {
            Self::Lean(_) => None,
            Self::Full(t) => Some(t),
        }
    }

    /// The lean tree, mutably.
    pub fn as_lean_mut(&mut self) -> Option<&mut EventTree<LeanEvent>> {
        match self {
            Self::Lean(t) => Some(t),
            Self::Full(_) => None,
        }
    }

    /// The full tree, mutably.
    pub fn as_full_mut(&mut self) -> Option<&mut EventTree<FullEvent>> {
        match self {
            Self::Lean(_) => None,
            Self::Full(t) => Some(t),
        }
    }
}

impl AnyNode {
    /// Event variant stored under the box.
    pub const fn variant(&self) -> EventVariant {
        match self {
            Self::Lean(_) => EventVariant::Lean,
            Self::Full(_) => EventVariant::Full,
        }
    }

    /// Kind of the box.
    pub fn kind(&self) -> BoxKind {
        BoxKind::new(self.variant(), !self.is_leaf())
    }

    /// Box ID.
    pub fn id(&self) -> BoxId {
        match self {
            Self::Lean(n) => n.id(),
            Self::Full(n) => n.id(),
        }
    }

    /// Depth below the root.
    pub fn depth(&self) -> u32 {
        match self {
            Self::Lean(n) => n.depth(),
            Self::Full(n) => n.depth(),
        }
    }

    /// Extents of the box.
    pub fn extents(&self) -> &Extents {
        match self {
            Self::Lean(n) => n.extents(),
            Self::Full(n) => n.extents(),
        }
    }

    /// Number of dimensions.
    pub fn nd(&self) -> usize {
        self.extents().nd()
    }

    /// Whether the box is a leaf.
    pub fn is_leaf(&self) -> bool {
        match self {
            Self::Lean(n) => n.is_leaf(),
            Self::Full(n) => n.is_leaf(),
        }
    }

    /// Number of events under the box.
    pub fn n_points(&self) -> u64 {
        match self {
            Self::Lean(n) => n.n_points(),
            Self::Full(n) => n.n_points(),
        }
    }

    /// The lean box, if this is one.
    pub fn into_lean(self) -> Option<Node<LeanEvent>> {
        match self {
            Self::Lean(n) => Some(n),
            Self::Full(_) => None,
        }
    }

    /// The full box, if this is one.
    pub fn into_full(self) -> Option<Node<FullEvent>> {
        match self {
            Self::Lean(_) => None,
            Self::Full(n) => Some(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SplitPolicy;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use mdbox_geom::UNBOUNDED_LIMIT;

    fn controller() -> Arc<BoxController> {
        Arc::new(BoxController::new(SplitPolicy::uniform(10, 3, 2)))
    }

    #[test]
    fn every_dimension_count_and_variant_builds_a_tree() {
        for nd in 1..=MAX_DIMENSIONS {
            for variant in EventVariant::ALL {
                let extents = Extents::cube(nd, 0.0, 1.0).unwrap();
                let tree = create_tree(nd, variant.name(), controller(), extents).unwrap();
                assert_eq!(tree.nd(), nd);
                assert_eq!(tree.variant(), variant);
                assert_eq!(tree.n_points(), 0);
            }
        }
    }

    #[test]
    fn out_of_range_requests_fail() {
        let extents = Extents::cube(2, 0.0, 1.0).unwrap();
        for nd in [0, MAX_DIMENSIONS + 1] {
            assert_eq!(
                create_tree(nd, "Lean", controller(), extents).err(),
                Some(TreeError::UnsupportedDimensions { nd })
            );
            assert_eq!(
                create_box(nd, BoxKind::LeanBox, &controller(), None, 0, 0, BoxId(0)).err(),
                Some(TreeError::UnsupportedDimensions { nd })
            );
        }
        assert_eq!(
            create_tree(2, "Bogus", controller(), extents).err(),
            Some(TreeError::UnknownEventVariant("Bogus".to_string()))
        );
        assert_eq!(
            create_tree(3, "Lean", controller(), extents).err(),
            Some(TreeError::DimensionMismatch {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn every_box_kind_is_built() {
        let c = controller();
        for nd in 1..=MAX_DIMENSIONS {
            for kind in BoxKind::ALL {
                let node = create_box(nd, kind, &c, None, 0, 16, BoxId(100)).unwrap();
                assert_eq!(node.kind(), kind);
                assert_eq!(node.nd(), nd);
                assert_eq!(node.id(), BoxId(100));
                assert_eq!(node.is_leaf(), !kind.is_grid());
                let iv = node.extents().interval(0).unwrap();
                assert_eq!(iv.min(), -UNBOUNDED_LIMIT);
                assert_eq!(iv.max(), UNBOUNDED_LIMIT);
            }
        }
        assert!(
            c.next_unallocated_id() > 100,
            "explicit ids are never handed out again"
        );
    }

    #[test]
    fn grid_kinds_come_with_children() {
        let c = controller();
        let extents = Extents::cube(3, 0.0, 8.0).unwrap();
        let node = create_box(3, BoxKind::FullGridBox, &c, Some(extents), 1, 0, BoxId(7)).unwrap();
        let grid = node.into_full().unwrap();
        let children = grid.children();
        assert_eq!(children.len(), 8);
        assert!(children.iter().all(|n| n.depth() == 2 && n.id() > BoxId(7)));
        assert_eq!(
            create_box(3, BoxKind::LeanGridBox, &c, Some(extents), 3, 0, BoxId(8)).err(),
            Some(TreeError::DepthExceeded {
                depth: 4,
                max_depth: 3
            })
        );
        assert_eq!(
            create_box(3, BoxKind::LeanBox, &c, Some(extents), 4, 0, BoxId(9)).err(),
            Some(TreeError::DepthExceeded {
                depth: 4,
                max_depth: 3
            })
        );
    }

    #[test]
    fn variant_mismatch_is_reported() {
        let extents = Extents::cube(2, 0.0, 1.0).unwrap();
        let mut tree = create_tree(2, "Lean", controller(), extents).unwrap();
        let full = FullEvent::from_slice(&[0.5, 0.5], 1.0, 1.0, 0, 0, 3).unwrap();
        assert_eq!(
            tree.insert(full.into()),
            Err(TreeError::VariantMismatch {
                expected: EventVariant::Lean,
                found: EventVariant::Full
            })
        );
        tree.insert(full.to_lean().into()).unwrap();
        tree.split_all().unwrap();
        assert_eq!(tree.n_points(), 1);
        let ids: Vec<_> = tree
            .as_lean()
            .unwrap()
            .boxes(crate::TraversalFilter::ALL)
            .map(Node::id)
            .collect();
        assert_eq!(ids.len(), 1);
        assert!(tree.as_full().is_none());
    }
}
