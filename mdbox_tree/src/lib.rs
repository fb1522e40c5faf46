// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! MD Box Tree: an adaptive N-dimensional tree of weighted events.
//!
//! Events (a point plus a signal and its squared error) are inserted into
//! leaf boxes. A leaf that grows past the split threshold is replaced by a grid
//! box whose children tile it on a regular grid, down to a maximum depth. The
//! result supports fast aggregate sums, region queries, and integration over
//! sub-regions, for any dimension count from 1 to [`MAX_DIMENSIONS`].
//!
//! - [`EventTree`]: a root box plus its shared [`BoxController`].
//! - [`Node`]: a box handle, either a leaf ([`MdBox`]) or a grid ([`MdGridBox`]).
//! - [`LeanEvent`] / [`FullEvent`]: the two event payloads.
//! - [`create_tree`] / [`create_box`]: construction from a dimension count and
//!   variant chosen at run time.
//!
//! ## Splitting
//!
//! Inserts never split. [`EventTree::split_all`] is the finalize step that
//! subdivides every overfull leaf recursively and refreshes cached aggregates.
//! Insert in bulk, then split once. A split is all-or-nothing: if memory for
//! it cannot be reserved the leaf stays as it was and the error is returned.
//! A leaf too narrow for `f32` to subdivide stops splitting, like a leaf at the
//! maximum depth.
//!
//! ## Cached aggregates
//!
//! Boxes cache their signal, squared error, and event count. Inserting drops
//! the caches along the insertion path, and reads fall back to summing the
//! children, so results are always current. [`EventTree::refresh_cache`] (run by
//! `split_all`) makes later reads O(1) again.
//!
//! ## Features
//!
//! - `std` (default): forwards to dependencies.
//! - `rayon`: split and refresh sibling subtrees in parallel.
//! - `tracing`: a span around `split_all` and a debug event per split leaf.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mdbox_geom::Extents;
//! use mdbox_tree::{BoxController, EventTree, LeanEvent, SplitPolicy, TraversalFilter};
//!
//! let controller = Arc::new(BoxController::new(SplitPolicy::uniform(2, 4, 2)));
//! let mut tree = EventTree::new(controller, Extents::cube(2, 0.0, 1.0).unwrap()).unwrap();
//!
//! let events = [(0.1, 0.1), (0.2, 0.8), (0.7, 0.3), (0.9, 0.9), (0.95, 0.85)];
//! for (x, y) in events {
//!     tree.insert(LeanEvent::from_slice(&[x, y], 1.0, 1.0).unwrap()).unwrap();
//! }
//! tree.split_all().unwrap();
//!
//! // Every leaf now holds at most two events.
//! assert!(tree.boxes(TraversalFilter::leaves()).all(|n| n.n_points() <= 2));
//!
//! // Sum over the upper right quadrant.
//! let quadrant = Extents::cube(2, 0.5, 1.0).unwrap();
//! assert_eq!(tree.integrate(&quadrant).unwrap().signal, 2.0);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod controller;
pub mod error;
pub mod event;
pub mod factory;
pub mod grid_box;
pub mod iter;
pub mod leaf;
pub mod node;
pub mod tree;

pub use controller::{BoxController, SplitPolicy};
pub use error::TreeError;
pub use event::{AnyEvent, Event, EventVariant, FullEvent, LeanEvent};
pub use factory::{AnyNode, AnyTree, BoxKind, create_box, create_tree};
pub use grid_box::MdGridBox;
pub use iter::{BoxIter, TraversalFilter};
pub use leaf::MdBox;
pub use mdbox_geom::{Coords, Extents, MAX_DIMENSIONS};
pub use node::{Aggregate, BoxFlags, BoxId, Node, SplitOutcome};
pub use tree::{EventTree, TreeStats};
