// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type shared by every tree operation.

use alloc::collections::TryReserveError;
use alloc::string::String;

use mdbox_geom::{GeomError, MAX_DIMENSIONS};

use crate::event::EventVariant;
use crate::node::BoxId;

/// Errors reported by tree construction, insertion, and splitting.
///
/// Configuration errors come from the factory or controller and never touch an
/// existing tree. Bounds errors come from `insert`. A failed split leaves the
/// box exactly as it was.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TreeError {
    /// The dimension count is zero or above [`MAX_DIMENSIONS`].
    #[error("{nd} dimensions requested, supported range is 1..={max}", max = MAX_DIMENSIONS)]
    UnsupportedDimensions {
        /// Requested dimension count.
        nd: usize,
    },
    /// The event variant name is not recognized.
    #[error("unknown event variant {0:?}, expected \"Lean\" or \"Full\"")]
    UnknownEventVariant(String),
    /// Two dimension counts that must agree do not.
    #[error("expected {expected} dimensions, found {found}")]
    DimensionMismatch {
        /// Dimension count of the tree or box.
        expected: usize,
        /// Dimension count of the argument.
        found: usize,
    },
    /// A box was requested deeper than the controller allows.
    #[error("depth {depth} exceeds the maximum depth {max_depth}")]
    DepthExceeded {
        /// Requested depth.
        depth: u32,
        /// Controller limit.
        max_depth: u32,
    },
    /// Invalid geometry or split configuration.
    #[error(transparent)]
    Geometry(#[from] GeomError),
    /// An event lies outside the extents of the box it was inserted into.
    #[error("event lies outside the extents of box {box_id}")]
    OutOfBounds {
        /// Box that rejected the event.
        box_id: BoxId,
    },
    /// A grid box found no child cell for a point it contains.
    #[error("no child of grid box {box_id} contains the event")]
    UnreachablePoint {
        /// Grid box that failed to route the event.
        box_id: BoxId,
    },
    /// An event of one variant was offered to a tree of the other.
    #[error("{found:?} event offered to a {expected:?} tree")]
    VariantMismatch {
        /// Variant of the tree.
        expected: EventVariant,
        /// Variant of the event.
        found: EventVariant,
    },
    /// Memory for a split could not be reserved.
    #[error("allocation failed while splitting box {box_id}")]
    AllocationFailed {
        /// Box whose split was abandoned.
        box_id: BoxId,
        /// Underlying reservation error.
        source: TryReserveError,
    },
}
