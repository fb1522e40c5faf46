// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-tree split policy and box-ID allocation.

use core::sync::atomic::{AtomicU64, Ordering};

use mdbox_geom::{GridShape, MAX_DIMENSIONS};

use crate::error::TreeError;
use crate::node::BoxId;

/// Split policy for one tree.
///
/// Only the first `nd` entries of [`split_into`](Self::split_into) are used by a
/// tree of `nd` dimensions. A split creates `∏ split_into[d]` children at once,
/// which grows exponentially with `nd`: nine dimensions split in two give 512
/// children per split, split in four give 262 144.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitPolicy {
    /// A leaf holding more events than this splits on the next split pass.
    pub split_threshold: usize,
    /// Deepest allowed level. Leaves at this depth never split.
    pub max_depth: u32,
    /// Number of equal cells per dimension created by a split.
    pub split_into: [usize; MAX_DIMENSIONS],
}

impl SplitPolicy {
    /// The same split factor along every dimension.
    pub const fn uniform(split_threshold: usize, max_depth: u32, split_into: usize) -> Self {
        Self {
            split_threshold,
            max_depth,
            split_into: [split_into; MAX_DIMENSIONS],
        }
    }

    /// Replace the split factor of one dimension.
    pub fn with_split_into(mut self, dim: usize, factor: usize) -> Self {
        if let Some(slot) = self.split_into.get_mut(dim) {
            *slot = factor;
        }
        self
    }
}

impl Default for SplitPolicy {
    fn default() -> Self {
        Self::uniform(1000, 5, 2)
    }
}

/// Shared policy object consulted by every box of one tree.
///
/// The policy is fixed at construction. The only mutable state is the box-ID
/// counter, which is atomic so sibling subtrees can split on different threads.
#[derive(Debug)]
pub struct BoxController {
    policy: SplitPolicy,
    next_id: AtomicU64,
}

impl BoxController {
    /// Create a controller. IDs start at zero.
    pub const fn new(policy: SplitPolicy) -> Self {
        Self {
            policy,
            next_id: AtomicU64::new(0),
        }
    }

    /// The split policy.
    #[inline]
    pub const fn policy(&self) -> &SplitPolicy {
        &self.policy
    }

    /// Split threshold (events per leaf).
    #[inline]
    pub const fn split_threshold(&self) -> usize {
        self.policy.split_threshold
    }

    /// Maximum depth.
    #[inline]
    pub const fn max_depth(&self) -> u32 {
        self.policy.max_depth
    }

    /// Validated grid shape used when splitting a box of `nd` dimensions.
    pub fn grid_shape(&self, nd: usize) -> Result<GridShape, TreeError> {
        if nd == 0 || nd > MAX_DIMENSIONS {
            return Err(TreeError::UnsupportedDimensions { nd });
        }
        Ok(GridShape::new(&self.policy.split_into[..nd])?)
    }

    /// Whether a leaf with `n_events` events at `depth` should split.
    #[inline]
    pub const fn should_split(&self, n_events: usize, depth: u32) -> bool {
        n_events > self.policy.split_threshold && depth < self.policy.max_depth
    }

    /// Allocate one box ID.
    #[inline]
    pub fn next_id(&self) -> BoxId {
        BoxId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Allocate `n` consecutive box IDs and return the first.
    #[inline]
    pub fn claim_ids(&self, n: usize) -> BoxId {
        BoxId(self.next_id.fetch_add(n as u64, Ordering::Relaxed))
    }

    /// Make sure IDs handed out from now on are greater than `id`.
    ///
    /// Used when boxes are created with explicit IDs, for example when a
    /// persistence layer rebuilds a tree.
    pub fn ensure_id_above(&self, id: BoxId) {
        self.next_id
            .fetch_max(id.0.saturating_add(1), Ordering::Relaxed);
    }

    /// The next ID that would be allocated; every ID handed out so far is below it.
    pub fn next_unallocated_id(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }
}

impl Default for BoxController {
    fn default() -> Self {
        Self::new(SplitPolicy::default())
    }
}
