// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event records: one observation each, a coordinate vector plus a weight.
//!
//! Both variants are fixed-size and `Copy`. Coordinates live in an inline
//! [`Coords`] buffer, so a `Vec` of events is one contiguous allocation no matter
//! the dimension count.

use core::fmt::Debug;
use core::str::FromStr;

use alloc::string::ToString;
use mdbox_geom::{Coords, GeomError};

use crate::error::TreeError;

/// Which payload a tree stores per event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventVariant {
    /// Coordinates, signal, and squared error only.
    Lean,
    /// Lean payload plus run, goniometer, and detector provenance.
    Full,
}

impl EventVariant {
    /// Both variants, in dispatch-table order.
    pub const ALL: [Self; 2] = [Self::Lean, Self::Full];

    /// Canonical name, accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lean => "Lean",
            Self::Full => "Full",
        }
    }

    pub(crate) const fn table_index(self) -> usize {
        match self {
            Self::Lean => 0,
            Self::Full => 1,
        }
    }
}

impl FromStr for EventVariant {
    type Err = TreeError;

    /// Parses `"Lean"` or `"Full"`; the long names `"MDLeanEvent"` and
    /// `"MDEvent"` are accepted too.
    fn from_str(s: &str) -> Result<Self, TreeError> {
        match s {
            "Lean" | "MDLeanEvent" => Ok(Self::Lean),
            "Full" | "MDEvent" => Ok(Self::Full),
            other => Err(TreeError::UnknownEventVariant(other.to_string())),
        }
    }
}

/// Behavior shared by the event variants stored in a tree.
pub trait Event: Copy + Debug + Send + Sync + 'static {
    /// Variant tag of this event type.
    const VARIANT: EventVariant;

    /// Coordinates of the event.
    fn coords(&self) -> &[f32];

    /// Coordinates, writable in place (for coordinate transforms).
    fn coords_mut(&mut self) -> &mut [f32];

    /// Signal weight.
    fn signal(&self) -> f32;

    /// Squared error of the signal.
    fn error_squared(&self) -> f32;

    /// Number of dimensions.
    #[inline]
    fn nd(&self) -> usize {
        self.coords().len()
    }
}

/// An event carrying only what aggregation needs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LeanEvent {
    coords: Coords,
    signal: f32,
    error_squared: f32,
}

impl LeanEvent {
    /// Create an event.
    pub const fn new(coords: Coords, signal: f32, error_squared: f32) -> Self {
        Self {
            coords,
            signal,
            error_squared,
        }
    }

    /// Create an event from a coordinate slice.
    pub fn from_slice(coords: &[f32], signal: f32, error_squared: f32) -> Result<Self, GeomError> {
        Ok(Self::new(Coords::new(coords)?, signal, error_squared))
    }

    /// The coordinate buffer.
    pub const fn center(&self) -> &Coords {
        &self.coords
    }
}

impl Event for LeanEvent {
    const VARIANT: EventVariant = EventVariant::Lean;

    #[inline]
    fn coords(&self) -> &[f32] {
        self.coords.as_slice()
    }

    #[inline]
    fn coords_mut(&mut self) -> &mut [f32] {
        self.coords.as_mut_slice()
    }

    #[inline]
    fn signal(&self) -> f32 {
        self.signal
    }

    #[inline]
    fn error_squared(&self) -> f32 {
        self.error_squared
    }
}

/// An event that also records where it came from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FullEvent {
    coords: Coords,
    signal: f32,
    error_squared: f32,
    run_index: u16,
    goniometer_index: u16,
    detector_id: i32,
}

impl FullEvent {
    /// Create an event with provenance.
    pub const fn new(
        coords: Coords,
        signal: f32,
        error_squared: f32,
        run_index: u16,
        goniometer_index: u16,
        detector_id: i32,
    ) -> Self {
        Self {
            coords,
            signal,
            error_squared,
            run_index,
            goniometer_index,
            detector_id,
        }
    }

    /// Create an event with provenance from a coordinate slice.
    pub fn from_slice(
        coords: &[f32],
        signal: f32,
        error_squared: f32,
        run_index: u16,
        goniometer_index: u16,
        detector_id: i32,
    ) -> Result<Self, GeomError> {
        Ok(Self::new(
            Coords::new(coords)?,
            signal,
            error_squared,
            run_index,
            goniometer_index,
            detector_id,
        ))
    }

    /// Index of the run (experiment) that produced the event.
    pub const fn run_index(&self) -> u16 {
        self.run_index
    }

    /// Index of the goniometer setting within the run.
    pub const fn goniometer_index(&self) -> u16 {
        self.goniometer_index
    }

    /// Detector pixel that recorded the event.
    pub const fn detector_id(&self) -> i32 {
        self.detector_id
    }

    /// The event without its provenance.
    pub const fn to_lean(&self) -> LeanEvent {
        LeanEvent::new(self.coords, self.signal, self.error_squared)
    }
}

impl Event for FullEvent {
    const VARIANT: EventVariant = EventVariant::Full;

    #[inline]
    fn coords(&self) -> &[f32] {
        self.coords.as_slice()
    }

    #[inline]
    fn coords_mut(&mut self) -> &mut [f32] {
        self.coords.as_mut_slice()
    }

    #[inline]
    fn signal(&self) -> f32 {
        self.signal
    }

    #[inline]
    fn error_squared(&self) -> f32 {
        self.error_squared
    }
}

/// An event of either variant, for trees whose variant is chosen at runtime.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AnyEvent {
    /// A lean event.
    Lean(LeanEvent),
    /// A full event.
    Full(FullEvent),
}

impl AnyEvent {
    /// Variant of the wrapped event.
    pub const fn variant(&self) -> EventVariant {
        match self {
            Self::Lean(_) => EventVariant::Lean,
            Self::Full(_) => EventVariant::Full,
        }
    }
}

impl From<LeanEvent> for AnyEvent {
    fn from(e: LeanEvent) -> Self {
        Self::Lean(e)
    }
}

impl From<FullEvent> for AnyEvent {
    fn from(e: FullEvent) -> Self {
        Self::Full(e)
    }
}
