//! Multi-stream coordinate synchronization.
//!
//! This module provides the two stream walkers the recalibration engine
//! is built on:
//! - [`CoordinateGrouper`]: groups the primary stream into coordinate
//!   groups with inline sort validation
//! - [`AuxCursor`]: forward-only, one-line-lookahead cursor over a
//!   sorted replicate stream
//!
//! Both walkers hold O(1) state beyond the current coordinate group.

pub mod cursor;
pub mod grouper;

pub use cursor::AuxCursor;
pub use grouper::CoordinateGrouper;
