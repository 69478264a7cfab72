//! Command implementations for retier.

pub mod recalibrate;

pub use recalibrate::{
    Corroboration, RecalibrateCommand, RecalibrateStats, ReplicateSet, MAX_REJECTS, MAX_VAF,
    MIN_PASSES,
};
