//! retier: confidence-tier recalibration of variant calls
//!
//! This library cross-checks low-confidence, low-allele-fraction calls
//! in a primary VCF against up to three deep-sequencing replicate call
//! sets and promotes or demotes each call's confidence tier.
//!
//! # Features
//!
//! - **Streaming**: every stream is read once, forward-only, with one
//!   line of lookahead per replicate
//! - **Strict ordering**: all streams are validated against one
//!   contig-order table built from the reference index
//! - **Order-preserving output**: only the FILTER field of reclassified
//!   records changes
//!
//! # Example
//!
//! ```rust,no_run
//! use retier_genomics::{commands::RecalibrateCommand, genome::ContigOrder};
//!
//! let contigs = ContigOrder::from_fai("genome.fa.fai").unwrap();
//!
//! let mut cmd = RecalibrateCommand::new();
//! cmd.deepseq_bwa = Some("deep_bwa.vcf.gz".into());
//!
//! let mut out = Vec::new();
//! let stats = cmd.run("calls.vcf", &contigs, &mut out).unwrap();
//! eprintln!("{}", stats);
//! ```

pub mod commands;
pub mod genome;
pub mod labels;
pub mod streaming;
pub mod textio;
pub mod vcf;

// Re-export commonly used types
pub use commands::{RecalibrateCommand, RecalibrateStats};
pub use genome::ContigOrder;
pub use labels::Confidence;
pub use vcf::{Coordinate, VariantKey, VcfError, VcfRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commands::{RecalibrateCommand, RecalibrateStats, ReplicateSet};
    pub use crate::genome::ContigOrder;
    pub use crate::labels::Confidence;
    pub use crate::streaming::{AuxCursor, CoordinateGrouper};
    pub use crate::vcf::{Coordinate, VariantKey, VcfError, VcfRecord};
}
