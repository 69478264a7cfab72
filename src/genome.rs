//! Contig-order table built from a FASTA index.
//!
//! Parses .fai files (tab-delimited: name\tlength\toffset\tlinebases\tlinewidth)
//! and assigns each contig its rank in file order. The table defines the
//! one total order over coordinates that every stream in a run must obey.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::vcf::{Coordinate, VcfError};

/// Total order over contig names, derived from a reference index.
/// Immutable once built; shared read-only by every stream component.
#[derive(Debug, Clone, Default)]
pub struct ContigOrder {
    /// Map of contig name to rank (position in the index)
    ranks: FxHashMap<String, usize>,
    /// Contig names in index order
    order: Vec<String>,
}

impl ContigOrder {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            ranks: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Load contig order from a .fai file.
    /// Only the first column (the contig name) is used.
    pub fn from_fai<P: AsRef<Path>>(path: P) -> Result<Self, VcfError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut table = Self::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            let name = line.split('\t').next().unwrap_or("");
            if name.is_empty() {
                return Err(VcfError::Parse {
                    line: line_num + 1,
                    message: "fai line has an empty contig name".to_string(),
                });
            }

            table.insert(name.to_string());
        }

        Ok(table)
    }

    /// Register a contig (appends to the order if new).
    pub fn insert(&mut self, name: String) {
        if !self.ranks.contains_key(&name) {
            self.ranks.insert(name.clone(), self.order.len());
            self.order.push(name);
        }
    }

    /// Rank of a contig, or None if it is not in the index.
    #[inline]
    pub fn rank(&self, chrom: &str) -> Option<usize> {
        self.ranks.get(chrom).copied()
    }

    /// Check if a contig exists.
    #[inline]
    pub fn has_contig(&self, chrom: &str) -> bool {
        self.ranks.contains_key(chrom)
    }

    /// Get all contig names in index order.
    pub fn contigs(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    /// Get number of contigs.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Order two coordinates: contig rank first, then position.
    ///
    /// A contig absent from the index is fatal - it means the input was
    /// called against a different reference than the one supplied.
    pub fn compare(&self, a: &Coordinate, b: &Coordinate) -> Result<Ordering, VcfError> {
        let rank_a = self.rank(&a.chrom).ok_or_else(|| VcfError::UnknownContig {
            contig: a.chrom.clone(),
        })?;
        let rank_b = self.rank(&b.chrom).ok_or_else(|| VcfError::UnknownContig {
            contig: b.chrom.clone(),
        })?;

        Ok(rank_a.cmp(&rank_b).then(a.pos.cmp(&b.pos)))
    }
}
