//! Streaming VCF line model.
//!
//! Records are kept as their raw tab-split fields so that emission
//! reproduces the input byte-for-byte apart from the one field this tool
//! rewrites (FILTER). Only the position is parsed eagerly; INFO and
//! FORMAT lookups happen on demand.

use std::fmt;
use std::io;

use memchr::memchr;
use thiserror::Error;

/// Errors that can occur while recalibrating a call set.
#[derive(Error, Debug)]
pub enum VcfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Contig '{contig}' not found in the reference index")]
    UnknownContig { contig: String },

    #[error("{file} does not seem to be properly sorted: {message}")]
    UnsortedInput { file: String, message: String },

    #[error("Cannot open replicate call set '{path}': {source}")]
    MissingAuxiliary { path: String, source: io::Error },
}

pub type Result<T> = std::result::Result<T, VcfError>;

/// A genomic location: contig name plus 1-based position.
///
/// Coordinates are only comparable through a
/// [`ContigOrder`](crate::genome::ContigOrder) table; lexical contig
/// comparison is wrong for genome-ordered files (chr9 before chr10).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub chrom: String,
    pub pos: u64,
}

impl Coordinate {
    pub fn new(chrom: impl Into<String>, pos: u64) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chrom, self.pos)
    }
}

/// Identity of one variant call: coordinate plus REF plus the full ALT
/// string as written (multi-allelic records match on the whole
/// comma-joined ALT, not the first allele).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pub chrom: String,
    pub pos: u64,
    pub ref_allele: String,
    pub alt_allele: String,
}

/// One data line of a VCF, tab-split.
///
/// Field layout: CHROM POS ID REF ALT QUAL FILTER INFO [FORMAT sample...].
#[derive(Debug, Clone)]
pub struct VcfRecord {
    fields: Vec<String>,
    pos: u64,
    line_number: usize,
}

impl VcfRecord {
    /// Parse one data line. `line_number` is carried for error messages.
    pub fn parse(line: &str, line_number: usize) -> Result<Self> {
        let fields: Vec<String> = line.split('\t').map(|s| s.to_string()).collect();
        if fields.len() < 8 {
            return Err(VcfError::Parse {
                line: line_number,
                message: format!("expected at least 8 fields, got {}", fields.len()),
            });
        }
        let pos: u64 = fields[1].parse().map_err(|_| VcfError::Parse {
            line: line_number,
            message: format!("invalid position: '{}'", fields[1]),
        })?;
        Ok(Self {
            fields,
            pos,
            line_number,
        })
    }

    #[inline]
    pub fn chrom(&self) -> &str {
        &self.fields[0]
    }

    /// Line number this record was parsed from, for error messages.
    #[inline]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.chrom(), self.pos)
    }

    #[inline]
    pub fn ref_allele(&self) -> &str {
        &self.fields[3]
    }

    /// The full ALT string, possibly comma-joined.
    #[inline]
    pub fn alt(&self) -> &str {
        &self.fields[4]
    }

    /// The first ALT allele of a possibly multi-allelic record.
    pub fn first_alt(&self) -> &str {
        self.alt().split(',').next().unwrap_or("")
    }

    /// The raw FILTER field.
    #[inline]
    pub fn filters(&self) -> &str {
        &self.fields[6]
    }

    /// Replace the FILTER field. No other field is touched.
    pub fn set_filters(&mut self, filters: String) {
        self.fields[6] = filters;
    }

    /// True if the FILTER field contains `name` as a whole token
    /// (tokens are `;`- or space-joined).
    pub fn has_filter(&self, name: &str) -> bool {
        self.fields[6]
            .split(|c| c == ';' || c == ' ')
            .any(|tok| tok == name)
    }

    /// Look up a `key=value` entry in the INFO field.
    pub fn info_value(&self, key: &str) -> Option<&str> {
        self.fields[7].split(';').find_map(|entry| {
            let (k, v) = entry.split_once('=')?;
            (k == key).then_some(v)
        })
    }

    /// Numeric INFO annotation; missing or non-numeric is fatal.
    pub fn info_f64(&self, key: &str) -> Result<f64> {
        self.info_value(key)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| self.bad_annotation(key))
    }

    /// Integer INFO annotation; missing or non-numeric is fatal.
    pub fn info_u64(&self, key: &str) -> Result<u64> {
        self.info_value(key)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| self.bad_annotation(key))
    }

    /// A comma-pair INFO annotation such as `bwaDP=12,345`
    /// (variant-supporting depth, total depth).
    pub fn info_depth_pair(&self, key: &str) -> Result<(u64, u64)> {
        let raw = self.info_value(key).ok_or_else(|| self.bad_annotation(key))?;
        let (vdp, dp) = raw.split_once(',').ok_or_else(|| self.bad_annotation(key))?;
        match (vdp.parse(), dp.parse()) {
            (Ok(v), Ok(d)) => Ok((v, d)),
            _ => Err(self.bad_annotation(key)),
        }
    }

    /// Look up a FORMAT key in the `sample_idx`-th sample column (0-based).
    pub fn sample_value(&self, key: &str, sample_idx: usize) -> Option<&str> {
        let format = self.fields.get(8)?;
        let column = self.fields.get(9 + sample_idx)?;
        let slot = format.split(':').position(|k| k == key)?;
        column.split(':').nth(slot)
    }

    /// The identity used to match this call against replicate streams.
    pub fn key(&self) -> VariantKey {
        VariantKey {
            chrom: self.chrom().to_string(),
            pos: self.pos,
            ref_allele: self.ref_allele().to_string(),
            alt_allele: self.alt().to_string(),
        }
    }

    /// Rejoin the fields into an output line.
    pub fn to_line(&self) -> String {
        self.fields.join("\t")
    }

    fn bad_annotation(&self, key: &str) -> VcfError {
        VcfError::Parse {
            line: self.line_number,
            message: format!("INFO annotation '{}' missing or malformed", key),
        }
    }
}

/// True for lines the record scanners ignore: empty lines and `#` headers.
#[inline]
pub fn should_skip_line(line: &[u8]) -> bool {
    line.is_empty() || line[0] == b'#'
}

/// Fast u64 parsing - no allocation, no error formatting.
///
/// Returns None if the input is empty or contains non-digit characters.
#[inline(always)]
pub fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.wrapping_mul(10).wrapping_add(d as u64);
    }
    Some(n)
}

/// Parse the first two VCF columns using memchr - zero allocation.
///
/// Returns (chrom_bytes, pos) or None if the line is malformed. Used by
/// the replicate cursors to order-compare lines without paying full
/// record parse cost for records that will be skipped.
#[inline(always)]
pub fn parse_coordinate_bytes(line: &[u8]) -> Option<(&[u8], u64)> {
    let tab1 = memchr(b'\t', line)?;
    let chrom = &line[..tab1];
    if chrom.is_empty() {
        return None;
    }

    let rest = &line[tab1 + 1..];
    let pos_len = memchr(b'\t', rest).unwrap_or(rest.len());
    let pos = parse_u64_fast(&rest[..pos_len])?;

    Some((chrom, pos))
}
