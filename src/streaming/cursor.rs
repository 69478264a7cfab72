//! Forward-only cursor over one sorted replicate call set.
//!
//! # Algorithm
//!
//! The cursor is asked for "every record at coordinate C" with
//! monotonically increasing C (the primary stream's group anchors):
//! 1. Records strictly before C are consumed and dropped - a replicate
//!    need not contain every primary coordinate.
//! 2. Records exactly at C are fully parsed and keyed by variant identity.
//! 3. The first record strictly after C ends the scan and is held as the
//!    single line of lookahead for the next call; it is never re-read
//!    from the underlying stream.
//!
//! Records on the skip path only pay a byte-level coordinate peek; full
//! record parsing happens for records at the target coordinate.
//!
//! The cursor validates its own stream's sort order inline and fails
//! fast on regression, naming the offending file.

use std::cmp::Ordering;
use std::io::BufRead;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::genome::ContigOrder;
use crate::textio::open_textfile;
use crate::vcf::{
    parse_coordinate_bytes, should_skip_line, Coordinate, VariantKey, VcfError, VcfRecord,
};

/// One line of lookahead: coordinate pre-parsed so resumption never
/// re-derives it.
#[derive(Debug)]
struct Pending {
    coord: Coordinate,
    line: String,
    line_number: usize,
}

/// Cursor over one sorted, forward-only replicate stream.
pub struct AuxCursor<R: BufRead> {
    reader: R,
    file: String,
    pending: Option<Pending>,
    prev: Option<Coordinate>,
    line_number: usize,
    exhausted: bool,
}

impl AuxCursor<Box<dyn BufRead>> {
    /// Open a replicate call set from a path (plain or gzipped).
    /// A configured but unreadable path is fatal.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VcfError> {
        let display = path.as_ref().display().to_string();
        let reader = open_textfile(path.as_ref()).map_err(|e| match e {
            VcfError::Io(source) => VcfError::MissingAuxiliary {
                path: display.clone(),
                source,
            },
            other => other,
        })?;
        Ok(Self::from_reader(reader, display))
    }
}

impl<R: BufRead> AuxCursor<R> {
    /// Build a cursor over any line source (used by tests).
    pub fn from_reader(reader: R, file: impl Into<String>) -> Self {
        Self {
            reader,
            file: file.into(),
            pending: None,
            prev: None,
            line_number: 0,
            exhausted: false,
        }
    }

    /// Collect every record exactly at `target`, keyed by variant
    /// identity. Returns an empty map when the stream has nothing there
    /// (including after exhaustion).
    pub fn collect_at(
        &mut self,
        target: &Coordinate,
        contigs: &ContigOrder,
    ) -> Result<FxHashMap<VariantKey, VcfRecord>, VcfError> {
        let mut found: FxHashMap<VariantKey, VcfRecord> = FxHashMap::default();

        loop {
            let pending = match self.take_pending(contigs)? {
                Some(p) => p,
                None => break,
            };

            match contigs.compare(&pending.coord, target)? {
                Ordering::Less => continue,
                Ordering::Equal => {
                    let record = VcfRecord::parse(&pending.line, pending.line_number)?;
                    found.insert(record.key(), record);
                }
                Ordering::Greater => {
                    // Past the target: hold for the next call.
                    self.pending = Some(pending);
                    break;
                }
            }
        }

        Ok(found)
    }

    /// True once the underlying stream is fully consumed and no
    /// lookahead line remains.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.pending.is_none()
    }

    /// Next record line: the held lookahead if present, otherwise read
    /// from the stream. Order is validated when a line is first read.
    fn take_pending(&mut self, contigs: &ContigOrder) -> Result<Option<Pending>, VcfError> {
        if let Some(p) = self.pending.take() {
            return Ok(Some(p));
        }
        if self.exhausted {
            return Ok(None);
        }

        let mut buf = String::with_capacity(1024);
        loop {
            buf.clear();
            let bytes_read = self.reader.read_line(&mut buf)?;
            if bytes_read == 0 {
                self.exhausted = true;
                return Ok(None);
            }
            self.line_number += 1;

            let line = buf.trim_end();
            if should_skip_line(line.as_bytes()) {
                continue;
            }

            let (chrom, pos) =
                parse_coordinate_bytes(line.as_bytes()).ok_or_else(|| VcfError::Parse {
                    line: self.line_number,
                    message: format!("malformed record in {}", self.file),
                })?;
            let coord = Coordinate::new(String::from_utf8_lossy(chrom).into_owned(), pos);

            if let Some(ref prev) = self.prev {
                if contigs.compare(&coord, prev)? == Ordering::Less {
                    return Err(VcfError::UnsortedInput {
                        file: self.file.clone(),
                        message: format!(
                            "{} at line {} comes after {}",
                            coord, self.line_number, prev
                        ),
                    });
                }
            }
            self.prev = Some(coord.clone());

            return Ok(Some(Pending {
                coord,
                line: line.to_string(),
                line_number: self.line_number,
            }));
        }
    }
}
