//! Coordinate grouping of the primary stream.
//!
//! # Algorithm
//!
//! Read one record and treat its coordinate as the group anchor; keep
//! appending records while the coordinate stays the same; the first
//! record at a different coordinate terminates the group and becomes the
//! next group's anchor (one record of lookahead carried across group
//! boundaries). Multi-allelic sites arrive as consecutive lines sharing
//! a coordinate and therefore land in one group.
//!
//! Sort order is verified inline as records stream through: a coordinate
//! regression relative to the contig-order table is fatal and names the
//! primary file. Each line is parsed exactly once; the same parse feeds
//! grouping, order checking and downstream reclassification.
//!
//! The legacy label rename is applied to every data line before parsing,
//! so grouped records already carry current label tokens.

use std::io::BufRead;

use crate::genome::ContigOrder;
use crate::labels::rename_legacy_labels;
use crate::vcf::{should_skip_line, Coordinate, VcfError, VcfRecord};

/// Lazy iterator of coordinate groups over the primary stream.
///
/// Finite and consumed once; the driver pulls groups until exhaustion.
pub struct CoordinateGrouper<'a, R: BufRead> {
    reader: R,
    file: String,
    contigs: &'a ContigOrder,
    /// First data line, handed over by the driver after the header.
    carried_line: Option<String>,
    /// One record of lookahead carried across group boundaries.
    pending: Option<VcfRecord>,
    prev: Option<Coordinate>,
    line_number: usize,
    done: bool,
}

impl<'a, R: BufRead> CoordinateGrouper<'a, R> {
    /// `first_line` is the first data line (the driver consumed the
    /// header); `lines_consumed` keeps error line numbers absolute.
    pub fn new(
        reader: R,
        contigs: &'a ContigOrder,
        file: impl Into<String>,
        first_line: Option<String>,
        lines_consumed: usize,
    ) -> Self {
        Self {
            reader,
            file: file.into(),
            contigs,
            carried_line: first_line,
            pending: None,
            prev: None,
            line_number: lines_consumed,
            done: false,
        }
    }

    /// Rename, parse and order-check one data line.
    fn process_line(&mut self, line: &str, line_number: usize) -> Result<VcfRecord, VcfError> {
        let line = rename_legacy_labels(line);
        let record = VcfRecord::parse(&line, line_number)?;
        let coord = record.coordinate();

        if let Some(ref prev) = self.prev {
            if self.contigs.compare(&coord, prev)? == std::cmp::Ordering::Less {
                return Err(VcfError::UnsortedInput {
                    file: self.file.clone(),
                    message: format!("{} at line {} comes after {}", coord, line_number, prev),
                });
            }
        }
        self.prev = Some(coord);

        Ok(record)
    }

    /// Next parsed record, or None at end of stream.
    fn next_record(&mut self) -> Result<Option<VcfRecord>, VcfError> {
        if let Some(line) = self.carried_line.take() {
            let line_number = self.line_number;
            return self.process_line(&line, line_number).map(Some);
        }

        let mut buf = String::with_capacity(1024);
        loop {
            buf.clear();
            let bytes_read = self.reader.read_line(&mut buf)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = buf.trim_end();
            if should_skip_line(line.as_bytes()) {
                continue;
            }

            let line_number = self.line_number;
            return self.process_line(line, line_number).map(Some);
        }
    }
}

impl<R: BufRead> Iterator for CoordinateGrouper<'_, R> {
    type Item = Result<Vec<VcfRecord>, VcfError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // Anchor: lookahead from the previous group, or the next record.
        let anchor = match self.pending.take() {
            Some(rec) => rec,
            None => match self.next_record() {
                Ok(Some(rec)) => rec,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            },
        };

        let anchor_coord = anchor.coordinate();
        let mut group = vec![anchor];

        loop {
            match self.next_record() {
                Ok(Some(rec)) => {
                    if rec.coordinate() == anchor_coord {
                        group.push(rec);
                    } else {
                        self.pending = Some(rec);
                        break;
                    }
                }
                Ok(None) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        Some(Ok(group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contigs(names: &[&str]) -> ContigOrder {
        let mut t = ContigOrder::new();
        for n in names {
            t.insert(n.to_string());
        }
        t
    }

    fn groups(content: &str, order: &ContigOrder) -> Vec<Vec<VcfRecord>> {
        CoordinateGrouper::new(content.as_bytes(), order, "primary.vcf", None, 0)
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_single_record_groups() {
        let order = contigs(&["chr1", "chr2"]);
        let content = "\
chr1\t100\t.\tG\tA\t.\tPASS\t.
chr1\t200\t.\tC\tT\t.\tPASS\t.
chr2\t100\t.\tA\tG\t.\tPASS\t.
";
        let got = groups(content, &order);
        assert_eq!(got.len(), 3);
        assert!(got.iter().all(|g| g.len() == 1));
    }

    #[test]
    fn test_multiallelic_site_forms_one_group() {
        let order = contigs(&["chr1"]);
        let content = "\
chr1\t100\t.\tG\tA\t.\tPASS\t.
chr1\t100\t.\tG\tC\t.\tPASS\t.
chr1\t300\t.\tC\tT\t.\tPASS\t.
";
        let got = groups(content, &order);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].len(), 2);
        // Original relative order within the group is preserved.
        assert_eq!(got[0][0].alt(), "A");
        assert_eq!(got[0][1].alt(), "C");
        assert_eq!(got[1].len(), 1);
    }

    #[test]
    fn test_carried_first_line_is_grouped() {
        let order = contigs(&["chr1"]);
        let rest = "chr1\t100\t.\tG\tC\t.\tPASS\t.\nchr1\t200\t.\tC\tT\t.\tPASS\t.\n";
        let first = Some("chr1\t100\t.\tG\tA\t.\tPASS\t.".to_string());

        let got: Vec<_> = CoordinateGrouper::new(rest.as_bytes(), &order, "primary.vcf", first, 1)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].len(), 2);
    }

    #[test]
    fn test_legacy_labels_renamed_before_grouping() {
        let order = contigs(&["chr1"]);
        let content = "chr1\t100\t.\tG\tA\t.\tNeutralEvidence\tTVAF=0.05\n";
        let got = groups(content, &order);
        assert_eq!(got[0][0].filters(), "LowConf");
    }

    #[test]
    fn test_position_regression_is_fatal() {
        let order = contigs(&["chr1"]);
        let content = "chr1\t300\t.\tG\tA\t.\tPASS\t.\nchr1\t100\t.\tC\tT\t.\tPASS\t.\n";
        let mut grouper =
            CoordinateGrouper::new(content.as_bytes(), &order, "primary.vcf", None, 0);

        let err = grouper
            .find_map(|r| r.err())
            .expect("regression must surface");
        let msg = err.to_string();
        assert!(msg.contains("primary.vcf"));
        assert!(msg.contains("properly sorted"));
    }

    #[test]
    fn test_contig_regression_is_fatal() {
        let order = contigs(&["chr1", "chr2"]);
        let content = "chr2\t100\t.\tG\tA\t.\tPASS\t.\nchr1\t500\t.\tC\tT\t.\tPASS\t.\n";
        let mut grouper =
            CoordinateGrouper::new(content.as_bytes(), &order, "primary.vcf", None, 0);

        assert!(grouper.find_map(|r| r.err()).is_some());
    }

    #[test]
    fn test_iterator_terminates_after_error() {
        let order = contigs(&["chr1"]);
        let content = "chr1\t300\t.\tG\tA\t.\tPASS\t.\nchr1\t100\t.\tC\tT\t.\tPASS\t.\n";
        let mut grouper =
            CoordinateGrouper::new(content.as_bytes(), &order, "primary.vcf", None, 0);

        // Pull everything: after the Err item the iterator is fused.
        let items: Vec<_> = grouper.by_ref().collect();
        assert!(items.iter().any(|r| r.is_err()));
        assert!(grouper.next().is_none());
    }
}
