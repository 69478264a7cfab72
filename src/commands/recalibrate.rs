//! Confidence-tier recalibration against deep-sequencing replicates.
//!
//! # Algorithm
//!
//! The primary call set streams through once, in coordinate groups. Each
//! low-confidence, low-allele-fraction candidate is looked up in up to
//! three replicate call sets (deeper runs of the same sample aligned
//! with bwa, bowtie and novoalign) and its confidence tier is moved by a
//! deterministic decision table:
//!
//! 1. Every configured replicate PASSes the call -> raise to MedConf.
//! 2. A Burrows-Wheeler replicate (bwa or bowtie) PASSes, novoalign
//!    PASSes, and no replicate REJECTs or misses the call -> raise to
//!    MedConf. A call missing from a deep-coverage replicate counts as
//!    evidence against it, the same as an explicit REJECT.
//! 3. Every configured replicate REJECTs or misses the call -> lower to
//!    Unclassified.
//! 4. Otherwise the tier is left alone.
//!
//! First match wins. Replicate cursors are queried once per coordinate
//! group and the resulting lookups are shared by every candidate at that
//! coordinate, so each replicate stream is read exactly once end to end.
//!
//! Output preserves line count and relative order; only the FILTER field
//! of reclassified records changes.

use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::genome::ContigOrder;
use crate::labels::{rename_legacy_labels, Confidence};
use crate::streaming::{AuxCursor, CoordinateGrouper};
use crate::textio::open_textfile;
use crate::vcf::{VariantKey, VcfError, VcfRecord};

/// Candidates above this allele fraction are left alone.
pub const MAX_VAF: f64 = 0.1;
/// Minimum upstream pass count for a candidate.
pub const MIN_PASSES: u64 = 15;
/// Maximum upstream reject count for a candidate.
pub const MAX_REJECTS: u64 = 10;

/// Per-aligner depth annotations every candidate must carry.
const DEPTH_KEYS: [&str; 3] = ["bwaDP", "bowtieDP", "novoDP"];

/// What one replicate stream says about one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corroboration {
    /// Present and accepted by the replicate's own filter.
    Pass,
    /// Present but rejected by the replicate's own filter.
    Reject,
    /// No record at this variant identity.
    Missing,
}

/// Outcome per configured replicate; None means the stream was not
/// supplied for this run.
#[derive(Debug, Default, Clone, Copy)]
struct Outcomes {
    bwa: Option<Corroboration>,
    bowtie: Option<Corroboration>,
    novo: Option<Corroboration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Promote,
    Demote,
    Unchanged,
}

/// Classify one candidate against one replicate's records at its
/// coordinate. A found record whose filter carries neither PASS nor
/// REJECT is malformed - there is no third corroboration state.
fn corroborate(
    key: &VariantKey,
    hits: &FxHashMap<VariantKey, VcfRecord>,
) -> Result<Corroboration, VcfError> {
    match hits.get(key) {
        None => Ok(Corroboration::Missing),
        Some(rec) if rec.has_filter("PASS") => Ok(Corroboration::Pass),
        Some(rec) if rec.has_filter("REJECT") => Ok(Corroboration::Reject),
        Some(rec) => Err(VcfError::Parse {
            line: rec.line_number(),
            message: format!(
                "replicate filter '{}' carries neither PASS nor REJECT",
                rec.filters()
            ),
        }),
    }
}

/// The decision table, evaluated in priority order over the configured
/// streams' outcomes.
fn decide(outcomes: &Outcomes) -> Verdict {
    let configured: Vec<Corroboration> = [outcomes.bwa, outcomes.bowtie, outcomes.novo]
        .into_iter()
        .flatten()
        .collect();
    if configured.is_empty() {
        return Verdict::Unchanged;
    }

    // Full promotion: unanimous PASS.
    if configured.iter().all(|c| *c == Corroboration::Pass) {
        return Verdict::Promote;
    }

    // Partial promotion: a Burrows-Wheeler aligner and novoalign both
    // PASS, with no REJECT and no missing call anywhere.
    let bw_pass = outcomes.bwa == Some(Corroboration::Pass)
        || outcomes.bowtie == Some(Corroboration::Pass);
    let against = |c: &Corroboration| matches!(c, Corroboration::Reject | Corroboration::Missing);
    if bw_pass && outcomes.novo == Some(Corroboration::Pass) && !configured.iter().any(against) {
        return Verdict::Promote;
    }

    // Demotion: no replicate corroborates the call.
    if configured.iter().all(against) {
        return Verdict::Demote;
    }

    Verdict::Unchanged
}

/// The candidate's current tier if it qualifies for reconciliation.
///
/// The three gate annotations are read for every data record; a missing
/// or non-numeric value is fatal regardless of the record's tier.
fn eligibility(record: &VcfRecord) -> Result<Option<Confidence>, VcfError> {
    let tvaf = record.info_f64("TVAF")?;
    let n_passes = record.info_u64("nPASSES")?;
    let n_rejects = record.info_u64("nREJECTS")?;

    let tier = match Confidence::from_filters(record.filters()) {
        Some(t) if t <= Confidence::MedConf => t,
        _ => return Ok(None),
    };

    if tvaf <= MAX_VAF && n_passes >= MIN_PASSES && n_rejects <= MAX_REJECTS {
        Ok(Some(tier))
    } else {
        Ok(None)
    }
}

/// Owned cursors over the configured replicate call sets.
///
/// The cursors are moved into the driver and mutated only through their
/// own advance operation; nothing else touches the underlying handles.
pub struct ReplicateSet {
    pub bwa: Option<AuxCursor<Box<dyn BufRead>>>,
    pub bowtie: Option<AuxCursor<Box<dyn BufRead>>>,
    pub novo: Option<AuxCursor<Box<dyn BufRead>>>,
}

impl ReplicateSet {
    /// No replicates configured.
    pub fn none() -> Self {
        Self {
            bwa: None,
            bowtie: None,
            novo: None,
        }
    }

    /// Open the configured replicate paths. Any unreadable configured
    /// path is fatal before the run starts.
    pub fn open(
        bwa: Option<&Path>,
        bowtie: Option<&Path>,
        novo: Option<&Path>,
    ) -> Result<Self, VcfError> {
        Ok(Self {
            bwa: bwa.map(AuxCursor::open).transpose()?,
            bowtie: bowtie.map(AuxCursor::open).transpose()?,
            novo: novo.map(AuxCursor::open).transpose()?,
        })
    }
}

/// Statistics from one recalibration run.
#[derive(Debug, Default, Clone)]
pub struct RecalibrateStats {
    /// Number of data records processed
    pub records: usize,
    /// Number of coordinate groups
    pub groups: usize,
    /// Number of records that passed the eligibility gate
    pub candidates: usize,
    /// Number of records promoted
    pub promoted: usize,
    /// Number of records demoted
    pub demoted: usize,
}

impl std::fmt::Display for RecalibrateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Records: {}, Groups: {}, Candidates: {}, Promoted: {}, Demoted: {}",
            self.records, self.groups, self.candidates, self.promoted, self.demoted
        )
    }
}

/// Recalibration command configuration.
#[derive(Debug, Clone, Default)]
pub struct RecalibrateCommand {
    /// Deep-coverage replicate called from a bwa alignment
    pub deepseq_bwa: Option<PathBuf>,
    /// Deep-coverage replicate called from a bowtie alignment
    pub deepseq_bowtie: Option<PathBuf>,
    /// Deep-coverage replicate called from a novoalign alignment
    pub deepseq_novo: Option<PathBuf>,
}

impl RecalibrateCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recalibrate `infile` into `output`, corroborating against the
    /// configured replicate call sets.
    pub fn run<P: AsRef<Path>, W: Write>(
        &self,
        infile: P,
        contigs: &ContigOrder,
        output: &mut W,
    ) -> Result<RecalibrateStats, VcfError> {
        let reader = open_textfile(infile.as_ref())?;
        let name = infile.as_ref().display().to_string();
        let replicates = ReplicateSet::open(
            self.deepseq_bwa.as_deref(),
            self.deepseq_bowtie.as_deref(),
            self.deepseq_novo.as_deref(),
        )?;
        self.run_streams(reader, &name, replicates, contigs, output)
    }

    /// Core driver over already-open streams.
    pub fn run_streams<R: BufRead, W: Write>(
        &self,
        mut primary: R,
        primary_name: &str,
        mut replicates: ReplicateSet,
        contigs: &ContigOrder,
        output: &mut W,
    ) -> Result<RecalibrateStats, VcfError> {
        let mut writer = BufWriter::with_capacity(256 * 1024, output);
        let mut stats = RecalibrateStats::default();

        // Header: copy through with labels renamed, stopping at the
        // first data line, which seeds the grouper.
        let mut buf = String::with_capacity(1024);
        let mut lines_consumed = 0;
        let mut first_data: Option<String> = None;
        loop {
            buf.clear();
            if primary.read_line(&mut buf)? == 0 {
                break;
            }
            lines_consumed += 1;

            let line = buf.trim_end();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                writeln!(writer, "{}", rename_legacy_labels(line))?;
            } else {
                first_data = Some(line.to_string());
                break;
            }
        }

        if first_data.is_none() {
            writer.flush()?;
            return Ok(stats);
        }

        let grouper =
            CoordinateGrouper::new(primary, contigs, primary_name, first_data, lines_consumed);

        for group in grouper {
            let group = group?;
            stats.groups += 1;

            // One cursor query per coordinate, shared by every candidate
            // in the group.
            let coord = group[0].coordinate();
            let bwa_hits = match replicates.bwa.as_mut() {
                Some(cursor) => Some(cursor.collect_at(&coord, contigs)?),
                None => None,
            };
            let bowtie_hits = match replicates.bowtie.as_mut() {
                Some(cursor) => Some(cursor.collect_at(&coord, contigs)?),
                None => None,
            };
            let novo_hits = match replicates.novo.as_mut() {
                Some(cursor) => Some(cursor.collect_at(&coord, contigs)?),
                None => None,
            };

            for mut record in group {
                stats.records += 1;

                if let Some(tier) = eligibility(&record)? {
                    stats.candidates += 1;

                    // The per-aligner depth pairs must parse; their
                    // values feed no decision.
                    for key in DEPTH_KEYS {
                        record.info_depth_pair(key)?;
                    }

                    let key = record.key();
                    let outcomes = Outcomes {
                        bwa: bwa_hits.as_ref().map(|h| corroborate(&key, h)).transpose()?,
                        bowtie: bowtie_hits
                            .as_ref()
                            .map(|h| corroborate(&key, h))
                            .transpose()?,
                        novo: novo_hits
                            .as_ref()
                            .map(|h| corroborate(&key, h))
                            .transpose()?,
                    };

                    let new_tier = match decide(&outcomes) {
                        // Promotion tops out at MedConf.
                        Verdict::Promote => tier.promote(2).min(Confidence::MedConf),
                        Verdict::Demote => tier.demote(2),
                        Verdict::Unchanged => tier,
                    };

                    if new_tier != tier {
                        let rewritten = record.filters().replace(tier.token(), new_tier.token());
                        record.set_filters(rewritten);
                        if new_tier > tier {
                            stats.promoted += 1;
                        } else {
                            stats.demoted += 1;
                        }
                    }
                }

                writeln!(writer, "{}", record.to_line())?;
            }
        }

        writer.flush()?;
        Ok(stats)
    }
}
