//! End-to-end recalibration tests over real files.
//!
//! Each test builds a primary call set, a reference index and up to
//! three replicate call sets on disk, runs the command through the
//! library API, and checks the emitted VCF line by line.

use std::io::Write;

use tempfile::NamedTempFile;

use retier_genomics::commands::{RecalibrateCommand, RecalibrateStats};
use retier_genomics::genome::ContigOrder;
use retier_genomics::vcf::VcfError;

const HEADER: &str = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// A .fai with the given contigs in order; the other columns are
/// irrelevant to the contig-order table.
fn write_fai(contigs: &[&str]) -> NamedTempFile {
    let content: String = contigs
        .iter()
        .map(|c| format!("{}\t1000000\t10\t70\t71\n", c))
        .collect();
    write_temp(&content)
}

fn candidate_line(chrom: &str, pos: u64, alt: &str, filters: &str) -> String {
    format!(
        "{}\t{}\t.\tG\t{}\t.\t{}\tTVAF=0.05;nPASSES=20;nREJECTS=2;bwaDP=5,100;bowtieDP=6,110;novoDP=4,90\n",
        chrom, pos, alt, filters
    )
}

fn aux_line(chrom: &str, pos: u64, alt: &str, filter: &str) -> String {
    format!("{}\t{}\t.\tG\t{}\t.\t{}\t.\n", chrom, pos, alt, filter)
}

#[derive(Debug)]
struct Run {
    output: String,
    stats: RecalibrateStats,
}

fn recalibrate(
    primary: &str,
    fai_contigs: &[&str],
    replicates: (&str, &str, &str),
) -> Result<Run, VcfError> {
    let primary_file = write_temp(primary);
    let fai = write_fai(fai_contigs);
    let (bwa, bowtie, novo) = replicates;
    let bwa_file = write_temp(&(HEADER.to_string() + bwa));
    let bowtie_file = write_temp(&(HEADER.to_string() + bowtie));
    let novo_file = write_temp(&(HEADER.to_string() + novo));

    let contigs = ContigOrder::from_fai(fai.path())?;
    let cmd = RecalibrateCommand {
        deepseq_bwa: Some(bwa_file.path().to_path_buf()),
        deepseq_bowtie: Some(bowtie_file.path().to_path_buf()),
        deepseq_novo: Some(novo_file.path().to_path_buf()),
    };

    let mut out = Vec::new();
    let stats = cmd.run(primary_file.path(), &contigs, &mut out)?;
    Ok(Run {
        output: String::from_utf8(out).unwrap(),
        stats,
    })
}

fn data_lines(output: &str) -> Vec<&str> {
    output.lines().filter(|l| !l.starts_with('#')).collect()
}

#[test]
fn test_full_promotion_scenario() {
    let primary = HEADER.to_string() + &candidate_line("chr1", 100, "A", "LowConf");
    let pass = aux_line("chr1", 100, "A", "PASS");

    let run = recalibrate(&primary, &["chr1"], (&pass, &pass, &pass)).unwrap();

    let lines = data_lines(&run.output);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("\tMedConf\t"));
    assert_eq!(run.stats.promoted, 1);
}

#[test]
fn test_full_demotion_scenario() {
    let primary = HEADER.to_string()
        + &"chr1\t100\t.\tG\tA\t.\tMedConf\tTVAF=0.03;nPASSES=16;nREJECTS=5;bwaDP=5,100;bowtieDP=6,110;novoDP=4,90\n";
    let reject = aux_line("chr1", 100, "A", "REJECT");

    // One replicate rejects the call, two have nothing at the identity.
    let run = recalibrate(&primary, &["chr1"], (&reject, "", "")).unwrap();

    let lines = data_lines(&run.output);
    assert!(lines[0].contains("\tUnclassified\t"));
    assert_eq!(run.stats.demoted, 1);
}

#[test]
fn test_no_consensus_leaves_label_unchanged() {
    let primary = HEADER.to_string() + &candidate_line("chr1", 100, "A", "LowConf");
    let pass = aux_line("chr1", 100, "A", "PASS");
    let reject = aux_line("chr1", 100, "A", "REJECT");

    let run = recalibrate(&primary, &["chr1"], (&pass, &reject, "")).unwrap();

    assert!(data_lines(&run.output)[0].contains("\tLowConf\t"));
    assert_eq!(run.stats.promoted, 0);
    assert_eq!(run.stats.demoted, 0);
}

#[test]
fn test_eligibility_gating_never_alters_records() {
    // VAF too high, too few passes, too many rejects, wrong label: all
    // pass through untouched even with unanimous replicate support.
    let primary = HEADER.to_string()
        + "chr1\t100\t.\tG\tA\t.\tLowConf\tTVAF=0.2;nPASSES=20;nREJECTS=2;bwaDP=5,100;bowtieDP=6,110;novoDP=4,90\n"
        + "chr1\t200\t.\tG\tA\t.\tLowConf\tTVAF=0.05;nPASSES=10;nREJECTS=2;bwaDP=5,100;bowtieDP=6,110;novoDP=4,90\n"
        + "chr1\t300\t.\tG\tA\t.\tLowConf\tTVAF=0.05;nPASSES=20;nREJECTS=11;bwaDP=5,100;bowtieDP=6,110;novoDP=4,90\n"
        + "chr1\t400\t.\tG\tA\t.\tPASS\tTVAF=0.05;nPASSES=20;nREJECTS=2;bwaDP=5,100;bowtieDP=6,110;novoDP=4,90\n";
    let pass: String = [100, 200, 300, 400]
        .iter()
        .map(|p| aux_line("chr1", *p, "A", "PASS"))
        .collect();

    let run = recalibrate(&primary, &["chr1"], (&pass, &pass, &pass)).unwrap();

    let lines = data_lines(&run.output);
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("\tLowConf\t"));
    assert!(lines[1].contains("\tLowConf\t"));
    assert!(lines[2].contains("\tLowConf\t"));
    assert!(lines[3].contains("\tPASS\t"));
    assert_eq!(run.stats.candidates, 0);
}

#[test]
fn test_output_preserves_line_count_and_order() {
    let primary = HEADER.to_string()
        + &candidate_line("chr9", 100, "A", "LowConf")
        + &candidate_line("chr9", 500, "A", "MedConf")
        + &candidate_line("chr10", 50, "A", "Unclassified");
    let pass = aux_line("chr9", 100, "A", "PASS");

    // Genome order: chr9 before chr10 (lexical order would reverse them).
    let run = recalibrate(&primary, &["chr9", "chr10"], (&pass, &pass, &pass)).unwrap();

    let lines = data_lines(&run.output);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("chr9\t100\t"));
    assert!(lines[1].starts_with("chr9\t500\t"));
    assert!(lines[2].starts_with("chr10\t50\t"));
    assert_eq!(run.stats.records, 3);
}

#[test]
fn test_multiallelic_group_stays_adjacent_and_ordered() {
    let primary = HEADER.to_string()
        + &candidate_line("chr1", 100, "A", "LowConf")
        + &candidate_line("chr1", 100, "C", "LowConf");
    let pass = aux_line("chr1", 100, "A", "PASS") + &aux_line("chr1", 100, "C", "PASS");

    let run = recalibrate(&primary, &["chr1"], (&pass, &pass, &pass)).unwrap();

    let lines = data_lines(&run.output);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\tG\tA\t"));
    assert!(lines[1].contains("\tG\tC\t"));
    assert_eq!(run.stats.groups, 1);
    assert_eq!(run.stats.promoted, 2);
}

#[test]
fn test_legacy_labels_renamed_in_header_and_data() {
    let primary = "##FILTER=<ID=NeutralEvidence,Description=\"neutral\">\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n"
        .to_string()
        + "chr1\t100\t.\tG\tA\t.\tNeutralEvidence\tTVAF=0.2;nPASSES=1;nREJECTS=0\n";

    let run = recalibrate(&primary, &["chr1"], ("", "", "")).unwrap();

    let lines: Vec<&str> = run.output.lines().collect();
    assert!(lines[0].contains("ID=LowConf"));
    assert!(lines[2].contains("\tLowConf\t"));
    assert!(!run.output.contains("NeutralEvidence"));
}

#[test]
fn test_unsorted_primary_aborts() {
    let primary = HEADER.to_string()
        + &candidate_line("chr1", 300, "A", "LowConf")
        + &candidate_line("chr1", 100, "A", "LowConf");

    let err = recalibrate(&primary, &["chr1"], ("", "", "")).unwrap_err();
    assert!(err.to_string().contains("properly sorted"));
}

#[test]
fn test_unknown_contig_aborts() {
    let primary = HEADER.to_string() + &candidate_line("chrMT", 100, "A", "LowConf");

    let err = recalibrate(&primary, &["chr1"], ("", "", "")).unwrap_err();
    assert!(err.to_string().contains("chrMT"));
}

#[test]
fn test_missing_replicate_path_aborts() {
    let primary_file = write_temp(&(HEADER.to_string() + &candidate_line("chr1", 100, "A", "LowConf")));
    let fai = write_fai(&["chr1"]);
    let contigs = ContigOrder::from_fai(fai.path()).unwrap();

    let cmd = RecalibrateCommand {
        deepseq_bwa: Some("/no/such/replicate.vcf".into()),
        deepseq_bowtie: None,
        deepseq_novo: None,
    };

    let mut out = Vec::new();
    let err = cmd.run(primary_file.path(), &contigs, &mut out).unwrap_err();
    assert!(err.to_string().contains("/no/such/replicate.vcf"));
}

#[test]
fn test_gzipped_replicate_stream() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let primary_file = write_temp(&(HEADER.to_string() + &candidate_line("chr1", 100, "A", "LowConf")));
    let fai = write_fai(&["chr1"]);
    let contigs = ContigOrder::from_fai(fai.path()).unwrap();

    let gz = tempfile::Builder::new().suffix(".vcf.gz").tempfile().unwrap();
    let mut encoder = GzEncoder::new(gz.reopen().unwrap(), Compression::default());
    encoder
        .write_all((HEADER.to_string() + &aux_line("chr1", 100, "A", "PASS")).as_bytes())
        .unwrap();
    encoder.finish().unwrap();

    let cmd = RecalibrateCommand {
        deepseq_bwa: Some(gz.path().to_path_buf()),
        deepseq_bowtie: None,
        deepseq_novo: None,
    };

    let mut out = Vec::new();
    let stats = cmd.run(primary_file.path(), &contigs, &mut out).unwrap();

    // bwa PASS alone is full consensus of the configured streams.
    assert_eq!(stats.promoted, 1);
    let output = String::from_utf8(out).unwrap();
    assert!(data_lines(&output)[0].contains("\tMedConf\t"));
}

#[test]
fn test_replicates_shared_across_candidates_at_one_coordinate() {
    // Both ALTs at chr1:100 consult the same cursor snapshot; the
    // replicate streams contain a record for only one of them.
    let primary = HEADER.to_string()
        + &candidate_line("chr1", 100, "A", "LowConf")
        + &candidate_line("chr1", 100, "C", "MedConf")
        + &candidate_line("chr1", 200, "A", "LowConf");
    let pass = aux_line("chr1", 100, "A", "PASS") + &aux_line("chr1", 200, "A", "PASS");

    let run = recalibrate(&primary, &["chr1"], (&pass, &pass, &pass)).unwrap();

    let lines = data_lines(&run.output);
    assert!(lines[0].contains("\tMedConf\t"));
    // The G>C call was missing from every replicate: demoted.
    assert!(lines[1].contains("\tUnclassified\t"));
    assert!(lines[2].contains("\tMedConf\t"));
    assert_eq!(run.stats.groups, 2);
}
