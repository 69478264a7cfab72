//! retier: recalibrate confidence tiers of low-VAF variant calls
//!
//! Usage: retier --vcf-infile <VCF> --vcf-outfile <VCF> --genome-reference <FASTA> [OPTIONS]

use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::process;

use retier_genomics::commands::RecalibrateCommand;
use retier_genomics::genome::ContigOrder;
use retier_genomics::vcf::VcfError;

#[derive(Parser)]
#[command(name = "retier")]
#[command(version)]
#[command(
    about = "Recalibrate confidence tiers of low-VAF variant calls against deep-sequencing replicate call sets",
    long_about = None
)]
struct Cli {
    /// Input VCF (plain or gzipped)
    #[arg(long = "vcf-infile")]
    vcf_infile: PathBuf,

    /// Output VCF
    #[arg(long = "vcf-outfile")]
    vcf_outfile: PathBuf,

    /// Reference FASTA; its index is found by appending .fai
    #[arg(long = "genome-reference")]
    genome_reference: PathBuf,

    /// Deep-coverage replicate call set, bwa alignment
    #[arg(long = "deepseq-bwa")]
    deepseq_bwa: Option<PathBuf>,

    /// Deep-coverage replicate call set, bowtie alignment
    #[arg(long = "deepseq-bowtie")]
    deepseq_bowtie: Option<PathBuf>,

    /// Deep-coverage replicate call set, novoalign alignment
    #[arg(long = "deepseq-novo")]
    deepseq_novo: Option<PathBuf>,

    /// Legacy alias (accepted but unused, kept for compatibility)
    #[arg(long = "spp-bwa", hide = true)]
    spp_bwa: Option<PathBuf>,

    /// Legacy alias (accepted but unused, kept for compatibility)
    #[arg(long = "spp-bowtie", hide = true)]
    spp_bowtie: Option<PathBuf>,

    /// Legacy alias (accepted but unused, kept for compatibility)
    #[arg(long = "spp-novo", hide = true)]
    spp_novo: Option<PathBuf>,

    /// Print run statistics to stderr
    #[arg(long)]
    stats: bool,
}

fn run(cli: &Cli) -> Result<(), VcfError> {
    // Legacy aliases are accepted for old pipeline invocations but not
    // consulted.
    let _ = (&cli.spp_bwa, &cli.spp_bowtie, &cli.spp_novo);

    let fai_path = PathBuf::from(format!("{}.fai", cli.genome_reference.display()));
    let contigs = ContigOrder::from_fai(&fai_path)?;

    let cmd = RecalibrateCommand {
        deepseq_bwa: cli.deepseq_bwa.clone(),
        deepseq_bowtie: cli.deepseq_bowtie.clone(),
        deepseq_novo: cli.deepseq_novo.clone(),
    };

    let mut output = File::create(&cli.vcf_outfile)?;
    let stats = cmd.run(&cli.vcf_infile, &contigs, &mut output)?;

    if cli.stats {
        eprintln!("Recalibration stats: {}", stats);
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
