use std::path::PathBuf;
use clap::builder::TypedValueParser;
use clap::{Args, Parser, Subcommand};
use crate::config::defs::{DEFAULT_QUALITY, DEFAULT_THREADS};

#[derive(Parser, Debug, Clone)]
#[command(name = "methylotl", version, about = "Main script for indexing genome or processing reads")]
pub struct Arguments {

    #[arg(short = 'v', long = "verbose", global = true, action)]
    pub verbose: bool,

    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Action {
    /// Index the genome
    Index(IndexArgs),
    /// Process reads
    Process(ProcessArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    #[arg(long, help = "Path to the reference genome file")]
    pub genome: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    #[arg(long, default_value_t = DEFAULT_THREADS, value_parser = clap::value_parser!(u32).range(1..).map(|t| t as usize), help = "Number of threads")]
    pub threads: usize,

    #[arg(long = "input_dir", help = "Path to input folder")]
    pub input_dir: PathBuf,

    #[arg(long = "output_dir", help = "Path to output folder")]
    pub output_dir: PathBuf,

    #[arg(long = "ref", help = "Path to genome file")]
    pub reference: PathBuf,

    #[arg(long = "logs", help = "Path to logs folder")]
    pub logs: PathBuf,

    #[arg(long = "q", default_value_t = DEFAULT_QUALITY, help = "Quality score for trim_galore")]
    pub quality: u8,

    #[arg(long = "r1-suffix", help = "Mate-1 suffix to use instead of detecting it (e.g. _R1_001.fastq.gz)")]
    pub r1_suffix: Option<String>,

    #[arg(long = "dry-run", default_value_t = false, help = "Log the planned commands without running them")]
    pub dry_run: bool,
}
