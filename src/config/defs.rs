use std::path::PathBuf;
use std::process::ExitStatus;
use lazy_static::lazy_static;
use std::collections::HashMap;
use thiserror::Error;

// External software
pub const FASTQC_TAG: &str = "fastqc";
pub const TRIM_GALORE_TAG: &str = "trim_galore";
pub const BSMAPZ_TAG: &str = "bsmapz";
pub const SAMTOOLS_TAG: &str = "samtools";
pub const METHYLDACKEL_TAG: &str = "MethylDackel";

/// Every tool the `process` pipeline spawns, in first-use order.
pub const PIPELINE_TOOLS: &[&str] = &[FASTQC_TAG, TRIM_GALORE_TAG, BSMAPZ_TAG, SAMTOOLS_TAG, METHYLDACKEL_TAG];

lazy_static! {
    pub static ref TOOL_VERSIONS: HashMap<&'static str, (u32, u32)> = {
        let mut m = HashMap::new();
        m.insert(FASTQC_TAG, (0, 11));
        m.insert(TRIM_GALORE_TAG, (0, 6));
        m.insert(SAMTOOLS_TAG, (1, 10));
        m.insert(METHYLDACKEL_TAG, (0, 5));

        m
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamtoolsSubcommand {
    Faidx,
    Fixmate,
    Sort,
    Markdup,
    Merge,
    Flagstat,
}

impl SamtoolsSubcommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamtoolsSubcommand::Faidx => "faidx",
            SamtoolsSubcommand::Fixmate => "fixmate",
            SamtoolsSubcommand::Sort => "sort",
            SamtoolsSubcommand::Markdup => "markdup",
            SamtoolsSubcommand::Merge => "merge",
            SamtoolsSubcommand::Flagstat => "flagstat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MethylDackelSubcommand {
    Extract,
    Mbias,
}

impl MethylDackelSubcommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethylDackelSubcommand::Extract => "extract",
            MethylDackelSubcommand::Mbias => "mbias",
        }
    }
}

// Output tree
pub const FASTQC_DIR: &str = "FastQC";
pub const TRIM_GALORE_DIR: &str = "trim-galore";
pub const ALIGNING_DIR: &str = "aligning";
pub const EXTRACTION_DIR: &str = "methyl_extraction";
pub const OUTPUT_SUBDIRS: &[&str] = &[FASTQC_DIR, TRIM_GALORE_DIR, ALIGNING_DIR, EXTRACTION_DIR];

pub const LOG_EXT: &str = "log";

// Static Filenames
// Output names the external tools choose on their own. Trim Galore appends
// `_val_{1,2}.fq.gz` to the input stem in --paired --gzip mode; MethylDackel
// `extract` writes `<bam stem>_CpG.meth.bedGraph` next to the BAM when --fraction
// is given and `mbias` writes `<prefix>_O{T,B}.svg` into its working directory.
pub const METHYLDACKEL_NAMING_CONTRACT: &str = "MethylDackel 0.5/0.6";
pub const TRIMMED_R1_SUFFIX: &str = "_val_1.fq.gz";
pub const TRIMMED_R2_SUFFIX: &str = "_val_2.fq.gz";
pub const DEDUP_BAM_SUFFIX: &str = ".sorted.deduplicated.bam";
pub const BEDGRAPH_SUFFIX: &str = ".sorted.deduplicated_CpG.meth.bedGraph";
pub const MBIAS_SVG_SUFFIXES: &[&str] = &["_OB.svg", "_OT.svg"];
pub const FAI_EXT: &str = "fai";

// Static Parameters
pub const METHYLDACKEL_MIN_DEPTH: usize = 10;
pub const DEFAULT_THREADS: usize = 8;
pub const DEFAULT_QUALITY: u8 = 20;

pub const FASTQ_EXTS: &[&'static str] = &[".fastq.gz", ".fq.gz", ".fastq", ".fq"];
pub const GZIP_EXT: &str = ".gz";


/// Immutable snapshot of one `process` run, shared by every stage.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub cwd: PathBuf,
    pub threads: usize,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub reference: PathBuf,
    pub log_dir: PathBuf,
    pub quality: u8,
    pub r1_suffix: Option<String>,
    pub dry_run: bool,
}

impl RunConfig {
    pub fn subdir(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn sample_log(&self, sample_name: &str) -> PathBuf {
        self.log_dir.join(format!("{}.{}", sample_name, LOG_EXT))
    }
}


#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Empty input directory: {}", .0.display())]
    EmptyInput(PathBuf),

    #[error("Wrong file format: no file in {} ends with a known paired-end suffix", .0.display())]
    UnrecognizedFormat(PathBuf),

    #[error("Ambiguous file format in {}: found suffixes {suffixes:?}; pass --r1-suffix to choose one", .dir.display())]
    AmbiguousFormat {
        dir: PathBuf,
        suffixes: Vec<String>,
    },

    #[error("Number of files for '{sample}' does not match paired reads ({count} files)")]
    UnbalancedPair {
        sample: String,
        count: usize,
    },

    #[error("Sample '{sample}' mixes lane-tagged and lane-less read pairs")]
    MixedLaneLayout {
        sample: String,
    },

    #[error("File name is not valid UTF-8: {}", .0.display())]
    NonUtf8FileName(PathBuf),

    #[error("Cannot derive a sample name from '{file}'")]
    EmptySampleName {
        file: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("{tool} not found on PATH: {error}")]
    ToolNotFound {
        tool: String,
        error: String,
    },

    #[error("Failed to run {tool}: {error}")]
    ToolExecution {
        tool: String,
        error: String,
    },

    #[error("{stage} failed: {tool} exited with {status}; see {}", .log.display())]
    ToolFailed {
        stage: String,
        tool: String,
        status: ExitStatus,
        log: PathBuf,
    },

    #[error("Expected artifact {} was not produced", .0.display())]
    MissingArtifact(PathBuf),

    #[error("I/O error: {0}")]
    IOError(String),

    #[error("{failed} of {total} samples failed")]
    SamplesFailed {
        failed: usize,
        total: usize,
    },
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::IOError(e.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbalanced_pair_names_sample() {
        let error = PipelineError::UnbalancedPair { sample: "sampleC".to_string(), count: 3 };
        let msg = format!("{error}");
        assert!(msg.contains("'sampleC'"));
        assert!(msg.contains("3 files"));
    }

    #[test]
    fn test_ambiguous_format_lists_suffixes() {
        let error = PipelineError::AmbiguousFormat {
            dir: PathBuf::from("/data/in"),
            suffixes: vec!["_1.fq".to_string(), "_R1.fq".to_string()],
        };
        let msg = format!("{error}");
        assert!(msg.contains("_1.fq"));
        assert!(msg.contains("_R1.fq"));
        assert!(msg.contains("--r1-suffix"));
    }

    #[test]
    fn test_run_config_paths() {
        let config = RunConfig {
            cwd: PathBuf::from("/work"),
            threads: 4,
            input_dir: PathBuf::from("/in"),
            output_dir: PathBuf::from("/out"),
            reference: PathBuf::from("/ref/genome.fa"),
            log_dir: PathBuf::from("/logs"),
            quality: 20,
            r1_suffix: None,
            dry_run: false,
        };
        assert_eq!(config.subdir(ALIGNING_DIR), PathBuf::from("/out/aligning"));
        assert_eq!(config.sample_log("sampleA"), PathBuf::from("/logs/sampleA.log"));
    }
}
