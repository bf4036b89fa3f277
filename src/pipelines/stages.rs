//! Per-sample tool sequence: QC, trimming, alignment and BAM post-processing per
//! lane, an optional merge, then statistics and methylation calling on the
//! sample-level BAM.

use std::fmt;
use std::path::PathBuf;
use log::info;
use crate::config::defs::{
    MethylDackelSubcommand, PipelineError, RunConfig, SamtoolsSubcommand, ALIGNING_DIR,
    BEDGRAPH_SUFFIX, DEDUP_BAM_SUFFIX, EXTRACTION_DIR, FASTQC_DIR, MBIAS_SVG_SUFFIXES,
    OUTPUT_SUBDIRS, TRIMMED_R1_SUFFIX, TRIMMED_R2_SUFFIX, TRIM_GALORE_DIR,
};
use crate::utils::command::samtools::SamtoolsConfig;
use crate::utils::command::{bsmapz, fastqc, methyldackel, samtools, trim_galore, ToolInvocation};
use crate::utils::fastx::{trimmed_name, LaneMode, LanePair, NamingConvention, SampleGroup};
use crate::utils::file::{ensure_dirs, relocate};
use crate::utils::streams::{run_logged, LogTarget};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    QualityControl,
    AdapterTrimming,
    Alignment,
    MateFixing,
    Sorting,
    Deduplication,
    Merge,
    StatsCollection,
    MethylationExtraction,
    MBiasAnalysis,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::QualityControl => "QualityControl",
            Stage::AdapterTrimming => "AdapterTrimming",
            Stage::Alignment => "Alignment",
            Stage::MateFixing => "MateFixing",
            Stage::Sorting => "Sorting",
            Stage::Deduplication => "Deduplication",
            Stage::Merge => "Merge",
            Stage::StatsCollection => "StatsCollection",
            Stage::MethylationExtraction => "MethylationExtraction",
            Stage::MBiasAnalysis => "MBiasAnalysis",
        }
    }

    /// Stages repeated once per lane pair.
    pub fn is_lane_stage(&self) -> bool {
        matches!(
            self,
            Stage::QualityControl
                | Stage::AdapterTrimming
                | Stage::Alignment
                | Stage::MateFixing
                | Stage::Sorting
                | Stage::Deduplication
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// Artifact a tool writes under a fixed name, moved once the tool succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct Relocation {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub stage: Stage,
    pub label: String,
    pub invocation: ToolInvocation,
    pub relocations: Vec<Relocation>,
}

impl Step {
    fn new(stage: Stage, label: &str, invocation: ToolInvocation) -> Self {
        Step { stage, label: label.to_string(), invocation, relocations: Vec::new() }
    }
}

/// Ordered tool calls for one sample.
#[derive(Debug, Clone)]
pub struct SamplePlan {
    pub sample_name: String,
    pub mode: LaneMode,
    pub log_path: PathBuf,
    pub sample_bam: PathBuf,
    pub steps: Vec<Step>,
}

struct OutputDirs {
    qc: PathBuf,
    trim: PathBuf,
    aligning: PathBuf,
    extraction: PathBuf,
}

impl OutputDirs {
    fn new(config: &RunConfig) -> Self {
        OutputDirs {
            qc: config.subdir(FASTQC_DIR),
            trim: config.subdir(TRIM_GALORE_DIR),
            aligning: config.subdir(ALIGNING_DIR),
            extraction: config.subdir(EXTRACTION_DIR),
        }
    }

    fn bam(&self, label: &str, suffix: &str) -> PathBuf {
        self.aligning.join(format!("{}{}", label, suffix))
    }
}

/// QC through deduplication for one lane pair; returns the deduplicated BAM.
fn lane_steps(
    config: &RunConfig,
    dirs: &OutputDirs,
    pair: &LanePair,
    gzipped: bool,
    steps: &mut Vec<Step>,
) -> PathBuf {
    let r1 = config.input_dir.join(&pair.r1);
    let r2 = config.input_dir.join(&pair.r2);
    let label = pair.label.as_str();

    steps.push(Step::new(Stage::QualityControl, label, fastqc::arg_generator(config, &dirs.qc, &r1, &r2, gzipped)));
    steps.push(Step::new(Stage::AdapterTrimming, label, trim_galore::arg_generator(config, &dirs.trim, &r1, &r2)));

    let trimmed_r1 = dirs.trim.join(trimmed_name(&pair.r1, TRIMMED_R1_SUFFIX));
    let trimmed_r2 = dirs.trim.join(trimmed_name(&pair.r2, TRIMMED_R2_SUFFIX));
    let aligned = dirs.bam(label, ".bam");
    steps.push(Step::new(Stage::Alignment, label, bsmapz::arg_generator(config, &trimmed_r1, &trimmed_r2, &aligned)));

    let fixmate = dirs.bam(label, ".fixmate.bam");
    let sorted = dirs.bam(label, ".sorted.bam");
    let dedup = dirs.bam(label, DEDUP_BAM_SUFFIX);
    let post = [
        (Stage::MateFixing, SamtoolsSubcommand::Fixmate, &aligned, &fixmate),
        (Stage::Sorting, SamtoolsSubcommand::Sort, &fixmate, &sorted),
        (Stage::Deduplication, SamtoolsSubcommand::Markdup, &sorted, &dedup),
    ];
    for (stage, subcommand, input, output) in post {
        let samtools_config = SamtoolsConfig {
            subcommand,
            inputs: vec![input.clone()],
            output: Some(output.clone()),
        };
        steps.push(Step::new(stage, label, samtools::arg_generator(config, &samtools_config)));
    }
    dedup
}

/// Builds the full tool sequence for one sample.
///
/// # Arguments
///
/// * `config` - Run configuration.
/// * `group` - The sample's files.
/// * `convention` - Naming convention of the input directory.
///
/// # Returns
/// SamplePlan, or the grouping error when the sample's files cannot be paired.
pub fn plan_sample(
    config: &RunConfig,
    group: &SampleGroup,
    convention: &NamingConvention,
) -> Result<SamplePlan, PipelineError> {
    let mode = group.lane_mode()?;
    let pairs = group.lane_pairs()?;
    let dirs = OutputDirs::new(config);
    let sample = group.sample_name.as_str();
    let mut steps = Vec::new();

    let lane_bams: Vec<PathBuf> = pairs
        .iter()
        .map(|pair| lane_steps(config, &dirs, pair, convention.is_gzipped(), &mut steps))
        .collect();

    let sample_bam = dirs.bam(sample, DEDUP_BAM_SUFFIX);
    if mode == LaneMode::Multi {
        let merge_config = SamtoolsConfig {
            subcommand: SamtoolsSubcommand::Merge,
            inputs: lane_bams,
            output: Some(sample_bam.clone()),
        };
        steps.push(Step::new(Stage::Merge, sample, samtools::arg_generator(config, &merge_config)));
    }

    let flagstat_config = SamtoolsConfig {
        subcommand: SamtoolsSubcommand::Flagstat,
        inputs: vec![sample_bam.clone()],
        output: None,
    };
    steps.push(Step::new(Stage::StatsCollection, sample, samtools::arg_generator(config, &flagstat_config)));

    let bedgraph = format!("{}{}", sample, BEDGRAPH_SUFFIX);
    let mut extract = Step::new(
        Stage::MethylationExtraction,
        sample,
        methyldackel::arg_generator(config, MethylDackelSubcommand::Extract, &sample_bam, None),
    );
    extract.relocations.push(Relocation {
        from: dirs.aligning.join(&bedgraph),
        to: dirs.extraction.join(&bedgraph),
    });
    steps.push(extract);

    let mut mbias = Step::new(
        Stage::MBiasAnalysis,
        sample,
        methyldackel::arg_generator(config, MethylDackelSubcommand::Mbias, &sample_bam, Some(sample)),
    );
    for svg_suffix in MBIAS_SVG_SUFFIXES {
        let svg = format!("{}{}", sample, svg_suffix);
        mbias.relocations.push(Relocation {
            from: config.cwd.join(&svg),
            to: dirs.extraction.join(&svg),
        });
    }
    steps.push(mbias);

    Ok(SamplePlan {
        sample_name: sample.to_string(),
        mode,
        log_path: config.sample_log(sample),
        sample_bam,
        steps,
    })
}

/// Runs a plan step by step. The first failing tool or missing artifact stops the sample.
pub async fn execute_plan(config: &RunConfig, plan: &SamplePlan) -> Result<(), PipelineError> {
    let mut previous: Option<Stage> = None;
    for (i, step) in plan.steps.iter().enumerate() {
        if previous != Some(step.stage) || step.stage.is_lane_stage() {
            info!("{} [{}]: {}...", plan.sample_name, step.label, step.stage);
        }
        previous = Some(step.stage);

        let log = LogTarget { path: &plan.log_path, truncate: i == 0 };
        run_logged(&step.invocation, step.stage.as_str(), log, &config.cwd).await?;

        for relocation in &step.relocations {
            relocate(&relocation.from, &relocation.to)?;
        }
    }
    Ok(())
}

/// Logs every planned command without running anything.
pub fn describe_plan(plan: &SamplePlan) {
    info!("{}: {} steps ({:?} lane mode), log {}", plan.sample_name, plan.steps.len(), plan.mode, plan.log_path.display());
    for step in &plan.steps {
        info!("  {} [{}]: {}", step.stage, step.label, step.invocation);
        for relocation in &step.relocations {
            info!("    move {} -> {}", relocation.from.display(), relocation.to.display());
        }
    }
}

/// Creates the log directory and the fixed output subdirectories.
pub fn ensure_output_tree(config: &RunConfig) -> Result<(), PipelineError> {
    let mut dirs = vec![config.log_dir.clone()];
    dirs.extend(OUTPUT_SUBDIRS.iter().map(|d| config.subdir(d)));
    ensure_dirs(&dirs)
}
