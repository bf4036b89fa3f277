use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, error, info, warn};
use crate::config::defs::{PipelineError, RunConfig, METHYLDACKEL_NAMING_CONTRACT, PIPELINE_TOOLS};
use crate::pipelines::stages::{describe_plan, ensure_output_tree, execute_plan, plan_sample};
use crate::utils::command::check_versions;
use crate::utils::fastx::{detect_naming_convention, group_samples, LaneMode, NamingConvention, SampleGroup};
use crate::utils::file::list_file_names;
use crate::utils::system::check_thread_budget;


#[derive(Debug)]
pub struct SampleOutcome {
    pub sample_name: String,
    pub mode: LaneMode,
    pub elapsed: Duration,
    pub error: Option<PipelineError>,
}

#[derive(Debug)]
pub struct RunReport {
    pub convention: NamingConvention,
    pub samples: Vec<SampleOutcome>,
}

impl RunReport {
    pub fn failed(&self) -> impl Iterator<Item = &SampleOutcome> {
        self.samples.iter().filter(|s| s.error.is_some())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}


/// Validates the input directory, resolves the naming convention and groups files by sample.
/// Runs before any external tool, so every naming error surfaces here.
///
/// # Arguments
///
/// * `config` - RunConfig from main.
///
/// # Returns
/// The convention and the validated sample groups.
pub fn resolve_samples(config: &RunConfig) -> Result<(NamingConvention, BTreeMap<String, SampleGroup>), PipelineError> {
    let file_names = list_file_names(&config.input_dir)?;
    if file_names.is_empty() {
        return Err(PipelineError::EmptyInput(config.input_dir.clone()));
    }

    let convention = match &config.r1_suffix {
        Some(suffix) => NamingConvention::from_r1_suffix(suffix)?,
        None => detect_naming_convention(&config.input_dir)?,
    };
    info!("Mate suffixes: {} / {}", convention.r1_suffix, convention.r2_suffix);

    let groups = group_samples(&file_names, &convention)?;
    if groups.is_empty() {
        return Err(PipelineError::UnrecognizedFormat(config.input_dir.clone()));
    }
    for group in groups.values() {
        group.lane_pairs()?;
    }
    Ok((convention, groups))
}

/// Runs the methylation pipeline over every sample in the input directory.
///
/// # Arguments
///
/// * `config` - RunConfig struct from main.
///
/// # Returns
/// RunReport on success; SamplesFailed if any sample's tool chain failed.
pub async fn run(config: Arc<RunConfig>) -> Result<RunReport, PipelineError> {
    println!("\n-------------\n Methylation\n-------------\n");

    let (convention, groups) = resolve_samples(&config)?;
    info!("Found {} sample(s) in {}", groups.len(), config.input_dir.display());
    check_thread_budget(config.threads);
    debug!("Artifact names follow {} output naming", METHYLDACKEL_NAMING_CONTRACT);

    if !config.dry_run {
        ensure_output_tree(&config)?;
        check_versions(PIPELINE_TOOLS).await?;
    }

    let mut samples = Vec::with_capacity(groups.len());
    for group in groups.values() {
        let start = Instant::now();
        let plan = plan_sample(&config, group, &convention)?;
        info!("Processing {} ({} files, {:?} lane mode)", plan.sample_name, group.files.len(), plan.mode);

        let error = if config.dry_run {
            describe_plan(&plan);
            None
        } else {
            execute_plan(&config, &plan).await.err()
        };
        if let Some(e) = &error {
            error!("Sample {} failed: {}", plan.sample_name, e);
        }

        samples.push(SampleOutcome {
            sample_name: plan.sample_name,
            mode: plan.mode,
            elapsed: start.elapsed(),
            error,
        });
    }

    let report = RunReport { convention, samples };
    info!("Summary ({} / {} inputs):", report.convention.r1_suffix, report.convention.r2_suffix);
    for outcome in &report.samples {
        match &outcome.error {
            None => info!("  {}: ok ({:.1}s)", outcome.sample_name, outcome.elapsed.as_secs_f64()),
            Some(e) => warn!("  {}: FAILED ({})", outcome.sample_name, e),
        }
    }

    let failed = report.failed().count();
    if failed > 0 {
        return Err(PipelineError::SamplesFailed {
            failed,
            total: report.samples.len(),
        });
    }
    Ok(report)
}
