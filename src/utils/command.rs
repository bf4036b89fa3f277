/// Functions and structs for working with creating command-line arguments

use std::fmt;
use std::path::Path;
use log::{debug, warn};
use tokio::process::Command;
use crate::config::defs::{PipelineError, TOOL_VERSIONS};


/// One fully assembled external tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool: &'static str,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(tool: &'static str, args: Vec<String>) -> Self {
        ToolInvocation { tool, args }
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tool)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}


pub mod fastqc {
    use std::path::Path;
    use crate::config::defs::{RunConfig, FASTQC_TAG};
    use super::{path_arg, ToolInvocation};

    pub fn arg_generator(config: &RunConfig, out_dir: &Path, r1: &Path, r2: &Path, gzipped: bool) -> ToolInvocation {
        let mut args_vec: Vec<String> = Vec::new();
        if gzipped {
            args_vec.push("--noextract".to_string());
        }
        args_vec.push("-o".to_string());
        args_vec.push(path_arg(out_dir));
        args_vec.push("-t".to_string());
        args_vec.push(config.threads.to_string());
        args_vec.push(path_arg(r1));
        args_vec.push(path_arg(r2));
        ToolInvocation::new(FASTQC_TAG, args_vec)
    }
}

pub mod trim_galore {
    use std::path::Path;
    use crate::config::defs::{RunConfig, TRIM_GALORE_TAG};
    use super::{path_arg, ToolInvocation};

    pub fn arg_generator(config: &RunConfig, out_dir: &Path, r1: &Path, r2: &Path) -> ToolInvocation {
        let args_vec = vec![
            "-q".to_string(),
            config.quality.to_string(),
            "--fastqc".to_string(),
            "-o".to_string(),
            path_arg(out_dir),
            "-j".to_string(),
            config.threads.to_string(),
            "--paired".to_string(),
            "--gzip".to_string(),
            path_arg(r1),
            path_arg(r2),
        ];
        ToolInvocation::new(TRIM_GALORE_TAG, args_vec)
    }
}

pub mod bsmapz {
    use std::path::Path;
    use crate::config::defs::{RunConfig, BSMAPZ_TAG};
    use super::{path_arg, ToolInvocation};

    pub fn arg_generator(config: &RunConfig, trimmed_r1: &Path, trimmed_r2: &Path, out_bam: &Path) -> ToolInvocation {
        let args_vec = vec![
            "-a".to_string(),
            path_arg(trimmed_r1),
            "-b".to_string(),
            path_arg(trimmed_r2),
            "-d".to_string(),
            path_arg(&config.reference),
            "-o".to_string(),
            path_arg(out_bam),
            "-p".to_string(),
            config.threads.to_string(),
        ];
        ToolInvocation::new(BSMAPZ_TAG, args_vec)
    }
}

pub mod samtools {
    use std::path::{Path, PathBuf};
    use crate::config::defs::{RunConfig, SamtoolsSubcommand, SAMTOOLS_TAG};
    use super::{path_arg, ToolInvocation};

    #[derive(Debug)]
    pub struct SamtoolsConfig {
        pub subcommand: SamtoolsSubcommand,
        pub inputs: Vec<PathBuf>,
        pub output: Option<PathBuf>,
    }

    pub fn arg_generator(config: &RunConfig, samtools_config: &SamtoolsConfig) -> ToolInvocation {
        let mut args_vec: Vec<String> = vec![samtools_config.subcommand.as_str().to_string()];
        let output = samtools_config.output.as_deref().map(path_arg);
        let inputs = samtools_config.inputs.iter().map(|p| path_arg(p));

        match samtools_config.subcommand {
            SamtoolsSubcommand::Fixmate => {
                args_vec.push("-m".to_string());
                args_vec.extend(inputs);
                args_vec.extend(output);
            }
            SamtoolsSubcommand::Sort => {
                args_vec.push("-@".to_string());
                args_vec.push(config.threads.to_string());
                if let Some(out) = output {
                    args_vec.push("-o".to_string());
                    args_vec.push(out);
                }
                args_vec.extend(inputs);
            }
            SamtoolsSubcommand::Merge => {
                args_vec.push("-@".to_string());
                args_vec.push(config.threads.to_string());
                args_vec.extend(output);
                args_vec.extend(inputs);
            }
            SamtoolsSubcommand::Markdup => {
                args_vec.extend(inputs);
                args_vec.extend(output);
            }
            SamtoolsSubcommand::Faidx | SamtoolsSubcommand::Flagstat => {
                args_vec.extend(inputs);
            }
        }
        ToolInvocation::new(SAMTOOLS_TAG, args_vec)
    }

    /// `samtools faidx` needs no run configuration.
    pub fn faidx(genome: &Path) -> ToolInvocation {
        ToolInvocation::new(SAMTOOLS_TAG, vec![SamtoolsSubcommand::Faidx.as_str().to_string(), path_arg(genome)])
    }
}

pub mod methyldackel {
    use std::path::Path;
    use crate::config::defs::{MethylDackelSubcommand, RunConfig, METHYLDACKEL_MIN_DEPTH, METHYLDACKEL_TAG};
    use super::{path_arg, ToolInvocation};

    pub fn arg_generator(config: &RunConfig, subcommand: MethylDackelSubcommand, bam: &Path, prefix: Option<&str>) -> ToolInvocation {
        let mut args_vec: Vec<String> = vec![subcommand.as_str().to_string()];
        if subcommand == MethylDackelSubcommand::Extract {
            args_vec.push("--fraction".to_string());
            args_vec.push("--minDepth".to_string());
            args_vec.push(METHYLDACKEL_MIN_DEPTH.to_string());
        }
        args_vec.push(path_arg(&config.reference));
        args_vec.push(path_arg(bam));
        if let Some(prefix) = prefix {
            args_vec.push(prefix.to_string());
        }
        ToolInvocation::new(METHYLDACKEL_TAG, args_vec)
    }
}


/// Version as `(major, minor)`, compared numerically so 1.9 sorts before 1.10.
pub type ToolVersion = (u32, u32);

/// Pulls a `major.minor` pair out of a tool's version banner.
pub fn parse_version(output: &str) -> Option<ToolVersion> {
    output
        .split_whitespace()
        .map(|tok| tok.trim_start_matches(|c: char| c == 'v' || c == 'V'))
        .filter(|tok| tok.starts_with(|c: char| c.is_ascii_digit()))
        .find_map(|tok| {
            let mut parts = tok.split('.');
            let major = parts.next()?.parse::<u32>().ok()?;
            let minor: String = parts.next()?.chars().take_while(|c| c.is_ascii_digit()).collect();
            Some((major, minor.parse::<u32>().ok()?))
        })
}

/// True when `found` is below the tested floor for a tool.
pub fn is_older(found: ToolVersion, min: ToolVersion) -> bool {
    found < min
}

/// Checks that a tool can be spawned and reports its version if it prints one.
///
/// # Arguments
///
/// * `tool` - Executable name.
///
/// # Returns
/// Version banner line, or ToolNotFound when the executable cannot be spawned.
pub async fn check_version(tool: &str) -> Result<Option<String>, PipelineError> {
    let output = Command::new(tool)
        .arg("--version")
        .stdin(std::process::Stdio::null())
        .output()
        .await
        .map_err(|e| PipelineError::ToolNotFound {
            tool: tool.to_string(),
            error: e.to_string(),
        })?;

    let text = format!("{}\n{}", String::from_utf8_lossy(&output.stdout), String::from_utf8_lossy(&output.stderr));
    let banner = text
        .lines()
        .map(str::trim)
        .find(|line| parse_version(line).is_some())
        .map(str::to_string);

    match (&banner, TOOL_VERSIONS.get(tool)) {
        (Some(line), Some(min)) => match parse_version(line) {
            Some(found) if is_older(found, *min) => warn!(
                "{} version {}.{} is older than tested {}.{}",
                tool, found.0, found.1, min.0, min.1
            ),
            _ => debug!("{}: {}", tool, line),
        },
        (None, _) => debug!("{}: no version reported", tool),
        _ => {}
    }
    Ok(banner)
}

pub async fn check_versions(tools: &[&str]) -> Result<(), PipelineError> {
    for tool in tools {
        check_version(tool).await?;
    }
    Ok(())
}
