use std::path::{Path, PathBuf};
use log::info;
use tokio::process::Command;
use crate::config::defs::{PipelineError, FAI_EXT, SAMTOOLS_TAG};
use crate::utils::command::samtools;


/// Path of the FASTA index `samtools faidx` writes next to the genome.
pub fn fai_path(genome: &Path) -> PathBuf {
    let mut name = genome.as_os_str().to_owned();
    name.push(".");
    name.push(FAI_EXT);
    PathBuf::from(name)
}

/// Indexes a reference genome with `samtools faidx`.
///
/// # Arguments
///
/// * `genome` - Path to the reference FASTA.
///
/// # Returns
/// Path to the `.fai` index.
pub async fn run(genome: &Path) -> Result<PathBuf, PipelineError> {
    println!("\n-------------\n Index\n-------------\n");

    if !genome.is_file() {
        return Err(PipelineError::MissingInput(genome.to_path_buf()));
    }

    let invocation = samtools::faidx(genome);
    info!("{}", invocation);
    let status = Command::new(invocation.tool)
        .args(&invocation.args)
        .status()
        .await
        .map_err(|e| PipelineError::ToolExecution {
            tool: SAMTOOLS_TAG.to_string(),
            error: e.to_string(),
        })?;

    if !status.success() {
        return Err(PipelineError::ToolExecution {
            tool: SAMTOOLS_TAG.to_string(),
            error: format!("faidx exited with {}", status),
        });
    }

    let index = fai_path(genome);
    info!("Genome indexed. Index file saved as: {}", index.display());
    Ok(index)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fai_path() {
        assert_eq!(fai_path(Path::new("/ref/hg38.fa")), PathBuf::from("/ref/hg38.fa.fai"));
        assert_eq!(fai_path(Path::new("genome.fasta.gz")), PathBuf::from("genome.fasta.gz.fai"));
    }

    #[tokio::test]
    async fn test_missing_genome() {
        let result = run(Path::new("/definitely/not/a/genome.fa")).await;
        assert!(matches!(result, Err(PipelineError::MissingInput(_))));
    }
}
