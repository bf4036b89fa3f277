// src/utils/streams.rs
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use log::debug;
use tokio::process::Command;
use crate::config::defs::PipelineError;
use crate::utils::command::ToolInvocation;
use crate::utils::file::open_log;


/// Where a child's combined stdout/stderr goes.
#[derive(Debug, Clone, Copy)]
pub struct LogTarget<'a> {
    pub path: &'a Path,
    pub truncate: bool,
}

/// Runs one external tool to completion, sending stdout and stderr to the log.
///
/// # Arguments
///
/// * `invocation` - Tool and arguments.
/// * `stage` - Pipeline stage name, written to the log header and errors.
/// * `log` - Log file and whether this call starts it fresh.
/// * `cwd` - Working directory of the child.
///
/// # Returns
/// Ok on exit status 0; ToolExecution if the child cannot be spawned, ToolFailed otherwise.
pub async fn run_logged(
    invocation: &ToolInvocation,
    stage: &str,
    log: LogTarget<'_>,
    cwd: &Path,
) -> Result<(), PipelineError> {
    let mut log_file = open_log(log.path, log.truncate)?;
    writeln!(
        log_file,
        "### [{}] {}: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        stage,
        invocation
    )?;
    log_file.flush()?;

    let stdout = log_file.try_clone()?;
    debug!("{}: {}", stage, invocation);

    let status = Command::new(invocation.tool)
        .args(&invocation.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(log_file))
        .status()
        .await
        .map_err(|e| PipelineError::ToolExecution {
            tool: invocation.tool.to_string(),
            error: e.to_string(),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(PipelineError::ToolFailed {
            stage: stage.to_string(),
            tool: invocation.tool.to_string(),
            status,
            log: log.path.to_path_buf(),
        })
    }
}
