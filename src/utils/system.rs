// src/utils/system.rs: System functions

use std::env;
use std::path::PathBuf;
use log::{info, warn};
use sysinfo::System;
use crate::config::defs::PipelineError;


/// Number of physical cores, falling back to 1 when the OS does not say.
pub fn detect_physical_cores() -> usize {
    System::physical_core_count().unwrap_or(1)
}

/// Logs the host core count and warns when the requested tool threads exceed it.
/// The thread count is passed to the tools unchanged.
///
/// # Arguments
///
/// * `threads` - Value of --threads.
///
/// # Returns
/// true when `threads` oversubscribes the physical cores.
pub fn check_thread_budget(threads: usize) -> bool {
    let physical_cores = detect_physical_cores();
    info!("CPU count: {} physical cores, {} threads requested", physical_cores, threads);
    if threads > physical_cores {
        warn!("--threads {} exceeds the {} physical cores; external tools will be oversubscribed", threads, physical_cores);
        return true;
    }
    false
}

pub fn current_dir() -> Result<PathBuf, PipelineError> {
    Ok(env::current_dir()?)
}
