use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use log::debug;
use crate::config::defs::PipelineError;


/// Lists the names of the regular files in a directory, sorted.
///
/// # Arguments
///
/// * `dir` - Directory to scan.
///
/// # Returns
/// Vec of file names. Subdirectories are skipped; a non-UTF-8 name is NonUtf8FileName.
pub fn list_file_names(dir: &Path) -> Result<Vec<String>, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::MissingInput(dir.to_path_buf()));
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| PipelineError::NonUtf8FileName(entry.path()))?;
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// Resolves `path` against `cwd` when it is relative.
pub fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Creates each directory (and parents) if missing.
pub fn ensure_dirs<P: AsRef<Path>>(dirs: &[P]) -> Result<(), PipelineError> {
    for dir in dirs {
        fs::create_dir_all(dir.as_ref())?;
        debug!("Ensured directory {}", dir.as_ref().display());
    }
    Ok(())
}

/// Opens a sample log, truncating it on the sample's first write and appending afterwards.
pub fn open_log(path: &Path, truncate: bool) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    if truncate {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    options.open(path)
}

/// Moves an artifact, falling back to copy + remove across filesystems.
///
/// # Arguments
///
/// * `from` - Artifact written by an external tool.
/// * `to` - Destination path.
///
/// # Returns
/// MissingArtifact if `from` does not exist.
pub fn relocate(from: &Path, to: &Path) -> Result<(), PipelineError> {
    if !from.exists() {
        return Err(PipelineError::MissingArtifact(from.to_path_buf()));
    }
    if fs::rename(from, to).is_err() {
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    debug!("Moved {} -> {}", from.display(), to.display());
    Ok(())
}
