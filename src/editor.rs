//! In-place editing
//!
//! The original file is read completely before anything is written, so the
//! query never reads its own output. The result lands in a temporary file in
//! the same directory and is renamed over the original, so readers see either
//! the old content or the new, never a partial write.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::command::Command;
use crate::error_helpers;
use crate::executor::Executor;

/// What happened to one edited file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub path: PathBuf,
    pub backup: Option<PathBuf>,
    pub changed: bool,
}

/// `file.txt` + `.bak` -> `file.txt.bak`
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Run `command` over `path` and replace the file with the result
///
/// With `backup_suffix` the original is copied aside first. The file is
/// rewritten even when the output is identical; `EditOutcome::changed`
/// reports whether the content differed.
pub fn edit_in_place(
    path: &Path,
    command: &Command,
    executor: &Executor,
    backup_suffix: Option<&str>,
) -> Result<EditOutcome> {
    let metadata = fs::metadata(path).map_err(|e| error_helpers::open_error(path, e))?;
    if !metadata.is_file() {
        anyhow::bail!("Not a regular file: {}", path.display());
    }

    let original = fs::read(path).map_err(|e| error_helpers::open_error(path, e))?;

    let mut transformed = Vec::with_capacity(original.len());
    executor
        .execute(command, original.as_slice(), &mut transformed)
        .with_context(|| format!("Failed to process {}", path.display()))?;

    let backup = match backup_suffix.filter(|suffix| !suffix.is_empty()) {
        Some(suffix) => {
            let backup = backup_path(path, suffix);
            fs::copy(path, &backup)
                .with_context(|| format!("Failed to create backup: {}", backup.display()))?;
            tracing::debug!(backup = %backup.display(), "backup created");
            Some(backup)
        }
        None => None,
    };

    write_atomic(path, &transformed, metadata.permissions())?;

    Ok(EditOutcome {
        path: path.to_path_buf(),
        backup,
        changed: transformed != original,
    })
}

fn write_atomic(path: &Path, content: &[u8], permissions: fs::Permissions) -> Result<()> {
    let parent_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Create temp file in same directory as target (for atomic rename)
    let mut temp_file = NamedTempFile::new_in(parent_dir)
        .map_err(|e| error_helpers::write_error(parent_dir, e))?;

    temp_file
        .write_all(content)
        .with_context(|| format!("Failed to write temp file in {}", parent_dir.display()))?;
    temp_file
        .as_file()
        .sync_all()
        .with_context(|| "Failed to flush temp file")?;

    fs::set_permissions(temp_file.path(), permissions)
        .with_context(|| format!("Failed to copy permissions for {}", path.display()))?;

    temp_file
        .persist(path)
        .map_err(|e| error_helpers::write_error(path, e.error))?;

    Ok(())
}
