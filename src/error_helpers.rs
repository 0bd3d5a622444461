//! Error helper functions for creating actionable error messages

use std::io;
use std::path::Path;

/// Check if an IO error is a permission denied error
pub fn is_permission_denied(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied
}

/// Check if an IO error is a "not found" error
pub fn is_not_found(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

fn parent_display(path: &Path) -> String {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string())
}

/// Create an enhanced error message for file permission issues
pub fn permission_error(path: &Path, operation: &str) -> String {
    format!(
        "Permission denied when {} '{}'\n\n\
         Possible fixes:\n\
         1. Check file permissions: ls -l '{}'\n\
         2. For --in-place, the directory must be writable too: chmod u+w '{}'\n\
         3. Use --preview to see the result without writing",
        operation,
        path.display(),
        path.display(),
        parent_display(path)
    )
}

/// Create an enhanced error message for file not found issues
pub fn not_found_error(path: &Path, context: &str) -> String {
    format!(
        "File not found: '{}'\n\n\
         Context: {}\n\n\
         Possible fixes:\n\
         1. Check the file path is correct\n\
         2. Use an absolute path if the relative path is ambiguous\n\
         3. Omit the file to read from stdin instead",
        path.display(),
        context,
    )
}

/// Turn a failed `File::open` into an actionable error
pub fn open_error(path: &Path, err: io::Error) -> anyhow::Error {
    if is_not_found(&err) {
        anyhow::anyhow!(not_found_error(path, "opening input file"))
    } else if is_permission_denied(&err) {
        anyhow::anyhow!(permission_error(path, "reading"))
    } else {
        anyhow::Error::new(err).context(format!("Failed to open file: {}", path.display()))
    }
}

/// Turn a failed write during in-place editing into an actionable error
pub fn write_error(path: &Path, err: io::Error) -> anyhow::Error {
    if is_permission_denied(&err) {
        anyhow::anyhow!(permission_error(path, "writing"))
    } else {
        anyhow::Error::new(err).context(format!("Failed to write file: {}", path.display()))
    }
}
