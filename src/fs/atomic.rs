//! Atomic, owner-only file writes for courtfile.
//!
//! Writes go to a temporary file in the target's directory, are synced, and
//! then renamed over the target. Readers see either the old content or the
//! new content, never a partial file.
//!
//! Source and destination must be on the same filesystem for the rename to be
//! atomic, which holds because the temporary file lives next to the target.
//! On crash, a temporary file may remain (named `.{filename}.tmp`).

use crate::error::{FilingError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file readable only by the owner.
///
/// On Unix the file ends up with mode `0600`. Used for the credential key and
/// the encrypted credential record.
///
/// # Returns
///
/// * `Ok(())` - On successful atomic write
/// * `Err(FilingError::UserError)` - On write or rename failure
///
/// # Example
///
/// ```no_run
/// use courtfile::fs::atomic_write_private;
/// use std::path::Path;
///
/// atomic_write_private(Path::new("certificate.json"), b"{}\n")?;
/// # Ok::<(), courtfile::error::FilingError>(())
/// ```
pub fn atomic_write_private<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            FilingError::UserError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        FilingError::UserError(format!(
            "failed to atomically replace '{}': {}",
            path.display(),
            e
        ))
    })?;

    #[cfg(unix)]
    {
        if let Some(parent) = path.parent()
            && let Ok(dir) = File::open(parent)
        {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

/// Generate a temporary file path in the same directory as the target.
fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| FilingError::UserError("invalid file path".to_string()))?;

    Ok(parent.join(format!(".{}.tmp", filename)))
}

/// Write content to a file and sync to disk.
fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| {
        FilingError::UserError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content)
        .and_then(|_| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(path);
            FilingError::UserError(format!("failed to write temporary file: {}", e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("certificate.json");
        fs::write(&file_path, "original").unwrap();

        atomic_write_private(&file_path, b"replacement").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "replacement");
        assert!(!temp_dir.path().join(".certificate.json.tmp").exists());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("credentials").join("certificate.json");

        atomic_write_private(&file_path, b"{}").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "{}");
    }

    #[cfg(unix)]
    #[test]
    fn test_written_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("master.key");

        atomic_write_private(&file_path, b"secret").unwrap();

        let mode = fs::metadata(&file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_generate_temp_path() {
        let temp = generate_temp_path(Path::new("/some/path/file.txt")).unwrap();
        assert_eq!(temp, PathBuf::from("/some/path/.file.txt.tmp"));
    }
}
