//! Atomic file replacement for the credential cache.
//!
//! A reader never sees a partially written file. Concurrent writers to the
//! same path do not interleave bytes; the last rename wins. There is no
//! cross-process lock, so two processes refreshing the same token both
//! succeed and one of them is kept.

use std::io::Write;
use std::path::{Path, PathBuf};

/// Write `data` to `path` by writing a temporary sibling file and renaming it
/// into place. The sibling lives in the same directory so the rename stays on
/// one filesystem. On unix the file is created readable by its owner only.
///
/// # Errors
///
/// Returns an error if the parent directory is missing, the temp file cannot
/// be written, or the rename fails.
pub fn atomic_write_sync(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp_path = temp_sibling(path);

    if let Err(e) = write_new(&temp_path, data) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}

fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

fn temp_sibling(path: &Path) -> PathBuf {
    let suffix = fastrand::u64(..);
    let file_name = path
        .file_name()
        .map_or_else(|| "entry".to_string(), |n| n.to_string_lossy().to_string());
    path.with_file_name(format!(".{file_name}.{suffix:016x}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.json");
        atomic_write_sync(&path, b"first").unwrap();
        atomic_write_sync(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn test_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.json");
        atomic_write_sync(&path, b"data").unwrap();
        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_written_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.json");
        atomic_write_sync(&path, b"token").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_missing_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("entry.json");
        assert!(atomic_write_sync(&path, b"data").is_err());
    }

    #[test]
    fn test_temp_sibling_is_hidden_and_adjacent() {
        let temp = temp_sibling(Path::new("/tmp/cache/abc.json"));
        assert_eq!(temp.parent(), Some(Path::new("/tmp/cache")));
        let name = temp.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(".abc.json."));
        assert!(name.ends_with(".tmp"));
    }
}
