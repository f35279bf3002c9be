use std::io;
use std::path::{Path, PathBuf};

/// File access used by the definition store, profile loader and credential
/// cache. Tests substitute their own implementation to avoid touching disk.
pub trait FileSystem: Send + Sync {
    /// Reads a whole UTF-8 file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replaces the file at `path` with `contents`. Readers never observe a
    /// partially written file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn write_all(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Lists the entries of a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory does not exist or cannot be read.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_all(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        crate::atomic::atomic_write_sync(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .collect();
        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        OsFileSystem.write_all(&path, b"{}").unwrap();
        assert!(OsFileSystem.is_file(&path));
        assert_eq!(OsFileSystem.read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_read_dir_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.yaml"), "").unwrap();
        std::fs::write(dir.path().join("a.yaml"), "").unwrap();
        let entries = OsFileSystem.read_dir(dir.path()).unwrap();
        let names: Vec<_> = entries
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.yaml", "b.yaml"]);
    }
}
