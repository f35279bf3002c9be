use crate::constants::DEFINITION_EXTENSIONS;
use crate::error::Error;
use crate::fs::FileSystem;
use std::path::{Path, PathBuf};

/// Raw definition documents stored as `<dir>/<name>.yaml|.yml|.json`.
pub struct DefinitionStore<F: FileSystem> {
    fs: F,
    dir: PathBuf,
}

impl<F: FileSystem> DefinitionStore<F> {
    pub fn new(fs: F, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of all stored definitions, sorted and de-duplicated. A missing
    /// directory holds no definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn names(&self) -> Result<Vec<String>, Error> {
        if !self.fs.is_dir(&self.dir) {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = self
            .fs
            .read_dir(&self.dir)?
            .iter()
            .filter(|path| self.fs.is_file(path))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| DEFINITION_EXTENSIONS.contains(&ext))
            })
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Reads the raw document for `name`, or `None` if it is not stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn read(&self, name: &str) -> Result<Option<String>, Error> {
        for extension in DEFINITION_EXTENSIONS {
            let path = self.dir.join(format!("{name}.{extension}"));
            if self.fs.is_file(&path) {
                return Ok(Some(self.fs.read_to_string(&path)?));
            }
        }
        Ok(None)
    }
}
