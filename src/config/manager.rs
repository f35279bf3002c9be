use crate::config::models::{ConfigFile, PluginConfig, Profile};
use crate::constants;
use crate::error::Error;
use crate::fs::FileSystem;
use std::path::{Path, PathBuf};

/// Returns the configuration directory, `CMDGEN_CONFIG_DIR` or
/// `~/.config/cmdgen`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn get_config_dir() -> Result<PathBuf, Error> {
    if let Ok(dir) = std::env::var(constants::ENV_CONFIG_DIR) {
        return Ok(PathBuf::from(dir));
    }
    let home_dir =
        dirs::home_dir().ok_or_else(|| Error::invalid_config("home directory not found"))?;
    Ok(home_dir.join(".config").join("cmdgen"))
}

/// Locations of every file the CLI reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub configuration: PathBuf,
    pub plugins: PathBuf,
    pub definitions: PathBuf,
    pub cache: PathBuf,
}

impl ConfigPaths {
    /// All paths under one configuration directory.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            configuration: dir.join(constants::CONFIG_FILE_NAME),
            plugins: dir.join(constants::PLUGINS_FILE_NAME),
            definitions: dir.join(constants::DEFINITIONS_DIR),
            cache: dir.join(constants::AUTH_CACHE_DIR),
        }
    }

    /// Paths from the environment, each falling back to the configuration
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration directory cannot be determined.
    pub fn from_env() -> Result<Self, Error> {
        let mut paths = Self::in_dir(&get_config_dir()?);
        let overrides = [
            (constants::ENV_CONFIGURATION_PATH, &mut paths.configuration),
            (constants::ENV_PLUGINS_PATH, &mut paths.plugins),
            (constants::ENV_DEFINITIONS_PATH, &mut paths.definitions),
            (constants::ENV_CACHE_PATH, &mut paths.cache),
        ];
        for (var, target) in overrides {
            if let Some(value) = std::env::var(var).ok().filter(|v| !v.is_empty()) {
                *target = PathBuf::from(value);
            }
        }
        Ok(paths)
    }
}

/// Loaded profiles and profile selection
#[derive(Debug, Clone, Default)]
pub struct ConfigProvider {
    config: ConfigFile,
}

impl ConfigProvider {
    #[must_use]
    pub const fn new(config: ConfigFile) -> Self {
        Self { config }
    }

    /// Loads `config.yaml`; a missing file means no profiles.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn load<F: FileSystem>(fs: &F, path: &Path) -> Result<Self, Error> {
        if !fs.is_file(path) {
            return Ok(Self::default());
        }
        let content = fs.read_to_string(path).map_err(|e| {
            Error::invalid_config(format!("Error reading '{}': {e}", path.display()))
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ConfigFile = serde_yaml::from_str(&content).map_err(|e| {
            Error::invalid_config(format!("Error parsing '{}': {e}", path.display()))
        })?;
        Ok(Self::new(config))
    }

    /// Selects a profile by name, `default` when `name` is `None`. A missing
    /// `default` profile is an empty profile; any other missing profile is an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a non-default profile does not exist.
    pub fn profile(&self, name: Option<&str>) -> Result<Profile, Error> {
        let name = name.unwrap_or(constants::DEFAULT_PROFILE);
        if let Some(profile) = self.config.profiles.iter().find(|p| p.name == name) {
            return Ok(profile.clone());
        }
        if name == constants::DEFAULT_PROFILE {
            return Ok(Profile::named(name));
        }
        Err(Error::invalid_config(format!(
            "Could not find profile '{name}'"
        )))
    }
}

/// Applies `CMDGEN_URI`, `CMDGEN_ORGANIZATION` and `CMDGEN_TENANT` on top of
/// a profile. `lookup` reads one variable.
#[must_use]
pub fn apply_env_overrides<L>(mut profile: Profile, lookup: L) -> Profile
where
    L: Fn(&str) -> Option<String>,
{
    let read = |var: &str| lookup(var).filter(|v| !v.is_empty());
    if let Some(uri) = read(constants::ENV_URI) {
        profile.uri = Some(uri);
    }
    if let Some(organization) = read(constants::ENV_ORGANIZATION) {
        profile.organization = Some(organization);
    }
    if let Some(tenant) = read(constants::ENV_TENANT) {
        profile.tenant = Some(tenant);
    }
    profile
}

/// Loads `plugins.yaml`; a missing file means no plugins.
///
/// # Errors
///
/// Returns a plugin configuration error if the file cannot be read or parsed.
pub fn load_plugin_config<F: FileSystem>(fs: &F, path: &Path) -> Result<PluginConfig, Error> {
    if !fs.is_file(path) {
        return Ok(PluginConfig::default());
    }
    let content = fs
        .read_to_string(path)
        .map_err(|e| Error::PluginConfig(format!("Error reading '{}': {e}", path.display())))?;
    if content.trim().is_empty() {
        return Ok(PluginConfig::default());
    }
    serde_yaml::from_str(&content)
        .map_err(|e| Error::PluginConfig(format!("Error parsing '{}': {e}", path.display())))
}
