//! Shared test utilities for the compiled binary

use std::path::PathBuf;

/// Cached binary path for the cmdgen CLI to avoid repeated lookups
#[allow(deprecated)]
pub static CMDGEN_BIN: std::sync::LazyLock<PathBuf> =
    std::sync::LazyLock::new(|| assert_cmd::cargo::cargo_bin("cmdgen"));

/// A command for the binary with every configuration location inside
/// `config_dir` and no environment overrides leaking in.
pub fn cmdgen_cmd(config_dir: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(&*CMDGEN_BIN);
    cmd.env("CMDGEN_CONFIG_DIR", config_dir);
    for var in [
        "CMDGEN_CONFIGURATION_PATH",
        "CMDGEN_PLUGINS_PATH",
        "CMDGEN_DEFINITIONS_PATH",
        "CMDGEN_CACHE_PATH",
        "CMDGEN_PROFILE",
        "CMDGEN_URI",
        "CMDGEN_ORGANIZATION",
        "CMDGEN_TENANT",
        "CMDGEN_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}
