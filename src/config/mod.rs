//! Profiles, plugin configuration and base URI resolution.

pub mod manager;
pub mod models;
pub mod server_variable_resolver;

pub use manager::{apply_env_overrides, get_config_dir, load_plugin_config, ConfigPaths, ConfigProvider};
pub use models::{ConfigFile, ExternalAuthenticatorConfig, OutputMode, PluginConfig, Profile};
pub use server_variable_resolver::{ResolvedServer, ServerVariableResolver};
