//! Resolution of `<definition> <group> <command>` and the run of one command.

use crate::auth::{AuthenticatorChain, BrowserLauncher, ExecBrowserLauncher};
use crate::cache::{CredentialCache, FileCache};
use crate::config::{apply_env_overrides, load_plugin_config, ConfigPaths, ConfigProvider, Profile};
use crate::constants;
use crate::engine::binder::{split_command_path, RawArguments};
use crate::engine::builder::build_context;
use crate::engine::context::InputStream;
use crate::engine::executor::Executor;
use crate::engine::generator::{generate_definition, generate_root};
use crate::engine::loader::DefinitionLoader;
use crate::engine::plugin_executor::PluginExecutor;
use crate::error::Error;
use crate::fs::OsFileSystem;
use crate::plugin::PluginRegistry;
use crate::spec::{Command, DefinitionStore, Visibility};
use crate::suggestions::suggest_similar;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Everything loaded once per process: profiles, plugins and authenticators
pub struct App {
    paths: ConfigPaths,
    config: ConfigProvider,
    registry: PluginRegistry,
    authenticators: AuthenticatorChain,
    executor: Executor,
    env: EnvLookup,
}

impl App {
    /// Loads the configuration from the locations given by the environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration or plugin configuration error.
    pub fn from_env() -> Result<Self, Error> {
        Self::new(ConfigPaths::from_env()?, Arc::new(ExecBrowserLauncher))
    }

    /// # Errors
    ///
    /// Returns `Config` if the profiles cannot be loaded and `PluginConfig`
    /// if the plugin configuration cannot be loaded.
    pub fn new(paths: ConfigPaths, browser: Arc<dyn BrowserLauncher>) -> Result<Self, Error> {
        let config = ConfigProvider::load(&OsFileSystem, &paths.configuration)?;
        let plugins = load_plugin_config(&OsFileSystem, &paths.plugins)?;
        let cache: Arc<dyn CredentialCache> =
            Arc::new(FileCache::new(OsFileSystem, paths.cache.clone()));
        let registry = PluginRegistry::standard();

        Ok(Self {
            authenticators: AuthenticatorChain::standard(&plugins, cache, browser),
            executor: Executor::new(PluginExecutor::new(registry.clone())),
            registry,
            config,
            paths,
            env: Box::new(|name| std::env::var(name).ok()),
        })
    }

    /// Replaces the environment variable lookup.
    #[must_use]
    pub fn with_env<L>(mut self, lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    /// Whether the HTTP exchange should be echoed, from `--debug` or the
    /// selected profile. Unparseable arguments count as no.
    #[must_use]
    pub fn debug_requested<S: AsRef<str>>(&self, args: &[S]) -> bool {
        let (_, rest) = split_command_path(args);
        let Ok(raw) = RawArguments::parse(rest) else {
            return false;
        };
        raw.debug || self.profile(&raw).is_ok_and(|profile| profile.debug)
    }

    fn profile(&self, args: &RawArguments) -> Result<Profile, Error> {
        let name = args
            .profile
            .clone()
            .or_else(|| (self.env)(constants::ENV_PROFILE).filter(|v| !v.is_empty()));
        let profile = self.config.profile(name.as_deref())?;
        Ok(apply_env_overrides(profile, |var| (self.env)(var)))
    }

    /// Runs the command named by `args`, or writes help when `args` stops at
    /// a definition or group or asks for `--help`.
    ///
    /// `input` backs the command's file parameter when no `--file` style flag
    /// is given. It is only read when the command needs it.
    ///
    /// # Errors
    ///
    /// Returns the first failure from lookup, binding, authentication or
    /// execution.
    pub async fn run<S, W>(
        &self,
        args: &[S],
        input: Option<InputStream>,
        out: &mut W,
    ) -> Result<(), Error>
    where
        S: AsRef<str>,
        W: AsyncWrite + Unpin + Send,
    {
        let (path, rest) = split_command_path(args);
        let loader = DefinitionLoader::new(
            DefinitionStore::new(OsFileSystem, &self.paths.definitions),
            &self.registry,
        );

        let Some(definition_name) = path.first().copied() else {
            return write_help(out, generate_root(&loader.names()?)).await;
        };
        let Some(tree) = loader.load(definition_name)? else {
            let names = loader.names()?;
            return Err(not_found(
                definition_name,
                names.iter().map(String::as_str),
            ));
        };

        let mut help = generate_definition(&tree);
        let Some(group_name) = path.get(1).copied() else {
            return write_help(out, help).await;
        };
        let Some(group) = tree.group(group_name) else {
            return Err(not_found(
                group_name,
                tree.listed_groups().map(|g| g.name.as_str()),
            ));
        };
        if let Some(group_help) = help.find_subcommand(group_name).cloned() {
            help = group_help;
        }

        let Some(command_name) = path.get(2).copied() else {
            return write_help(out, help).await;
        };
        let Some(command) = tree.find(group_name, command_name) else {
            return Err(not_found(
                command_name,
                tree.commands_in(group)
                    .filter(|c| c.visibility.is_listed())
                    .map(|c| c.name.as_str()),
            ));
        };
        if let Some(command_help) = help.find_subcommand(command_name).cloned() {
            help = command_help;
        }

        let args = RawArguments::parse(rest)?;
        if args.help {
            return write_help(out, help).await;
        }
        if let Visibility::Disabled { reason } = &command.visibility {
            return Err(Error::CommandNotSupported {
                reason: reason.clone(),
            });
        }

        let profile = self.profile(&args)?;
        let input = match input {
            Some(stream) if reads_input(command, &args) => stream.probe().await,
            _ => None,
        };

        let context = build_context(
            command,
            &tree.server,
            &args,
            &profile,
            input.as_ref(),
            &self.authenticators,
        )
        .await?;
        tracing::debug!(
            definition = %context.definition,
            group = %context.group,
            command = %context.command,
            base_uri = %context.base_uri,
            "executing command"
        );

        let output = self.executor.execute(command, &context).await?;
        output.write_to(out, context.output).await
    }
}

/// A file parameter left unset on the command line may be fed from input
fn reads_input(command: &Command, args: &RawArguments) -> bool {
    command
        .parameters
        .iter()
        .any(|p| p.param_type.is_file() && !args.contains(&p.flag))
}

fn not_found<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Error {
    Error::CommandNotFound {
        name: name.to_string(),
        suggestions: suggest_similar(name, candidates),
    }
}

async fn write_help<W>(out: &mut W, mut command: clap::Command) -> Result<(), Error>
where
    W: AsyncWrite + Unpin + Send,
{
    let help = command.render_help().to_string();
    out.write_all(help.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::browser::MockBrowserLauncher;

    fn app(dir: &std::path::Path) -> App {
        App::new(ConfigPaths::in_dir(dir), Arc::new(MockBrowserLauncher::new()))
            .unwrap()
            .with_env(|_| None)
    }

    async fn run(app: &App, args: &[&str]) -> (Result<(), Error>, String) {
        let mut out = Vec::new();
        let result = app.run(args, None, &mut out).await;
        (result, String::from_utf8(out).unwrap())
    }

    fn with_definitions(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let definitions = dir.path().join(constants::DEFINITIONS_DIR);
        std::fs::create_dir_all(&definitions).unwrap();
        for name in names {
            std::fs::write(definitions.join(format!("{name}.yaml")), "").unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_root_help_lists_definitions() {
        let dir = with_definitions(&["du", "orchestrator"]);
        let (result, out) = run(&app(dir.path()), &[]).await;
        result.unwrap();
        assert!(out.contains("du"));
        assert!(out.contains("orchestrator"));
    }

    #[tokio::test]
    async fn test_unknown_definition_suggests() {
        let dir = with_definitions(&["orchestrator"]);
        let (result, _) = run(&app(dir.path()), &["orchestrato", "buckets"]).await;
        let err = result.unwrap_err();
        assert!(matches!(
            &err,
            Error::CommandNotFound { name, suggestions }
                if name == "orchestrato" && suggestions == &vec!["orchestrator".to_string()]
        ));
    }

    #[tokio::test]
    async fn test_group_help_hides_disabled_command() {
        let dir = with_definitions(&["du"]);
        let (result, out) = run(&app(dir.path()), &["du", "digitization"]).await;
        result.unwrap();
        assert!(out.contains("digitize"));
        assert!(!out.contains("digitize-result"));
    }

    #[tokio::test]
    async fn test_disabled_command_fails_before_profile() {
        let dir = with_definitions(&["du"]);
        let (result, out) = run(
            &app(dir.path()),
            &["du", "digitization", "digitize-result", "--profile", "missing"],
        )
        .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Digitize result command not supported"
        );
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_command_help() {
        let dir = with_definitions(&["orchestrator"]);
        let (result, out) = run(
            &app(dir.path()),
            &["orchestrator", "buckets", "upload", "--help"],
        )
        .await;
        result.unwrap();
        assert!(out.contains("--folder-id"));
        assert!(out.contains("--file"));
    }

    #[tokio::test]
    async fn test_missing_argument_without_profile() {
        let dir = with_definitions(&["orchestrator"]);
        let (result, _) = run(
            &app(dir.path()),
            &["orchestrator", "buckets", "download", "--key", "2", "--path", "a.txt"],
        )
        .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Argument --folder-id is missing"
        );
    }

    #[test]
    fn test_debug_requested_from_profile() {
        let dir = with_definitions(&[]);
        std::fs::write(
            dir.path().join(constants::CONFIG_FILE_NAME),
            "profiles:\n- name: default\n- name: verbose\n  debug: true\n",
        )
        .unwrap();
        let app = app(dir.path());
        assert!(!app.debug_requested(&["du", "digitization", "digitize"]));
        assert!(app.debug_requested(&["du", "digitization", "digitize", "--debug"]));
        assert!(app.debug_requested(&["du", "digitization", "digitize", "--profile", "verbose"]));
    }
}
